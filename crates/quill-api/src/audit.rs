//! Security audit logging for authentication events
//!
//! Registrations, logins and gate rejections are logged with the "audit"
//! target so they can be filtered and routed separately from request logs.
//! Each event is also serialized to JSON and attached as the `event` field.
//!
//! # Example
//!
//! ```ignore
//! use quill_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     username: user.username.clone(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Account created
    Registration {
        user_id: Uuid,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Account creation refused
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Credentials accepted and a token issued
    LoginSuccess {
        user_id: Uuid,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Credentials refused
    ///
    /// The reason stays in the audit trail; clients only ever see the
    /// generic message.
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// The request gate rejected a call to a protected route
    AccessDenied {
        method: String,
        path: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

impl AuditEvent {
    /// Stable event name, matching the serialized `event_type`
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::Registration { .. } => "registration",
            AuditEvent::RegistrationFailure { .. } => "registration_failure",
            AuditEvent::LoginSuccess { .. } => "login_success",
            AuditEvent::LoginFailure { .. } => "login_failure",
            AuditEvent::AccessDenied { .. } => "access_denied",
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            AuditEvent::RegistrationFailure { .. }
                | AuditEvent::LoginFailure { .. }
                | AuditEvent::AccessDenied { .. }
        )
    }
}

/// Write an audit event to the "audit" tracing target
///
/// Successes are logged at INFO, failures at WARN.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));
    let event_type = event.event_type();

    if event.is_failure() {
        warn!(
            target: "audit",
            timestamp = %timestamp,
            event_type,
            event = %event_json,
            "Security event"
        );
    } else {
        info!(
            target: "audit",
            timestamp = %timestamp,
            event_type,
            event = %event_json,
            "Security event"
        );
    }
}

/// Extract client IP address from request headers
///
/// Prefers the first hop of `X-Forwarded-For`, then `X-Real-IP`.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            username: "user1".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("user1"));
        assert_eq!(event.event_type(), "login_success");
    }

    #[test]
    fn test_access_denied_is_failure() {
        let event = AuditEvent::AccessDenied {
            method: "GET".to_string(),
            path: "/posts".to_string(),
            reason: "Missing Authorization header".to_string(),
            ip_address: None,
            user_agent: None,
        };
        assert!(event.is_failure());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "access_denied");
        assert_eq!(json["path"], "/posts");
    }

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));

        assert_eq!(extract_ip_address(&headers), Some("10.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(extract_ip_address(&headers), Some("10.0.0.9".to_string()));

        assert_eq!(extract_ip_address(&HeaderMap::new()), None);
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("curl/8.0"),
        );
        assert_eq!(extract_user_agent(&headers), Some("curl/8.0".to_string()));
    }
}
