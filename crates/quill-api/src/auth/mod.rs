//! Authentication and authorization module
//!
//! - Token encoding and verification (HS256)
//! - Password hashing with Argon2id
//! - Request gate middleware for protected routes
//! - Registration and login service

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{Claims, DecodeError, EncodeError, TokenCodec};
pub use middleware::{auth_middleware, AuthError, CurrentUser, RequestAuth};
pub use password::{verify_password, Argon2Hasher, PasswordError};
pub use service::{
    AuthService, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserView,
};
