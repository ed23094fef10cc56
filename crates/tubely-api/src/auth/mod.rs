//! Bearer-token authentication

pub mod jwt;

pub use jwt::{authenticate, get_bearer_token, make_jwt, validate_jwt, JwtClaims};
