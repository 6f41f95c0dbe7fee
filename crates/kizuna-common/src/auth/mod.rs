//! Credential verification

mod jwt;

pub use jwt::{extract_token, Claims, JwtService, TokenType};
