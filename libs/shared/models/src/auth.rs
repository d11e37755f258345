use serde::{Deserialize, Serialize};

/// Claims carried by an identity-provider token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub iat: Option<u64>,
}

/// The verified identity behind an authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub email: Option<String>,
}
