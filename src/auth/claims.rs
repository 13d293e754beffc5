use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload used for authentication.
///
/// `email` is optional on the wire so that a token signed without it can be
/// told apart from a structurally broken one during verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user ID
    #[serde(default)]
    pub email: Option<String>,
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}
