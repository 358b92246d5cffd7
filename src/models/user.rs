//! Caller identity carried by bearer tokens

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims identifying a hacker or an organizer.
///
/// Tokens are issued by the event application; this server only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    #[serde(default)]
    pub is_organizer: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Hardware desk operations are reserved to organizers
    pub fn require_organizer(&self) -> Result<(), AppError> {
        if self.is_organizer {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only organizers can manage hardware".to_string(),
            ))
        }
    }
}
