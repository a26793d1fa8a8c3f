use std::sync::{Arc, RwLock};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use uuid::Uuid;
use vibes_types::api::Claims;

use crate::error::{ClientError, Result};

/// The signed-in actor, shared by every component of a client.
#[derive(Clone, Default)]
pub struct Session {
    claims: Arc<RwLock<Option<Claims>>>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Session for a known user id, without a token.
    pub fn for_user(user_id: Uuid) -> Self {
        let session = Self::default();
        session.set(Some(Claims {
            sub: user_id,
            email: None,
            exp: usize::MAX,
        }));
        session
    }

    /// Read the claims out of a backend access token.
    ///
    /// The backend verifies signatures on every request, so the client only
    /// checks structure and expiry.
    pub fn from_access_token(token: &str) -> anyhow::Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        let session = Self::default();
        session.set(Some(data.claims));
        Ok(session)
    }

    /// The authenticated user id, or [`ClientError::Auth`].
    pub fn actor(&self) -> Result<Uuid> {
        self.claims
            .read()
            .map_err(|_| ClientError::Auth)?
            .as_ref()
            .map(|c| c.sub)
            .ok_or(ClientError::Auth)
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    fn set(&self, claims: Option<Claims>) {
        if let Ok(mut guard) = self.claims.write() {
            *guard = claims;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    #[test]
    fn token_claims_become_the_actor() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id,
            email: Some("a@example.com".into()),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"backend-secret"),
        )
        .unwrap();

        let session = Session::from_access_token(&token).unwrap();
        assert_eq!(session.actor().unwrap(), user_id);

        session.sign_out();
        assert!(matches!(session.actor(), Err(ClientError::Auth)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: None,
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(Session::from_access_token(&token).is_err());
    }

    #[test]
    fn anonymous_session_has_no_actor() {
        assert!(matches!(Session::anonymous().actor(), Err(ClientError::Auth)));
    }
}
