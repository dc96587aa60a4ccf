//! Signed-in session.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub company_id: String,
    pub role: Role,
}

/// Tokens issued by the identity provider plus the signed-in user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub user: User,
}

/// On-disk shape of a session.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    user: User,
}

#[derive(Debug, Default)]
pub struct AuthStore {
    session: Option<AuthSession>,
    error: Option<String>,
}

impl AuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, session: AuthSession) {
        info!(user = %session.user.email, "Signed in");
        self.session = Some(session);
        self.error = None;
    }

    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            info!(user = %session.user.email, "Signed out");
        }
        self.error = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    /// Bearer token for API requests.
    pub fn token(&self) -> Option<&SecretString> {
        self.session.as_ref().map(|s| &s.token)
    }

    /// Record a failed sign-in attempt.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Serialize the session for storage, if signed in.
    pub fn persist(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        let persisted = PersistedSession {
            token: session.token.expose_secret().to_string(),
            refresh_token: session
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            user: session.user.clone(),
        };
        serde_json::to_string(&persisted).ok()
    }

    /// Restore a stored session. Corrupt data clears the session and returns false.
    pub fn restore(&mut self, stored: &str) -> bool {
        match serde_json::from_str::<PersistedSession>(stored) {
            Ok(p) if !p.token.is_empty() => {
                self.session = Some(AuthSession {
                    token: SecretString::from(p.token),
                    refresh_token: p.refresh_token.map(SecretString::from),
                    user: p.user,
                });
                true
            }
            Ok(_) => {
                warn!("Stored session has an empty token, clearing");
                self.session = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "Stored session is corrupt, clearing");
                self.session = None;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            token: SecretString::from("tok-123"),
            refresh_token: Some(SecretString::from("ref-456")),
            user: User {
                id: "u-1".into(),
                email: "ana@lavanderia.test".into(),
                name: "Ana".into(),
                company_id: "company-456".into(),
                role: Role::Admin,
            },
        }
    }

    #[test]
    fn sign_in_and_out() {
        let mut store = AuthStore::new();
        store.fail("bad password");
        store.sign_in(session());
        assert!(store.is_signed_in());
        assert!(store.error().is_none());
        assert_eq!(store.token().unwrap().expose_secret(), "tok-123");

        store.sign_out();
        assert!(!store.is_signed_in());
        assert!(store.token().is_none());
    }

    #[test]
    fn persist_then_restore() {
        let mut store = AuthStore::new();
        store.sign_in(session());
        let stored = store.persist().unwrap();
        assert!(stored.contains("\"companyId\":\"company-456\""));

        let mut restored = AuthStore::new();
        assert!(restored.restore(&stored));
        assert_eq!(restored.user().unwrap().role, Role::Admin);
        assert_eq!(restored.token().unwrap().expose_secret(), "tok-123");
    }

    #[test]
    fn corrupt_storage_clears_session() {
        let mut store = AuthStore::new();
        store.sign_in(session());
        assert!(!store.restore("{\"token\": \"x\", \"user\": \"not an object\"}"));
        assert!(!store.is_signed_in());
    }

    #[test]
    fn empty_token_is_not_restored() {
        let mut store = AuthStore::new();
        let stored = r#"{"token": "", "user": {"id": "u", "email": "e", "name": "n",
            "companyId": "c", "role": "user"}}"#;
        assert!(!store.restore(stored));
        assert!(store.persist().is_none());
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("tok-123"));
    }
}
