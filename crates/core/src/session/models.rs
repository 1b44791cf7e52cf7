use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Login credentials supplied by the user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredentials {
    username: String,
    password: String,
    #[serde(default)]
    remember: bool,
}

impl AccountCredentials {
    /// Bundle a username/password pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>, remember: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember,
        }
    }

    /// Account username (student id).
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Account password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether the user asked for the login to be persisted.
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// Whether the pair is worth sending to the server at all.
    pub fn is_well_formed(&self) -> bool {
        static USERNAME_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("invalid username regex"));

        !self.password.is_empty() && USERNAME_RE.is_match(self.username.trim())
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

/// Token handed out by the server on a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    /// Opaque session identifier.
    pub token: String,
    /// Epoch millis at which the server issued the token.
    pub issued_at_ms: i64,
}

/// Credentials plus the session currently bound to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSession {
    credentials: AccountCredentials,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    session_issued_at_ms: i64,
}

impl AccountSession {
    /// Fresh, unauthenticated session for the given credentials.
    pub fn new(credentials: AccountCredentials) -> Self {
        Self {
            credentials,
            session_token: None,
            session_issued_at_ms: 0,
        }
    }

    /// Credentials this session logs in with.
    pub fn credentials(&self) -> &AccountCredentials {
        &self.credentials
    }

    /// Token from the last successful login, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// When the token was issued, in epoch milliseconds; `0` without one.
    pub fn session_issued_at_ms(&self) -> i64 {
        self.session_issued_at_ms
    }

    /// Credentials are present and well formed.
    pub fn is_valid(&self) -> bool {
        self.credentials.is_well_formed()
    }

    /// A non-empty token is held, regardless of its age.
    pub fn has_token(&self) -> bool {
        self.session_token
            .as_deref()
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }

    /// Valid credentials and a token no older than `ttl` millis.
    pub fn is_authenticated(&self, now: i64, ttl: i64) -> bool {
        self.is_valid()
            && self.has_token()
            && now.saturating_sub(self.session_issued_at_ms) <= ttl
    }

    /// Same credentials bound to a newly issued token.
    pub fn with_grant(self, grant: SessionGrant) -> Self {
        Self {
            credentials: self.credentials,
            session_token: Some(grant.token),
            session_issued_at_ms: grant.issued_at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_credentials() {
        assert!(AccountCredentials::new("102190123", "secret", false).is_well_formed());
        assert!(AccountCredentials::new(" 102190123 ", "secret", false).is_well_formed());
        assert!(!AccountCredentials::new("", "secret", false).is_well_formed());
        assert!(!AccountCredentials::new("1021 90123", "secret", false).is_well_formed());
        assert!(!AccountCredentials::new("102190123", "", false).is_well_formed());
    }

    #[test]
    fn authentication_requires_fresh_token() {
        let session = AccountSession::new(AccountCredentials::new("a", "b", true));
        assert!(session.is_valid());
        assert!(!session.is_authenticated(0, 1_000));

        let session = session.with_grant(SessionGrant {
            token: "T1".to_string(),
            issued_at_ms: 5_000,
        });
        assert_eq!(session.session_token(), Some("T1"));
        assert!(session.is_authenticated(6_000, 1_000));
        assert!(!session.is_authenticated(6_001, 1_000));
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", AccountCredentials::new("a", "hunter2", false));
        assert!(rendered.contains("\"a\""));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn session_round_trips_through_json() -> serde_json::Result<()> {
        let session = AccountSession::new(AccountCredentials::new("a", "b", true)).with_grant(
            SessionGrant {
                token: "T1".to_string(),
                issued_at_ms: 42,
            },
        );
        let restored: AccountSession = serde_json::from_str(&serde_json::to_string(&session)?)?;
        assert_eq!(restored, session);
        Ok(())
    }
}
