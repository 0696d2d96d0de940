//! Session credential holder injected into the service client and controller.

use std::{fmt, sync::RwLock};

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<AccessToken>;

    fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }
}

/// In-memory credential slot. Sign-in and sign-out swap the whole token.
#[derive(Default)]
pub struct SessionContext {
    token: RwLock<Option<AccessToken>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    pub fn sign_in(&self, token: AccessToken) {
        let mut guard = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(token);
    }

    pub fn sign_out(&self) {
        let mut guard = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

impl CredentialProvider for SessionContext {
    fn credential(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(AccessToken::new("   ").is_none());
        assert_eq!(
            AccessToken::new(" abc ").map(|t| t.as_str().to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn sign_in_and_out_toggle_presence() {
        let session = SessionContext::new();
        assert!(!session.is_authenticated());

        session.sign_in(AccessToken::new("token-1").expect("token"));
        assert!(session.is_authenticated());

        session.sign_out();
        assert!(session.credential().is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let token = AccessToken::new("secret-value").expect("token");
        assert!(!format!("{token:?}").contains("secret-value"));
    }
}
