//! Credential checks.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::UserConfig;

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unknown account")]
    UnknownUser,

    #[error("wrong password")]
    WrongPassword,
}

pub trait AuthService: Send + Sync + 'static {
    fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

struct Account {
    user: User,
    password_digest: [u8; 32],
}

/// Accounts seeded from configuration. Passwords are kept as SHA-256 digests.
#[derive(Default)]
pub struct InMemoryAuth {
    accounts: HashMap<String, Account>,
}

impl std::fmt::Debug for InMemoryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAuth")
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(users: &[UserConfig]) -> Self {
        let mut auth = Self::new();
        for user in users {
            auth.insert(&user.user_id, &user.email, &user.password);
        }
        auth
    }

    pub fn insert(&mut self, user_id: &str, email: &str, password: &str) {
        self.accounts.insert(
            email.to_ascii_lowercase(),
            Account {
                user: User {
                    user_id: user_id.to_string(),
                    email: email.to_string(),
                },
                password_digest: digest(password),
            },
        );
    }
}

impl AuthService for InMemoryAuth {
    fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let account = self
            .accounts
            .get(&email.trim().to_ascii_lowercase())
            .ok_or(AuthError::UnknownUser)?;
        if account.password_digest != digest(password) {
            return Err(AuthError::WrongPassword);
        }
        Ok(account.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    #[test]
    fn test_default_account_logs_in() {
        let auth = InMemoryAuth::from_config(&AuthConfig::default().users);
        let user = auth.login("admin", "abc123").unwrap();
        assert_eq!(user.user_id, "admin");
    }

    #[test]
    fn test_login_failures() {
        let mut auth = InMemoryAuth::new();
        auth.insert("u1", "Ana@Example.com", "secret");

        assert_eq!(auth.login("nobody@example.com", "secret"), Err(AuthError::UnknownUser));
        assert_eq!(auth.login("ana@example.com", "wrong"), Err(AuthError::WrongPassword));
        assert_eq!(auth.login(" ana@example.com ", "secret").unwrap().user_id, "u1");
    }
}
