//! User suggestions.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Feedback left by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Suggestion {
    /// Empty until stored.
    pub id: String,
    pub user_id: String,
    pub addr: String,
    pub text: String,
}

pub trait SuggestionService: Send + Sync + 'static {
    /// Store a suggestion, assigning an id when it has none.
    fn add(&self, suggestion: Suggestion) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySuggestions {
    inner: Arc<DashMap<String, Suggestion>>,
}

impl InMemorySuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Suggestion> {
        self.inner.iter().map(|e| e.value().clone()).collect()
    }
}

impl SuggestionService for InMemorySuggestions {
    fn add(&self, mut suggestion: Suggestion) -> bool {
        if suggestion.id.is_empty() {
            suggestion.id = Uuid::new_v4().to_string();
        }
        if self.inner.contains_key(&suggestion.id) {
            return false;
        }
        self.inner.insert(suggestion.id.clone(), suggestion);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_assigns_id() {
        let store = InMemorySuggestions::new();
        let suggestion = Suggestion {
            id: String::new(),
            user_id: "u1".into(),
            addr: "127.0.0.1".into(),
            text: "Dark mode please".into(),
        };
        assert!(store.add(suggestion.clone()));
        assert!(store.add(suggestion));

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| !s.id.is_empty()));
        assert_ne!(all[0].id, all[1].id);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let store = InMemorySuggestions::new();
        let suggestion = Suggestion {
            id: "fixed".into(),
            user_id: String::new(),
            addr: String::new(),
            text: "x".into(),
        };
        assert!(store.add(suggestion.clone()));
        assert!(!store.add(suggestion));
    }
}
