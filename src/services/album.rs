//! Album storage.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::codec::unix_now;

/// An image album owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Album {
    pub album_id: String,
    pub user_id: String,
    pub name: String,
    /// Display order; `-1` means unordered.
    pub seq: i32,
    /// Unix seconds.
    pub created_at: u64,
}

impl Album {
    /// A new, unordered album with a fresh id.
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            album_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            seq: -1,
            created_at: unix_now(),
        }
    }
}

/// Album operations used by the album controller.
pub trait AlbumService: Send + Sync + 'static {
    /// Albums of `user_id`, ordered by `seq` then creation time.
    fn list(&self, user_id: &str) -> Vec<Album>;

    fn add(&self, album: Album) -> bool;

    fn update(&self, album_id: &str, user_id: &str, name: &str) -> bool;

    /// `(ok, msg)`; `msg` explains a refusal.
    fn delete(&self, user_id: &str, album_id: &str) -> (bool, String);
}

/// [`AlbumService`] backed by a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlbums {
    inner: Arc<DashMap<String, Album>>,
}

impl InMemoryAlbums {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, album_id: &str) -> Option<Album> {
        self.inner.get(album_id).map(|a| a.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AlbumService for InMemoryAlbums {
    fn list(&self, user_id: &str) -> Vec<Album> {
        let mut albums: Vec<Album> = self
            .inner
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        albums.sort_by(|a, b| a.seq.cmp(&b.seq).then(a.created_at.cmp(&b.created_at)));
        albums
    }

    fn add(&self, album: Album) -> bool {
        if album.user_id.is_empty() || self.inner.contains_key(&album.album_id) {
            return false;
        }
        tracing::debug!(album_id = %album.album_id, user_id = %album.user_id, "Album added");
        self.inner.insert(album.album_id.clone(), album);
        true
    }

    fn update(&self, album_id: &str, user_id: &str, name: &str) -> bool {
        match self.inner.get_mut(album_id) {
            Some(mut album) if album.user_id == user_id => {
                album.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    fn delete(&self, user_id: &str, album_id: &str) -> (bool, String) {
        match self.inner.get(album_id).map(|a| a.user_id == user_id) {
            None => (false, "album.not_found".to_string()),
            Some(false) => (false, "album.not_owner".to_string()),
            Some(true) => {
                self.inner.remove(album_id);
                tracing::debug!(album_id, user_id, "Album deleted");
                (true, String::new())
            }
        }
    }
}
