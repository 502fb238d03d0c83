//! Boundaries to the remote services the avatar cache depends on.
//!
//! The cache only sees these traits; `crate::platform` holds the HTTP
//! implementations and tests swap in fakes.

use std::fmt;

use async_trait::async_trait;

use super::errors::TransportError;

/// A small image asset hosted by the chat platform (an application emoji).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub id: String,
    pub name: String,
}

impl fmt::Display for AssetHandle {
    /// Renders as inline emoji markup.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<:{}:{}>", self.name, self.id)
    }
}

/// Source of truth for player head images.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    /// Raw image bytes for the player with this UUID, `size` pixels square.
    async fn fetch(&self, unique_id: &str, size: u32) -> Result<Vec<u8>, TransportError>;
}

/// Creates, deletes and lists assets on the chat platform.
#[async_trait]
pub trait AssetProvider: Send + Sync {
    async fn create(&self, name: &str, image: &[u8]) -> Result<AssetHandle, TransportError>;
    async fn delete(&self, handle: &AssetHandle) -> Result<(), TransportError>;
    async fn list(&self) -> Result<Vec<AssetHandle>, TransportError>;
}
