use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::{DashMap, DashSet};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::error_sink::ErrorSink;
use super::errors::CacheError;
use super::ports::{AssetHandle, AssetProvider, AvatarSource};
use crate::db::queries::avatar_records;

/// Suffix marking platform assets owned by this cache.
pub const ASSET_SUFFIX: &str = "_head";

/// A Minecraft player as reported by a server status response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerIdentity {
    pub display_name: String,
    /// Player UUID; stable across name changes.
    pub unique_id: String,
}

impl PlayerIdentity {
    pub fn new(display_name: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            unique_id: unique_id.into(),
        }
    }

    /// Key into the in-memory handle map.
    pub fn cache_key(&self) -> String {
        self.display_name.to_lowercase()
    }
}

/// Platform asset name for a cache key.
pub fn asset_name(cache_key: &str) -> String {
    format!("{cache_key}{ASSET_SUFFIX}")
}

/// Hex-encoded SHA-256 of an image.
pub fn content_hash(image: &[u8]) -> String {
    hex::encode(Sha256::digest(image))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Create the asset if it is not cached yet.
    pub create: bool,
    /// Kick off a background revalidation when the asset is cached.
    pub revalidate: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AvatarSettings {
    /// Requested image edge length in pixels.
    pub size: u32,
    /// Minimum time between two revalidations of the same player.
    pub revalidate_after: Duration,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            size: 128,
            revalidate_after: Duration::minutes(10),
        }
    }
}

/// What a revalidation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidation {
    /// The player was never cached through this store.
    NoRecord,
    /// Validated too recently; nothing fetched.
    Fresh,
    /// Fetched and the image is the same.
    Unchanged,
    /// The image changed; the asset was deleted and recreated.
    Replaced,
}

/// Player head emojis keyed by lower-cased player name.
///
/// Handles live in memory and are rebuilt from the platform on startup
/// ([`populate`](Self::populate)); the content hash and last validation time
/// of each player live in `avatar_records`.
pub struct AvatarCache {
    handles: DashMap<String, AssetHandle>,
    /// One lock per cache key, created on first use and kept for the life of
    /// the process.
    creation_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Player UUIDs with a background revalidation currently running.
    revalidating: DashSet<String>,
    db: SqlitePool,
    source: Arc<dyn AvatarSource>,
    assets: Arc<dyn AssetProvider>,
    errors: Arc<dyn ErrorSink>,
    settings: AvatarSettings,
}

impl AvatarCache {
    pub fn new(
        db: SqlitePool,
        source: Arc<dyn AvatarSource>,
        assets: Arc<dyn AssetProvider>,
        errors: Arc<dyn ErrorSink>,
        settings: AvatarSettings,
    ) -> Self {
        Self {
            handles: DashMap::new(),
            creation_locks: DashMap::new(),
            revalidating: DashSet::new(),
            db,
            source,
            assets,
            errors,
            settings,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    fn cached(&self, name: &str) -> Option<AssetHandle> {
        self.handles.get(name).map(|h| h.value().clone())
    }

    /// Load every existing `*_head` asset into memory.
    ///
    /// Must run before any creation traffic.
    pub async fn populate(&self) -> Result<usize, CacheError> {
        let assets = self.assets.list().await?;

        let mut loaded = 0;
        for handle in assets {
            let Some(name) = handle.name.strip_suffix(ASSET_SUFFIX) else {
                continue;
            };
            // Lookups are by lower-cased name only.
            if name.is_empty() || name != name.to_lowercase() {
                continue;
            }
            self.handles.insert(name.to_string(), handle);
            loaded += 1;
        }

        info!(count = loaded, "loaded player heads from platform");
        Ok(loaded)
    }

    /// The player's head asset.
    ///
    /// A cached handle is returned immediately; with `revalidate` a background
    /// check is started first. A missing handle is created when `create` is
    /// set and is otherwise `NotFound`.
    pub async fn get(
        self: &Arc<Self>,
        player: &PlayerIdentity,
        options: GetOptions,
    ) -> Result<AssetHandle, CacheError> {
        let name = player.cache_key();

        if let Some(handle) = self.cached(&name) {
            if options.revalidate {
                self.revalidate_in_background(player.clone());
            }
            return Ok(handle);
        }

        if !options.create {
            return Err(CacheError::NotFound(format!(
                "{name}'s player head not found."
            )));
        }

        let handle = self.create(player).await?;
        if handle.name != asset_name(&name) {
            return Err(CacheError::Invariant(format!(
                "player head for {name} created as {}",
                handle.name
            )));
        }
        Ok(handle)
    }

    /// Create the player's head asset unless it already exists.
    ///
    /// Returns the handle found or inserted while holding the player's
    /// creation lock.
    pub async fn create(&self, player: &PlayerIdentity) -> Result<AssetHandle, CacheError> {
        self.create_with(player, None).await
    }

    async fn create_with(
        &self,
        player: &PlayerIdentity,
        prefetched: Option<Vec<u8>>,
    ) -> Result<AssetHandle, CacheError> {
        let name = player.cache_key();
        let lock = Arc::clone(&self.creation_locks.entry(name.clone()).or_default());
        let _guard = lock.lock().await;

        // Someone else may have created it while we waited for the lock.
        if let Some(handle) = self.cached(&name) {
            return Ok(handle);
        }

        debug!(player = %name, unique_id = %player.unique_id, "creating player head");

        let image = match prefetched {
            Some(image) => image,
            None => {
                self.source
                    .fetch(&player.unique_id, self.settings.size)
                    .await?
            }
        };
        let hash = content_hash(&image);

        let handle = self.assets.create(&asset_name(&name), &image).await?;
        avatar_records::upsert_record(&self.db, &player.unique_id, &hash, Utc::now()).await?;
        self.handles.insert(name.clone(), handle.clone());

        info!(player = %name, "created player head");
        Ok(handle)
    }

    /// Forget a cached head and delete its asset from the platform.
    pub async fn delete(&self, name: &str) -> Result<(), CacheError> {
        let Some((_, handle)) = self.handles.remove(name) else {
            return Err(CacheError::NotFound(format!(
                "{name}'s player head not found."
            )));
        };

        self.assets.delete(&handle).await?;
        info!(player = %name, asset_id = %handle.id, "deleted player head");
        Ok(())
    }

    /// Re-fetch the player's head and replace the asset if it changed.
    ///
    /// The validation time is advanced before fetching, so a failing source
    /// is retried at most once per interval.
    pub async fn validate_and_refresh(
        &self,
        player: &PlayerIdentity,
    ) -> Result<Revalidation, CacheError> {
        let Some(record) = avatar_records::get_record(&self.db, &player.unique_id).await? else {
            return Ok(Revalidation::NoRecord);
        };

        let now = Utc::now();
        if now - record.last_validated_at < self.settings.revalidate_after {
            return Ok(Revalidation::Fresh);
        }

        avatar_records::touch_validated_at(&self.db, &player.unique_id, now).await?;

        let image = self
            .source
            .fetch(&player.unique_id, self.settings.size)
            .await?;
        if content_hash(&image) == record.content_hash {
            debug!(player = %player.display_name, "player head unchanged");
            return Ok(Revalidation::Unchanged);
        }

        info!(
            player = %player.display_name,
            unique_id = %player.unique_id,
            "player head changed, replacing"
        );
        self.delete(&player.cache_key()).await?;
        self.create_with(player, Some(image)).await?;
        Ok(Revalidation::Replaced)
    }

    /// Spawn [`validate_and_refresh`](Self::validate_and_refresh) detached,
    /// reporting failures to the error sink.
    ///
    /// Returns `None` without spawning if a revalidation for the same player
    /// is still running.
    pub fn revalidate_in_background(
        self: &Arc<Self>,
        player: PlayerIdentity,
    ) -> Option<JoinHandle<()>> {
        if !self.revalidating.insert(player.unique_id.clone()) {
            debug!(player = %player.display_name, "revalidation already running");
            return None;
        }

        let in_flight = InFlight {
            cache: Arc::clone(self),
            unique_id: player.unique_id.clone(),
        };
        let cache = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            if let Err(e) = cache.validate_and_refresh(&player).await {
                cache.errors.report(
                    &format!("revalidating player head for {}", player.display_name),
                    &e,
                );
            }
        }))
    }
}

/// Clears a player's in-flight revalidation mark on drop, including when the
/// task panics.
struct InFlight {
    cache: Arc<AvatarCache>,
    unique_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.cache.revalidating.remove(&self.unique_id);
    }
}
