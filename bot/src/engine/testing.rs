//! In-memory collaborators for cache tests.

use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::error_sink::ErrorSink;
use super::errors::TransportError;
use super::ports::{AssetHandle, AssetProvider, AvatarSource};

/// Serves configured images per UUID, optionally slowly or not at all.
#[derive(Default)]
pub struct FakeAvatarSource {
    images: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
    failing: AtomicBool,
    panicking: AtomicBool,
    delay: Duration,
}

impl FakeAvatarSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps first, so concurrent callers interleave.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn set_image(&self, unique_id: &str, image: &[u8]) {
        self.images
            .lock()
            .unwrap()
            .insert(unique_id.to_string(), image.to_vec());
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every fetch panic, as a bug inside a task would.
    pub fn panic_on_fetch(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AvatarSource for FakeAvatarSource {
    async fn fetch(&self, unique_id: &str, _size: u32) -> Result<Vec<u8>, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panicking.load(Ordering::SeqCst) {
            panic!("avatar source blew up");
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::InvalidResponse("avatar source down".into()));
        }
        self.images
            .lock()
            .unwrap()
            .get(unique_id)
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse(format!("no avatar for {unique_id}")))
    }
}

/// Keeps assets in a list and hands out increasing ids.
#[derive(Default)]
pub struct FakeAssetProvider {
    live: Mutex<Vec<AssetHandle>>,
    next_id: AtomicU64,
    created: AtomicUsize,
    deleted: AtomicUsize,
}

impl FakeAssetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self, name: &str) -> AssetHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        AssetHandle {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// Add an asset that already existed before the cache started.
    pub fn seed(&self, name: &str) {
        let handle = self.next_handle(name);
        self.live.lock().unwrap().push(handle);
    }

    pub fn live(&self) -> Vec<AssetHandle> {
        self.live.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetProvider for FakeAssetProvider {
    async fn create(&self, name: &str, _image: &[u8]) -> Result<AssetHandle, TransportError> {
        let handle = self.next_handle(name);
        self.live.lock().unwrap().push(handle.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn delete(&self, handle: &AssetHandle) -> Result<(), TransportError> {
        let mut live = self.live.lock().unwrap();
        let before = live.len();
        live.retain(|h| h.id != handle.id);
        if live.len() == before {
            return Err(TransportError::InvalidResponse(format!(
                "unknown asset {}",
                handle.id
            )));
        }
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AssetHandle>, TransportError> {
        Ok(self.live())
    }
}

/// Records every report as `"{context}: {error}"`.
#[derive(Default)]
pub struct CollectingErrorSink {
    reports: Mutex<Vec<String>>,
}

impl CollectingErrorSink {
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, context: &str, error: &(dyn Error + Send + Sync)) {
        self.reports
            .lock()
            .unwrap()
            .push(format!("{context}: {error}"));
    }
}
