use async_trait::async_trait;

use super::USER_AGENT;
use crate::engine::errors::TransportError;
use crate::engine::ports::AvatarSource;

/// Player head renders from a Crafthead-compatible service.
pub struct CraftheadClient {
    client: reqwest::Client,
    base_url: String,
}

impl CraftheadClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn avatar_url(&self, unique_id: &str, size: u32) -> String {
        format!(
            "{}/avatar/{}/{}",
            self.base_url.trim_end_matches('/'),
            unique_id,
            size
        )
    }
}

#[async_trait]
impl AvatarSource for CraftheadClient {
    async fn fetch(&self, unique_id: &str, size: u32) -> Result<Vec<u8>, TransportError> {
        let url = self.avatar_url(unique_id, size);
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: resp.status(),
            });
        }

        let body = resp.bytes().await?;
        if body.is_empty() {
            return Err(TransportError::InvalidResponse(format!(
                "empty avatar for {unique_id}"
            )));
        }
        Ok(body.to_vec())
    }
}
