use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::USER_AGENT;
use crate::engine::errors::TransportError;
use crate::engine::ports::{AssetHandle, AssetProvider};

/// Application emojis via the chat platform's REST API.
pub struct EmojiApiClient {
    client: reqwest::Client,
    api_base_url: String,
    application_id: u64,
    token: String,
}

#[derive(Deserialize)]
struct EmojiObject {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct EmojiList {
    items: Vec<EmojiObject>,
}

impl From<EmojiObject> for AssetHandle {
    fn from(emoji: EmojiObject) -> Self {
        AssetHandle {
            id: emoji.id,
            name: emoji.name,
        }
    }
}

impl EmojiApiClient {
    pub fn new(
        client: reqwest::Client,
        api_base_url: impl Into<String>,
        application_id: u64,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into(),
            application_id,
            token: token.into(),
        }
    }

    fn emojis_url(&self) -> String {
        format!(
            "{}/applications/{}/emojis",
            self.api_base_url.trim_end_matches('/'),
            self.application_id
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    async fn send(
        &self,
        url: String,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: resp.status(),
            });
        }
        Ok(resp)
    }
}

/// MIME type of an image, sniffed from its magic bytes. Defaults to PNG.
fn sniff_mime(image: &[u8]) -> &'static str {
    if image.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if image.starts_with(b"GIF87a") || image.starts_with(b"GIF89a") {
        "image/gif"
    } else if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.len() >= 12 && &image[..4] == b"RIFF" && &image[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/png"
    }
}

fn image_data_uri(image: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(image), STANDARD.encode(image))
}

#[async_trait]
impl AssetProvider for EmojiApiClient {
    async fn create(&self, name: &str, image: &[u8]) -> Result<AssetHandle, TransportError> {
        let url = self.emojis_url();
        let body = json!({
            "name": name,
            "image": image_data_uri(image),
        });
        let builder = self.request(reqwest::Method::POST, &url).json(&body);
        let emoji: EmojiObject = self.send(url, builder).await?.json().await?;

        debug!(emoji_id = %emoji.id, %name, "created application emoji");
        Ok(emoji.into())
    }

    async fn delete(&self, handle: &AssetHandle) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.emojis_url(), handle.id);
        let builder = self.request(reqwest::Method::DELETE, &url);
        self.send(url, builder).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AssetHandle>, TransportError> {
        let url = self.emojis_url();
        let builder = self.request(reqwest::Method::GET, &url);
        let list: EmojiList = self.send(url, builder).await?.json().await?;
        Ok(list.items.into_iter().map(AssetHandle::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EmojiApiClient {
        EmojiApiClient::new(reqwest::Client::new(), "https://discord.com/api/v10/", 42, "t")
    }

    #[test]
    fn test_emojis_url() {
        assert_eq!(
            client().emojis_url(),
            "https://discord.com/api/v10/applications/42/emojis"
        );
    }

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n...."), "image/png");
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_sniff_unknown_defaults_to_png() {
        assert_eq!(sniff_mime(b""), "image/png");
        assert_eq!(sniff_mime(b"RIFF"), "image/png");
    }

    #[test]
    fn test_image_data_uri() {
        assert_eq!(image_data_uri(b"GIF89a"), "data:image/gif;base64,R0lGODlh");
    }

    #[test]
    fn test_parse_emoji_list() {
        let raw = r#"{"items": [
            {"id": "1", "name": "steve_head", "roles": [], "require_colons": true},
            {"id": "2", "name": "party_parrot", "animated": true}
        ]}"#;
        let list: EmojiList = serde_json::from_str(raw).unwrap();
        let handles: Vec<AssetHandle> = list.items.into_iter().map(AssetHandle::from).collect();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].name, "steve_head");
        assert_eq!(handles[1].id, "2");
    }
}
