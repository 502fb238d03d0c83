use std::error::Error;

use reqwest::multipart::{Form, Part};
use serde_json::json;
use tracing::{error, warn};

/// Where failures from detached background tasks end up, since there is no
/// caller left to return them to.
pub trait ErrorSink: Send + Sync {
    fn report(&self, context: &str, error: &(dyn Error + Send + Sync));
}

/// Logs reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, context: &str, error: &(dyn Error + Send + Sync)) {
        error!(%context, error = %error, "background task failed");
    }
}

/// Plain-message limit for a webhook post.
const MESSAGE_LIMIT: usize = 2000;
/// Embed description limit.
const EMBED_LIMIT: usize = 4096;
const CODEBLOCK_OVERHEAD: usize = "```\n\n```".len();

/// Logs reports and also forwards them to a chat webhook (the log funnel).
///
/// Delivery runs on a spawned task; a failed delivery is only logged.
pub struct WebhookErrorSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookErrorSink {
    pub fn new(client: reqwest::Client, webhook_url: String) -> Self {
        Self {
            client,
            webhook_url,
        }
    }
}

impl ErrorSink for WebhookErrorSink {
    fn report(&self, context: &str, error: &(dyn Error + Send + Sync)) {
        TracingErrorSink.report(context, error);

        let payload = webhook_payload(context, &error.to_string());
        let client = self.client.clone();
        let url = self.webhook_url.clone();
        tokio::spawn(async move {
            let request = match payload {
                WebhookPayload::Json(body) => client.post(&url).json(&body),
                WebhookPayload::Attachment { body, text } => {
                    let file = Part::bytes(text.into_bytes()).file_name(ATTACHMENT_NAME);
                    let form = Form::new()
                        .text("payload_json", body.to_string())
                        .part("files[0]", file);
                    client.post(&url).multipart(form)
                }
            };
            let result = request
                .send()
                .await
                .and_then(|resp| resp.error_for_status());
            if let Err(e) = result {
                warn!(error = %e, "failed to deliver error report to webhook");
            }
        });
    }
}

/// File name used when a report is too long for an embed.
const ATTACHMENT_NAME: &str = "log.txt";

#[derive(Debug)]
enum WebhookPayload {
    Json(serde_json::Value),
    /// Full report text uploaded as a file next to the JSON body.
    Attachment {
        body: serde_json::Value,
        text: String,
    },
}

/// Pick the webhook shape for a report: a code block when it fits in a
/// message, an embed when it fits in an embed, otherwise a file attachment.
fn webhook_payload(context: &str, message: &str) -> WebhookPayload {
    let text = format!("{context}: {message}");
    let username = "[estella] ERROR";
    let len = text.chars().count() + CODEBLOCK_OVERHEAD;

    if len < MESSAGE_LIMIT {
        return WebhookPayload::Json(json!({
            "username": username,
            "content": format!("```\n{text}\n```"),
        }));
    }

    if len < EMBED_LIMIT {
        return WebhookPayload::Json(json!({
            "username": username,
            "embeds": [{ "description": format!("```\n{text}\n```") }],
        }));
    }

    WebhookPayload::Attachment {
        body: json!({
            "username": username,
            "attachments": [{ "id": 0, "filename": ATTACHMENT_NAME }],
        }),
        text,
    }
}
