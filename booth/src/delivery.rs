use lovelens_common::config::TelegramConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Positive acknowledgment from the bot API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledged {
    pub message_id: Option<i64>,
}

/// Response envelope of the bot API: success is a truthy `ok`; anything else
/// carries its diagnostic in `description`.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
    result: Option<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: Option<i64>,
}

/// Thin client for the Telegram `sendPhoto` endpoint. One POST per send, no
/// retry, no queuing; the endpoint's protocol is treated as a black box.
/// Cloneable and safe to use from concurrent in-flight sends.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    send_photo_url: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            send_photo_url: format!(
                "{}/bot{}/sendPhoto",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Upload one encoded still as a multipart form: a `chat_id` text field
    /// and a `photo` binary field named `photo.png`.
    pub async fn send_photo(&self, png: Vec<u8>) -> Result<Acknowledged, DeliveryError> {
        let photo = reqwest::multipart::Part::bytes(png)
            .file_name("photo.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("photo", photo);

        let response = self
            .http
            .post(&self.send_photo_url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, "sendPhoto response");
        ack_from_body(&body)
    }
}

/// Interpret the response envelope. A missing or false `ok` is a rejection
/// carrying whatever diagnostic the endpoint offered.
fn ack_from_body(body: &str) -> Result<Acknowledged, DeliveryError> {
    match serde_json::from_str::<ApiEnvelope>(body) {
        Ok(envelope) if envelope.ok => Ok(Acknowledged {
            message_id: envelope.result.and_then(|m| m.message_id),
        }),
        Ok(envelope) => Err(DeliveryError::Rejected(
            envelope
                .description
                .unwrap_or_else(|| "no diagnostic in response".into()),
        )),
        Err(_) => Err(DeliveryError::Rejected(format!(
            "unparseable response: {body}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_is_acknowledged() {
        let ack = ack_from_body(r#"{"ok":true,"result":{"message_id":1234}}"#).unwrap();
        assert_eq!(ack.message_id, Some(1234));
    }

    #[test]
    fn ok_without_message_id_is_still_acknowledged() {
        let ack = ack_from_body(r#"{"ok":true}"#).unwrap();
        assert_eq!(ack.message_id, None);
    }

    #[test]
    fn not_ok_is_rejected_with_diagnostic() {
        let err = ack_from_body(r#"{"ok":false,"description":"x"}"#).unwrap_err();
        match err {
            DeliveryError::Rejected(reason) => assert_eq!(reason, "x"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn missing_ok_field_is_rejected() {
        let err = ack_from_body(r#"{"description":"who knows"}"#).unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected(_)));
    }

    #[test]
    fn non_json_body_is_rejected() {
        let err = ack_from_body("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let config = TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
            // Nothing listens here; the connection is refused.
            api_base: "http://127.0.0.1:9".into(),
        };
        let client = TelegramClient::new(&config).unwrap();
        let err = client.send_photo(vec![0x89, 0x50]).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn endpoint_url_is_templated_with_token() {
        let config = TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "42".into(),
            api_base: "https://api.telegram.org/".into(),
        };
        let client = TelegramClient::new(&config).unwrap();
        assert_eq!(
            client.send_photo_url,
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
        assert_eq!(client.chat_id, "42");
    }
}
