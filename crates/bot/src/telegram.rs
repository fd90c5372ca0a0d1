use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Thin Bot API client over long polling. Only the three methods the bot needs.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    /// Unix seconds, as sent by Telegram.
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
}

impl TelegramClient {
    pub fn new(token: &str, poll_timeout_secs: u64) -> anyhow::Result<Self> {
        let api_base =
            std::env::var("TELEGRAM_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::with_base_url(&api_base, token, poll_timeout_secs)
    }

    pub fn with_base_url(api_base: &str, token: &str, poll_timeout_secs: u64) -> anyhow::Result<Self> {
        // The HTTP timeout has to outlive the server-side long poll.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 15))
            .build()
            .context("failed to build telegram http client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> anyhow::Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: timeout_secs,
                allowed_updates: &["message"],
            },
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<Message> {
        self.call("sendMessage", &SendMessage { chat_id, text }).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> anyhow::Result<()> {
        // Result is the edited Message, or `true` for inline messages; neither is needed.
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &EditMessageText {
                    chat_id,
                    message_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> anyhow::Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .with_context(|| format!("telegram {method} body read failed"))?;

        decode_response(method, status.as_u16(), &text)
    }
}

fn decode_response<T: DeserializeOwned>(method: &str, status: u16, body: &str) -> anyhow::Result<T> {
    let parsed: ApiResponse<T> = serde_json::from_str(body)
        .with_context(|| format!("telegram {method} returned non-JSON (status {status})"))?;

    if !parsed.ok {
        anyhow::bail!(
            "telegram {method} failed: {} ({})",
            parsed.description.as_deref().unwrap_or("no description"),
            parsed.error_code.unwrap_or(i64::from(status))
        );
    }

    parsed
        .result
        .with_context(|| format!("telegram {method} returned ok without result"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_updates_with_and_without_text() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 5, "date": 1760594400,
                  "chat": {"id": 42, "type": "private"}, "text": "100 for tea"}},
                {"update_id": 11, "message": {"message_id": 6, "date": 1760594401,
                  "chat": {"id": 42, "type": "private"}, "sticker": {}}},
                {"update_id": 12, "edited_message": {}}
            ]
        }"#;
        let updates: Vec<Update> = decode_response("getUpdates", 200, body).unwrap();

        assert_eq!(updates.len(), 3);
        let first = updates[0].message.as_ref().unwrap();
        assert_eq!(first.chat.id, 42);
        assert_eq!(first.text.as_deref(), Some("100 for tea"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn api_errors_carry_description() {
        let body = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let err = decode_response::<Vec<Update>>("getUpdates", 401, body).unwrap_err();
        assert_eq!(err.to_string(), "telegram getUpdates failed: Unauthorized (401)");
    }

    #[test]
    fn non_json_body_is_an_error() {
        let err = decode_response::<Message>("sendMessage", 502, "<html>Bad Gateway</html>")
            .unwrap_err();
        assert!(err.to_string().contains("status 502"));
    }

    #[test]
    fn builds_method_endpoint_from_base() {
        let client = TelegramClient::with_base_url("http://localhost:8081/", "123:abc", 30).unwrap();
        assert_eq!(client.endpoint, "http://localhost:8081/bot123:abc");
    }

    #[test]
    fn get_updates_omits_missing_offset() {
        let body = serde_json::to_value(GetUpdates {
            offset: None,
            timeout: 30,
            allowed_updates: &["message"],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"timeout": 30, "allowed_updates": ["message"]}));
    }
}
