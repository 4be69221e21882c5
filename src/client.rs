use reqwest::Client;
use serde::Serialize;
use std::str::FromStr;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Chat,
    Search,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat",
            ChatMode::Search => "search",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ChatMode::Chat => ChatMode::Search,
            ChatMode::Search => ChatMode::Chat,
        }
    }

    /// Button label shown in the view
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatMode::Chat => "Chat Mode",
            ChatMode::Search => "Search Mode",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            ChatMode::Chat => "/api/chat",
            ChatMode::Search => "/api/search",
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(ChatMode::Chat),
            "search" => Ok(ChatMode::Search),
            other => Err(format!("unknown mode '{}', expected chat or search", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("response body is not JSON (status {status})")]
    Malformed { status: u16 },
    #[error("response body has no `response` field (status {status})")]
    MissingResponse { status: u16 },
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    session_id: &'a str,
    query: &'a str,
}

#[derive(Serialize)]
struct ClearHistoryRequest<'a> {
    session_id: &'a str,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one message and return the assistant reply.
    pub async fn send(&self, session_id: &str, mode: ChatMode, text: &str) -> Result<String, ChatError> {
        let url = format!("{}{}", self.base_url, mode.endpoint());

        let request = match mode {
            ChatMode::Chat => self.client.post(&url).json(&ChatRequest { session_id, message: text }),
            ChatMode::Search => self.client.post(&url).json(&SearchRequest { session_id, query: text }),
        };

        let response = request
            .send()
            .await
            .map_err(|source| ChatError::Transport { url: url.clone(), source })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| ChatError::Transport { url: url.clone(), source })?;

        parse_reply(status, &body)
    }

    /// Ask the backend to drop this session's history. Any completed response
    /// counts, whatever its status or body.
    pub async fn clear_history(&self, session_id: &str) -> Result<(), ChatError> {
        let url = format!("{}/api/clear_history", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ClearHistoryRequest { session_id })
            .send()
            .await
            .map_err(|source| ChatError::Transport { url: url.clone(), source })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::info!(status = status.as_u16(), body = %body, "Clear history acknowledged");
        Ok(())
    }
}

/// Pull the `response` string out of a reply body.
fn parse_reply(status: u16, body: &[u8]) -> Result<String, ChatError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ChatError::Malformed { status })?;

    value
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ChatError::MissingResponse { status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_reply_extracts_response() {
        let reply = parse_reply(200, br#"{"response": "hi there"}"#).unwrap();
        assert_eq!(reply, "hi there");
    }

    #[test]
    fn test_parse_reply_missing_field() {
        assert!(matches!(
            parse_reply(200, b"{}"),
            Err(ChatError::MissingResponse { status: 200 })
        ));
    }

    #[test]
    fn test_parse_reply_non_string_field() {
        assert!(matches!(
            parse_reply(200, br#"{"response": 42}"#),
            Err(ChatError::MissingResponse { .. })
        ));
    }

    #[test]
    fn test_parse_reply_not_json() {
        assert!(matches!(
            parse_reply(400, b"<html>Bad Request</html>"),
            Err(ChatError::Malformed { status: 400 })
        ));
    }

    #[test]
    fn test_mode_round_trip_and_toggle() {
        assert_eq!("Search".parse::<ChatMode>(), Ok(ChatMode::Search));
        assert_eq!(" chat ".parse::<ChatMode>(), Ok(ChatMode::Chat));
        assert!("other".parse::<ChatMode>().unwrap_err().contains("other"));
        assert_eq!(ChatMode::Chat.toggled(), ChatMode::Search);
        assert_eq!(ChatMode::Search.toggled().display_name(), "Chat Mode");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ChatClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_send_chat_posts_session_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"session_id": "S", "message": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "hi there"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let reply = client.send("S", ChatMode::Chat, "hello").await.unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn test_send_search_posts_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search"))
            .and(body_json(json!({"session_id": "S", "query": "rust crates"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "found 3"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let reply = client.send("S", ChatMode::Search, "rust crates").await.unwrap();
        assert_eq!(reply, "found 3");
    }

    #[tokio::test]
    async fn test_send_without_response_field_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let result = client.send("S", ChatMode::Chat, "hello").await;
        assert!(matches!(result, Err(ChatError::MissingResponse { status: 200 })));
    }

    #[tokio::test]
    async fn test_send_server_error_with_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "upstream failed"})))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        let result = client.send("S", ChatMode::Chat, "hello").await;
        assert!(matches!(result, Err(ChatError::MissingResponse { status: 500 })));
    }

    #[tokio::test]
    async fn test_clear_history_accepts_any_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/clear_history"))
            .and(body_json(json!({"session_id": "S"})))
            .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri());
        assert!(client.clear_history("S").await.is_ok());
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Nothing listens on port 9 in the test environment
        let client = ChatClient::new("http://127.0.0.1:9");
        let result = client.send("S", ChatMode::Chat, "hello").await;
        assert!(matches!(result, Err(ChatError::Transport { .. })));
    }
}
