use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub const CHAT_MODE: &str = "chat";
pub const MISSING_RESPONSE_TEXT: &str = "Resposta não encontrada.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected response format while fetching workspaces")]
    UnexpectedFormat,
    #[error("could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A workspace as returned by the backend. Only the name is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workspace(pub Value);

impl Workspace {
    /// The `name` field, or the raw JSON when the entry has none
    pub fn name(&self) -> String {
        match self.0.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => self.0.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    mode: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse(pub Value);

impl ChatResponse {
    pub fn text_response(&self) -> Option<&str> {
        self.0.get("textResponse").and_then(Value::as_str)
    }

    pub fn text_or_fallback(&self) -> String {
        self.text_response()
            .unwrap_or(MISSING_RESPONSE_TEXT)
            .to_string()
    }
}

/// Accepts either a bare array or `{"workspaces": [...]}`.
/// The backend has shipped both shapes.
pub fn normalize_workspaces(value: Value) -> Result<Vec<Workspace>, ApiError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("workspaces") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::UnexpectedFormat),
        },
        _ => return Err(ApiError::UnexpectedFormat),
    };
    Ok(items.into_iter().map(Workspace).collect())
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Single attempt against `{base_url}/{endpoint}`. Any failure comes back
    /// as an `ApiError`; there are no retries.
    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.config.base_url, endpoint);
        debug!(%url, ?method, "sending request");

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let mut builder = builder
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            ApiError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, "request rejected");
            return Err(ApiError::Status { status, body });
        }

        let value: Value = response.json().await.map_err(|e| {
            warn!(%url, error = %e, "response body is not valid JSON");
            ApiError::from(e)
        })?;
        Ok(value)
    }

    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>, ApiError> {
        let value = self.request("workspaces", Method::Get, None).await?;
        normalize_workspaces(value)
    }

    pub async fn ask(&self, workspace: &str, question: &str) -> Result<ChatResponse, ApiError> {
        let request = ChatRequest {
            message: question,
            mode: CHAT_MODE,
        };
        let body = serde_json::to_value(&request)?;
        let endpoint = format!("workspace/{}/chat", workspace);
        let value = self.request(&endpoint, Method::Post, Some(&body)).await?;
        Ok(ChatResponse(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, key: &str) -> ApiClient {
        ApiClient::new(Config::new(format!("{}/api/v1", server.uri()), key))
    }

    #[test]
    fn normalize_bare_array() {
        let value = json!([{"name": "support"}, {"name": "sales"}]);
        let workspaces = normalize_workspaces(value).unwrap();
        let names: Vec<String> = workspaces.iter().map(Workspace::name).collect();
        assert_eq!(names, vec!["support", "sales"]);
    }

    #[test]
    fn normalize_wrapped_array() {
        let value = json!({"workspaces": [{"name": "support", "slug": "support"}]});
        let workspaces = normalize_workspaces(value).unwrap();
        assert_eq!(workspaces, vec![Workspace(json!({"name": "support", "slug": "support"}))]);
    }

    #[test]
    fn normalize_empty_array_is_not_an_error() {
        assert!(normalize_workspaces(json!([])).unwrap().is_empty());
    }

    #[test]
    fn normalize_rejects_other_shapes() {
        for value in [
            json!({}),
            json!("string"),
            json!(42),
            json!(null),
            json!({"items": []}),
            json!({"workspaces": "support"}),
        ] {
            assert!(matches!(
                normalize_workspaces(value),
                Err(ApiError::UnexpectedFormat)
            ));
        }
    }

    #[test]
    fn workspace_name_falls_back_to_json() {
        assert_eq!(Workspace(json!({"slug": "x"})).name(), r#"{"slug":"x"}"#);
        assert_eq!(Workspace(json!("plain")).name(), r#""plain""#);
    }

    #[test]
    fn chat_response_fallback() {
        assert_eq!(ChatResponse(json!({"textResponse": "Hi there"})).text_or_fallback(), "Hi there");
        assert_eq!(ChatResponse(json!({"id": 1})).text_or_fallback(), MISSING_RESPONSE_TEXT);
        assert_eq!(ChatResponse(json!({"textResponse": null})).text_or_fallback(), MISSING_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn list_workspaces_sends_expected_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workspaces"))
            .and(header("accept", "application/json"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workspaces": [{"name": "support"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let workspaces = client_for(&server, "test-key").list_workspaces().await.unwrap();
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].name(), "support");
    }

    #[tokio::test]
    async fn list_workspaces_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workspaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let result = client_for(&server, "k").list_workspaces().await;
        assert!(matches!(result, Err(ApiError::UnexpectedFormat)));
    }

    #[tokio::test]
    async fn ask_posts_chat_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/workspace/support/chat"))
            .and(header("authorization", "Bearer k"))
            .and(body_json(json!({"message": "Hello", "mode": "chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "textResponse": "Hi there"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server, "k").ask("support", "Hello").await.unwrap();
        assert_eq!(response.text_or_fallback(), "Hi there");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/workspace/support/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, "k").ask("support", "Hello").await;
        match result {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workspaces"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = client_for(&server, "k").list_workspaces().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = ApiClient::new(Config::new("http://127.0.0.1:1", "k"));
        let result = client.list_workspaces().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn set_config_takes_effect_on_next_request() {
        let old_server = MockServer::start().await;
        let new_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&old_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/workspaces"))
            .and(header("authorization", "Bearer new-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "fresh"}])))
            .expect(1)
            .mount(&new_server)
            .await;

        let mut client = client_for(&old_server, "old-key");
        client.set_config(Config::new(format!("{}/api/v1", new_server.uri()), "new-key"));

        let workspaces = client.list_workspaces().await.unwrap();
        assert_eq!(workspaces[0].name(), "fresh");
    }
}
