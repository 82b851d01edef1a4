use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: String,
}

#[derive(Deserialize)]
struct AckResponse {
    success: bool,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorVersion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub versions: Vec<VendorVersion>,
}

#[derive(Deserialize)]
struct VendorsResponse {
    success: bool,
    #[serde(default)]
    vendors: Vec<Vendor>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub resolved: u64,
    #[serde(default)]
    pub success_rate: f64,
}

#[derive(Deserialize)]
struct StatsResponse {
    success: bool,
    #[serde(default)]
    stats: Option<Stats>,
}

/// What a completed chat exchange resolved to. Transport and decode failures
/// surface as `Err` from [`ChatClient::send`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The backend answered; the string is the assistant's reply text.
    Reply(String),
    /// The backend processed the request but reported an application error.
    Refused(String),
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

    /// Send one user message to the AI chat endpoint.
    ///
    /// A body that decodes to the expected shape counts as an answer even on
    /// a non-2xx status (the backend reports application failures as
    /// `{"success": false, "error": ...}` with an error status). Anything
    /// else is a transport error.
    pub async fn send(&self, message: &str) -> Result<ChatOutcome> {
        let url = format!("{}/ai/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let body: ChatResponse = response.json().await?;
        if body.success {
            Ok(ChatOutcome::Reply(body.response))
        } else {
            Ok(ChatOutcome::Refused(body.error))
        }
    }

    /// Drop the server-side conversation context.
    pub async fn clear_history(&self) -> Result<()> {
        let url = format!("{}/ai/clear", self.base_url);

        let response = self.client.post(&url).send().await?;
        let body: AckResponse = response.json().await?;
        if body.success {
            Ok(())
        } else {
            Err(anyhow!("server refused to clear history: {}", body.error))
        }
    }

    /// Fetch the supported vendors shown as dashboard cards.
    pub async fn vendors(&self) -> Result<Vec<Vendor>> {
        let url = format!("{}/api/vendors", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body: VendorsResponse = response.json().await?;
        if body.success {
            Ok(body.vendors)
        } else {
            Err(anyhow!("vendor listing failed"))
        }
    }

    /// Fetch diagnostic usage statistics.
    pub async fn stats(&self) -> Result<Stats> {
        let url = format!("{}/api/stats", self.base_url);

        let response = self.client.get(&url).send().await?;
        let body: StatsResponse = response.json().await?;
        match (body.success, body.stats) {
            (true, Some(stats)) => Ok(stats),
            _ => Err(anyhow!("stats fetch failed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn send_returns_reply_on_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/ai/chat")
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "hello"}));
                then.status(200)
                    .json_body(json!({"success": true, "response": "**hi**"}));
            })
            .await;

        let client = ChatClient::new(&server.base_url());
        let outcome = client.send("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome, ChatOutcome::Reply("**hi**".to_string()));
    }

    #[tokio::test]
    async fn send_surfaces_server_reported_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/ai/chat");
                then.status(400)
                    .json_body(json!({"success": false, "error": "AI not configured"}));
            })
            .await;

        let client = ChatClient::new(&server.base_url());
        let outcome = client.send("hello").await.unwrap();

        assert_eq!(outcome, ChatOutcome::Refused("AI not configured".to_string()));
    }

    #[tokio::test]
    async fn send_treats_malformed_body_as_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/ai/chat");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let client = ChatClient::new(&server.base_url());
        assert!(client.send("hello").await.is_err());
    }

    #[tokio::test]
    async fn clear_history_checks_ack() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/ai/clear");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let client = ChatClient::new(&server.base_url());
        assert!(client.clear_history().await.is_ok());
    }

    #[tokio::test]
    async fn vendors_and_stats_decode() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/vendors");
                then.status(200).json_body(json!({
                    "success": true,
                    "vendors": [{
                        "id": "cisco",
                        "name": "Cisco",
                        "icon": "🔷",
                        "versions": [{"id": "ios15", "name": "IOS 15", "description": "Classic IOS"}]
                    }]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/stats");
                then.status(200).json_body(json!({
                    "success": true,
                    "stats": {"total": 12, "resolved": 9, "success_rate": 75.0}
                }));
            })
            .await;

        let client = ChatClient::new(&server.base_url());

        let vendors = client.vendors().await.unwrap();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].versions[0].name, "IOS 15");

        let stats = client.stats().await.unwrap();
        assert_eq!(stats.total, 12);
        assert_eq!(stats.resolved, 9);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ChatClient::new("http://localhost:5000/");
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
