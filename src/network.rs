use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::FetchError;
use crate::source::{AppSource, DeleteResponse, SUCCESS_CODE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_time: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub env_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub domain: String,
    /// `"*"` on the environment the server considers current.
    #[serde(default)]
    pub current: Option<String>,
}

impl Environment {
    /// An environment known only by name, used until the full list arrives.
    pub fn named(env_name: &str) -> Self {
        Environment {
            env_name: env_name.to_string(),
            ..Default::default()
        }
    }

    pub fn is_current(&self) -> bool {
        self.current.as_deref() == Some("*")
    }
}

// --- API Envelope ---

#[derive(Deserialize)]
struct VelaResponse<T> {
    code: i64,
    data: Option<T>,
}

#[derive(Deserialize)]
struct VersionInfo {
    version: String,
}

/// HTTP client for the application-management API server.
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> anyhow::Result<ApiClient> {
        let base = Url::parse(server_url)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("{} cannot be used as a server address", server_url);
        }
        Ok(ApiClient {
            client: reqwest::Client::new(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body: VelaResponse<T> = resp.json().await?;
        if body.code != SUCCESS_CODE {
            return Err(FetchError::Api(body.code));
        }
        body.data
            .ok_or_else(|| FetchError::Decode("response has no data".to_string()))
    }
}

#[async_trait]
impl AppSource for ApiClient {
    async fn list_environments(&self) -> Result<Vec<Environment>, FetchError> {
        self.get_data(self.endpoint(&["api", "envs", ""])).await
    }

    async fn list_applications(
        &self,
        env_name: &str,
    ) -> Result<Vec<ApplicationSummary>, FetchError> {
        self.get_data(self.endpoint(&["api", "envs", env_name, "apps", ""]))
            .await
    }

    async fn delete_application(&self, env_name: &str, app_name: &str) -> DeleteResponse {
        let url = self.endpoint(&["api", "envs", env_name, "apps", app_name]);

        let resp = match self.client.delete(url).send().await {
            Ok(r) => r,
            Err(e) => {
                return DeleteResponse {
                    code: 503,
                    message: format!("Delete Http Error: {}", e),
                };
            }
        };

        let status = resp.status();
        match resp.json::<VelaResponse<String>>().await {
            Ok(body) => DeleteResponse {
                code: body.code,
                message: body
                    .data
                    .unwrap_or_else(|| format!("Delete {} returned no message", app_name)),
            },
            Err(_) if status.is_success() => DeleteResponse {
                code: 502,
                message: format!("Delete {}: unreadable response", app_name),
            },
            Err(_) => DeleteResponse {
                code: i64::from(status.as_u16()),
                message: format!("Delete Failed: {}", status),
            },
        }
    }

    async fn version(&self) -> Result<String, FetchError> {
        let info: VersionInfo = self.get_data(self.endpoint(&["api", "version"])).await?;
        Ok(info.version)
    }
}

// --- Lookups outside the application list ---

pub enum NetworkEvent {
    Environments(Vec<Environment>),
    Version(String),
    Error(String),
}

pub enum NetworkCommand {
    Environments,
    Version,
}

/// Serves the environment list and server version to the UI. The application
/// list itself is owned by the controller.
pub struct Network {
    /// Channel to send events back to the main thread
    pub sender: mpsc::Sender<NetworkEvent>,
    /// Channel to receive commands from the main thread
    pub receiver: mpsc::Receiver<NetworkCommand>,
    pub source: Arc<dyn AppSource>,
}

impl Network {
    pub fn new(
        sender: mpsc::Sender<NetworkEvent>,
        receiver: mpsc::Receiver<NetworkCommand>,
        source: Arc<dyn AppSource>,
    ) -> Network {
        Network {
            sender,
            receiver,
            source,
        }
    }

    pub async fn run(&mut self) {
        // Initial Fetch
        self.fetch_environments().await;
        self.fetch_version().await;

        while let Some(command) = self.receiver.recv().await {
            match command {
                NetworkCommand::Environments => self.fetch_environments().await,
                NetworkCommand::Version => self.fetch_version().await,
            }
        }
    }

    async fn fetch_environments(&self) {
        let event = match self.source.list_environments().await {
            Ok(envs) => NetworkEvent::Environments(envs),
            Err(e) => {
                tracing::warn!(error = %e, "environment lookup failed");
                NetworkEvent::Error(format!("Environment Fetch Error: {}", e))
            }
        };
        let _ = self.sender.send(event).await;
    }

    async fn fetch_version(&self) {
        match self.source.version().await {
            Ok(v) => {
                let _ = self.sender.send(NetworkEvent::Version(v)).await;
            }
            // Older servers have no version route; the header just omits it.
            Err(e) => tracing::debug!(error = %e, "server version unavailable"),
        }
    }
}
