//! In-memory backend for `--demo`. Deletes are accepted at once and carried
//! out a little later, the way the real server removes applications in the
//! background.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::FetchError;
use crate::network::{ApplicationSummary, Environment};
use crate::source::{AppSource, DeleteResponse, SUCCESS_CODE};

type Store = Arc<Mutex<HashMap<String, Vec<ApplicationSummary>>>>;

pub struct DemoBackend {
    environments: Vec<Environment>,
    apps: Store,
    removal_delay_ms: Range<u64>,
}

impl DemoBackend {
    pub fn new() -> DemoBackend {
        let now = chrono::Utc::now();
        let app = |name: &str, status: &str, hours_ago: i64| ApplicationSummary {
            name: name.to_string(),
            status: status.to_string(),
            created_time: (now - chrono::Duration::hours(hours_ago)).to_rfc3339(),
        };

        let mut apps = HashMap::new();
        apps.insert(
            "default".to_string(),
            vec![
                app("hello-world", "Deployed", 2),
                app("podinfo", "Deployed", 30),
                app("nginx-test", "Failed", 1),
            ],
        );
        apps.insert(
            "prod".to_string(),
            vec![
                app("storefront", "Deployed", 240),
                app("checkout", "Deployed", 200),
                app("payments", "Deployed", 190),
                app("search", "Deploying", 0),
            ],
        );
        apps.insert(
            "staging".to_string(),
            vec![app("storefront", "Deployed", 5), app("checkout", "Deployed", 4)],
        );

        let env = |name: &str, current: bool| Environment {
            env_name: name.to_string(),
            namespace: name.to_string(),
            email: "ops@example.com".to_string(),
            domain: format!("{}.example.com", name),
            current: current.then(|| "*".to_string()),
        };

        DemoBackend {
            environments: vec![env("default", true), env("prod", false), env("staging", false)],
            apps: Arc::new(Mutex::new(apps)),
            removal_delay_ms: 1_000..3_000,
        }
    }

    #[cfg(test)]
    fn with_removal_delay(mut self, delay_ms: Range<u64>) -> DemoBackend {
        self.removal_delay_ms = delay_ms;
        self
    }

    fn lookup(&self, env_name: &str) -> Option<Vec<ApplicationSummary>> {
        let apps = self.apps.lock().ok()?;
        apps.get(env_name).cloned()
    }
}

#[async_trait]
impl AppSource for DemoBackend {
    async fn list_environments(&self) -> Result<Vec<Environment>, FetchError> {
        Ok(self.environments.clone())
    }

    async fn list_applications(
        &self,
        env_name: &str,
    ) -> Result<Vec<ApplicationSummary>, FetchError> {
        self.lookup(env_name).ok_or(FetchError::Api(404))
    }

    async fn delete_application(&self, env_name: &str, app_name: &str) -> DeleteResponse {
        let exists = self
            .lookup(env_name)
            .is_some_and(|apps| apps.iter().any(|a| a.name == app_name));
        if !exists {
            return DeleteResponse {
                code: 404,
                message: format!("application {} not found in {}", app_name, env_name),
            };
        }

        let delay = if self.removal_delay_ms.is_empty() {
            self.removal_delay_ms.start
        } else {
            rand::thread_rng().gen_range(self.removal_delay_ms.clone())
        };
        let store = Arc::clone(&self.apps);
        let (env, name) = (env_name.to_string(), app_name.to_string());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if let Ok(mut apps) = store.lock() {
                if let Some(list) = apps.get_mut(&env) {
                    list.retain(|a| a.name != name);
                }
            }
        });

        DeleteResponse {
            code: SUCCESS_CODE,
            message: format!("{} deleted from env {}", app_name, env_name),
        }
    }

    async fn version(&self) -> Result<String, FetchError> {
        Ok("demo".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn deleted_app_disappears_after_delay() {
        let backend = DemoBackend::new().with_removal_delay(200..300);
        let resp = backend.delete_application("prod", "checkout").await;
        assert!(resp.is_success());

        let listed = backend.list_applications("prod").await.unwrap();
        assert!(listed.iter().any(|a| a.name == "checkout"));

        tokio::time::sleep(Duration::from_millis(400)).await;
        let listed = backend.list_applications("prod").await.unwrap();
        assert!(!listed.iter().any(|a| a.name == "checkout"));
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn deleting_unknown_app_is_rejected() {
        let backend = DemoBackend::new();
        let resp = backend.delete_application("prod", "nope").await;
        assert_eq!(resp.code, 404);
        assert!(resp.message.contains("nope"));
    }

    #[tokio::test]
    async fn unknown_environment_fails_the_list() {
        let backend = DemoBackend::new();
        assert!(matches!(
            backend.list_applications("nowhere").await,
            Err(FetchError::Api(404))
        ));
    }

    #[tokio::test]
    async fn one_environment_is_marked_current() {
        let backend = DemoBackend::new();
        let envs = backend.list_environments().await.unwrap();
        assert_eq!(envs.iter().filter(|e| e.is_current()).count(), 1);
    }
}
