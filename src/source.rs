//! The seam between the controller and whatever serves application lists.

use async_trait::async_trait;

use crate::error::{DeleteError, FetchError};
use crate::network::{ApplicationSummary, Environment};

/// Result code the API uses for success, in both list and delete bodies.
pub const SUCCESS_CODE: i64 = 200;

/// Body of a delete call: a result code and a message meant for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteResponse {
    pub code: i64,
    pub message: String,
}

impl DeleteResponse {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    pub fn into_result(self, name: &str) -> Result<String, DeleteError> {
        if self.is_success() {
            Ok(self.message)
        } else {
            Err(DeleteError {
                name: name.to_string(),
                code: self.code,
                message: self.message,
            })
        }
    }
}

#[async_trait]
pub trait AppSource: Send + Sync + 'static {
    async fn list_environments(&self) -> Result<Vec<Environment>, FetchError>;

    async fn list_applications(
        &self,
        env_name: &str,
    ) -> Result<Vec<ApplicationSummary>, FetchError>;

    /// Never fails outright: transport problems come back as a non-success
    /// code so the caller always has a message to show.
    async fn delete_application(&self, env_name: &str, app_name: &str) -> DeleteResponse;

    async fn version(&self) -> Result<String, FetchError>;
}

/// Lists the applications of `env_name`. No environment means no request and
/// an empty list.
pub async fn fetch<S: AppSource + ?Sized>(
    source: &S,
    env_name: Option<&str>,
) -> Result<Vec<ApplicationSummary>, FetchError> {
    match env_name {
        Some(env) => source.list_applications(env).await,
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl AppSource for CountingSource {
        async fn list_environments(&self) -> Result<Vec<Environment>, FetchError> {
            Ok(Vec::new())
        }

        async fn list_applications(
            &self,
            env_name: &str,
        ) -> Result<Vec<ApplicationSummary>, FetchError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ApplicationSummary {
                name: format!("{}-app", env_name),
                status: "Deployed".to_string(),
                created_time: String::new(),
            }])
        }

        async fn delete_application(&self, _: &str, _: &str) -> DeleteResponse {
            DeleteResponse {
                code: SUCCESS_CODE,
                message: String::new(),
            }
        }

        async fn version(&self) -> Result<String, FetchError> {
            Ok("test".to_string())
        }
    }

    #[tokio::test]
    async fn fetch_without_environment_skips_the_source() {
        let source = CountingSource::default();
        let apps = fetch(&source, None).await.unwrap();
        assert!(apps.is_empty());
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_with_environment_reads_that_environment() {
        let source = CountingSource::default();
        let apps = fetch(&source, Some("prod")).await.unwrap();
        assert_eq!(apps[0].name, "prod-app");
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_success_delete_becomes_delete_error() {
        let resp = DeleteResponse {
            code: 500,
            message: "boom".to_string(),
        };
        let err = resp.into_result("web").unwrap_err();
        assert_eq!(err.name, "web");
        assert_eq!(err.code, 500);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn success_delete_keeps_message() {
        let resp = DeleteResponse {
            code: SUCCESS_CODE,
            message: "web deleted".to_string(),
        };
        assert_eq!(resp.into_result("web").unwrap(), "web deleted");
    }
}
