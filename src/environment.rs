//! The selected environment, shared with the controller through a watch
//! channel.

use tokio::sync::watch;

use crate::network::Environment;

pub struct EnvironmentProvider {
    tx: watch::Sender<Option<Environment>>,
}

impl EnvironmentProvider {
    pub fn new(initial: Option<Environment>) -> Self {
        let (tx, _) = watch::channel(initial);
        EnvironmentProvider { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Environment>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Environment> {
        self.tx.borrow().clone()
    }

    pub fn current_name(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|e| e.env_name.clone())
    }

    pub fn select(&self, env: Option<Environment>) {
        tracing::info!(env = ?env.as_ref().map(|e| &e.env_name), "environment changed");
        self.tx.send_replace(env);
    }

    /// Adopts a freshly loaded environment list. The current selection is kept
    /// (with its full record) when the list still has it; otherwise the
    /// preferred or server-current environment is picked.
    pub fn adopt(&self, envs: &[Environment], preferred: Option<&str>) {
        let current = self.current_name();
        let keep = current.as_deref().or(preferred);
        let next = pick_initial(envs, keep);
        if next != self.current() {
            self.select(next);
        }
    }
}

/// `preferred` if listed, else the environment the server marks current, else
/// the first one.
pub fn pick_initial(envs: &[Environment], preferred: Option<&str>) -> Option<Environment> {
    preferred
        .and_then(|name| envs.iter().find(|e| e.env_name == name))
        .or_else(|| envs.iter().find(|e| e.is_current()))
        .or_else(|| envs.first())
        .cloned()
}
