use crate::config::Config;
use crate::controller::{Notice, NoticeLevel, Snapshot};
use crate::network::{ApplicationSummary, Environment};
use crate::theme::Theme;
use ratatui::style::Color;
use ratatui::widgets::TableState;
use std::time::{Duration, Instant};

/// A delete needs the key pressed twice within this window.
pub const CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Application State
pub struct App {
    /// Latest state published by the controller
    pub snapshot: Snapshot,
    /// Flag to signal app exit
    pub should_quit: bool,
    pub table_state: TableState,
    /// Current frame index for loading spinner
    pub spinner_frame: usize,

    // --- Theme State ---
    pub current_theme: Theme,
    pub theme_list_state: ratatui::widgets::ListState,
    pub show_theme_selector: bool,
    pub is_transparent: bool,

    // --- Environment State ---
    pub show_env_selector: bool,
    pub env_list_state: ratatui::widgets::ListState,
    pub environments: Vec<Environment>,

    // --- Filtering ---
    pub filter_query: String,
    pub is_filter_mode: bool,
    pub filtered: Vec<ApplicationSummary>,

    // --- UI State ---
    pub show_legend: bool,
    pub error_message: Option<String>,
    pub current_time: String,
    pub server_label: String,
    pub server_version: Option<String>,

    // --- Actions State ---
    pub confirmation_mode: ConfirmationState,
    pub toast_message: Option<(String, Color, Instant)>,
}

#[derive(Debug, PartialEq)]
pub enum ConfirmationState {
    None,
    DeletePending(String, Instant), // App name, Time started
}

impl App {
    pub fn new(config: &Config, server_label: String) -> App {
        App {
            snapshot: Snapshot::default(),
            should_quit: false,
            table_state: TableState::default(),
            spinner_frame: 0,
            current_theme: Theme::from_name(&config.theme_name).unwrap_or(Theme::Default),
            theme_list_state: Default::default(),
            show_theme_selector: false,
            is_transparent: config.is_transparent,
            show_env_selector: false,
            env_list_state: Default::default(),
            environments: vec![],
            filter_query: String::new(),
            is_filter_mode: false,
            filtered: vec![],
            show_legend: false,
            error_message: None,
            current_time: chrono::Local::now().format("%H:%M:%S").to_string(),
            server_label,
            server_version: None,
            confirmation_mode: ConfirmationState::None,
            toast_message: None,
        }
    }

    /// Writes the UI preferences and current environment back to `config`.
    pub fn store_preferences(&self, config: &mut Config) {
        config.theme_name = self.current_theme.name().to_string();
        config.is_transparent = self.is_transparent;
        if let Some(env) = &self.snapshot.env_name {
            config.last_env_name = Some(env.clone());
        }
    }

    pub fn on_tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        self.current_time = chrono::Local::now().format("%H:%M:%S").to_string();

        if let ConfirmationState::DeletePending(_, started) = &self.confirmation_mode {
            if started.elapsed() > CONFIRM_WINDOW {
                self.confirmation_mode = ConfirmationState::None;
            }
        }
        // Clear Toast Message after 4 seconds
        if let Some((_, _, time)) = &self.toast_message {
            if time.elapsed() > Duration::from_secs(4) {
                self.toast_message = None;
            }
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let env_changed = snapshot.env_name != self.snapshot.env_name;
        let current = self.selected_name();
        self.snapshot = snapshot;
        if env_changed {
            self.confirmation_mode = ConfirmationState::None;
        }
        self.update_filter();
        self.select_by_name(current);
    }

    pub fn apply_notice(&mut self, notice: Notice) {
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        self.toast_message = Some((notice.message, color, Instant::now()));
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.snapshot.is_pending(name)
    }

    pub fn update_filter(&mut self) {
        let query = self.filter_query.to_lowercase();
        self.filtered = self
            .snapshot
            .applications
            .iter()
            .flatten()
            .filter(|a| query.is_empty() || a.name.to_lowercase().contains(&query))
            .cloned()
            .collect();
    }

    pub fn selected(&self) -> Option<&ApplicationSummary> {
        self.table_state.selected().and_then(|i| self.filtered.get(i))
    }

    pub fn selected_name(&self) -> Option<String> {
        self.selected().map(|a| a.name.clone())
    }

    pub fn select_by_name(&mut self, name: Option<String>) {
        if let Some(target) = name {
            if let Some(pos) = self.filtered.iter().position(|a| a.name == target) {
                self.table_state.select(Some(pos));
                return;
            }
        }
        // Fallback: If name not found (gone or filtered out), select 0 if list not empty
        if !self.filtered.is_empty() {
            let i = self
                .table_state
                .selected()
                .unwrap_or(0)
                .min(self.filtered.len() - 1);
            self.table_state.select(Some(i));
        } else {
            self.table_state.select(None);
        }
    }

    pub fn select_next(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
        self.confirmation_mode = ConfirmationState::None;
    }

    pub fn select_previous(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
        self.confirmation_mode = ConfirmationState::None;
    }

    /// First press arms the confirmation, a second press on the same row
    /// within the window returns the name to delete.
    pub fn confirm_delete(&mut self) -> Option<String> {
        let name = self.selected_name()?;
        if self.is_pending(&name) {
            // Still allowed: the delete call is re-issued.
            tracing::debug!(app = %name, "delete requested again while pending");
        }
        if let ConfirmationState::DeletePending(target, started) = &self.confirmation_mode {
            if *target == name && started.elapsed() <= CONFIRM_WINDOW {
                self.confirmation_mode = ConfirmationState::None;
                return Some(name);
            }
        }
        self.confirmation_mode = ConfirmationState::DeletePending(name, Instant::now());
        None
    }

    pub fn env_name(&self) -> &str {
        self.snapshot.env_name.as_deref().unwrap_or("(none)")
    }
}

/// "5m ago" style age for RFC 3339 timestamps; anything else is shown as is.
pub fn relative_time(created: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    let Ok(at) = chrono::DateTime::parse_from_rfc3339(created) else {
        return created.to_string();
    };
    let seconds_ago = (now - at.with_timezone(&chrono::Utc)).num_seconds().max(0);
    if seconds_ago < 60 {
        "Just now".to_string()
    } else if seconds_ago < 3600 {
        format!("{}m ago", seconds_ago / 60)
    } else if seconds_ago < 86400 {
        format!("{}h ago", seconds_ago / 3600)
    } else {
        format!("{}d ago", seconds_ago / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(names: &[&str]) -> App {
        let mut app = App::new(&Config::default(), "test".to_string());
        app.apply_snapshot(Snapshot {
            env_name: Some("prod".to_string()),
            applications: Some(
                names
                    .iter()
                    .map(|n| ApplicationSummary {
                        name: n.to_string(),
                        status: "Deployed".to_string(),
                        created_time: String::new(),
                    })
                    .collect(),
            ),
            ..Default::default()
        });
        app
    }

    #[test]
    fn selection_follows_name_across_snapshots() {
        let mut app = app_with(&["a", "b", "c"]);
        app.select_by_name(Some("c".to_string()));

        let mut next = app.snapshot.clone();
        next.applications.as_mut().unwrap().remove(0);
        app.apply_snapshot(next);
        assert_eq!(app.selected_name().as_deref(), Some("c"));
    }

    #[test]
    fn selection_clamps_when_row_disappears() {
        let mut app = app_with(&["a", "b"]);
        app.select_by_name(Some("b".to_string()));

        let mut next = app.snapshot.clone();
        next.applications.as_mut().unwrap().pop();
        app.apply_snapshot(next);
        assert_eq!(app.selected_name().as_deref(), Some("a"));
    }

    #[test]
    fn delete_needs_two_presses_on_same_row() {
        let mut app = app_with(&["a", "b"]);
        app.select_by_name(Some("a".to_string()));
        assert_eq!(app.confirm_delete(), None);
        assert_eq!(app.confirm_delete().as_deref(), Some("a"));
        assert_eq!(app.confirmation_mode, ConfirmationState::None);
    }

    #[test]
    fn moving_selection_cancels_confirmation() {
        let mut app = app_with(&["a", "b"]);
        app.select_by_name(Some("a".to_string()));
        assert_eq!(app.confirm_delete(), None);
        app.select_next();
        assert_eq!(app.confirm_delete(), None);
        assert!(matches!(
            app.confirmation_mode,
            ConfirmationState::DeletePending(ref n, _) if n == "b"
        ));
    }

    #[test]
    fn filter_matches_name_case_insensitively() {
        let mut app = app_with(&["Storefront", "checkout"]);
        app.filter_query = "STORE".to_string();
        app.update_filter();
        assert_eq!(app.filtered.len(), 1);
        assert_eq!(app.filtered[0].name, "Storefront");
    }

    #[test]
    fn relative_time_formats_rfc3339_and_passes_through_others() {
        let now = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(relative_time("2024-05-01T11:59:30Z", now), "Just now");
        assert_eq!(relative_time("2024-05-01T11:15:00Z", now), "45m ago");
        assert_eq!(relative_time("2024-05-01T09:00:00Z", now), "3h ago");
        assert_eq!(relative_time("2024-04-28T12:00:00Z", now), "3d ago");
        assert_eq!(relative_time("yesterday", now), "yesterday");
    }
}
