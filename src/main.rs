use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, style::Color, Terminal};
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio::time;

mod app;
mod config;
mod controller;
mod demo;
mod environment;
mod error;
mod logging;
mod network;
mod pending;
mod source;
mod theme;
mod ui;

use app::{App, ConfirmationState};
use controller::{Controller, ControllerCommand, ControllerEvent};
use environment::EnvironmentProvider;
use network::{ApiClient, Environment, Network, NetworkCommand, NetworkEvent};
use source::AppSource;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API server to talk to
    #[arg(long, env = "APPDECK_SERVER")]
    server: Option<String>,

    /// Environment to open first
    #[arg(long)]
    env: Option<String>,

    /// How often to re-list applications while removals are pending
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Run against a built-in in-memory backend
    #[arg(long)]
    demo: bool,

    /// Never open pages in the browser
    #[arg(long)]
    no_browser: bool,
}

// --- Terminal Guard ---
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (_log_guard, log_dir) = logging::init_logging();

    // Load Config, flags win
    let mut config = config::Config::load();
    if let Some(server) = args.server.clone() {
        config.server_url = server;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    let poll_interval = config.poll_interval();

    let (source, server_label): (Arc<dyn AppSource>, String) = if args.demo {
        (Arc::new(demo::DemoBackend::new()), "demo".to_string())
    } else {
        let client = ApiClient::new(&config.server_url)
            .with_context(|| format!("invalid server url {}", config.server_url))?;
        (Arc::new(client), config.server_url.clone())
    };
    tracing::info!(
        server = %server_label,
        poll_ms = poll_interval.as_millis() as u64,
        logs = %log_dir.display(),
        "starting"
    );

    let initial_env = args.env.clone().or_else(|| config.last_env_name.clone());
    let provider = EnvironmentProvider::new(initial_env.as_deref().map(Environment::named));

    // Controller Task
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (ctl_tx, ctl_rx) = mpsc::channel(100);
    let controller = Controller::new(Arc::clone(&source), poll_interval, event_tx);
    let controller_task = tokio::spawn(controller.run(provider.subscribe(), ctl_rx));

    // Network Task
    let (net_tx, mut net_rx) = mpsc::channel(100);
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    let mut network = Network::new(net_tx, cmd_rx, Arc::clone(&source));
    tokio::spawn(async move {
        network.run().await;
    });

    // 1. Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // 2. Create the Guard immediately after setup
    let _guard = TerminalGuard;

    // 3. Initialize Backend
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config, server_label);
    let dashboard = (!args.demo && !args.no_browser).then(|| config.dashboard_url().to_string());

    // Main Loop
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = time::Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(
                        key.code,
                        &mut app,
                        &mut config,
                        &provider,
                        &ctl_tx,
                        &cmd_tx,
                        &dashboard,
                    )
                    .await;
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = time::Instant::now();
        }

        // Handle Controller Events
        while let Ok(event) = event_rx.try_recv() {
            match event {
                ControllerEvent::State(snapshot) => app.apply_snapshot(snapshot),
                ControllerEvent::Notice(notice) => app.apply_notice(notice),
            }
        }

        // Handle Network Events
        while let Ok(event) = net_rx.try_recv() {
            match event {
                NetworkEvent::Environments(envs) => {
                    provider.adopt(&envs, initial_env.as_deref());
                    app.environments = envs;
                    app.error_message = None;
                }
                NetworkEvent::Version(v) => app.server_version = Some(v),
                NetworkEvent::Error(msg) => app.error_message = Some(msg),
            }
        }

        if app.should_quit {
            break;
        }
    }

    let _ = ctl_tx.send(ControllerCommand::Shutdown).await;
    if let Err(e) = controller_task.await {
        tracing::warn!(error = %e, "controller task ended abnormally");
    }

    app.store_preferences(&mut config);
    config.save();
    tracing::info!("bye");

    // Restore terminal
    // Handled by TerminalGuard
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_key(
    code: KeyCode,
    app: &mut App,
    config: &mut config::Config,
    provider: &EnvironmentProvider,
    ctl_tx: &mpsc::Sender<ControllerCommand>,
    cmd_tx: &mpsc::Sender<NetworkCommand>,
    dashboard: &Option<String>,
) {
    // --- Filter Mode (Traps Focus) ---
    if app.is_filter_mode {
        match code {
            KeyCode::Esc => {
                app.is_filter_mode = false;
                app.filter_query.clear();
                app.update_filter();
                app.select_by_name(None);
            }
            KeyCode::Enter => {
                app.is_filter_mode = false;
                // Keep query active
            }
            KeyCode::Backspace => {
                app.filter_query.pop();
                app.update_filter();
                app.table_state.select(Some(0));
            }
            KeyCode::Char(c) => {
                app.filter_query.push(c);
                app.update_filter();
                app.table_state.select(Some(0));
            }
            _ => {}
        }
        return;
    }

    // --- Overlay Modes (Traps Focus) ---
    if app.show_theme_selector {
        let len = theme::Theme::all().len();
        let step = |i: Option<usize>, forward: bool| match (i, forward) {
            (Some(i), true) if i + 1 < len => i + 1,
            (_, true) => 0,
            (Some(0) | None, false) => len - 1,
            (Some(i), false) => i - 1,
        };
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('t') => app.show_theme_selector = false,
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Down | KeyCode::Char('j') => {
                let forward = matches!(code, KeyCode::Down | KeyCode::Char('j'));
                let i = step(app.theme_list_state.selected(), forward);
                app.theme_list_state.select(Some(i));
                if let Some(theme) = theme::Theme::from_index(i) {
                    app.current_theme = theme;
                    app.store_preferences(config);
                    config.save();
                }
            }
            KeyCode::Char('x') => {
                app.is_transparent = !app.is_transparent;
                app.store_preferences(config);
                config.save();
            }
            _ => {}
        }
        return;
    }

    if app.show_env_selector {
        let len = app.environments.len();
        match code {
            KeyCode::Esc | KeyCode::Char('e') => app.show_env_selector = false,
            KeyCode::Enter => {
                if let Some(env) = app
                    .env_list_state
                    .selected()
                    .and_then(|i| app.environments.get(i))
                {
                    config.last_env_name = Some(env.env_name.clone());
                    config.save();
                    provider.select(Some(env.clone()));
                }
                app.show_env_selector = false;
            }
            KeyCode::Up | KeyCode::Char('k') if len > 0 => {
                let i = match app.env_list_state.selected() {
                    Some(0) | None => len - 1,
                    Some(i) => i - 1,
                };
                app.env_list_state.select(Some(i));
            }
            KeyCode::Down | KeyCode::Char('j') if len > 0 => {
                let i = match app.env_list_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                app.env_list_state.select(Some(i));
            }
            _ => {}
        }
        return;
    }

    // Global Clear Error & Confirmation
    if code == KeyCode::Esc {
        app.error_message = None;
        app.confirmation_mode = ConfirmationState::None;
        return;
    }

    // --- Main Navigation & Global Commands ---
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Char('g') => app.table_state.select((!app.filtered.is_empty()).then_some(0)),
        KeyCode::Char('G') => app
            .table_state
            .select(app.filtered.len().checked_sub(1)),

        // --- Actions ---
        KeyCode::Char('d') => {
            if let Some(name) = app.confirm_delete() {
                let _ = ctl_tx.send(ControllerCommand::Delete(name)).await;
            }
        }
        KeyCode::Char('r') => {
            let _ = ctl_tx.send(ControllerCommand::Refresh).await;
            let _ = cmd_tx.send(NetworkCommand::Version).await;
        }
        KeyCode::Char('c') => open_page(app, dashboard, "applications/create"),
        KeyCode::Char('o') | KeyCode::Enter => {
            if let Some(name) = app.selected_name() {
                open_page(app, dashboard, &format!("applications/{}", name));
            }
        }

        KeyCode::Char(' ') => app.show_legend = !app.show_legend,
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('t') => {
            app.show_theme_selector = true;
            app.theme_list_state
                .select(Some(app.current_theme.as_index()));
            app.show_legend = false;
        }
        KeyCode::Char('e') => {
            app.show_env_selector = true;
            if app.environments.is_empty() {
                let _ = cmd_tx.send(NetworkCommand::Environments).await;
            }
            let current = app
                .environments
                .iter()
                .position(|e| Some(&e.env_name) == app.snapshot.env_name.as_ref());
            app.env_list_state.select(current.or(Some(0)));
            app.show_legend = false;
        }
        KeyCode::Char('/') => {
            app.is_filter_mode = true;
            // Don't clear query, allow refinement. Esc clears it.
            app.show_legend = false;
        }
        _ => {}
    }
}

fn open_page(app: &mut App, dashboard: &Option<String>, path: &str) {
    let Some(base) = dashboard else {
        app.toast_message = Some((
            "Browser pages are disabled".to_string(),
            Color::Yellow,
            std::time::Instant::now(),
        ));
        return;
    };
    let url = format!("{}/{}", base.trim_end_matches('/'), path);
    tracing::info!(%url, "opening browser");
    if let Err(e) = webbrowser::open(&url) {
        app.error_message = Some(format!("Failed to open browser: {}", e));
    }
}
