use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Padding, Paragraph, Row, Table},
    Frame,
};

use crate::app::{relative_time, App, ConfirmationState};
use crate::theme::{Theme, ThemeColors};

const SPINNER: [&str; 4] = ["⠖", "⠲", "⠴", "⠦"];

// --- MAIN DRAW ---
pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();
    if size.width < 60 || size.height < 16 {
        draw_size_warning(f, size, app);
        return;
    }

    let colors = app.current_theme.get_colors();

    if !app.is_transparent {
        let bg_block = Block::default().bg(colors.bg);
        f.render_widget(bg_block, f.area());
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Body
            Constraint::Length(1), // Status line
        ])
        .margin(1)
        .split(f.area());

    draw_header(f, chunks[0], app, &colors);
    draw_body(f, chunks[1], app, &colors);
    draw_status_line(f, chunks[2], app, &colors);

    if app.show_theme_selector {
        draw_theme_selector(f, app, &colors);
    }

    if app.show_env_selector {
        draw_env_selector(f, app, &colors);
    }

    if let Some(err) = &app.error_message {
        draw_error_overlay(f, err, &colors);
    }

    if let ConfirmationState::DeletePending(name, _) = &app.confirmation_mode {
        draw_toast(
            f,
            &format!("Press 'd' again to CONFIRM deleting {}", name),
            colors.status_error,
        );
    } else if let Some((msg, color, _)) = &app.toast_message {
        draw_toast(f, msg, *color);
    }

    if app.show_legend {
        let area = f.area();
        let height = 3;
        let legend_area = Rect::new(
            area.x,
            area.height.saturating_sub(height),
            area.width,
            height,
        );
        draw_key_legend(f, legend_area, &colors);
    }
}

fn draw_size_warning(f: &mut Frame, area: Rect, app: &App) {
    let colors = app.current_theme.get_colors();
    let bg = if app.is_transparent {
        Color::Reset
    } else {
        colors.bg
    };
    f.render_widget(Block::default().bg(bg), area);

    if area.width < 20 || area.height < 5 {
        return;
    }

    let text = vec![
        Line::from(Span::styled(
            "Terminal size too small:",
            Style::default()
                .fg(colors.text_primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Width = {} Height = {}", area.width, area.height),
            Style::default().fg(colors.status_error),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Width = 60 Height = 16",
            Style::default().fg(colors.status_success),
        )),
    ];

    let height = 4;
    let width = 40;
    let left = (area.width.saturating_sub(width)) / 2;
    let top = (area.height.saturating_sub(height)) / 2;
    let rect = Rect::new(left, top, width.min(area.width), height.min(area.height));
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), rect);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(9),  // Title
            Constraint::Length(10), // Dots
            Constraint::Min(0),     // Metadata
        ])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "Appdeck",
        Style::default()
            .fg(colors.text_primary)
            .add_modifier(Modifier::BOLD),
    ));
    f.render_widget(title, layout[0]);

    let dots_text = Line::from(vec![
        Span::styled("● ", Style::default().fg(colors.status_error)),
        Span::styled("● ", Style::default().fg(colors.status_pending)),
        Span::styled("● ", Style::default().fg(colors.status_success)),
        Span::styled("●", Style::default().fg(colors.accent_primary)),
    ]);
    f.render_widget(Paragraph::new(dots_text), layout[1]);

    let mut server = app.server_label.clone();
    if let Some(v) = &app.server_version {
        server.push_str(&format!(" ({})", v));
    }

    let meta_text = Line::from(vec![
        Span::styled("Server", Style::default().fg(colors.text_dim)),
        Span::styled(" • ", Style::default().fg(colors.border)),
        Span::styled(server, Style::default().fg(colors.text_dim)),
        Span::raw("     "),
        Span::styled("Env: ", Style::default().fg(colors.text_dim)),
        Span::styled(app.env_name(), Style::default().fg(colors.text_primary)),
        Span::raw("   "),
        Span::styled(&app.current_time, Style::default().fg(colors.text_dim)),
    ]);
    f.render_widget(
        Paragraph::new(meta_text).alignment(Alignment::Right),
        layout[2],
    );
}

// --- BODY ---
fn draw_body(f: &mut Frame, area: Rect, app: &mut App, colors: &ThemeColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Applications
            Constraint::Length(6), // Details
        ])
        .split(area);

    draw_applications(f, chunks[0], app, colors);
    draw_details(f, chunks[1], app, colors);
}

fn draw_applications(f: &mut Frame, area: Rect, app: &mut App, colors: &ThemeColors) {
    let border_color = if app.is_filter_mode {
        colors.border
    } else {
        colors.accent_primary
    };
    let title_text = if !app.filter_query.is_empty() || app.is_filter_mode {
        format!(" Applications (Filter: {}) ", app.filter_query)
    } else {
        " Applications ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(title_text, Style::default().fg(border_color)))
        .padding(Padding::new(1, 1, 0, 0));

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let (search_area, list_area) = if app.is_filter_mode || !app.filter_query.is_empty() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(inner_area);
        (Some(chunks[0]), chunks[1])
    } else {
        (None, inner_area)
    };

    if let Some(r) = search_area {
        let border_style = if app.is_filter_mode {
            Style::default().fg(colors.accent_primary)
        } else {
            Style::default().fg(colors.border)
        };
        let input_block = Block::default()
            .borders(Borders::ALL)
            .title(" Filter Name (Enter/Esc to close) ")
            .border_style(border_style);
        let input = Paragraph::new(format!("{}█", app.filter_query))
            .style(Style::default().fg(colors.text_primary))
            .block(input_block);
        f.render_widget(input, r);
    }

    let placeholder = match (&app.snapshot.env_name, &app.snapshot.applications) {
        (None, _) => Some("No environment selected. Press 'e' to choose one.".to_string()),
        (Some(_), None) => Some(format!(
            "{} Loading applications...",
            SPINNER[app.spinner_frame % SPINNER.len()]
        )),
        (Some(env), Some(apps)) if apps.is_empty() => Some(format!(
            "No applications in {}. Press 'c' to create one.",
            env
        )),
        _ if app.filtered.is_empty() => Some("No application matches the filter.".to_string()),
        _ => None,
    };
    if let Some(text) = placeholder {
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(colors.text_dim));
        f.render_widget(p, list_area);
        return;
    }

    let now = chrono::Utc::now();
    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];
    let rows: Vec<Row> = app
        .filtered
        .iter()
        .map(|a| {
            let pending = app.is_pending(&a.name);
            let (status, status_fg) = if pending {
                (format!("{} Deleting", spinner), colors.status_pending)
            } else {
                (a.status.clone(), status_color(&a.status, colors))
            };
            let name_style = if pending {
                Style::default()
                    .fg(colors.text_dim)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(colors.text_primary)
            };
            // A confirmed delete on a pending row re-issues the call.
            let actions = if pending { "d: Retry" } else { "d: Delete" };
            Row::new(vec![
                Cell::from(Span::styled(a.name.clone(), name_style)),
                Cell::from(Span::styled(status, Style::default().fg(status_fg))),
                Cell::from(Span::styled(
                    relative_time(&a.created_time, now),
                    Style::default().fg(colors.text_dim),
                )),
                Cell::from(Span::styled(actions, Style::default().fg(colors.text_dim))),
            ])
        })
        .collect();

    let header = Row::new(vec!["Name", "Status", "Created Time", "Actions"])
        .style(
            Style::default()
                .fg(colors.text_dim)
                .add_modifier(Modifier::BOLD),
        )
        .bottom_margin(1);

    let highlight_bg = if app.is_transparent {
        colors.text_dim
    } else {
        colors.border
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(25),
            Constraint::Percentage(15),
        ],
    )
    .header(header)
    .row_highlight_style(Style::default().bg(highlight_bg).add_modifier(Modifier::BOLD))
    .highlight_symbol("▌ ");

    f.render_stateful_widget(table, list_area, &mut app.table_state);
}

fn status_color(status: &str, colors: &ThemeColors) -> Color {
    let s = status.to_lowercase();
    if s.contains("fail") || s.contains("error") {
        colors.status_error
    } else if s.contains("ing") {
        colors.status_pending
    } else if s.is_empty() {
        colors.text_dim
    } else {
        colors.status_success
    }
}

fn draw_details(f: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border))
        .title(Span::styled(
            " Details ",
            Style::default().fg(colors.accent_primary),
        ))
        .padding(Padding::new(2, 2, 0, 0));

    let Some(a) = app.selected() else {
        f.render_widget(block, area);
        return;
    };

    let max_len = (area.width as usize).saturating_sub(16).max(10);
    let state = if app.is_pending(&a.name) {
        Span::styled(
            "Deletion requested, waiting for the server to remove it",
            Style::default().fg(colors.status_pending),
        )
    } else {
        Span::styled(
            truncate(&a.status, max_len),
            Style::default().fg(status_color(&a.status, colors)),
        )
    };

    let text = vec![
        Line::from(vec![
            Span::styled("Application: ", Style::default().fg(colors.text_dim)),
            Span::styled(
                truncate(&a.name, max_len),
                Style::default()
                    .fg(colors.text_primary)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(colors.text_dim)),
            state,
        ]),
        Line::from(vec![
            Span::styled("Created: ", Style::default().fg(colors.text_dim)),
            Span::styled(
                truncate(&a.created_time, max_len),
                Style::default().fg(colors.text_primary),
            ),
        ]),
    ];

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App, colors: &ThemeColors) {
    let spinner = SPINNER[app.spinner_frame % SPINNER.len()];
    let pending = app.snapshot.pending.len();

    let mut spans = vec![];
    if app.snapshot.polling {
        spans.push(Span::styled(
            format!(
                "{} Waiting for {} removal{} to finish",
                spinner,
                pending,
                if pending == 1 { "" } else { "s" }
            ),
            Style::default().fg(colors.status_pending),
        ));
    } else if app.snapshot.is_fetching {
        spans.push(Span::styled(
            format!("{} Refreshing", spinner),
            Style::default().fg(colors.text_dim),
        ));
    }

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(32)])
        .split(area);

    f.render_widget(Paragraph::new(Line::from(spans)), layout[0]);

    let count = app
        .snapshot
        .applications
        .as_ref()
        .map(|a| a.len())
        .unwrap_or(0);
    let right = Paragraph::new(Span::styled(
        format!("{} applications   (space) keys", count),
        Style::default().fg(colors.text_dim),
    ))
    .alignment(Alignment::Right);
    f.render_widget(right, layout[1]);
}

// --- SELECTORS ---
fn draw_theme_selector(f: &mut Frame, app: &mut App, colors: &ThemeColors) {
    let items: Vec<ListItem> = Theme::all()
        .iter()
        .map(|t| picker_item(t.name().to_string(), *t == app.current_theme, colors))
        .collect();
    let checkbox = if app.is_transparent { "[x]" } else { "[ ]" };
    let footer = format!("{} Transp. (X) │ ↕ Select │ ↵ Close", checkbox);
    let area = centered_rect(50, 50, f.area());
    let picker = Picker {
        title: " Select Theme ",
        footer: &footer,
        transparent: app.is_transparent,
    };
    picker.draw(f, area, items, &mut app.theme_list_state, colors);
}

fn draw_env_selector(f: &mut Frame, app: &mut App, colors: &ThemeColors) {
    let items: Vec<ListItem> = if app.environments.is_empty() {
        vec![ListItem::new("Loading environments...").style(Style::default().fg(colors.text_dim))]
    } else {
        app.environments
            .iter()
            .map(|e| {
                let label = if e.namespace.is_empty() {
                    e.env_name.clone()
                } else {
                    format!("{}  ({})", e.env_name, e.namespace)
                };
                let active = Some(&e.env_name) == app.snapshot.env_name.as_ref();
                picker_item(label, active, colors)
            })
            .collect()
    };
    let area = centered_rect(50, 40, f.area());
    let picker = Picker {
        title: " Select Environment ",
        footer: "↕ Navigate │ ↵ Select │ Esc Close",
        transparent: app.is_transparent,
    };
    picker.draw(f, area, items, &mut app.env_list_state, colors);
}

fn picker_item(label: String, active: bool, colors: &ThemeColors) -> ListItem<'static> {
    let style = if active {
        Style::default()
            .fg(colors.accent_primary)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(colors.text_primary)
    };
    ListItem::new(label).style(style)
}

/// Rounded popup with a selectable list and a one-line footer.
struct Picker<'a> {
    title: &'a str,
    footer: &'a str,
    transparent: bool,
}

impl Picker<'_> {
    fn draw(
        &self,
        f: &mut Frame,
        area: Rect,
        items: Vec<ListItem>,
        state: &mut ratatui::widgets::ListState,
        colors: &ThemeColors,
    ) {
        f.render_widget(Clear, area);

        let bg = if self.transparent { Color::Reset } else { colors.bg };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(ratatui::widgets::BorderType::Rounded)
            .title(self.title)
            .style(Style::default().bg(bg).fg(colors.text_primary));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let [list_area, footer_area] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

        let list = List::new(items)
            .block(Block::default().padding(Padding::horizontal(1)))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, list_area, state);

        let footer = Paragraph::new(self.footer)
            .alignment(Alignment::Center)
            .style(Style::default().fg(colors.text_dim));
        f.render_widget(footer, footer_area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn draw_error_overlay(f: &mut Frame, msg: &str, colors: &ThemeColors) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.status_error))
        .border_type(ratatui::widgets::BorderType::Double)
        .title(" Error (Esc) ")
        .style(Style::default().fg(colors.text_primary).bg(colors.bg));

    let p = Paragraph::new(msg)
        .block(block)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .alignment(Alignment::Center);
    f.render_widget(p, area);
}

fn draw_key_legend(f: &mut Frame, area: Rect, colors: &ThemeColors) {
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(colors.border))
        .style(Style::default().bg(colors.bg));
    f.render_widget(block, area);

    let items = [
        ("Delete", "D D"),
        ("Create", "C"),
        ("Open", "O"),
        ("Environment", "E"),
        ("Refresh", "R"),
        ("Filter", "/"),
        ("Theme", "T"),
        ("Quit", "Q"),
    ];

    let mut spans = vec![];
    for (label, key) in items {
        spans.push(Span::styled(
            format!(" {} ", label),
            Style::default().fg(colors.text_primary),
        ));
        spans.push(Span::styled(
            format!("({})", key),
            Style::default()
                .fg(colors.accent_primary)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  "));
    }

    let p = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .style(Style::default().bg(colors.bg));

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Margin for Top Border
            Constraint::Length(1), // The Text Line
            Constraint::Min(0),
        ])
        .split(area);

    f.render_widget(p, layout[1]);
}

fn draw_toast(f: &mut Frame, msg: &str, color: Color) {
    let area = f.area();
    let width = toast_width(msg, area.width);
    let height = 3;
    let x = (area.width.saturating_sub(width)) / 2;
    let y = 1;

    let rect = Rect::new(x, y, width, height);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .bg(Color::Reset);

    let p = Paragraph::new(Span::styled(
        msg,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(block);

    f.render_widget(p, rect);
}

/// Message width plus borders, capped at `max`.
fn toast_width(msg: &str, max: u16) -> u16 {
    u16::try_from(msg.chars().count().saturating_add(4))
        .unwrap_or(u16::MAX)
        .min(max)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let len = max_chars.saturating_sub(3);
        let mut truncated: String = s.chars().take(len).collect();
        truncated.push_str("...");
        truncated
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::controller::Snapshot;
    use crate::network::ApplicationSummary;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect::<String>()
    }

    #[test]
    fn pending_row_is_marked_as_deleting() {
        let mut app = App::new(&Config::default(), "demo".to_string());
        app.apply_snapshot(Snapshot {
            env_name: Some("prod".to_string()),
            applications: Some(vec![
                ApplicationSummary {
                    name: "checkout".to_string(),
                    status: "Deployed".to_string(),
                    created_time: String::new(),
                },
                ApplicationSummary {
                    name: "search".to_string(),
                    status: "Deployed".to_string(),
                    created_time: String::new(),
                },
            ]),
            pending: vec!["checkout".to_string()],
            is_fetching: false,
            polling: true,
        });

        let screen = rendered(&mut app);
        assert!(screen.contains("Deleting"));
        assert!(screen.contains("Waiting for 1 removal to finish"));
        assert!(screen.contains("search"));
        assert!(screen.contains("d: Retry"));
        assert!(screen.contains("d: Delete"));
    }

    #[test]
    fn no_environment_shows_hint() {
        let mut app = App::new(&Config::default(), "demo".to_string());
        app.apply_snapshot(Snapshot {
            applications: Some(vec![]),
            ..Default::default()
        });
        assert!(rendered(&mut app).contains("No environment selected"));
    }

    #[test]
    fn toast_width_saturates_on_huge_messages() {
        let huge = "x".repeat(65_533);
        assert_eq!(toast_width(&huge, 100), 100);
        assert_eq!(toast_width(&"y".repeat(200_000), u16::MAX), u16::MAX);
        assert_eq!(toast_width("deleted", 100), 11);
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("application", 8), "appli...");
        assert_eq!(truncate("app", 8), "app");
    }
}
