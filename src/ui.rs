use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::api::DashboardStats;
use crate::app::{App, AppState, MenuSection};
use crate::modules::dashboard::CHART_DATASET;
use crate::modules::notifications::Permission;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(f.area());

    draw_title(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(20), Constraint::Percentage(80)])
        .split(chunks[1]);

    draw_menu(f, app, main_chunks[0]);

    match app.current_section {
        MenuSection::Dashboard => draw_dashboard(f, app, main_chunks[1]),
        MenuSection::Notifications => draw_notifications(f, app, main_chunks[1]),
    }

    draw_status(f, app, chunks[2]);

    match app.state {
        AppState::Alert => draw_alert_popup(f, app),
        AppState::PermissionPrompt => draw_permission_popup(f, app),
        AppState::Normal if app.show_help => draw_help_popup(f),
        AppState::Normal => {}
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let time_str = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let permission = match app.notifications_module.permission {
        _ if !app.notifications_module.native_available => "off",
        Permission::Granted => "allowed",
        Permission::Default => "ask",
        Permission::Denied => "blocked",
    };
    let header = format!(
        "taskbell | {} | {} | desktop notifications: {}",
        app.server, time_str, permission
    );

    let title = Paragraph::new(header)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let menu_items = [
        ("1", "Dashboard", MenuSection::Dashboard),
        ("2", "Notifications", MenuSection::Notifications),
    ];

    let items: Vec<ListItem> = menu_items
        .iter()
        .map(|(key, name, section)| {
            let style = if *section == app.current_section {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} {}", key, name)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title("Menu")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(list, area);
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(60),
            Constraint::Min(0),
        ])
        .split(area);

    draw_counters(f, app, chunks[0]);
    draw_chart(f, app, chunks[1]);

    let notifs: Vec<ListItem> = app
        .notifications_module
        .notifications
        .iter()
        .take(5)
        .map(|n| {
            ListItem::new(format!(
                "[{}] {} - {}",
                n.timestamp.format("%H:%M:%S"),
                n.title,
                n.message
            ))
        })
        .collect();

    if notifs.is_empty() {
        let empty = Paragraph::new("No notifications yet")
            .block(Block::default().title("Recent Notifications").borders(Borders::ALL));
        f.render_widget(empty, chunks[2]);
    } else {
        let notif_block = List::new(notifs)
            .block(Block::default().title("Recent Notifications").borders(Borders::ALL));
        f.render_widget(notif_block, chunks[2]);
    }
}

fn draw_counters(f: &mut Frame, app: &App, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let counters: [(&str, fn(&DashboardStats) -> u64, Color); 4] = [
        ("Total", |s| s.total, Color::White),
        ("Pendentes", |s| s.pending, Color::Yellow),
        ("Atrasadas", |s| s.overdue, Color::Red),
        ("Sem notificação", |s| s.no_notify, Color::Gray),
    ];

    for (cell, (label, pick, color)) in cells.iter().zip(counters) {
        let value = Paragraph::new(app.dashboard_module.counter(pick))
            .alignment(Alignment::Center)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(Block::default().title(label).borders(Borders::ALL));
        f.render_widget(value, *cell);
    }
}

fn draw_chart(f: &mut Frame, app: &App, area: Rect) {
    let dash = &app.dashboard_module;
    let title = match dash.last_updated {
        Some(at) => format!("{} (updated {})", CHART_DATASET, at.format("%H:%M:%S")),
        None => CHART_DATASET.to_string(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let Some(chart) = dash.chart.as_ref() else {
        let waiting = Paragraph::new("Waiting for dashboard data...").block(block);
        f.render_widget(waiting, area);
        return;
    };

    let bars = chart.bars();
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / bars.len() as u16).saturating_sub(2).clamp(3, 20);
    let widget = BarChart::default()
        .block(block)
        .data(bars.as_slice())
        .bar_width(bar_width)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD))
        .label_style(Style::default().fg(Color::White));
    f.render_widget(widget, area);
}

fn draw_notifications(f: &mut Frame, app: &App, area: Rect) {
    let window_height = area.height.saturating_sub(2) as usize;
    let total = app.notifications_module.notifications.len();
    let start = app.selected_index.saturating_sub(window_height / 2);
    let end = usize::min(start + window_height, total);

    let items: Vec<ListItem> = app
        .notifications_module
        .notifications[start..end]
        .iter()
        .enumerate()
        .map(|(offset, n)| {
            let i = start + offset;
            let style = if i == app.selected_index {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let level_icon = match n.level.as_str() {
                "error" => "❌",
                "alert" => "🔔",
                "info" => "ℹ️",
                _ => "📢",
            };
            ListItem::new(format!(
                "{} [{}] {} - {}",
                level_icon,
                n.timestamp.format("%H:%M:%S"),
                n.title,
                n.message
            ))
            .style(style)
        })
        .collect();

    if total == 0 {
        let empty = Paragraph::new("No notifications yet")
            .block(Block::default().title("Notifications").borders(Borders::ALL));
        f.render_widget(empty, area);
    } else {
        let list = List::new(items)
            .block(Block::default().title("Notifications (C: clear)").borders(Borders::ALL));
        f.render_widget(list, area);
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.state {
        AppState::Normal => "q: Quit | Tab: Next Section | ↑↓/jk: Navigate | r: Refresh | e: Enable sound | ?: Help",
        AppState::Alert => "Enter/Esc: Dismiss",
        AppState::PermissionPrompt => "y: Allow | n: Block | Esc: Not now",
    };

    let status = Paragraph::new(vec![
        Line::from(app.status_message.as_str()),
        Line::from(help_text),
    ])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn draw_alert_popup(f: &mut Frame, app: &App) {
    let Some(text) = app.current_alert() else { return };
    let area = centered_rect(50, 25, f.area());
    let remaining = app.alerts.len();
    let title = if remaining > 1 {
        format!("Alert (1 of {})", remaining)
    } else {
        "Alert".to_string()
    };

    let mut lines: Vec<Line> = text.lines().map(Line::from).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press Enter to dismiss",
        Style::default().fg(Color::DarkGray),
    )));

    let alert = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(alert, area);
}

fn draw_permission_popup(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    let waiting = app.notifications_module.awaiting_count();
    let text = format!(
        "Allow taskbell to show desktop notifications?\n\n{} task notification(s) waiting.\n\ny: Allow   n: Block   Esc: Not now",
        waiting
    );
    let prompt = Paragraph::new(text)
        .block(
            Block::default()
                .title("Desktop Notifications")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(prompt, area);
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

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(70, 70, f.area());
    let help = "taskbell Help\n\nKeys:\n  q / Ctrl-C: Quit\n  Tab: Next Section\n  1-2: Jump to section\n  j/k or ↑/↓: Navigate\n  Home/End: Jump\n  r: Poll the server now\n  e: Enable and test the notification sound\n  C: Clear notification history (Notifications)\n  ?: Toggle this help\n\nAlerts: Enter, Esc or Space to dismiss\nPermission prompt: y allow, n block, Esc ask again later";

    let paragraph = Paragraph::new(help)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::poller::PollEvent;
    use ratatui::{Terminal, backend::TestBackend};
    use tempfile::TempDir;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    fn app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(Some(dir.path().join("config.toml"))).unwrap();
        config.notifications.permission = Permission::Denied;
        config.sound.path = dir.path().join("missing.wav");
        (App::new(config, true), dir)
    }

    #[test]
    fn test_dashboard_shows_counters_and_chart() {
        let (mut app, _dir) = app();
        app.handle_poll_event(PollEvent::Dashboard(Ok(DashboardStats {
            total: 10,
            pending: 4,
            overdue: 2,
            no_notify: 1,
        })));

        let screen = render(&app);
        assert!(screen.contains("Total"));
        assert!(screen.contains("10"));
        assert!(screen.contains("Atrasadas"));
        assert!(screen.contains("Tarefas (updated"));
    }

    #[test]
    fn test_failed_dashboard_cycle_leaves_screen_unchanged() {
        use crate::api::PollError;

        let (mut app, _dir) = app();
        app.handle_poll_event(PollEvent::Dashboard(Ok(DashboardStats {
            total: 10,
            pending: 4,
            overdue: 2,
            no_notify: 1,
        })));
        // The title bar carries a live clock, so compare everything below it.
        let below_title = |screen: String| screen.chars().skip(3 * 120).collect::<String>();
        let before = below_title(render(&app));

        let err = PollError::Body(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        app.handle_poll_event(PollEvent::Dashboard(Err(err)));
        let after = below_title(render(&app));

        assert!(app.dashboard_module.last_error.is_some());
        assert_eq!(before, after);
    }

    #[test]
    fn test_dashboard_before_data() {
        let (app, _dir) = app();
        assert!(render(&app).contains("Waiting for dashboard data"));
    }

    #[test]
    fn test_alert_popup_rendered() {
        let (mut app, _dir) = app();
        app.alerts.push_back("Tarefa: Backup\nPrioridade: Alta".to_string());
        app.state = AppState::Alert;

        let screen = render(&app);
        assert!(screen.contains("Tarefa: Backup"));
        assert!(screen.contains("Press Enter to dismiss"));
    }
}
