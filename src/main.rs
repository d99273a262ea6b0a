use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{error, info};

mod api;
mod app;
mod config;
mod logging;
mod modules;
mod poller;
mod ui;

use api::HttpApi;
use app::{App, AppState, MenuSection};
use config::Config;
use modules::notifications::PermissionAnswer;
use poller::{Feed, PollEvent};

#[derive(Parser, Debug)]
#[command(name = "taskbell", version, about = "Terminal notifier and dashboard for a task server")]
struct Cli {
    /// Task server base URL, e.g. http://127.0.0.1:5000
    #[arg(short, long)]
    server: Option<String>,

    /// Seconds between polls
    #[arg(short, long)]
    interval: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Never use desktop notifications; always alert inside the terminal
    #[arg(long)]
    no_native: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::setup_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let mut config = Config::load(cli.config.clone())?;
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    if let Some(secs) = cli.interval {
        config.polling.interval_secs = secs;
    }
    let native = config.notifications.native && !cli.no_native;

    let api = HttpApi::new(&config.server.base_url).context("Building HTTP client")?;
    let cadence = config.poll_interval();
    info!(server = %api.base_url(), ?cadence, native, "starting taskbell");

    let (tx, rx) = unbounded_channel();
    let pollers = poller::spawn_all(api.clone(), cadence, tx.clone());
    let mut app = App::new(config, native);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &api, &tx, rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    for handle in pollers {
        handle.abort();
    }

    if let Err(err) = res {
        error!(error = %err, "exited with error");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    api: &HttpApi,
    tx: &UnboundedSender<PollEvent>,
    mut rx: UnboundedReceiver<PollEvent>,
) -> Result<()> {
    loop {
        while let Ok(poll_event) = rx.try_recv() {
            app.handle_poll_event(poll_event);
        }

        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press { continue; }
                if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                match app.state {
                    AppState::Normal => match code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('?') => { app.show_help = !app.show_help; }
                        KeyCode::Char('1') => app.set_section(MenuSection::Dashboard),
                        KeyCode::Char('2') => app.set_section(MenuSection::Notifications),
                        KeyCode::Up | KeyCode::Char('k') => app.previous_item(),
                        KeyCode::Down | KeyCode::Char('j') => app.next_item(),
                        KeyCode::Home => app.go_home(),
                        KeyCode::End => app.go_end(),
                        KeyCode::Char('r') => {
                            poller::fetch_once(api, Feed::Notifications, tx);
                            poller::fetch_once(api, Feed::Dashboard, tx);
                            app.status_message = format!("Refreshing from {}...", app.server);
                        }
                        KeyCode::Char('e') => app.enable_sound(),
                        KeyCode::Char('C') => {
                            if app.current_section == MenuSection::Notifications {
                                app.clear_history();
                            }
                        }
                        KeyCode::Tab => app.next_section(),
                        KeyCode::BackTab => app.previous_section(),
                        KeyCode::Esc => app.show_help = false,
                        _ => {}
                    },
                    AppState::Alert => match code {
                        KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => app.dismiss_alert(),
                        _ => {}
                    },
                    AppState::PermissionPrompt => match code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => {
                            app.answer_permission(PermissionAnswer::Allow)
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') => {
                            app.answer_permission(PermissionAnswer::Deny)
                        }
                        KeyCode::Esc => app.answer_permission(PermissionAnswer::Dismiss),
                        _ => {}
                    },
                }
            }
        }
    }
}
