use anyhow::Result;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::api::NotificationItem;
use crate::config::Config;
use crate::modules::{
    dashboard::DashboardModule,
    desktop::DesktopNotifier,
    notifications::{Channels, Delivery, NotificationsModule, Permission, PermissionAnswer},
    sound::AudioCue,
};
use crate::poller::PollEvent;

const SOUND_ENABLED_MSG: &str = "Sound enabled. Task alerts will now play a sound.";
const SOUND_FAILED_MSG: &str =
    "Could not play the notification sound. Check the sound file and player in the config.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuSection {
    Dashboard,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Normal,
    /// A blocking dialog is on screen.
    Alert,
    PermissionPrompt,
}

pub struct App {
    pub current_section: MenuSection,
    pub state: AppState,
    pub selected_index: usize,
    pub status_message: String,
    pub show_help: bool,
    pub server: String,

    pub dashboard_module: DashboardModule,
    pub notifications_module: NotificationsModule,
    pub alerts: VecDeque<String>,

    config: Config,
    notifier: DesktopNotifier,
    audio: AudioCue,
}

/// Routes deliveries to the desktop, the speaker and the dialog queue.
struct DeliveryChannels<'a> {
    notifier: &'a DesktopNotifier,
    audio: &'a mut AudioCue,
    alerts: &'a mut VecDeque<String>,
}

impl Channels for DeliveryChannels<'_> {
    fn show_native(&mut self, item: &NotificationItem) -> Result<()> {
        self.notifier.show(item)
    }

    fn play_sound(&mut self) -> Result<()> {
        self.audio.play()
    }

    fn show_dialog(&mut self, text: String) {
        self.alerts.push_back(text);
    }
}

impl App {
    pub fn new(config: Config, native_available: bool) -> Self {
        let notifications_module =
            NotificationsModule::new(config.notifications.permission, native_available);
        let audio = AudioCue::new(&config.sound);

        Self {
            current_section: MenuSection::Dashboard,
            state: AppState::Normal,
            selected_index: 0,
            status_message: String::from("Welcome to taskbell! Press '?' for help"),
            show_help: false,
            server: config.server.base_url.clone(),
            dashboard_module: DashboardModule::new(),
            notifications_module,
            alerts: VecDeque::new(),
            config,
            notifier: DesktopNotifier::new(),
            audio,
        }
    }

    pub fn handle_poll_event(&mut self, event: PollEvent) {
        match event {
            PollEvent::Notifications(Ok(items)) => {
                if items.is_empty() {
                    return;
                }
                info!(count = items.len(), "notifications due");
                let outcomes = self.deliver(items);
                self.status_message = summarize(&outcomes);
            }
            PollEvent::Notifications(Err(e)) => {
                warn!(error = %e, "notification poll failed");
            }
            PollEvent::Dashboard(Ok(stats)) => {
                debug!(?stats, "dashboard refreshed");
                self.dashboard_module.apply(stats);
            }
            PollEvent::Dashboard(Err(e)) => {
                warn!(error = %e, "dashboard poll failed");
                self.dashboard_module.record_failure(e.to_string());
            }
        }
    }

    fn deliver(&mut self, items: Vec<NotificationItem>) -> Vec<Delivery> {
        let mut channels = DeliveryChannels {
            notifier: &self.notifier,
            audio: &mut self.audio,
            alerts: &mut self.alerts,
        };
        let outcomes = self.notifications_module.deliver_all(items, &mut channels);
        self.sync_state();
        outcomes
    }

    pub fn answer_permission(&mut self, answer: PermissionAnswer) {
        if self.state != AppState::PermissionPrompt {
            return;
        }
        let mut channels = DeliveryChannels {
            notifier: &self.notifier,
            audio: &mut self.audio,
            alerts: &mut self.alerts,
        };
        let outcomes = self.notifications_module.resolve_permission(answer, &mut channels);

        let permission = self.notifications_module.permission;
        if permission != Permission::Default {
            if let Err(e) = self.config.set_permission(permission) {
                self.report_error("Saving permission failed", e);
            }
        }
        if !outcomes.is_empty() {
            self.status_message = summarize(&outcomes);
        }
        self.sync_state();
    }

    /// Manual sound check, the only way to confirm the cue works.
    pub fn enable_sound(&mut self) {
        match self.audio.play() {
            Ok(()) => {
                info!("sound cue enabled by user");
                self.alerts.push_back(SOUND_ENABLED_MSG.to_string());
            }
            Err(e) => {
                warn!(error = %e, path = ?self.audio.path(), "sound cue failed");
                self.alerts.push_back(SOUND_FAILED_MSG.to_string());
            }
        }
        self.sync_state();
    }

    pub fn dismiss_alert(&mut self) {
        self.alerts.pop_front();
        self.sync_state();
    }

    pub fn current_alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    /// Dialogs block first; the permission prompt waits behind them.
    fn sync_state(&mut self) {
        self.state = if !self.alerts.is_empty() {
            AppState::Alert
        } else if self.notifications_module.permission_pending() {
            AppState::PermissionPrompt
        } else {
            AppState::Normal
        };
    }

    pub fn next_item(&mut self) {
        let max = self.get_current_list_len();
        if max > 0 {
            self.selected_index = (self.selected_index + 1) % max;
        }
    }

    pub fn previous_item(&mut self) {
        let max = self.get_current_list_len();
        if max > 0 {
            self.selected_index = if self.selected_index == 0 {
                max - 1
            } else {
                self.selected_index - 1
            };
        }
    }

    pub fn go_home(&mut self) {
        self.selected_index = 0;
    }

    pub fn go_end(&mut self) {
        let max = self.get_current_list_len();
        if max > 0 {
            self.selected_index = max - 1;
        }
    }

    pub fn set_section(&mut self, section: MenuSection) {
        if self.current_section != section {
            self.current_section = section;
            self.selected_index = 0;
        }
    }

    pub fn next_section(&mut self) {
        let next = match self.current_section {
            MenuSection::Dashboard => MenuSection::Notifications,
            MenuSection::Notifications => MenuSection::Dashboard,
        };
        self.set_section(next);
    }

    pub fn previous_section(&mut self) {
        // Two sections, so backwards and forwards coincide.
        self.next_section();
    }

    pub fn clear_history(&mut self) {
        self.notifications_module.notifications.clear();
        self.selected_index = 0;
        self.status_message = "Cleared notification history".to_string();
    }

    fn get_current_list_len(&self) -> usize {
        match self.current_section {
            MenuSection::Dashboard => 0,
            MenuSection::Notifications => self.notifications_module.notifications.len(),
        }
    }

    pub fn report_error(&mut self, context: &str, err: anyhow::Error) {
        let msg = format!("{}: {}", context, err);
        warn!("{}", msg);
        self.status_message = msg.clone();
        self.notifications_module.push(context, msg, "error");
    }
}

fn summarize(outcomes: &[Delivery]) -> String {
    let count = |d: Delivery| outcomes.iter().filter(|o| **o == d).count();
    let native = count(Delivery::Native);
    let fallback = count(Delivery::Fallback);
    let waiting = count(Delivery::AwaitingPermission);

    let mut parts = Vec::new();
    if native > 0 {
        parts.push(format!("{} sent to desktop", native));
    }
    if fallback > 0 {
        parts.push(format!("{} shown as alert", fallback));
    }
    if waiting > 0 {
        parts.push(format!("{} waiting for permission", waiting));
    }
    format!("Task notifications: {}", parts.join(", "))
}
