use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::NotificationItem;

const HISTORY_LIMIT: usize = 100;

/// Whether the user allows desktop notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    #[default]
    Default,
    Denied,
}

/// How a single item is going to reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Native,
    RequestPermission,
    Fallback,
}

pub fn route(permission: Permission, native_available: bool) -> Route {
    match (native_available, permission) {
        (false, _) => Route::Fallback,
        (true, Permission::Granted) => Route::Native,
        (true, Permission::Default) => Route::RequestPermission,
        (true, Permission::Denied) => Route::Fallback,
    }
}

/// What actually happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Native,
    /// Sound cue plus blocking dialog.
    Fallback,
    /// Parked until the permission prompt is answered.
    AwaitingPermission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAnswer {
    Allow,
    Deny,
    Dismiss,
}

/// The user-facing outputs a delivery can use.
pub trait Channels {
    fn show_native(&mut self, item: &NotificationItem) -> Result<()>;
    fn play_sound(&mut self) -> Result<()>;
    fn show_dialog(&mut self, text: String);
}

#[derive(Debug, Clone)]
pub struct NotificationEntry {
    pub title: String,
    pub message: String,
    pub level: String,
    pub timestamp: DateTime<Local>,
}

pub struct NotificationsModule {
    pub notifications: Vec<NotificationEntry>,
    pub permission: Permission,
    pub native_available: bool,
    awaiting: Vec<NotificationItem>,
}

impl NotificationsModule {
    pub fn new(permission: Permission, native_available: bool) -> Self {
        Self {
            notifications: Vec::new(),
            permission,
            native_available,
            awaiting: Vec::new(),
        }
    }

    pub fn push(&mut self, title: impl Into<String>, message: impl Into<String>, level: &str) {
        self.notifications.insert(
            0,
            NotificationEntry {
                title: title.into(),
                message: message.into(),
                level: level.to_string(),
                timestamp: Local::now(),
            },
        );
        if self.notifications.len() > HISTORY_LIMIT {
            self.notifications.pop();
        }
    }

    /// True while items are parked behind an unanswered permission prompt.
    pub fn permission_pending(&self) -> bool {
        !self.awaiting.is_empty()
    }

    pub fn awaiting_count(&self) -> usize {
        self.awaiting.len()
    }

    pub fn deliver_all<C: Channels>(
        &mut self,
        items: Vec<NotificationItem>,
        channels: &mut C,
    ) -> Vec<Delivery> {
        items
            .into_iter()
            .map(|item| self.deliver(item, channels))
            .collect()
    }

    pub fn deliver<C: Channels>(&mut self, item: NotificationItem, channels: &mut C) -> Delivery {
        match route(self.permission, self.native_available) {
            Route::Native => self.native_or_fallback(&item, channels),
            Route::RequestPermission => {
                debug!(title = %item.title, "parking notification until permission is answered");
                self.awaiting.push(item);
                Delivery::AwaitingPermission
            }
            Route::Fallback => self.fallback(&item, channels),
        }
    }

    /// Settles the permission prompt and flushes every parked item.
    pub fn resolve_permission<C: Channels>(
        &mut self,
        answer: PermissionAnswer,
        channels: &mut C,
    ) -> Vec<Delivery> {
        match answer {
            PermissionAnswer::Allow => self.permission = Permission::Granted,
            PermissionAnswer::Deny => self.permission = Permission::Denied,
            PermissionAnswer::Dismiss => {}
        }
        info!(?answer, permission = ?self.permission, "notification permission answered");

        let parked = std::mem::take(&mut self.awaiting);
        parked
            .iter()
            .map(|item| {
                if answer == PermissionAnswer::Allow {
                    self.native_or_fallback(item, channels)
                } else {
                    self.fallback(item, channels)
                }
            })
            .collect()
    }

    fn native_or_fallback<C: Channels>(
        &mut self,
        item: &NotificationItem,
        channels: &mut C,
    ) -> Delivery {
        match channels.show_native(item) {
            Ok(()) => {
                self.push(item.headline(), item.detail(), "info");
                Delivery::Native
            }
            Err(e) => {
                warn!(error = %e, "desktop notification failed, falling back to dialog");
                self.fallback(item, channels)
            }
        }
    }

    fn fallback<C: Channels>(&mut self, item: &NotificationItem, channels: &mut C) -> Delivery {
        if let Err(e) = channels.play_sound() {
            debug!(error = %e, "sound cue unavailable");
        }
        channels.show_dialog(item.dialog_text());
        self.push(item.headline(), item.detail(), "alert");
        Delivery::Fallback
    }
}
