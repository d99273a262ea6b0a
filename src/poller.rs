use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::api::{DashboardStats, NotificationItem, PollError, TaskApi};

#[derive(Debug)]
pub enum PollEvent {
    Notifications(Result<Vec<NotificationItem>, PollError>),
    Dashboard(Result<DashboardStats, PollError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Notifications,
    Dashboard,
}

/// Issues one fetch for `feed` in its own task and forwards the result.
pub fn fetch_once<A: TaskApi>(api: &A, feed: Feed, tx: &UnboundedSender<PollEvent>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = match feed {
            Feed::Notifications => PollEvent::Notifications(api.fetch_notifications().await),
            Feed::Dashboard => PollEvent::Dashboard(api.fetch_dashboard().await),
        };
        // The UI is gone; nothing left to tell.
        let _ = tx.send(event);
    });
}

/// Polls `feed` right away and then every `cadence`.
///
/// Each tick fires an independent fetch, so a slow server can have several
/// requests in flight at once. The loop ends once the receiver is dropped.
pub fn spawn_poller<A: TaskApi>(
    api: A,
    feed: Feed,
    cadence: Duration,
    tx: UnboundedSender<PollEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                debug!(?feed, "poller stopping");
                break;
            }
            debug!(?feed, "poll tick");
            fetch_once(&api, feed, &tx);
        }
    })
}

pub fn spawn_all<A: TaskApi>(
    api: A,
    cadence: Duration,
    tx: UnboundedSender<PollEvent>,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_poller(api.clone(), Feed::Notifications, cadence, tx.clone()),
        spawn_poller(api, Feed::Dashboard, cadence, tx),
    ]
}
