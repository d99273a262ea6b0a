use anyhow::Result;
use notify_rust::Notification;

use crate::api::NotificationItem;

const APP_NAME: &str = "taskbell";

/// Desktop notifications through the platform notification service.
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, item: &NotificationItem) -> Result<()> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(&item.headline())
            .body(&item.detail());

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(urgency_for(&item.priority));

        notification.show()?;
        Ok(())
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn urgency_for(priority: &crate::api::Priority) -> notify_rust::Urgency {
    use crate::api::Priority;
    use notify_rust::Urgency;
    match priority {
        Priority::Text(p) if p == "Alta" => Urgency::Critical,
        Priority::Text(p) if p == "Baixa" => Urgency::Low,
        _ => Urgency::Normal,
    }
}

#[cfg(all(test, unix, not(target_os = "macos")))]
mod tests {
    use super::*;
    use crate::api::Priority;
    use notify_rust::Urgency;

    #[test]
    fn test_urgency_follows_priority_label() {
        assert_eq!(urgency_for(&Priority::Text("Alta".into())), Urgency::Critical);
        assert_eq!(urgency_for(&Priority::Text("Média".into())), Urgency::Normal);
        assert_eq!(urgency_for(&Priority::Text("Baixa".into())), Urgency::Low);
        assert_eq!(urgency_for(&Priority::Number(3.into())), Urgency::Normal);
    }
}
