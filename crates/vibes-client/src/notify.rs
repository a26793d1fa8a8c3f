use tracing::{debug, info, warn};
use vibes_types::events::NotificationEvent;

/// Platform notification capability. Calls are fire-and-forget.
pub trait Notifier: Send + Sync + 'static {
    /// Whether the user granted notification permission.
    fn permitted(&self) -> bool;

    fn notify(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of a system tray.
#[derive(Debug, Default)]
pub struct LogNotifier {
    pub permitted: bool,
}

impl Notifier for LogNotifier {
    fn permitted(&self) -> bool {
        self.permitted
    }

    fn notify(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        info!(title = event.title(), ?event, "notification");
        Ok(())
    }
}

/// Deliver `event` if permitted. Never fails the caller.
pub fn notify_best_effort(notifier: &dyn Notifier, event: NotificationEvent) {
    if !notifier.permitted() {
        debug!("Notification skipped, permission not granted");
        return;
    }
    if let Err(e) = notifier.notify(&event) {
        warn!("Notification failed: {:#}", e);
    }
}
