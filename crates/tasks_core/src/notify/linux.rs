use crate::error::AppError;
use crate::notify::{Notice, NoticeLevel, Notifier};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary("tasks");
        notification.body(&notice.title);
        if notice.level == NoticeLevel::Error {
            notification.urgency(Urgency::Critical);
        }

        notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
