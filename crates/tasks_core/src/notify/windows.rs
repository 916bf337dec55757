use crate::error::AppError;
use crate::notify::{Notice, NoticeLevel, Notifier};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, notice: &Notice) -> Result<(), AppError> {
        let heading = match notice.level {
            NoticeLevel::Success => "tasks",
            NoticeLevel::Error => "tasks - error",
        };
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(heading)
            .text1(&notice.title)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
