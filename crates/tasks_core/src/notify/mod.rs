use crate::error::AppError;

mod board;

pub use board::{Notice, NoticeBoard, NoticeKey, NoticeLevel};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

/// Destination for notices outside the process, e.g. the desktop.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: &Notice) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var("TASKS_DISABLE_NOTIFICATIONS").is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
