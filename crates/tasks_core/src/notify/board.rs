use crate::clock::Clock;
use crate::error::AppError;
use crate::notify::{NoopNotifier, Notifier};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

/// Timestamp-derived key; strictly increasing within a board even when the
/// clock does not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoticeKey(i128);

impl fmt::Display for NoticeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoticeKey {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i128>()
            .map(NoticeKey)
            .map_err(|_| AppError::validation("notice key must be an integer"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub key: NoticeKey,
    pub title: String,
    pub level: NoticeLevel,
    pub created_at: OffsetDateTime,
}

/// Short-lived, dismissible notices. Purely observational: nothing here
/// feeds back into task state.
pub struct NoticeBoard {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    notices: BTreeMap<NoticeKey, Notice>,
    last_key: Option<NoticeKey>,
    sink: Box<dyn Notifier>,
}

impl NoticeBoard {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            notices: BTreeMap::new(),
            last_key: None,
            sink: Box::new(NoopNotifier),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn Notifier>) -> Self {
        self.sink = sink;
        self
    }

    pub fn push<T: Into<String>>(&mut self, title: T, level: NoticeLevel) -> NoticeKey {
        let created_at = self.clock.now();
        let mut key = NoticeKey(created_at.unix_timestamp_nanos());
        if let Some(last) = self.last_key
            && key <= last
        {
            key = NoticeKey(last.0 + 1);
        }
        self.last_key = Some(key);

        let notice = Notice {
            key,
            title: title.into(),
            level,
            created_at,
        };
        if let Err(err) = self.sink.notify(&notice) {
            tracing::warn!(error = %err, "notice sink failed");
        }
        self.notices.insert(key, notice);
        key
    }

    pub fn dismiss(&mut self, key: NoticeKey) -> bool {
        self.notices.remove(&key).is_some()
    }

    /// Unexpired notices, oldest first.
    pub fn active(&mut self) -> Vec<Notice> {
        let now = self.clock.now();
        let ttl = self.ttl;
        self.notices.retain(|_, notice| {
            notice.created_at.checked_add(ttl).is_none_or(|expiry| expiry > now)
        });
        self.notices.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{Notice, NoticeBoard, NoticeKey, NoticeLevel};
    use crate::clock::ManualClock;
    use crate::error::AppError;
    use crate::notify::Notifier;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use time::Duration;
    use time::macros::datetime;

    struct RecordingNotifier {
        seen: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: &Notice) -> Result<(), AppError> {
            self.seen.lock().push(notice.title.clone());
            if self.fail {
                Err(AppError::io("no notification daemon"))
            } else {
                Ok(())
            }
        }
    }

    fn board() -> (NoticeBoard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2025-12-20 09:00 UTC)));
        (NoticeBoard::new(clock.clone(), Duration::seconds(5)), clock)
    }

    #[test]
    fn keys_stay_distinct_when_clock_is_still() {
        let (mut board, _) = board();
        let first = board.push("Create successfully!", NoticeLevel::Success);
        let second = board.push("Task completed", NoticeLevel::Success);

        assert!(second > first);
        assert_eq!(board.active().len(), 2);
    }

    #[test]
    fn dismiss_removes_only_that_notice() {
        let (mut board, _) = board();
        let first = board.push("one", NoticeLevel::Success);
        let second = board.push("two", NoticeLevel::Error);

        assert!(board.dismiss(first));
        assert!(!board.dismiss(first));

        let active = board.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].key, second);
    }

    #[test]
    fn notices_expire_after_ttl() {
        let (mut board, clock) = board();
        board.push("old", NoticeLevel::Success);
        clock.advance(Duration::seconds(3));
        board.push("new", NoticeLevel::Success);

        clock.advance(Duration::seconds(2));
        let titles: Vec<_> = board.active().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["new".to_string()]);
    }

    #[test]
    fn huge_ttl_never_expires() {
        let clock = Arc::new(ManualClock::new(datetime!(2025-12-20 09:00 UTC)));
        let mut board = NoticeBoard::new(clock.clone(), Duration::seconds(i64::MAX));

        board.push("sticky", NoticeLevel::Success);
        clock.advance(Duration::days(365));

        assert_eq!(board.active().len(), 1);
    }

    #[test]
    fn sink_failures_do_not_drop_notice() {
        let (board, _) = board();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut board = board.with_sink(Box::new(RecordingNotifier {
            seen: seen.clone(),
            fail: true,
        }));

        board.push("Task completed", NoticeLevel::Success);

        assert_eq!(*seen.lock(), vec!["Task completed".to_string()]);
        assert_eq!(board.active().len(), 1);
    }

    #[test]
    fn notice_key_parses_from_display() {
        let (mut board, _) = board();
        let key = board.push("x", NoticeLevel::Success);
        let parsed: NoticeKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("abc".parse::<NoticeKey>().is_err());
    }
}
