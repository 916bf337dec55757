use crate::error::AppError;
use crate::model::{NewTask, Task, TaskId};
use crate::storage::{StoreError, TaskStore, mark_completed, next_task_id};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "TASKS_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredTasks {
    schema_version: u32,
    tasks: Vec<Task>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("tasks").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("tasks")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| StoreError::Io(err.to_string()))?;
    let stored: StoredTasks =
        serde_json::from_str(&content).map_err(|err| StoreError::Corrupt(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(StoreError::Corrupt("schema_version mismatch".into()));
    }

    let mut seen = HashSet::new();
    for task in &stored.tasks {
        if !seen.insert(task.id) {
            return Err(StoreError::Corrupt(format!("duplicate task id {}", task.id)));
        }
    }

    Ok(stored.tasks)
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))?;
    }

    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        tasks: tasks.to_vec(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| StoreError::Corrupt(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| StoreError::Io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|err| StoreError::Io(err.to_string()))?;
    }

    Ok(())
}

/// Store backed by a single JSON document. Each call is a full
/// load-modify-save cycle under an in-process lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonFileStore {
    fn insert(&self, task: NewTask) -> Result<TaskId, StoreError> {
        let _guard = self.guard.lock();
        let mut tasks = load_tasks(&self.path)?;
        let id = next_task_id(&tasks)?;
        tasks.push(Task {
            id,
            title: task.title,
            description: task.description,
            completed_at: None,
        });
        save_tasks(&self.path, &tasks)?;
        Ok(id)
    }

    fn update_completion(&self, id: TaskId, at: OffsetDateTime) -> Result<bool, StoreError> {
        let _guard = self.guard.lock();
        let mut tasks = load_tasks(&self.path)?;
        if !mark_completed(&mut tasks, id, at) {
            return Ok(false);
        }
        save_tasks(&self.path, &tasks)?;
        Ok(true)
    }

    fn select_open(&self) -> Result<Vec<Task>, StoreError> {
        let _guard = self.guard.lock();
        Ok(load_tasks(&self.path)?
            .into_iter()
            .filter(Task::is_open)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, SCHEMA_VERSION, load_tasks, save_tasks};
    use crate::model::{NewTask, Task, TaskId};
    use crate::storage::{StoreError, TaskStore};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::datetime;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("tasks-{nanos}-{file_name}"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let path = temp_path("missing.json");
        assert!(load_tasks(&path).unwrap().is_empty());
    }

    #[test]
    fn save_and_load_preserves_completion() {
        let path = temp_path("tasks.json");
        let task = Task {
            id: TaskId(7),
            title: "demo".to_string(),
            description: "desc".to_string(),
            completed_at: Some(datetime!(2025-12-20 10:00 UTC)),
        };

        save_tasks(&path, std::slice::from_ref(&task)).unwrap();
        let loaded = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, vec![task]);
    }

    #[test]
    fn accepts_records_without_completed_at() {
        let path = temp_path("open-only.json");
        let content = "{\n  \"schema_version\": 1,\n  \"tasks\": [\n    {\n      \"id\": 1,\n      \"title\": \"demo\",\n      \"description\": \"\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let loaded = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].is_open());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let path = temp_path("duplicate.json");
        let content = "{\n  \"schema_version\": 1,\n  \"tasks\": [\n    {\"id\": 1, \"title\": \"a\", \"description\": \"\"},\n    {\"id\": 1, \"title\": \"b\", \"description\": \"\"}\n  ]\n}";
        fs::write(&path, content).unwrap();

        let err = load_tasks(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn schema_version_must_match() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = load_tasks(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn store_round_trips_through_file() {
        let path = temp_path("store.json");
        let store = JsonFileStore::new(&path);

        let first = store
            .insert(NewTask {
                title: "Buy milk".into(),
                description: "2%".into(),
            })
            .unwrap();
        let second = store
            .insert(NewTask {
                title: "Walk dog".into(),
                description: String::new(),
            })
            .unwrap();
        assert!(
            store
                .update_completion(first, datetime!(2025-12-20 10:00 UTC))
                .unwrap()
        );

        let reopened = JsonFileStore::new(&path);
        let open = reopened.select_open().unwrap();
        let all = load_tasks(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second);
        assert_eq!(all.len(), 2);
    }
}
