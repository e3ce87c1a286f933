use std::path::{Path, PathBuf};

use hearth_nav::{PreferenceError, Theme, ThemeStore};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::collaborators::FlagStore;
use crate::error::ServiceError;

/// Key of the persisted theme setting.
pub const THEME_SETTING_KEY: &str = "theme-setting";

/// A flat JSON key/value store, persisted to a single file.
///
/// Every mutation rewrites the file through a temp file + rename, so a crash
/// mid-write leaves the previous contents intact.
pub struct JsonStore {
    /// `None` for an in-memory store.
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl JsonStore {
    /// Open the store at `path`, loading existing contents if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(ServiceError::Storage(format!(
                        "{}: expected a JSON object",
                        path.display()
                    )))
                }
                Err(e) => {
                    return Err(ServiceError::Storage(format!("{}: {e}", path.display())));
                }
            }
        } else {
            Map::new()
        };
        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Store `value` under `key`. On a failed write nothing changes.
    pub fn set(&self, key: &str, value: Value) -> Result<(), ServiceError> {
        let mut values = self.values.lock();
        let mut next = values.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    /// Remove `key`. Returns whether it was present. On a failed write the
    /// key stays.
    pub fn remove(&self, key: &str) -> Result<bool, ServiceError> {
        let mut values = self.values.lock();
        if !values.contains_key(key) {
            return Ok(false);
        }
        let mut next = values.clone();
        next.remove(key);
        self.persist(&next)?;
        *values = next;
        Ok(true)
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), ServiceError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let body = serde_json::to_vec_pretty(values)
            .map_err(|e| ServiceError::Storage(format!("serialize preferences: {e}")))?;
        write_atomic(path, &body)
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> Result<(), ServiceError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl FlagStore for JsonStore {
    fn get_flag(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.get(id).and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn remove_flag(&self, id: &str) -> Result<(), ServiceError> {
        if self.remove(id)? {
            tracing::debug!(flag = id, "persisted flag removed");
        }
        Ok(())
    }
}

impl ThemeStore for JsonStore {
    fn load_theme(&self) -> Result<Option<Theme>, PreferenceError> {
        match self.get(THEME_SETTING_KEY) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| PreferenceError::Read(e.to_string())),
            None => Ok(None),
        }
    }

    fn save_theme(&self, theme: Theme) -> Result<(), PreferenceError> {
        let value =
            serde_json::to_value(theme).map_err(|e| PreferenceError::Write(e.to_string()))?;
        self.set(THEME_SETTING_KEY, value)
            .map_err(|e| PreferenceError::Write(e.to_string()))
    }
}
