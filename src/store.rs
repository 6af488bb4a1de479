//! Durable key-value Config Store shared with the hook process.
//!
//! The store is read and written by several processes without a lock. Readers
//! call [`ConfigStore::reload`] before any value they must see fresh; the last
//! writer wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fsutil::make_world_readable;
use crate::media::MediaKind;

pub const CONFIG_FILE_NAME: &str = "cs_config.json";

/// Reloads closer together than this are skipped unless forced.
pub const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1000);

pub mod keys {
    pub const DISABLE_MODULE: &str = "disable_module";
    pub const PLAY_VIDEO_SOUND: &str = "play_video_sound";
    pub const FORCE_PRIVATE_DIR: &str = "force_private_dir";
    pub const DISABLE_TOAST: &str = "disable_toast";
    pub const ENABLE_RANDOM_PLAY: &str = "enable_random_play";
    pub const TARGET_PACKAGES: &str = "target_packages";
    pub const SELECTED_VIDEO: &str = "selected_video";
    pub const ORIGINAL_VIDEO_NAME: &str = "original_video_name";
    pub const SELECTED_IMAGE: &str = "selected_image";
    pub const SELECTED_AUDIO: &str = "selected_audio";
    pub const ENABLE_MIC_HOOK: &str = "enable_mic_hook";
    pub const MIC_HOOK_MODE: &str = "mic_hook_mode";
    pub const VIDEO_ROTATION_OFFSET: &str = "video_rotation_offset";
    pub const ENABLE_PHOTO_FAKE: &str = "enable_photo_fake";
    pub const LANGUAGE: &str = "key_language";
}

/// Key holding the selected file name for `kind`.
pub fn selection_key(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => keys::SELECTED_VIDEO,
        MediaKind::Image => keys::SELECTED_IMAGE,
        MediaKind::Audio => keys::SELECTED_AUDIO,
    }
}

pub trait ConfigStore: Send + Sync {
    /// Re-read persisted state if it may have changed. May be debounced.
    fn reload(&self);

    /// Re-read persisted state unconditionally.
    fn force_reload(&self);

    fn get(&self, key: &str) -> Option<Value>;

    /// Set one key and persist the whole store.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Replace every key and persist.
    fn replace_all(&self, data: Map<String, Value>) -> Result<()>;

    fn to_map(&self) -> Map<String, Value>;

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => match s.as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, Value::String(value.to_string()))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, Value::Bool(value))
    }

    fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.set(key, Value::from(value))
    }

    fn set_string_list(&self, key: &str, values: &[String]) -> Result<()> {
        self.set(
            key,
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        )
    }

    /// Selected file name for `kind`; an empty value counts as none.
    fn selected(&self, kind: MediaKind) -> Option<String> {
        self.get_string(selection_key(kind))
            .filter(|name| !name.is_empty())
    }

    fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&Value::Object(self.to_map()))?)
    }

    fn import_json(&self, json: &str) -> Result<()> {
        let data: Map<String, Value> = serde_json::from_str(json)?;
        self.replace_all(data)
    }

    fn reset_to_default(&self) -> Result<()> {
        self.replace_all(Map::new())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct JsonState {
    data: Map<String, Value>,
    loaded_mtime: Option<SystemTime>,
    last_reload: Option<Instant>,
}

/// Store persisted as one JSON object on disk.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    state: Mutex<JsonState>,
}

impl JsonConfigStore {
    /// Open (or lazily create) the store at `path`, loading it immediately.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            state: Mutex::new(JsonState::default()),
        };
        store.force_reload();
        store
    }

    /// Store at `<dir>/cs_config.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::open(dir.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_locked(&self, state: &mut JsonState, force: bool) {
        let md = match fs::metadata(&self.path) {
            Ok(md) => md,
            Err(_) => {
                debug!(path = %self.path.display(), "config file not found");
                return;
            }
        };
        let mtime = md.modified().ok();
        let stale = match (state.loaded_mtime, mtime) {
            (None, _) | (_, None) => true,
            (Some(loaded), Some(now)) => now > loaded,
        };
        if !force && !stale {
            debug!(path = %self.path.display(), "config file unchanged; skip read");
            return;
        }
        match fs::read_to_string(&self.path)
            .map_err(crate::error::Error::from)
            .and_then(|s| Ok(serde_json::from_str::<Map<String, Value>>(&s)?))
        {
            Ok(data) => {
                state.data = data;
                state.loaded_mtime = mtime.or_else(|| Some(SystemTime::now()));
                debug!(path = %self.path.display(), keys = state.data.len(), "config reloaded");
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "config file read error");
            }
        }
    }

    fn save_locked(&self, state: &mut JsonState) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        Value::Object(state.data.clone()).serialize(&mut ser)?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&buf)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        make_world_readable(&self.path);
        state.loaded_mtime = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn reload(&self) {
        let mut state = lock(&self.state);
        let now = Instant::now();
        if let Some(prev) = state.last_reload
            && now.duration_since(prev) < MIN_RELOAD_INTERVAL
        {
            return;
        }
        state.last_reload = Some(now);
        self.load_locked(&mut state, false);
    }

    fn force_reload(&self) {
        let mut state = lock(&self.state);
        state.last_reload = Some(Instant::now());
        state.loaded_mtime = None;
        self.load_locked(&mut state, true);
    }

    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.state).data.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut state = lock(&self.state);
        state.data.insert(key.to_string(), value);
        self.save_locked(&mut state)
    }

    fn replace_all(&self, data: Map<String, Value>) -> Result<()> {
        let mut state = lock(&self.state);
        state.data = data;
        self.save_locked(&mut state)
    }

    fn to_map(&self) -> Map<String, Value> {
        lock(&self.state).data.clone()
    }
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    data: Mutex<Map<String, Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn reload(&self) {}

    fn force_reload(&self) {}

    fn get(&self, key: &str) -> Option<Value> {
        lock(&self.data).get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        lock(&self.data).insert(key.to_string(), value);
        Ok(())
    }

    fn replace_all(&self, data: Map<String, Value>) -> Result<()> {
        *lock(&self.data) = data;
        Ok(())
    }

    fn to_map(&self) -> Map<String, Value> {
        lock(&self.data).clone()
    }
}
