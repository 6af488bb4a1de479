//! Typed view over the module's feature toggles in the Config Store.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::{ConfigStore, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MicHookMode {
    #[default]
    Mute,
    Replace,
    VideoSync,
}

impl MicHookMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Replace => "replace",
            Self::VideoSync => "video_sync",
        }
    }
}

impl fmt::Display for MicHookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MicHookMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mute" => Ok(Self::Mute),
            "replace" => Ok(Self::Replace),
            "video_sync" => Ok(Self::VideoSync),
            other => Err(Error::InvalidValue(format!("unknown mic hook mode: {other}"))),
        }
    }
}

/// Snapshot of every toggle, with defaults applied for absent keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Settings {
    pub disable_module: bool,
    pub play_video_sound: bool,
    pub force_private_dir: bool,
    pub disable_toast: bool,
    pub enable_random_play: bool,
    pub enable_mic_hook: bool,
    pub mic_hook_mode: MicHookMode,
    pub video_rotation_offset: i64,
    pub enable_photo_fake: bool,
    pub target_packages: Vec<String>,
    pub original_video_name: Option<String>,
}

impl Settings {
    /// Read the current toggles after a reload.
    pub fn load(store: &dyn ConfigStore) -> Self {
        store.reload();
        let mic_hook_mode = store
            .get_string(keys::MIC_HOOK_MODE)
            .and_then(|m| m.parse().ok())
            .unwrap_or_default();
        Self {
            disable_module: store.get_bool(keys::DISABLE_MODULE, false),
            play_video_sound: store.get_bool(keys::PLAY_VIDEO_SOUND, false),
            force_private_dir: store.get_bool(keys::FORCE_PRIVATE_DIR, false),
            disable_toast: store.get_bool(keys::DISABLE_TOAST, false),
            enable_random_play: store.get_bool(keys::ENABLE_RANDOM_PLAY, false),
            enable_mic_hook: store.get_bool(keys::ENABLE_MIC_HOOK, false),
            mic_hook_mode,
            video_rotation_offset: store.get_int(keys::VIDEO_ROTATION_OFFSET, 0),
            enable_photo_fake: store.get_bool(keys::ENABLE_PHOTO_FAKE, false),
            target_packages: store.get_string_list(keys::TARGET_PACKAGES),
            original_video_name: store
                .get_string(keys::ORIGINAL_VIDEO_NAME)
                .filter(|n| !n.is_empty()),
        }
    }
}

const BOOL_KEYS: &[&str] = &[
    keys::DISABLE_MODULE,
    keys::PLAY_VIDEO_SOUND,
    keys::FORCE_PRIVATE_DIR,
    keys::DISABLE_TOAST,
    keys::ENABLE_RANDOM_PLAY,
    keys::ENABLE_MIC_HOOK,
    keys::ENABLE_PHOTO_FAKE,
];

/// Set a toggle from its textual form, validating the value for known keys.
pub fn set_from_str(store: &dyn ConfigStore, key: &str, value: &str) -> Result<()> {
    if BOOL_KEYS.contains(&key) {
        let b = value
            .parse::<bool>()
            .map_err(|_| Error::InvalidValue(format!("{key} expects true/false, got {value}")))?;
        return store.set_bool(key, b);
    }
    match key {
        keys::VIDEO_ROTATION_OFFSET => {
            let degrees = value
                .parse::<i64>()
                .map_err(|_| Error::InvalidValue(format!("{key} expects an integer, got {value}")))?;
            store.set_int(key, degrees)
        }
        keys::MIC_HOOK_MODE => {
            let mode: MicHookMode = value.parse()?;
            store.set_string(key, mode.as_str())
        }
        keys::TARGET_PACKAGES => {
            let packages: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            store.set_string_list(key, &packages)
        }
        _ => store.set_string(key, value),
    }
}

pub fn add_target_package(store: &dyn ConfigStore, package: &str) -> Result<()> {
    let mut packages = store.get_string_list(keys::TARGET_PACKAGES);
    if !packages.iter().any(|p| p == package) {
        packages.push(package.to_string());
    }
    store.set_string_list(keys::TARGET_PACKAGES, &packages)
}

pub fn remove_target_package(store: &dyn ConfigStore, package: &str) -> Result<()> {
    let mut packages = store.get_string_list(keys::TARGET_PACKAGES);
    packages.retain(|p| p != package);
    store.set_string_list(keys::TARGET_PACKAGES, &packages)
}

/// Marker files older releases dropped into the media directory, and the
/// toggle each one stood for.
const LEGACY_MARKERS: &[(&str, &str)] = &[
    ("disable.jpg", keys::DISABLE_MODULE),
    ("no-silent.jpg", keys::PLAY_VIDEO_SOUND),
    ("private_dir.jpg", keys::FORCE_PRIVATE_DIR),
    ("no_toast.jpg", keys::DISABLE_TOAST),
];

/// Turn legacy marker files in `dir` into toggles, deleting each marker.
/// Returns whether anything was migrated.
pub fn migrate_legacy_markers(store: &dyn ConfigStore, dir: &Path) -> Result<bool> {
    let mut migrated = false;
    for (file, key) in LEGACY_MARKERS {
        let marker = dir.join(file);
        if !marker.exists() {
            continue;
        }
        store.set_bool(key, true)?;
        if let Err(err) = std::fs::remove_file(&marker) {
            warn!(marker = %marker.display(), error = %err, "could not remove legacy marker");
        }
        info!(marker = file, key, "migrated legacy marker");
        migrated = true;
    }
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConfigStore;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_store_is_empty() {
        let store = MemoryConfigStore::new();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn set_from_str_validates_known_keys() {
        let store = MemoryConfigStore::new();
        set_from_str(&store, keys::ENABLE_MIC_HOOK, "true").unwrap();
        set_from_str(&store, keys::MIC_HOOK_MODE, "video_sync").unwrap();
        set_from_str(&store, keys::VIDEO_ROTATION_OFFSET, "270").unwrap();
        set_from_str(&store, keys::TARGET_PACKAGES, "com.a, com.b,,").unwrap();

        assert!(set_from_str(&store, keys::DISABLE_TOAST, "yes").is_err());
        assert!(set_from_str(&store, keys::MIC_HOOK_MODE, "loud").is_err());

        let s = Settings::load(&store);
        assert!(s.enable_mic_hook);
        assert_eq!(s.mic_hook_mode, MicHookMode::VideoSync);
        assert_eq!(s.video_rotation_offset, 270);
        assert_eq!(s.target_packages, vec!["com.a", "com.b"]);
        assert!(!s.disable_toast);
    }

    #[test]
    fn target_packages_are_a_set() {
        let store = MemoryConfigStore::new();
        add_target_package(&store, "com.cam").unwrap();
        add_target_package(&store, "com.cam").unwrap();
        add_target_package(&store, "com.chat").unwrap();
        remove_target_package(&store, "com.cam").unwrap();
        assert_eq!(Settings::load(&store).target_packages, vec!["com.chat"]);
    }

    #[test]
    fn legacy_markers_become_toggles() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("disable.jpg"), b"").unwrap();
        std::fs::write(tmp.path().join("no_toast.jpg"), b"").unwrap();
        let store = MemoryConfigStore::new();

        assert!(migrate_legacy_markers(&store, tmp.path()).unwrap());
        let s = Settings::load(&store);
        assert!(s.disable_module && s.disable_toast);
        assert!(!s.play_video_sound && !s.force_private_dir);
        assert!(!tmp.path().join("disable.jpg").exists());

        assert!(!migrate_legacy_markers(&store, tmp.path()).unwrap());
    }
}
