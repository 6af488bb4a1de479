use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::store::CONFIG_FILE_NAME;

const DEFAULT_MEDIA_DIR: &str = "/sdcard/DCIM/Camera1";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Flat directory holding every library file.
    pub media_dir: PathBuf,
    /// Config Store file; defaults to `cs_config.json` inside `media-dir`.
    pub config_file: Option<PathBuf>,
    /// Scratch directory for imports awaiting conversion.
    pub staging_dir: Option<PathBuf>,
    /// Probe tool used for durations.
    pub ffprobe_path: PathBuf,
    /// When false, durations are never probed and report zero.
    pub probe_durations: bool,
    pub converter: ConverterOptions,
    /// Optional stamp file rewritten on every selection change.
    pub notify_stamp_file: Option<PathBuf>,
    /// Watch the Config Store for writes from other processes.
    pub watch_config: bool,
    /// Delay between a config file event and the reload it triggers.
    #[serde(with = "humantime_serde")]
    pub watch_settle: Duration,
    /// Bound of the library command queue.
    pub command_queue: usize,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.media_dir.as_os_str().is_empty(),
            "media-dir must not be empty"
        );
        ensure!(self.command_queue > 0, "command-queue must be greater than zero");
        self.converter.validate()?;
        Ok(self)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.media_dir.join(CONFIG_FILE_NAME))
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("camswap"))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            config_file: None,
            staging_dir: None,
            ffprobe_path: PathBuf::from("ffprobe"),
            probe_durations: true,
            converter: ConverterOptions::default(),
            notify_stamp_file: None,
            watch_config: true,
            watch_settle: Duration::from_millis(200),
            command_queue: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ConverterOptions {
    pub ffmpeg_path: PathBuf,
    /// Output frame rate.
    pub fps: u32,
    /// Seconds between key frames.
    pub keyframe_interval_secs: u32,
    /// Length of the produced clip.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Longest allowed output side in pixels.
    pub max_dimension: u32,
}

impl ConverterOptions {
    const fn default_fps() -> u32 {
        25
    }

    const fn default_duration() -> Duration {
        Duration::from_secs(3)
    }

    const fn default_max_dimension() -> u32 {
        1920
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.fps > 0, "converter.fps must be greater than zero");
        ensure!(
            self.keyframe_interval_secs > 0,
            "converter.keyframe-interval-secs must be greater than zero"
        );
        ensure!(
            self.duration > Duration::ZERO,
            "converter.duration must be positive"
        );
        ensure!(
            self.max_dimension >= 2,
            "converter.max-dimension must be at least 2"
        );
        Ok(())
    }
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            fps: Self::default_fps(),
            keyframe_interval_secs: 1,
            duration: Self::default_duration(),
            max_dimension: Self::default_max_dimension(),
        }
    }
}
