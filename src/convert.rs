//! Still image to short looping video conversion.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::ConverterOptions;
use crate::error::{Error, Result};
use crate::fsutil::{delete_if_exists, make_world_readable};
use crate::media::{sanitize_base_name, split_name};

pub trait Converter: Send + Sync {
    /// Encode `source` into a new video inside `dest_dir` and return its path.
    ///
    /// Implementations must not leave a partial output behind on failure.
    fn convert(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf>;
}

/// Converter that shells out to `ffmpeg` with libx264.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    opts: ConverterOptions,
}

impl FfmpegConverter {
    pub fn new(opts: ConverterOptions) -> Self {
        Self { opts }
    }

    fn fail(source: &Path, reason: impl Into<String>) -> Error {
        Error::Conversion {
            path: source.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl Converter for FfmpegConverter {
    fn convert(&self, source: &Path, dest_dir: &Path) -> Result<PathBuf> {
        info!(source = %source.display(), "converter: starting");
        let (raw_w, raw_h) = image::image_dimensions(source)
            .map_err(|e| Self::fail(source, format!("cannot decode image: {e}")))?;
        let (width, height) = fit_dimensions(raw_w, raw_h, self.opts.max_dimension);
        let output = output_path(source, dest_dir);
        debug!(
            raw_w, raw_h, width, height,
            output = %output.display(),
            "converter: output geometry"
        );

        let fps = self.opts.fps.to_string();
        let gop = self.opts.fps.saturating_mul(self.opts.keyframe_interval_secs).to_string();
        let secs = format!("{:.3}", self.opts.duration.as_secs_f64());
        let result = Command::new(&self.opts.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error", "-y", "-loop", "1", "-i"])
            .arg(source)
            .args(["-t", &secs, "-r", &fps])
            .args(["-vf", &format!("scale={width}:{height}")])
            .args(["-c:v", "libx264", "-g", &gop, "-pix_fmt", "yuv420p", "-an"])
            .arg(&output)
            .output();

        let discard = |reason: String| {
            if let Err(err) = delete_if_exists(&output) {
                warn!(output = %output.display(), error = %err, "converter: could not remove partial output");
            }
            Self::fail(source, reason)
        };

        match result {
            Err(e) => return Err(discard(format!("cannot run ffmpeg: {e}"))),
            Ok(out) if !out.status.success() => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(discard(format!("ffmpeg exited with {}: {}", out.status, stderr.trim())));
            }
            Ok(_) => {}
        }

        let len = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(discard("ffmpeg produced an empty file".to_string()));
        }
        make_world_readable(&output);
        info!(output = %output.display(), bytes = len, "converter: done");
        Ok(output)
    }
}

/// Fit within `max_dim` on both axes keeping aspect, then round each side
/// down to even with a floor of 2 (H.264 needs even dimensions).
pub fn fit_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let (mut w, mut h) = (width, height);
    let longest = w.max(h);
    if longest > max_dim {
        w = (u64::from(w) * u64::from(max_dim) / u64::from(longest)) as u32;
        h = (u64::from(h) * u64::from(max_dim) / u64::from(longest)) as u32;
    }
    ((w / 2 * 2).max(2), (h / 2 * 2).max(2))
}

/// `img_<base>.mp4` in `dest_dir`, or `img_<base>_<millis>.mp4` when taken.
pub fn output_path(source: &Path, dest_dir: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, _) = split_name(&file_name);
    let base = sanitize_base_name(stem);
    let candidate = dest_dir.join(format!("img_{base}.mp4"));
    if !candidate.exists() {
        return candidate;
    }
    let millis = chrono::Utc::now().timestamp_millis();
    dest_dir.join(format!("img_{base}_{millis}.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fits_and_evens_dimensions() {
        assert_eq!(fit_dimensions(640, 480, 1920), (640, 480));
        assert_eq!(fit_dimensions(641, 481, 1920), (640, 480));
        assert_eq!(fit_dimensions(3840, 2160, 1920), (1920, 1080));
        assert_eq!(fit_dimensions(1000, 4000, 1920), (480, 1920));
        assert_eq!(fit_dimensions(1, 1, 1920), (2, 2));
    }

    #[test]
    fn output_name_avoids_collisions() {
        let tmp = tempdir().unwrap();
        let src = Path::new("/cache/Beach Day.jpeg");
        let first = output_path(src, tmp.path());
        assert_eq!(first, tmp.path().join("img_Beach_Day.mp4"));

        fs::write(&first, b"x").unwrap();
        let second = output_path(src, tmp.path());
        let name = second.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("img_Beach_Day_") && name.ends_with(".mp4"), "{name}");
    }

    #[test]
    fn undecodable_image_fails_without_output() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("junk.png");
        fs::write(&src, b"definitely not a png").unwrap();
        let out_dir = tmp.path().join("out");
        fs::create_dir_all(&out_dir).unwrap();

        let conv = FfmpegConverter::new(ConverterOptions::default());
        assert!(matches!(conv.convert(&src, &out_dir), Err(Error::Conversion { .. })));
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }
}
