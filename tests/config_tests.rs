use camswap::config::Configuration;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
media-dir: "/data/camera"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.media_dir, PathBuf::from("/data/camera"));
    assert_eq!(cfg.config_file(), PathBuf::from("/data/camera/cs_config.json"));
    assert!(cfg.watch_config);
    assert_eq!(cfg.command_queue, 32);
}

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg.media_dir, PathBuf::from("/sdcard/DCIM/Camera1"));
    assert_eq!(cfg.converter.fps, 25);
    assert_eq!(cfg.converter.keyframe_interval_secs, 1);
    assert_eq!(cfg.converter.duration, Duration::from_secs(3));
    assert_eq!(cfg.converter.max_dimension, 1920);
    assert_eq!(cfg.watch_settle, Duration::from_millis(200));
    assert!(cfg.notify_stamp_file.is_none());
    cfg.validated().unwrap();
}

#[test]
fn parse_converter_and_humantime_fields() {
    let yaml = r#"
media-dir: "/m"
config-file: "/etc/camswap/cs_config.json"
staging-dir: "/tmp/stage"
probe-durations: false
watch-settle: 750ms
converter:
  ffmpeg-path: "/opt/ffmpeg/bin/ffmpeg"
  fps: 30
  duration: 5s
  max-dimension: 1280
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.config_file(), PathBuf::from("/etc/camswap/cs_config.json"));
    assert_eq!(cfg.staging_dir(), PathBuf::from("/tmp/stage"));
    assert!(!cfg.probe_durations);
    assert_eq!(cfg.watch_settle, Duration::from_millis(750));
    assert_eq!(cfg.converter.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    assert_eq!(cfg.converter.fps, 30);
    assert_eq!(cfg.converter.duration, Duration::from_secs(5));
    assert_eq!(cfg.converter.max_dimension, 1280);
    // Unspecified converter fields keep their defaults.
    assert_eq!(cfg.converter.keyframe_interval_secs, 1);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
media-dir: "/m"
photo-library-path: "/photos"
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());

    let nested = r#"
converter:
  bitrate: 9000
"#;
    assert!(serde_yaml::from_str::<Configuration>(nested).is_err());
}

#[test]
fn validation_rejects_zero_values() {
    let cfg: Configuration = serde_yaml::from_str("converter: { fps: 0 }").unwrap();
    let err = cfg.validated().unwrap_err();
    assert!(err.to_string().contains("fps"), "{err}");

    let cfg: Configuration = serde_yaml::from_str("command-queue: 0").unwrap();
    assert!(cfg.validated().is_err());

    let cfg: Configuration = serde_yaml::from_str("converter: { max-dimension: 1 }").unwrap();
    assert!(cfg.validated().is_err());

    let cfg: Configuration = serde_yaml::from_str("media-dir: \"\"").unwrap();
    assert!(cfg.validated().is_err());
}

#[test]
fn from_yaml_file_reads_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.yaml");
    std::fs::write(&path, "media-dir: /srv/media\nwatch-config: false\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.media_dir, PathBuf::from("/srv/media"));
    assert!(!cfg.watch_config);

    assert!(Configuration::from_yaml_file(tmp.path().join("missing.yaml")).is_err());
}
