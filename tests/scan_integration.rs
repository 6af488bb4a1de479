use camswap::MediaKind;
use camswap::error::Error;
use camswap::scan::{MetadataReader, NoMetadata, scan_dir};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Reports the same duration for every probed file.
struct FixedDuration(u64);

impl MetadataReader for FixedDuration {
    fn duration_ms(&self, _path: &Path) -> Option<u64> {
        Some(self.0)
    }
}

fn names(items: &[camswap::MediaItem]) -> Vec<String> {
    let mut names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
    names.sort();
    names
}

#[test]
fn classifies_by_extension_case_insensitively() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("A.MP4"), b"video").unwrap();
    fs::write(dir.join("b.mkv"), b"video").unwrap();
    fs::write(dir.join("c.Jpg"), b"image").unwrap();
    fs::write(dir.join("d.png"), b"image").unwrap();
    fs::write(dir.join("e.flac"), b"audio").unwrap();
    fs::write(dir.join("notes.txt"), b"skip").unwrap();
    fs::write(dir.join("cs_config.json"), b"{}").unwrap();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("nested").join("deep.mp4"), b"skip").unwrap();

    let out = scan_dir(dir, &NoMetadata).unwrap();
    assert_eq!(names(&out.videos), vec!["A.MP4", "b.mkv"]);
    assert_eq!(names(&out.images), vec!["c.Jpg", "d.png"]);
    assert_eq!(names(&out.audios), vec!["e.flac"]);

    let a = out.videos.iter().find(|v| v.name == "A.MP4").unwrap();
    assert_eq!(a.kind, MediaKind::Video);
    assert_eq!(a.size_bytes, 5);
    assert_eq!(a.display_name, "A.MP4");
    assert!(!a.is_virtual);
    assert_eq!(a.path, dir.join("A.MP4"));
}

#[test]
fn durations_only_for_timed_media() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("clip.mp4"), b"v").unwrap();
    fs::write(tmp.path().join("song.mp3"), b"a").unwrap();
    fs::write(tmp.path().join("pic.jpeg"), b"i").unwrap();

    let out = scan_dir(tmp.path(), &FixedDuration(61_500)).unwrap();
    assert_eq!(out.videos[0].duration_ms, 61_500);
    assert_eq!(out.audios[0].duration_ms, 61_500);
    assert_eq!(out.images[0].duration_ms, 0);

    let unknown = scan_dir(tmp.path(), &NoMetadata).unwrap();
    assert_eq!(unknown.videos[0].duration_ms, 0);
}

#[test]
fn missing_directory_is_created() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("Camera1");
    let out = scan_dir(&dir, &NoMetadata).unwrap();
    assert!(dir.is_dir());
    assert!(out.videos.is_empty() && out.images.is_empty() && out.audios.is_empty());
}

#[test]
fn file_in_place_of_directory_is_an_error() {
    let tmp = tempdir().unwrap();
    let not_dir = tmp.path().join("media");
    fs::write(&not_dir, b"oops").unwrap();
    assert!(matches!(scan_dir(&not_dir, &NoMetadata), Err(Error::BadDir(_))));
}

#[test]
fn scanning_twice_without_changes_is_stable() {
    let tmp = tempdir().unwrap();
    for name in ["a.mp4", "b.mov", "c.png", "d.wav"] {
        fs::write(tmp.path().join(name), name.as_bytes()).unwrap();
    }
    let first = scan_dir(tmp.path(), &FixedDuration(1000)).unwrap();
    let second = scan_dir(tmp.path(), &FixedDuration(1000)).unwrap();
    assert_eq!(first, second);
}

#[cfg(unix)]
#[test]
fn videos_become_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let video = tmp.path().join("private.mp4");
    let image = tmp.path().join("private.png");
    for p in [&video, &image] {
        fs::write(p, b"x").unwrap();
        fs::set_permissions(p, fs::Permissions::from_mode(0o600)).unwrap();
    }

    scan_dir(tmp.path(), &NoMetadata).unwrap();

    let mode = fs::metadata(&video).unwrap().permissions().mode();
    assert_eq!(mode & 0o444, 0o444, "mode was {mode:o}");
    let untouched = fs::metadata(&image).unwrap().permissions().mode();
    assert_eq!(untouched & 0o777, 0o600);
}
