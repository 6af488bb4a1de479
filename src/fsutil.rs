use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

/// Best-effort: let out-of-process readers open `path` directly (0644 semantics).
///
/// Failures are logged and swallowed.
pub fn make_world_readable(path: &Path) {
    if let Err(err) = try_make_world_readable(path) {
        warn!(path = %path.display(), error = %err, "chmod: could not mark file world-readable");
    }
}

#[cfg(unix)]
fn try_make_world_readable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode() | 0o444;
    if mode != perms.mode() {
        perms.set_mode(mode);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn try_make_world_readable(path: &Path) -> io::Result<()> {
    // No group/other permission bits off unix; only confirm the file exists.
    fs::metadata(path).map(|_| ())
}

/// Remove `p` if it exists. Returns whether a file was removed.
pub fn delete_if_exists(p: &Path) -> io::Result<bool> {
    if !p.exists() {
        debug!(path = %p.display(), "delete: file missing; skipping");
        return Ok(false);
    }
    match fs::remove_file(p) {
        Ok(()) => {
            info!(path = %p.display(), "delete: removed");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %p.display(), "delete: file vanished during remove; skipping");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn delete_missing_file_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let gone = tmp.path().join("gone.mp4");
        assert!(!delete_if_exists(&gone).unwrap());

        fs::write(&gone, b"x").unwrap();
        assert!(delete_if_exists(&gone).unwrap());
        assert!(!gone.exists());
    }

    #[cfg(unix)]
    #[test]
    fn world_readable_adds_read_bits() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let file = tmp.path().join("clip.mp4");
        fs::write(&file, b"x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o600)).unwrap();

        make_world_readable(&file);
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
