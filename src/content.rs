//! Externally supplied content references and the resolver that reads them.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Opaque reference to importable content (a URI or a plain path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(String);

impl ContentRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once("://").map(|(scheme, _)| scheme)
    }

    /// The reference's path component, without scheme, authority, query or fragment.
    pub fn path(&self) -> &str {
        let rest = match self.0.split_once("://") {
            Some(("file", rest)) => rest,
            Some((_, rest)) => rest.find('/').map_or("", |i| &rest[i..]),
            None => &self.0,
        };
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        &rest[..end]
    }

    /// Trailing segment of [`Self::path`], if any.
    pub fn last_segment(&self) -> Option<&str> {
        let path = self.path();
        let seg = path.rsplit('/').next().unwrap_or(path);
        (!seg.is_empty()).then_some(seg)
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for ContentRef {
    fn from(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for ContentRef {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

/// Query/read boundary for importable content.
pub trait ContentResolver: Send + Sync {
    /// Human-readable name reported by the content's provider, if any.
    fn display_name(&self, content: &ContentRef) -> Option<String>;

    /// MIME type reported or sniffed for the content, if any.
    fn mime_type(&self, content: &ContentRef) -> Option<String>;

    fn open(&self, content: &ContentRef) -> io::Result<Box<dyn Read + Send>>;
}

/// Resolves `file://` URIs and plain filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentResolver;

impl FsContentResolver {
    fn local_path(content: &ContentRef) -> Option<PathBuf> {
        match content.scheme() {
            None | Some("file") => Some(PathBuf::from(content.path())),
            Some(_) => None,
        }
    }
}

impl ContentResolver for FsContentResolver {
    fn display_name(&self, content: &ContentRef) -> Option<String> {
        let path = Self::local_path(content)?;
        if !path.is_file() {
            return None;
        }
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    fn mime_type(&self, content: &ContentRef) -> Option<String> {
        let path = Self::local_path(content)?;
        infer::get_from_path(path)
            .ok()
            .flatten()
            .map(|kind| kind.mime_type().to_string())
    }

    fn open(&self, content: &ContentRef) -> io::Result<Box<dyn Read + Send>> {
        let path = Self::local_path(content).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                format!("unsupported content scheme: {content}"),
            )
        })?;
        Ok(Box::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_segment_parsing() {
        let c = ContentRef::new("content://media/external/images/media/42?x=1");
        assert_eq!(c.scheme(), Some("content"));
        assert_eq!(c.path(), "/external/images/media/42");
        assert_eq!(c.last_segment(), Some("42"));

        let f = ContentRef::new("file:///sdcard/Download/beach.PNG");
        assert_eq!(f.path(), "/sdcard/Download/beach.PNG");
        assert_eq!(f.last_segment(), Some("beach.PNG"));

        let p = ContentRef::new("/tmp/clip.mp4");
        assert_eq!(p.scheme(), None);
        assert_eq!(p.last_segment(), Some("clip.mp4"));

        assert_eq!(ContentRef::new("content://authority").last_segment(), None);
        assert_eq!(ContentRef::new("/dir/").last_segment(), None);
    }

    #[test]
    fn fs_resolver_rejects_foreign_schemes() {
        let c = ContentRef::new("content://media/1");
        assert!(FsContentResolver.open(&c).is_err());
        assert_eq!(FsContentResolver.display_name(&c), None);
    }
}
