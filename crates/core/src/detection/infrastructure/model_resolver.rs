use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::CASCADE_BASE_URL;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("cascade file not found: {0}")]
    NotFound(PathBuf),
    #[error("{name} is not available locally and downloads are disabled")]
    DownloadDisabled { name: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write cascade to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Where to look for cascade files, in priority order.
#[derive(Clone, Debug, Default)]
pub struct CascadeLocations {
    /// Directory holding cascades under their stock file names.
    pub cascade_dir: Option<PathBuf>,
    /// Cache directory; `None` means the platform default.
    pub cache_dir: Option<PathBuf>,
    pub allow_download: bool,
}

/// Resolve a cascade file.
///
/// Resolution order:
/// 1. `explicit` path (must exist, no fallback)
/// 2. `cascade_dir/<name>`
/// 3. Cache directory
/// 4. Download the OpenCV stock cascade into the cache
pub fn resolve_cascade(
    name: &str,
    explicit: Option<&Path>,
    locations: &CascadeLocations,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::NotFound(path.to_path_buf()))
        };
    }

    if let Some(dir) = &locations.cascade_dir {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
        log::debug!("{name} not in {}", dir.display());
    }

    let cache_dir = match &locations.cache_dir {
        Some(dir) => dir.clone(),
        None => cascade_cache_dir()?,
    };
    let cached_path = cache_dir.join(name);
    if cached_path.is_file() {
        return Ok(cached_path);
    }

    if !locations.allow_download {
        return Err(ModelResolveError::DownloadDisabled {
            name: name.to_string(),
        });
    }

    fs::create_dir_all(&cache_dir).map_err(ModelResolveError::CacheDir)?;
    let url = format!("{CASCADE_BASE_URL}/{name}");
    log::info!("Downloading {name} from {url}");
    download(&url, &cached_path)?;
    Ok(cached_path)
}

/// Platform-specific cascade cache directory.
///
/// - macOS: `~/Library/Application Support/Facewatch/cascades/`
/// - Linux: `$XDG_CACHE_HOME/Facewatch/cascades/` or `~/.cache/Facewatch/cascades/`
/// - Windows: `%LOCALAPPDATA%/Facewatch/cascades/`
pub fn cascade_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Facewatch").join("cascades"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Facewatch").join("cascades"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path);

    // Clean up .part file on any error
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(url: &str, dest: &Path, temp_path: &Path) -> Result<(), ModelResolveError> {
    let write_err = |e| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        total += n as u64;
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    log::debug!("Saved {total} bytes to {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn offline(cascade_dir: Option<PathBuf>, cache_dir: &Path) -> CascadeLocations {
        CascadeLocations {
            cascade_dir,
            cache_dir: Some(cache_dir.to_path_buf()),
            allow_download: false,
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.xml");
        fs::write(&explicit, b"<opencv_storage/>").unwrap();
        let dir = tmp.path().join("dir");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("haarcascade_eye.xml"), b"x").unwrap();

        let resolved = resolve_cascade(
            "haarcascade_eye.xml",
            Some(&explicit),
            &offline(Some(dir), tmp.path()),
        )
        .unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_missing_explicit_path_does_not_fall_back() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("haarcascade_eye.xml"), b"x").unwrap();

        let err = resolve_cascade(
            "haarcascade_eye.xml",
            Some(&tmp.path().join("nope.xml")),
            &offline(Some(tmp.path().to_path_buf()), tmp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, ModelResolveError::NotFound(_)));
    }

    #[test]
    fn test_cascade_dir_before_cache() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("cascades");
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&dir).unwrap();
        fs::create_dir_all(&cache).unwrap();
        fs::write(dir.join("haarcascade_smile.xml"), b"dir").unwrap();
        fs::write(cache.join("haarcascade_smile.xml"), b"cache").unwrap();

        let resolved =
            resolve_cascade("haarcascade_smile.xml", None, &offline(Some(dir.clone()), &cache))
                .unwrap();
        assert_eq!(resolved, dir.join("haarcascade_smile.xml"));
    }

    #[test]
    fn test_cache_used_when_dir_lacks_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("haarcascade_eye.xml"), b"cache").unwrap();

        let resolved = resolve_cascade(
            "haarcascade_eye.xml",
            None,
            &offline(Some(tmp.path().join("empty")), &cache),
        )
        .unwrap();
        assert_eq!(resolved, cache.join("haarcascade_eye.xml"));
    }

    #[test]
    fn test_download_disabled_reports_name() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_cascade("haarcascade_eye.xml", None, &offline(None, tmp.path()))
            .unwrap_err();
        assert!(matches!(err, ModelResolveError::DownloadDisabled { .. }));
        assert!(err.to_string().contains("haarcascade_eye.xml"));
    }

    #[test]
    fn test_cascade_cache_dir_returns_path() {
        let path = cascade_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("Facewatch"));
        assert!(path.ends_with("cascades"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("haarcascade_eye.xml");
        let result = download("http://invalid.nonexistent.example.com/cascade.xml", &dest);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
