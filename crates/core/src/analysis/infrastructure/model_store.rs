use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::analysis::domain::analyzer_error::{AnalyzerError, ModelHint};
use crate::shared::model_cache::model_cache_dir;

/// A model file and the URL it can be fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub name: &'static str,
    pub url: &'static str,
}

/// Called with `(bytes_fetched, total_bytes)`; `total_bytes` is 0 when the
/// server sent no Content-Length.
pub type Progress<'a> = &'a dyn Fn(u64, u64);

/// Where model files are looked up and where fetched ones are stored.
///
/// Lookup order is the cache directory, then the bundled directory. A
/// model found in neither is fetched into the cache directory.
#[derive(Clone, Debug)]
pub struct ModelStore {
    cache_dir: Option<PathBuf>,
    bundled_dir: Option<PathBuf>,
}

impl ModelStore {
    /// Store backed by the per-user model cache.
    pub fn new(bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir: model_cache_dir(),
            bundled_dir,
        }
    }

    pub fn with_cache_dir(cache_dir: Option<PathBuf>, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            bundled_dir,
        }
    }

    /// An existing local copy of `source`, if any.
    pub fn locate(&self, source: &ModelSource) -> Option<PathBuf> {
        [self.cache_dir.as_deref(), self.bundled_dir.as_deref()]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(source.name))
            .find(|path| path.is_file())
    }

    /// Where an operator should put `source` by hand.
    pub fn hint(&self, source: &ModelSource) -> ModelHint {
        let dir = self.cache_dir.as_ref().or(self.bundled_dir.as_ref());
        ModelHint {
            model_name: source.name.to_string(),
            url: source.url.to_string(),
            destination: dir
                .map(|d| d.join(source.name))
                .unwrap_or_else(|| PathBuf::from(source.name)),
        }
    }

    /// Local path of `source`, fetching it into the cache when missing.
    ///
    /// Only transfer and write failures are reported as
    /// [`AnalyzerError::ModelDownload`]. A cache directory that is unknown or
    /// cannot be created is a [`AnalyzerError::ModelLoad`], since retrying
    /// will not help.
    pub fn fetch(
        &self,
        source: &ModelSource,
        progress: Option<Progress<'_>>,
    ) -> Result<PathBuf, AnalyzerError> {
        if let Some(path) = self.locate(source) {
            return Ok(path);
        }

        let cache_dir = self.cache_dir.as_deref().ok_or_else(|| AnalyzerError::ModelLoad {
            model: source.name.to_string(),
            message: "not found locally and no user cache directory is available".to_string(),
        })?;
        fs::create_dir_all(cache_dir).map_err(|e| AnalyzerError::ModelLoad {
            model: source.name.to_string(),
            message: format!("cannot create the model cache directory: {e}"),
        })?;

        log::info!("Fetching {} from {}", source.name, source.url);
        let dest = cache_dir.join(source.name);
        transfer(source.url, cache_dir, &dest, progress).map_err(|message| {
            AnalyzerError::ModelDownload {
                hint: self.hint(source),
                message,
            }
        })?;
        Ok(dest)
    }
}

/// Streams `url` into a temp file inside `dir`, then renames it to `dest`.
/// The temp file is removed on any failure.
fn transfer(
    url: &str,
    dir: &Path,
    dest: &Path,
    progress: Option<Progress<'_>>,
) -> Result<(), String> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| format!("request to {url} failed: {e}"))?;
    let total = response.content_length().unwrap_or(0);

    let temp = NamedTempFile::new_in(dir).map_err(|e| format!("cannot stage model file: {e}"))?;
    let mut writer = ProgressWriter {
        inner: temp,
        written: 0,
        total,
        progress,
    };
    io::copy(&mut response, &mut writer).map_err(|e| format!("transfer interrupted: {e}"))?;
    writer.flush().map_err(|e| format!("cannot write model file: {e}"))?;

    writer
        .inner
        .persist(dest)
        .map_err(|e| format!("cannot move model into {}: {}", dest.display(), e.error))?;
    Ok(())
}

struct ProgressWriter<'a, W> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<Progress<'a>>,
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(report) = self.progress {
            report(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    const UNREACHABLE: ModelSource = ModelSource {
        name: "model.onnx",
        url: "http://invalid.nonexistent.example.com/model.onnx",
    };

    #[test]
    fn test_cached_copy_wins_over_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("model.onnx"), b"cached").unwrap();
        fs::write(bundled.join("model.onnx"), b"bundled").unwrap();

        let store = ModelStore::with_cache_dir(Some(cache.clone()), Some(bundled));
        assert_eq!(store.fetch(&UNREACHABLE, None).unwrap(), cache.join("model.onnx"));
    }

    #[test]
    fn test_bundled_copy_used_without_touching_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("model.onnx"), b"bundled").unwrap();

        let store = ModelStore::with_cache_dir(Some(cache.clone()), Some(bundled.clone()));
        assert_eq!(store.fetch(&UNREACHABLE, None).unwrap(), bundled.join("model.onnx"));
        assert!(!cache.exists());
    }

    #[test]
    fn test_unreachable_url_is_download_failure_with_cache_hint() {
        let tmp = TempDir::new().unwrap();
        let store = ModelStore::with_cache_dir(Some(tmp.path().to_path_buf()), None);

        let err = store.fetch(&UNREACHABLE, None).unwrap_err();

        assert!(err.is_download_related());
        let hint = err.model_hint().unwrap();
        assert_eq!(hint.destination, tmp.path().join("model.onnx"));
        assert_eq!(hint.url, UNREACHABLE.url);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_cache_dir_is_load_failure() {
        let store = ModelStore::with_cache_dir(None, None);

        let err = store.fetch(&UNREACHABLE, None).unwrap_err();

        assert!(matches!(err, AnalyzerError::ModelLoad { .. }));
        assert!(!err.is_download_related());
    }

    #[test]
    fn test_uncreatable_cache_dir_is_load_failure() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();
        let store = ModelStore::with_cache_dir(Some(blocker.join("models")), None);

        let err = store.fetch(&UNREACHABLE, None).unwrap_err();

        assert!(matches!(err, AnalyzerError::ModelLoad { .. }));
        assert!(!err.is_download_related());
    }

    #[test]
    fn test_hint_falls_back_to_bundled_dir_then_bare_name() {
        let bundled = PathBuf::from("/opt/models");
        let store = ModelStore::with_cache_dir(None, Some(bundled.clone()));
        assert_eq!(store.hint(&UNREACHABLE).destination, bundled.join("model.onnx"));

        let bare = ModelStore::with_cache_dir(None, None);
        assert_eq!(bare.hint(&UNREACHABLE).destination, PathBuf::from("model.onnx"));
    }

    #[test]
    fn test_progress_writer_reports_running_total() {
        let calls = RefCell::new(Vec::new());
        let report = |done: u64, total: u64| calls.borrow_mut().push((done, total));
        let mut writer = ProgressWriter {
            inner: Vec::new(),
            written: 0,
            total: 10,
            progress: Some(&report as Progress),
        };

        writer.write_all(b"abcd").unwrap();
        writer.write_all(b"efghij").unwrap();

        assert_eq!(writer.inner, b"abcdefghij");
        assert_eq!(calls.into_inner(), vec![(4, 10), (10, 10)]);
    }
}
