use std::path::PathBuf;

/// Per-user directory where fetched models are kept.
///
/// - macOS: `~/Library/Application Support/EmotionLens/models/`
/// - Linux: `$XDG_CACHE_HOME/EmotionLens/models/` or `~/.cache/EmotionLens/models/`
/// - Windows: `%LOCALAPPDATA%/EmotionLens/models/`
///
/// `None` when the platform reports no such directory.
pub fn model_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("EmotionLens").join("models"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_dir_is_app_scoped() {
        if let Some(path) = model_cache_dir() {
            assert!(path.ends_with("EmotionLens/models"));
        }
    }
}
