use std::path::PathBuf;

/// Centralized cross-platform data directory.
/// Linux: ~/.config/chat-topics/
/// macOS: ~/Library/Application Support/chat-topics/
/// Windows: %APPDATA%/chat-topics/
pub fn data_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    base.join("chat-topics")
}

/// {data_dir}/config.toml
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// {data_dir}/topics.db: message archive + analysis cache.
pub fn database_path() -> PathBuf {
    data_dir().join("topics.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_data_dir() {
        let dir = data_dir();
        assert!(dir.ends_with("chat-topics"));
        assert!(config_path().starts_with(&dir));
        assert!(database_path().starts_with(&dir));
        assert_eq!(database_path().file_name().unwrap(), "topics.db");
    }
}
