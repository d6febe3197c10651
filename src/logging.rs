use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use env_logger::{Builder, Env, Target};

/// Send all log output to a file; the terminal itself belongs to the UI.
/// `RUST_LOG` controls the filter, defaulting to `info`.
pub fn init() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();

    Ok(path)
}

fn log_file_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("chatterm").join("chatterm.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_lives_under_app_dir() {
        let path = log_file_path().unwrap();
        assert!(path.to_string_lossy().contains("chatterm"));
        assert_eq!(path.file_name().unwrap(), "chatterm.log");
    }
}
