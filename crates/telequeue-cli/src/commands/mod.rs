//! Command handlers

pub mod config;
pub mod queue;
pub mod status;

use anyhow::{bail, Context, Result};
use tracing::warn;

use telequeue_core::{Config, ProjectToken, QueueManager, StorageEngine};

/// Validate the `--token` argument
pub fn require_token(token: Option<&str>) -> Result<ProjectToken> {
    let Some(token) = token else {
        bail!("A project token is required. Pass --token or set TELEQUEUE_TOKEN.");
    };
    ProjectToken::new(token).context("Invalid --token")
}

/// Open the queue, failing loudly where the library would only log
///
/// A recreated database is still usable, so that case only warns.
pub fn open_queue(config: &Config, token: ProjectToken) -> Result<QueueManager> {
    let mut engine = StorageEngine::from_config(config);

    if let Err(e) = engine.open(token) {
        if !e.is_recoverable() {
            match e.recovery_suggestion() {
                Some(hint) => bail!("{}\n{}", e, hint),
                None => bail!("{}", e),
            }
        }
        warn!("{}", e);
    }

    Ok(QueueManager::new(engine).with_batch_size(config.batch_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_require_token() {
        assert!(require_token(None).is_err());
        assert!(require_token(Some("bad token")).is_err());
        assert_eq!(require_token(Some("abc")).unwrap().as_str(), "abc");
    }

    #[test]
    fn test_open_queue_in_fresh_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::with_data_dir(temp_dir.path().join("nested"));

        let queue = open_queue(&config, ProjectToken::new("abc").unwrap()).unwrap();
        assert!(queue.engine().is_open());
        assert!(config.database_path().exists());
    }

    #[test]
    fn test_open_queue_reports_fatal_errors() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let config = Config::with_data_dir(&blocker);
        let err = open_queue(&config, ProjectToken::new("abc").unwrap())
            .err()
            .unwrap();
        assert!(err.to_string().contains("blocker"));
    }
}
