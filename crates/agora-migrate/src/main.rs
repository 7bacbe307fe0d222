use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use agora_db::Database;

#[derive(Debug, PartialEq)]
struct Config {
    db_path: PathBuf,
    target: Option<String>,
}

impl Config {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("AGORA_DB_PATH").unwrap_or_else(|| "agora.db".into());
        let target = lookup("AGORA_MIGRATE_TARGET").filter(|t| !t.trim().is_empty());
        Self {
            db_path: PathBuf::from(db_path),
            target,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug".into()),
        )
        .init();

    let config = Config::from_env();
    let db = Database::connect(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;

    let applied = db.applied_migrations()?;
    let pending = db.pending_migrations()?;
    info!("{} applied: {:?}", config.db_path.display(), applied);
    info!("pending: {:?}", pending);

    let ran = match &config.target {
        Some(target) => db
            .migrate_to(target)
            .with_context(|| format!("migrating to {target}"))?,
        None => db.migrate().context("applying pending migrations")?,
    };

    info!("Done, {} migration(s) applied", ran);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.db_path, PathBuf::from("agora.db"));
        assert!(config.target.is_none());
    }

    #[test]
    fn reads_path_and_target() {
        let config = Config::from_lookup(|key| match key {
            "AGORA_DB_PATH" => Some("/var/lib/agora/chat.db".into()),
            "AGORA_MIGRATE_TARGET" => Some("0001_initial".into()),
            _ => None,
        });
        assert_eq!(config.db_path, PathBuf::from("/var/lib/agora/chat.db"));
        assert_eq!(config.target.as_deref(), Some("0001_initial"));
    }

    #[test]
    fn blank_target_means_everything() {
        let config = Config::from_lookup(|key| (key == "AGORA_MIGRATE_TARGET").then(|| " ".into()));
        assert!(config.target.is_none());
    }
}
