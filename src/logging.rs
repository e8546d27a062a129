use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::LogConfig;

pub fn init(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    let level = if cfg.level.trim().is_empty() {
        "warn"
    } else {
        cfg.level.trim()
    };

    Builder::from_env(Env::default().default_filter_or(level))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_secs()
        .try_init()
        .context("logging: install logger")?;

    log::info!("ych-tui {} starting", crate::VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_means_no_logger() {
        let cfg = LogConfig {
            level: "debug".into(),
            file: None,
        };
        init(&cfg).unwrap();
    }
}
