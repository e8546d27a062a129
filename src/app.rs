use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{SystemBrowser, SystemClipboard};
use crate::config::{self, Config};
use crate::data::{VideoFeed, YoutubeVideoFeed};
use crate::logging;
use crate::state::AppState;
use crate::storage;
use crate::ui;
use crate::youtube;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = load_config(&opts)?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());

    let state = open_state(&cfg)?;

    let user_agent = if cfg.youtube.user_agent.trim().is_empty() {
        format!("ych-tui/{}", crate::VERSION)
    } else {
        cfg.youtube.user_agent.clone()
    };
    let client = youtube::Client::new(youtube::ClientConfig {
        user_agent,
        base_url: Some(cfg.youtube.base_url.clone()),
        timeout: Some(cfg.youtube.timeout),
        http_client: None,
    })
    .context("create YouTube client")?;
    let feed: Arc<dyn VideoFeed> = Arc::new(YoutubeVideoFeed::new(Arc::new(client)));

    let mut model = ui::Model::new(ui::Options {
        state,
        feed,
        clipboard: Box::new(SystemClipboard::new()),
        launcher: Box::new(SystemBrowser),
        config_path: display_path,
    });
    model.run()?;
    log::info!("ych-tui exiting");

    Ok(())
}

pub fn import(opts: RunOptions, path: &Path) -> Result<usize> {
    let cfg = load_config(&opts)?;
    let mut state = open_state(&cfg)?;
    let added = state
        .import_file(path)
        .with_context(|| format!("import {}", path.display()))?;
    if let Some(message) = state.error() {
        anyhow::bail!("{message}");
    }
    Ok(added)
}

fn load_config(opts: &RunOptions) -> Result<Config> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    Ok(cfg)
}

fn open_state(cfg: &Config) -> Result<AppState> {
    let store = storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    })
    .context("open storage")?;
    Ok(AppState::load(store, &cfg.youtube))
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/ych-tui/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_path_abbreviates_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".config/ych-tui/config.yaml");
            assert_eq!(friendly_path(Some(&path)), "~/.config/ych-tui/config.yaml");
        }
        assert_eq!(
            friendly_path(Some(&PathBuf::from("/etc/ych.yaml"))),
            "/etc/ych.yaml"
        );
        assert_eq!(friendly_path(None), "~/.config/ych-tui/config.yaml");
    }

    #[test]
    fn import_merges_into_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.yaml");
        let db = dir.path().join("state.db");
        std::fs::write(
            &config_file,
            format!(
                "storage:\n  path: {}\nlog:\n  file: {}\n",
                db.display(),
                dir.path().join("ych.log").display()
            ),
        )
        .unwrap();
        let bank = dir.path().join("bank.csv");
        std::fs::write(&bank, "first,second\nfirst").unwrap();

        let opts = RunOptions {
            config_file: Some(config_file),
        };
        assert_eq!(import(opts.clone(), &bank).unwrap(), 2);
        assert_eq!(import(opts, &bank).unwrap(), 0);
    }

    #[test]
    fn import_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("config.yaml");
        std::fs::write(
            &config_file,
            format!(
                "storage:\n  path: {}\nlog:\n  file: {}\n",
                dir.path().join("state.db").display(),
                dir.path().join("ych.log").display()
            ),
        )
        .unwrap();
        let bank = dir.path().join("bank.docx");
        std::fs::write(&bank, "hello").unwrap();
        let err = import(
            RunOptions {
                config_file: Some(config_file),
            },
            &bank,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("bank.docx"));
    }
}
