use std::path::Path;

use crate::actions::{self, Clipboard, Launcher};
use crate::comments::{self, CommentBank};
use crate::config::YoutubeConfig;
use crate::data::VideoFeed;
use crate::error::AppError;
use crate::persist::{self, PersistentField};
use crate::storage::Store;
use crate::youtube::{FetchRequest, VideoRecord, MAX_RESULTS_LIMIT};

const API_KEY: PersistentField<String> = PersistentField::new(persist::API_KEY);
const CHANNEL_ID: PersistentField<String> = PersistentField::new(persist::CHANNEL_ID);
const MAX_RESULTS: PersistentField<u32> = PersistentField::new(persist::MAX_RESULTS);
const COMMENTS: PersistentField<CommentBank> = PersistentField::new(persist::COMMENTS);
const ACCOUNTS: PersistentField<Vec<String>> = PersistentField::new(persist::ACCOUNTS);
const ACTIVE_ACCOUNT: PersistentField<Option<usize>> =
    PersistentField::new(persist::ACTIVE_ACCOUNT_INDEX);
const VIDEOS: PersistentField<Vec<VideoRecord>> = PersistentField::new(persist::VIDEOS);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub channel_id: String,
    pub max_results: u32,
}

impl Settings {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.channel_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending,
    Failed,
}

pub struct AppState {
    store: Store,
    settings: Settings,
    comments: CommentBank,
    selected_comment: Option<usize>,
    accounts: Vec<String>,
    active_account: Option<usize>,
    videos: Vec<VideoRecord>,
    fetch_status: FetchStatus,
    fetches_in_flight: usize,
    error: Option<String>,
    status: String,
    revision: u64,
}

pub fn clamp_max_results(value: u32) -> u32 {
    value.clamp(1, MAX_RESULTS_LIMIT)
}

impl AppState {
    pub fn load(store: Store, defaults: &YoutubeConfig) -> Self {
        let settings = Settings {
            api_key: API_KEY.load_or_else(&store, || defaults.api_key.trim().to_string()),
            channel_id: CHANNEL_ID.load_or_else(&store, || defaults.channel_id.trim().to_string()),
            max_results: clamp_max_results(MAX_RESULTS.load(&store, defaults.max_results)),
        };
        let comments = CommentBank::from_items(
            COMMENTS
                .load(&store, CommentBank::new())
                .as_slice()
                .to_vec(),
        );
        let accounts = ACCOUNTS.load(&store, Vec::new());
        let active_account = ACTIVE_ACCOUNT
            .load(&store, None)
            .filter(|index| *index < accounts.len());
        let videos = VIDEOS.load(&store, Vec::new());
        log::debug!(
            "state: loaded {} comments, {} accounts, {} videos",
            comments.len(),
            accounts.len(),
            videos.len()
        );

        Self {
            store,
            settings,
            comments,
            selected_comment: None,
            accounts,
            active_account,
            videos,
            fetch_status: FetchStatus::Idle,
            fetches_in_flight: 0,
            error: None,
            status: String::new(),
            revision: 1,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn comments(&self) -> &CommentBank {
        &self.comments
    }

    pub fn selected_comment(&self) -> Option<usize> {
        self.selected_comment
    }

    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn active_account(&self) -> Option<usize> {
        self.active_account
    }

    pub fn active_account_label(&self) -> Option<&str> {
        self.active_account
            .and_then(|index| self.accounts.get(index))
            .map(String::as_str)
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.fetch_status
    }

    pub fn is_busy(&self) -> bool {
        self.fetches_in_flight > 0
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn fail(&mut self, err: AppError) -> AppError {
        if err.is_validation() {
            log::debug!("state: rejected: {err}");
        } else {
            log::warn!("state: {err}");
        }
        self.error = Some(err.to_string());
        self.touch();
        err
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.touch();
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.touch();
    }

    fn succeed(&mut self, status: impl Into<String>) {
        self.error = None;
        self.status = status.into();
        self.touch();
    }

    // On failure the in-memory change stays and the error slot says so.
    fn persist<T>(&mut self, field: &PersistentField<T>, value: &T) -> bool
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        match field.save(&self.store, value) {
            Ok(()) => true,
            Err(err) => {
                self.status = "Not saved; the change lasts until you quit.".to_string();
                self.fail(AppError::Persist {
                    key: field.key().to_string(),
                    reason: format!("{err:#}"),
                });
                false
            }
        }
    }

    // Settings

    pub fn set_api_key(&mut self, value: &str) {
        self.settings.api_key = value.trim().to_string();
        let value = self.settings.api_key.clone();
        if self.persist(&API_KEY, &value) {
            self.succeed(if value.is_empty() {
                "API key cleared."
            } else {
                "API key saved."
            });
        }
    }

    pub fn set_channel_id(&mut self, value: &str) {
        self.settings.channel_id = value.trim().to_string();
        let value = self.settings.channel_id.clone();
        if self.persist(&CHANNEL_ID, &value) {
            self.succeed(format!("Channel ID set to {:?}.", value));
        }
    }

    pub fn set_max_results(&mut self, value: u32) -> u32 {
        let clamped = clamp_max_results(value);
        self.settings.max_results = clamped;
        if self.persist(&MAX_RESULTS, &clamped) {
            self.succeed(format!("Fetching up to {clamped} videos."));
        }
        clamped
    }

    pub fn set_max_results_text(&mut self, raw: &str) -> Result<u32, AppError> {
        match raw.trim().parse::<u32>() {
            Ok(value) => Ok(self.set_max_results(value)),
            Err(_) => Err(self.fail(AppError::InvalidMaxResults(raw.trim().to_string()))),
        }
    }

    // Comment bank

    pub fn add_comment(&mut self, text: &str) -> Result<(), AppError> {
        if let Err(err) = self.comments.add(text) {
            return Err(self.fail(err));
        }
        let bank = self.comments.clone();
        if self.persist(&COMMENTS, &bank) {
            self.succeed(format!("Added comment #{}.", self.comments.len()));
        }
        Ok(())
    }

    pub fn remove_comment(&mut self, index: usize) -> Result<String, AppError> {
        let Some(removed) = self.comments.remove(index) else {
            let len = self.comments.len();
            return Err(self.fail(AppError::SelectionOutOfRange { index, len }));
        };
        self.selected_comment = match self.selected_comment {
            Some(selected) if selected == index => None,
            Some(selected) if selected > index => Some(selected - 1),
            other => other,
        };
        let bank = self.comments.clone();
        if self.persist(&COMMENTS, &bank) {
            self.succeed("Comment removed.");
        }
        Ok(removed)
    }

    pub fn select_comment(&mut self, index: usize) -> Result<(), AppError> {
        if index >= self.comments.len() {
            let len = self.comments.len();
            return Err(self.fail(AppError::SelectionOutOfRange { index, len }));
        }
        self.selected_comment = Some(index);
        self.succeed(format!("Comment #{} selected.", index + 1));
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selected_comment.take().is_some() {
            self.touch();
        }
    }

    pub fn clear_comments(&mut self) {
        self.comments.clear();
        self.selected_comment = None;
        let bank = self.comments.clone();
        if self.persist(&COMMENTS, &bank) {
            self.succeed("Comment bank cleared.");
        }
    }

    pub fn merge_comments(&mut self, incoming: Vec<String>) -> usize {
        let added = self.comments.merge(incoming);
        if added > 0 {
            let bank = self.comments.clone();
            if !self.persist(&COMMENTS, &bank) {
                return added;
            }
        }
        self.succeed(match added {
            0 => "No new comments found.".to_string(),
            1 => "Added 1 new comment.".to_string(),
            n => format!("Added {n} new comments."),
        });
        added
    }

    pub fn finish_import(
        &mut self,
        result: Result<Vec<String>, AppError>,
    ) -> Result<usize, AppError> {
        match result {
            Ok(incoming) => Ok(self.merge_comments(incoming)),
            Err(err) => Err(self.fail(err)),
        }
    }

    pub fn import_file(&mut self, path: &Path) -> Result<usize, AppError> {
        let result = comments::ingest_file(path);
        self.finish_import(result)
    }

    // Account labels

    pub fn add_account(&mut self, label: &str) -> Result<(), AppError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(self.fail(AppError::EmptyAccountLabel));
        }
        self.accounts.push(label.to_string());
        if self.active_account.is_none() {
            self.active_account = Some(self.accounts.len() - 1);
        }
        if self.persist_accounts() {
            self.succeed(format!("Account label {label:?} added."));
        }
        Ok(())
    }

    pub fn remove_account(&mut self, index: usize) -> Result<String, AppError> {
        if index >= self.accounts.len() {
            return Err(self.fail(AppError::AccountOutOfRange { index }));
        }
        let removed = self.accounts.remove(index);
        self.active_account = match self.active_account {
            _ if self.accounts.is_empty() => None,
            Some(active) if active == index => Some(index.saturating_sub(1)),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        if self.persist_accounts() {
            self.succeed(format!("Account label {removed:?} removed."));
        }
        Ok(removed)
    }

    pub fn set_active_account(&mut self, index: usize) -> Result<(), AppError> {
        if index >= self.accounts.len() {
            return Err(self.fail(AppError::AccountOutOfRange { index }));
        }
        self.active_account = Some(index);
        let active = self.active_account;
        if self.persist(&ACTIVE_ACCOUNT, &active) {
            self.succeed(format!("Now commenting as {:?}.", self.accounts[index]));
        }
        Ok(())
    }

    fn persist_accounts(&mut self) -> bool {
        let accounts = self.accounts.clone();
        let active = self.active_account;
        self.persist(&ACCOUNTS, &accounts) && self.persist(&ACTIVE_ACCOUNT, &active)
    }

    // Video feed

    pub fn begin_fetch(&mut self) -> Result<FetchRequest, AppError> {
        if !self.settings.has_credentials() {
            return Err(self.fail(AppError::MissingCredentials));
        }
        self.fetches_in_flight += 1;
        self.fetch_status = FetchStatus::Pending;
        self.succeed("Fetching latest videos…");
        Ok(FetchRequest {
            api_key: self.settings.api_key.trim().to_string(),
            channel_id: self.settings.channel_id.trim().to_string(),
            max_results: self.settings.max_results,
        })
    }

    // No stale-response filtering: the last fetch to settle sets the list.
    pub fn finish_fetch(
        &mut self,
        result: Result<Vec<VideoRecord>, AppError>,
    ) -> Result<usize, AppError> {
        self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
        let still_pending = self.fetches_in_flight > 0;
        match result {
            Ok(videos) => {
                self.fetch_status = if still_pending {
                    FetchStatus::Pending
                } else {
                    FetchStatus::Idle
                };
                self.videos = videos;
                let count = self.videos.len();
                let videos = self.videos.clone();
                if self.persist(&VIDEOS, &videos) {
                    self.succeed(format!("Loaded {count} videos."));
                }
                Ok(count)
            }
            Err(err) => {
                self.fetch_status = if still_pending {
                    FetchStatus::Pending
                } else {
                    FetchStatus::Failed
                };
                Err(self.fail(err))
            }
        }
    }

    pub fn fetch_with(&mut self, feed: &dyn VideoFeed) -> Result<usize, AppError> {
        let request = self.begin_fetch()?;
        let result = feed.latest_videos(&request);
        self.finish_fetch(result)
    }

    // Copy and open

    pub fn copy_and_open(
        &mut self,
        video_index: usize,
        clipboard: &mut dyn Clipboard,
        launcher: &mut dyn Launcher,
    ) -> Result<String, AppError> {
        let Some(video) = self.videos.get(video_index) else {
            return Err(self.fail(AppError::VideoNotFound { index: video_index }));
        };
        match actions::copy_and_open(
            &self.comments,
            self.selected_comment,
            video,
            clipboard,
            launcher,
        ) {
            Ok(url) => {
                let title = video.title.clone();
                self.succeed(format!("Comment copied; opened {title:?} in your browser."));
                Ok(url)
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{RecordingClipboard, RecordingLauncher};
    use crate::data::{sample_videos, MockVideoFeed};

    fn fresh() -> AppState {
        AppState::load(Store::in_memory().unwrap(), &YoutubeConfig::default())
    }

    fn with_credentials() -> AppState {
        let mut state = fresh();
        state.set_api_key("KEY");
        state.set_channel_id("UC123");
        state
    }

    #[test]
    fn starts_empty_with_config_defaults() {
        let defaults = YoutubeConfig {
            api_key: " cfg-key ".into(),
            max_results: 99,
            ..YoutubeConfig::default()
        };
        let state = AppState::load(Store::in_memory().unwrap(), &defaults);
        assert_eq!(state.settings().api_key, "cfg-key");
        assert_eq!(state.settings().max_results, 50);
        assert!(state.comments().is_empty());
        assert!(state.videos().is_empty());
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
    }

    #[test]
    fn stored_settings_win_over_config() {
        let store = Store::in_memory().unwrap();
        let mut state = AppState::load(store.clone(), &YoutubeConfig::default());
        state.set_channel_id("UCstored");
        let defaults = YoutubeConfig {
            channel_id: "UCconfig".into(),
            ..YoutubeConfig::default()
        };
        let reloaded = AppState::load(store, &defaults);
        assert_eq!(reloaded.settings().channel_id, "UCstored");
    }

    #[test]
    fn every_change_is_written_through() {
        let store = Store::in_memory().unwrap();
        let mut state = AppState::load(store.clone(), &YoutubeConfig::default());
        state.set_api_key("KEY");
        state.set_max_results(7);
        state.add_comment("Nice!").unwrap();
        state.add_account("Main").unwrap();

        assert_eq!(store.get("apiKey").unwrap().as_deref(), Some("\"KEY\""));
        assert_eq!(store.get("maxResults").unwrap().as_deref(), Some("7"));
        assert_eq!(store.get("comments").unwrap().as_deref(), Some("[\"Nice!\"]"));
        assert_eq!(store.get("accounts").unwrap().as_deref(), Some("[\"Main\"]"));
        assert_eq!(store.get("activeAccountIndex").unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn corrupt_entries_fall_back_to_defaults() {
        let store = Store::in_memory().unwrap();
        store.put("comments", "{oops").unwrap();
        store.put("videos", "42").unwrap();
        store.put("activeAccountIndex", "3").unwrap();
        let state = AppState::load(store, &YoutubeConfig::default());
        assert!(state.comments().is_empty());
        assert!(state.videos().is_empty());
        assert_eq!(state.active_account(), None);
    }

    #[test]
    fn max_results_text_is_clamped_or_rejected() {
        let mut state = fresh();
        assert_eq!(state.set_max_results_text(" 0 ").unwrap(), 1);
        assert_eq!(state.set_max_results_text("120").unwrap(), 50);
        assert!(state.set_max_results_text("ten").is_err());
        assert_eq!(state.settings().max_results, 50);
        assert!(state.error().is_some());
    }

    #[test]
    fn deleting_selected_comment_clears_selection() {
        let mut state = fresh();
        state.merge_comments(vec!["a".into(), "b".into(), "c".into()]);
        state.select_comment(1).unwrap();
        state.remove_comment(1).unwrap();
        assert_eq!(state.selected_comment(), None);
        assert_eq!(state.comments().as_slice(), ["a", "c"]);
    }

    #[test]
    fn deleting_earlier_comment_keeps_selection_on_same_text() {
        let mut state = fresh();
        state.merge_comments(vec!["a".into(), "b".into(), "c".into()]);
        state.select_comment(2).unwrap();
        state.remove_comment(0).unwrap();
        assert_eq!(state.selected_comment(), Some(1));
        assert_eq!(state.comments().get(1), Some("c"));
    }

    #[test]
    fn out_of_range_operations_report_errors_without_changes() {
        let mut state = fresh();
        state.add_comment("only").unwrap();
        let revision = state.revision();
        assert!(state.select_comment(3).is_err());
        assert!(state.remove_comment(3).is_err());
        assert_eq!(state.comments().len(), 1);
        assert!(state.error().unwrap().contains("#3"));
        assert!(state.revision() > revision);
    }

    #[test]
    fn failed_import_keeps_existing_comments() {
        let mut state = fresh();
        state.add_comment("keep me").unwrap();
        let err = state
            .finish_import(Err(AppError::Extraction("broken xref".into())))
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
        assert_eq!(state.comments().as_slice(), ["keep me"]);
        assert!(state.error().unwrap().contains("broken xref"));
    }

    #[test]
    fn fetch_without_credentials_makes_no_call() {
        let feed = MockVideoFeed::new();
        let mut state = fresh();
        state.set_api_key("KEY");
        let err = state.fetch_with(&feed).unwrap_err();
        assert!(matches!(err, AppError::MissingCredentials));
        assert_eq!(feed.calls(), 0);
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
        assert!(state.error().is_some());
    }

    #[test]
    fn successful_fetch_replaces_list_wholesale() {
        let feed = MockVideoFeed::new();
        feed.push(Ok(sample_videos("old", 5)));
        feed.push(Ok(sample_videos("new", 3)));
        let mut state = with_credentials();
        state.fetch_with(&feed).unwrap();
        assert_eq!(state.videos().len(), 5);
        state.fetch_with(&feed).unwrap();
        let ids: Vec<_> = state.videos().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["new0", "new1", "new2"]);
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
    }

    #[test]
    fn failed_fetch_keeps_previous_videos() {
        let feed = MockVideoFeed::new();
        feed.push(Ok(sample_videos("v", 2)));
        feed.push(Err(AppError::HttpStatus { status: 403 }));
        let mut state = with_credentials();
        state.fetch_with(&feed).unwrap();
        assert!(state.fetch_with(&feed).is_err());
        assert_eq!(state.videos().len(), 2);
        assert_eq!(state.fetch_status(), FetchStatus::Failed);
        assert_eq!(state.error(), Some("YouTube API error: 403"));
    }

    #[test]
    fn overlapping_fetches_last_settled_wins() {
        let mut state = with_credentials();
        state.begin_fetch().unwrap();
        state.begin_fetch().unwrap();
        state.finish_fetch(Ok(sample_videos("second", 1))).unwrap();
        assert_eq!(state.fetch_status(), FetchStatus::Pending);
        state.finish_fetch(Ok(sample_videos("first", 2))).unwrap();
        assert_eq!(state.fetch_status(), FetchStatus::Idle);
        assert_eq!(state.videos()[0].id, "first0");
    }

    #[test]
    fn copy_and_open_uses_selection_or_first() {
        let mut state = with_credentials();
        state.finish_fetch(Ok(sample_videos("v", 1))).unwrap();
        state.merge_comments(vec!["Nice!".into(), "Wow".into()]);
        let mut clipboard = RecordingClipboard::default();
        let mut launcher = RecordingLauncher::default();

        let url = state.copy_and_open(0, &mut clipboard, &mut launcher).unwrap();
        assert_eq!(url, "https://www.youtube.com/watch?v=v0#ych_comment=Nice%21");

        state.select_comment(1).unwrap();
        let url = state.copy_and_open(0, &mut clipboard, &mut launcher).unwrap();
        assert!(url.ends_with("#ych_comment=Wow"));
        assert_eq!(clipboard.copied, ["Nice!", "Wow"]);
    }

    #[test]
    fn copy_and_open_with_empty_bank_fails() {
        let mut state = fresh();
        state.finish_fetch(Ok(sample_videos("v", 1))).unwrap();
        let mut launcher = RecordingLauncher::default();
        let err = state
            .copy_and_open(0, &mut RecordingClipboard::default(), &mut launcher)
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyCommentBank));
        assert!(launcher.opened.is_empty());
    }

    #[test]
    fn removing_active_account_moves_activity() {
        let mut state = fresh();
        state.add_account("one").unwrap();
        state.add_account("two").unwrap();
        state.add_account("three").unwrap();
        state.set_active_account(2).unwrap();
        state.remove_account(2).unwrap();
        assert_eq!(state.active_account_label(), Some("two"));
        state.remove_account(0).unwrap();
        assert_eq!(state.active_account(), Some(0));
        state.remove_account(0).unwrap();
        assert_eq!(state.active_account(), None);
        assert!(state.add_account("  ").is_err());
    }

    #[test]
    fn failed_save_keeps_change_but_reports_no_success() {
        let mut state = fresh();
        state.set_api_key("OLD");
        assert_eq!(state.status(), "API key saved.");

        state.store.drop_table_for_tests("kv");
        state.set_api_key("NEW");
        assert_eq!(state.settings().api_key, "NEW");
        assert!(state.error().unwrap().contains("apiKey"));
        assert_ne!(state.status(), "API key saved.");

        state.clear_error();
        state.set_channel_id("UC9");
        assert!(state.error().unwrap().contains("channelId"));
        assert!(!state.status().starts_with("Channel ID set"));

        state.clear_error();
        state.add_comment("kept in memory").unwrap();
        assert_eq!(state.comments().as_slice(), ["kept in memory"]);
        assert!(state.error().unwrap().contains("comments"));
    }
}
