use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

pub const SEARCH_API_URL: &str = "https://www.googleapis.com/youtube/v3/search";
pub const WATCH_URL: &str = "https://www.youtube.com/watch";
pub const MAX_RESULTS_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub api_key: String,
    pub channel_id: String,
    pub max_results: u32,
}

impl FetchRequest {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("channelId", self.channel_id.clone()),
            ("part", "snippet".to_string()),
            ("order", "date".to_string()),
            (
                "maxResults",
                self.max_results.clamp(1, MAX_RESULTS_LIMIT).to_string(),
            ),
            ("type", "video".to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("youtube client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        let base_url = config
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| SEARCH_API_URL.to_string());
        let parsed = Url::parse(base_url.trim())
            .with_context(|| format!("youtube: invalid base url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("youtube: base url must be http or https, got {}", parsed.scheme());
        }

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url: parsed.to_string(),
        })
    }

    pub fn latest_videos(&self, request: &FetchRequest) -> Result<Vec<VideoRecord>, AppError> {
        log::debug!(
            "youtube: searching channel {} (max {})",
            request.channel_id,
            request.max_results
        );
        let response = self
            .http
            .get(&self.base_url)
            .header(USER_AGENT, &self.user_agent)
            .query(&request.query())
            .send()
            .map_err(|err| AppError::Transport(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("youtube: search returned {status}");
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response
            .json()
            .map_err(|err| AppError::Transport(err.without_url().to_string()))?;
        let videos = body.into_videos();
        log::info!("youtube: received {} videos", videos.len());
        Ok(videos)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

impl SearchResponse {
    pub fn into_videos(self) -> Vec<VideoRecord> {
        self.items
            .into_iter()
            .filter_map(SearchItem::into_video)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub id: ItemId,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub default: Option<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

impl SearchItem {
    pub fn into_video(self) -> Option<VideoRecord> {
        let id = self.id.video_id.filter(|id| !id.trim().is_empty())?;
        let Some(snippet) = self.snippet else {
            log::debug!("youtube: item {id} has no snippet, skipped");
            return None;
        };
        let parsed = snippet
            .published_at
            .as_deref()
            .map(DateTime::parse_from_rfc3339);
        let published_at = match parsed {
            Some(Ok(at)) => at.with_timezone(&Utc),
            _ => {
                log::debug!("youtube: item {id} has no usable publishedAt, skipped");
                return None;
            }
        };
        let Thumbnails { medium, default } = snippet.thumbnails;
        Some(VideoRecord {
            id,
            title: snippet.title,
            published_at,
            thumbnail_url: medium
                .or(default)
                .map(|thumb| thumb.url)
                .filter(|url| !url.is_empty()),
        })
    }
}
