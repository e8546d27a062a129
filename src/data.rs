use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::error::AppError;
use crate::youtube::{self, FetchRequest, VideoRecord};

pub trait VideoFeed: Send + Sync {
    fn latest_videos(&self, request: &FetchRequest) -> Result<Vec<VideoRecord>, AppError>;
}

pub struct YoutubeVideoFeed {
    client: Arc<youtube::Client>,
}

impl YoutubeVideoFeed {
    pub fn new(client: Arc<youtube::Client>) -> Self {
        Self { client }
    }
}

impl VideoFeed for YoutubeVideoFeed {
    fn latest_videos(&self, request: &FetchRequest) -> Result<Vec<VideoRecord>, AppError> {
        self.client.latest_videos(request)
    }
}

#[derive(Default)]
pub struct MockVideoFeed {
    responses: Mutex<Vec<Result<Vec<VideoRecord>, AppError>>>,
    calls: AtomicUsize,
}

impl MockVideoFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<Vec<VideoRecord>, AppError>) {
        self.responses.lock().push(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VideoFeed for MockVideoFeed {
    fn latest_videos(&self, request: &FetchRequest) -> Result<Vec<VideoRecord>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            log::debug!("mock feed: no canned response for {}", request.channel_id);
            return Ok(Vec::new());
        }
        responses.remove(0)
    }
}

pub fn sample_videos(prefix: &str, count: usize) -> Vec<VideoRecord> {
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    (0..count)
        .map(|idx| VideoRecord {
            id: format!("{prefix}{idx}"),
            title: format!("Sample video {} ({prefix})", idx + 1),
            published_at: base - Duration::hours(idx as i64),
            thumbnail_url: None,
        })
        .collect()
}
