use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::comments::CommentBank;
use crate::error::AppError;
use crate::youtube::{VideoRecord, WATCH_URL};

// The companion extension reads this fragment key; key and encoding are fixed.
pub const FRAGMENT_KEY: &str = "ych_comment";

// RFC 3986 unreserved characters stay literal.
const FRAGMENT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
}

pub trait Launcher {
    fn open(&mut self, url: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { inner: None }
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        if self.inner.is_none() {
            let created = arboard::Clipboard::new()
                .map_err(|err| anyhow::anyhow!("create clipboard context: {}", err))?;
            self.inner = Some(created);
        }
        let Some(clipboard) = self.inner.as_mut() else {
            anyhow::bail!("clipboard unavailable");
        };
        clipboard
            .set_text(text.to_string())
            .map_err(|err| anyhow::anyhow!("copy comment: {}", err))
    }
}

#[derive(Default)]
pub struct SystemBrowser;

impl Launcher for SystemBrowser {
    fn open(&mut self, url: &str) -> anyhow::Result<()> {
        webbrowser::open(url)?;
        Ok(())
    }
}

pub fn watch_url_with_comment(video_id: &str, comment: &str) -> String {
    format!(
        "{}?v={}#{}={}",
        WATCH_URL,
        video_id,
        FRAGMENT_KEY,
        utf8_percent_encode(comment, FRAGMENT_VALUE)
    )
}

pub fn resolve_comment(bank: &CommentBank, selected: Option<usize>) -> Result<&str, AppError> {
    if bank.is_empty() {
        return Err(AppError::EmptyCommentBank);
    }
    let index = selected.unwrap_or(0);
    bank.get(index).ok_or(AppError::SelectionOutOfRange {
        index,
        len: bank.len(),
    })
}

pub fn copy_and_open(
    bank: &CommentBank,
    selected: Option<usize>,
    video: &VideoRecord,
    clipboard: &mut dyn Clipboard,
    launcher: &mut dyn Launcher,
) -> Result<String, AppError> {
    let comment = resolve_comment(bank, selected)?;

    if let Err(err) = clipboard.set_text(comment) {
        log::warn!("clipboard write failed: {err:#}");
    }

    let url = watch_url_with_comment(&video.id, comment);
    launcher.open(&url).map_err(|err| AppError::Launch {
        url: url.clone(),
        reason: format!("{err:#}"),
    })?;
    log::info!("opened video {} with comment attached", video.id);
    Ok(url)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Default)]
    pub struct RecordingClipboard {
        pub copied: Vec<String>,
        pub fail: bool,
    }

    impl Clipboard for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("no display");
            }
            self.copied.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingLauncher {
        pub opened: Vec<String>,
        pub fail: bool,
    }

    impl Launcher for RecordingLauncher {
        fn open(&mut self, url: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("no browser");
            }
            self.opened.push(url.to_string());
            Ok(())
        }
    }
}
