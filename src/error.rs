use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Enter both an API key and a channel ID before fetching videos.")]
    MissingCredentials,
    #[error("The comment bank is empty. Add or upload a comment first.")]
    EmptyCommentBank,
    #[error("Comment #{index} does not exist (the bank holds {len}).")]
    SelectionOutOfRange { index: usize, len: usize },
    #[error("Video #{index} is not in the current list.")]
    VideoNotFound { index: usize },
    #[error("Comment text cannot be empty.")]
    EmptyComment,
    #[error("That comment is already in the bank.")]
    DuplicateComment,
    #[error("Account label cannot be empty.")]
    EmptyAccountLabel,
    #[error("Account #{index} does not exist.")]
    AccountOutOfRange { index: usize },
    #[error("Max results must be a number between 1 and 50 (got {0:?}).")]
    InvalidMaxResults(String),
    #[error("Unsupported file type for {}; use .pdf, .txt or .csv.", .0.display())]
    UnsupportedFile(PathBuf),
    #[error("Could not read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not extract text from PDF: {0}")]
    Extraction(String),
    #[error("YouTube API error: {status}")]
    HttpStatus { status: u16 },
    #[error("Request to YouTube failed: {0}")]
    Transport(String),
    #[error("Failed to open browser for {url}: {reason}")]
    Launch { url: String, reason: String },
    #[error("Failed to save {key}: {reason}")]
    Persist { key: String, reason: String },
}

impl AppError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::MissingCredentials
                | AppError::EmptyCommentBank
                | AppError::SelectionOutOfRange { .. }
                | AppError::VideoNotFound { .. }
                | AppError::EmptyComment
                | AppError::DuplicateComment
                | AppError::EmptyAccountLabel
                | AppError::AccountOutOfRange { .. }
                | AppError::InvalidMaxResults(_)
                | AppError::UnsupportedFile(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_carries_code() {
        let err = AppError::HttpStatus { status: 403 };
        assert_eq!(err.to_string(), "YouTube API error: 403");
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_errors_are_flagged() {
        assert!(AppError::MissingCredentials.is_validation());
        assert!(AppError::SelectionOutOfRange { index: 3, len: 1 }.is_validation());
        assert!(!AppError::Extraction("bad xref".into()).is_validation());
    }
}
