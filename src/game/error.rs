use thiserror::Error;
use warp::http::StatusCode;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("No candidate words found")]
    NoCandidates,
    #[error("Could not find a valid target word in database after {attempts} attempts")]
    NoValidTarget { attempts: usize },
    #[error("Target embedding for \"{0}\" not found")]
    TargetEmbeddingMissing(String),
    #[error("Daily target word not found")]
    NoDailyTarget,
    #[error("Missing \"guess\" in request body")]
    EmptyGuess,
    #[error("Embedding for \"{0}\" not found")]
    UnknownWord(String),
    #[error("vector for \"{word}\" has dimension {found}, store holds dimension {expected}")]
    DimensionMismatch {
        word: String,
        expected: usize,
        found: usize,
    },
    #[error("vector for \"{0}\" has zero magnitude")]
    DegenerateVector(String),
    #[error("corrupted record at {0}")]
    Corrupted(String),
    #[error("storage: {0}")]
    Storage(#[from] opendal::Error),
    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::EmptyGuess => StatusCode::BAD_REQUEST,
            GameError::UnknownWord(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client. Infrastructure failures stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            GameError::Corrupted(_)
            | GameError::Storage(_)
            | GameError::Codec(_)
            | GameError::Io(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_class() {
        assert_eq!(GameError::EmptyGuess.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GameError::UnknownWord("pineapple".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GameError::NoDailyTarget.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GameError::NoValidTarget { attempts: 1000 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn infrastructure_detail_is_not_public() {
        let io = GameError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/secret/path",
        ));
        assert_eq!(io.public_message(), "Internal server error");
        assert_eq!(
            GameError::UnknownWord("pineapple".to_string()).public_message(),
            "Embedding for \"pineapple\" not found"
        );
    }
}
