use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imagegen_proto::protocol::ApiError;
use thiserror::Error;

/// Failures of the image file operations.  Generation failures are not
/// errors at this level: they travel inside `GenerationResult`.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("image path is empty")]
    EmptyPath,

    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("desktop directory does not exist: {0}")]
    DesktopMissing(PathBuf),

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl DaemonError {
    fn status(&self) -> StatusCode {
        match self {
            DaemonError::EmptyPath => StatusCode::BAD_REQUEST,
            DaemonError::ReadImage { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                StatusCode::NOT_FOUND
            }
            DaemonError::ReadImage { .. } | DaemonError::Copy { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DaemonError::DesktopMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiError {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_image_is_not_found() {
        let err = DaemonError::ReadImage {
            path: PathBuf::from("/nope.png"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("/nope.png"));
    }

    #[test]
    fn test_missing_desktop_status() {
        let resp = DaemonError::DesktopMissing(PathBuf::from("/home/x/Desktop")).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
