use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::model::process::ErrorResponse;
use std::path::PathBuf;
use strum::IntoStaticStr;

/// Every way a tiling or merge job, or the request that starts it, can fail.
///
/// The variant name doubles as the machine readable error kind reported to
/// clients, so `LockContention` can be told apart from a failing tool.
#[derive(Debug, thiserror::Error, IntoStaticStr)]
pub enum ProcessingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid value for <{param}>: {reason}")]
    InvalidValue { param: String, reason: String },

    #[error("mapset <{mapset}> of project <{project}> is locked by another process")]
    LockContention { project: String, mapset: String },

    #[error("mapset <{mapset}> does not exist in project <{project}>")]
    MissingWorkspace { project: String, mapset: String },

    #[error("module {module} of step <{id}> failed with return code {return_code}: {stderr}")]
    ToolFailed {
        id: String,
        module: String,
        return_code: i32,
        stderr: String,
    },

    #[error("unexpected output of module {module}: {reason}")]
    MalformedOutput { module: String, reason: String },

    #[error("no output was captured for step <{0}>")]
    MissingModuleOutput(String),

    /// The job was stopped from outside, e.g. because it exceeded its timeout.
    #[error("job cancelled before {0}")]
    Cancelled(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = ProcessingError> = std::result::Result<T, E>;

impl ProcessingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_value(param: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            param: param.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<&ProcessingError> for ErrorResponse {
    fn from(error: &ProcessingError) -> Self {
        Self {
            error: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl ResponseError for ProcessingError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(self))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::LockContention { .. } => StatusCode::CONFLICT,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_has_its_own_kind_and_status() {
        let error = ProcessingError::LockContention {
            project: "nc_spm_08".into(),
            mapset: "target".into(),
        };
        assert_eq!(error.kind(), "LockContention");
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let failed = ProcessingError::ToolFailed {
            id: "patch".into(),
            module: "r.patch".into(),
            return_code: 1,
            stderr: "ERROR".into(),
        };
        assert_eq!(failed.kind(), "ToolFailed");
        assert_eq!(failed.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_response_body() {
        let error = ProcessingError::InvalidRequest("empty mapsetlist".into());
        let body = ErrorResponse::from(&error);
        assert_eq!(body.error, "InvalidRequest");
        assert_eq!(body.message, "invalid request: empty mapsetlist");
    }
}
