use std::{path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use axum::http::StatusCode;
use derive_more::From;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use strum_macros::{Display, EnumString};

use crate::{domain::ClassificationResult, error::ClientError, server::ServerConfig, tools::{health::DependencyStatus, log::{log_error, log_info, LogServiceType}}};

pub mod onnx;
pub mod remote;
#[cfg(test)]
pub mod fixed;

pub type AnalyzerResult<T> = core::result::Result<T, AnalyzerError>;

#[serde_as]
#[derive(Debug, Serialize, strum_macros::AsRefStr, From)]
pub enum AnalyzerError {
    NoFaceDetected,
    ModelNotFound(PathBuf),
    InvalidModel(String),
    NoModelOutput(String),

    RemoteNotConfigured,
    RemoteStatus(u16),
    InvalidResponse(String),

    #[from]
    Io(#[serde_as(as = "DisplayFromStr")] std::io::Error),

    #[from]
    Ort(#[serde_as(as = "DisplayFromStr")] ort::Error),

    #[from]
    Image(#[serde_as(as = "DisplayFromStr")] image::ImageError),

    #[from]
    Shape(#[serde_as(as = "DisplayFromStr")] ndarray::ShapeError),

    #[from]
    Reqwest(#[serde_as(as = "DisplayFromStr")] reqwest::Error),

    #[from]
    Join(#[serde_as(as = "DisplayFromStr")] tokio::task::JoinError),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for AnalyzerError {
	fn fmt(
		&self,
		fmt: &mut core::fmt::Formatter,
	) -> core::result::Result<(), core::fmt::Error> {
		write!(fmt, "{self:?}")
	}
}

impl std::error::Error for AnalyzerError {}

// endregion: --- Error Boilerplate

impl AnalyzerError {
    pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
        match self {
            AnalyzerError::NoFaceDetected => (StatusCode::UNPROCESSABLE_ENTITY, ClientError::NO_FACE_DETECTED),
            AnalyzerError::Image(_) => (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS),
            AnalyzerError::ModelNotFound(_) | AnalyzerError::InvalidModel(_) | AnalyzerError::RemoteNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, ClientError::ANALYSIS_UNAVAILABLE),
            AnalyzerError::RemoteStatus(_) | AnalyzerError::InvalidResponse(_) | AnalyzerError::Reqwest(_) => (StatusCode::BAD_GATEWAY, ClientError::ANALYSIS_FAILED),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ClientError::ANALYSIS_FAILED),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnalyzerKind {
    #[default]
    Onnx,
    Remote,
}

/// Face detection plus emotion classification of one image file.
#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classifies the first face found in the image at `path`.
    async fn analyze(&self, path: &Path) -> AnalyzerResult<ClassificationResult>;

    /// Dependencies this backend relies on, for the startup report.
    async fn check(&self) -> Vec<DependencyStatus>;
}

pub type SharedAnalyzer = Arc<dyn EmotionAnalyzer>;

/// Builds the configured backend. When it cannot be built the failure is returned as
/// dependency statuses so the server can start in fallback mode.
pub async fn build_analyzer(config: &ServerConfig, local_path: &Path) -> (Option<SharedAnalyzer>, Vec<DependencyStatus>) {
    log_info(LogServiceType::Register, format!("Loading {} emotion analyzer", config.analyzer));
    let detector = config.detector_model_path(local_path);
    let classifier = config.emotion_model_path(local_path);
    let built: AnalyzerResult<SharedAnalyzer> = match config.analyzer {
        AnalyzerKind::Onnx => onnx::OnnxEmotionAnalyzer::load(&detector, &classifier, config.onnx_settings())
            .map(|analyzer| Arc::new(analyzer) as SharedAnalyzer),
        AnalyzerKind::Remote => match &config.remote_url {
            Some(url) => remote::RemoteEmotionAnalyzer::new(url, config.remote_timeout_secs)
                .map(|analyzer| Arc::new(analyzer) as SharedAnalyzer),
            None => Err(AnalyzerError::RemoteNotConfigured),
        },
    };

    match built {
        Ok(analyzer) => {
            let statuses = analyzer.check().await;
            if statuses.iter().all(|s| s.available) {
                (Some(analyzer), statuses)
            } else {
                (None, statuses)
            }
        },
        Err(err) => {
            log_error(LogServiceType::Register, format!("Unable to load {} analyzer: {}", config.analyzer, err));
            let mut statuses = match config.analyzer {
                AnalyzerKind::Onnx => onnx::model_file_statuses(&detector, &classifier),
                AnalyzerKind::Remote => vec![],
            };
            statuses.push(DependencyStatus::failed(&format!("{}-analyzer", config.analyzer), err.to_string()));
            (None, statuses)
        },
    }
}
