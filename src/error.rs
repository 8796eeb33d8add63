use std::sync::Arc;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use derive_more::From;
use serde_json::json;
use serde_with::{serde_as, DisplayFromStr};
use nanoid::nanoid;

use crate::tools::{analyzer::AnalyzerError, image_tools::ImageError, log::{log_error, LogServiceType}};

pub type Result<T> = core::result::Result<T, Error>;

#[serde_as]
#[derive(Debug, Serialize, From, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
	// -- Request errors.
	MissingImage,
	InvalidThreshold(f64),
	MalformedThreshold(String),
	UnsupportedImageFormat(String),

	// -- Analysis errors.
	AnalysisUnavailable,

	// -- Servers errors.
	ServerMalformatedConfigFile,
	ServerUnableToAccessServerLocalFolder,
	ServerUnableToWriteConfig,

	// -- Externals

	#[from]
	Analyzer(#[serde_as(as = "DisplayFromStr")] AnalyzerError),

	#[from]
	Image(#[serde_as(as = "DisplayFromStr")] ImageError),

	#[from]
	Io(#[serde_as(as = "DisplayFromStr")] std::io::Error),

	#[from]
	Serde(#[serde_as(as = "DisplayFromStr")] serde_json::Error),

	#[from]
	Multipart(#[serde_as(as = "DisplayFromStr")] axum::extract::multipart::MultipartError),

	#[from]
	Join(#[serde_as(as = "DisplayFromStr")] tokio::task::JoinError),
}

// region:    --- Error Boilerplate
impl core::fmt::Display for Error {
	fn fmt(
		&self,
		fmt: &mut core::fmt::Formatter,
	) -> core::result::Result<(), core::fmt::Error> {
		write!(fmt, "{self:?}")
	}
}

impl std::error::Error for Error {}
// endregion: --- Error Boilerplate

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let nanoid = nanoid!();
		log_error(LogServiceType::Other, format!("{} - {:?}", nanoid, self));
		let (status_code, client_error) = self.client_status_and_error();

		let error_json = json!({
						"error": {
							"type": client_error.as_ref(),
							"req_uuid": nanoid.to_string(),
						}
					});

		let mut error_response = (status_code, Json(error_json)).into_response();

		error_response.extensions_mut().insert(Arc::new(self));

		error_response
	}
}

impl Error {
	pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
		#[allow(unreachable_patterns)]
		match self {
			Self::MissingImage
			| Self::InvalidThreshold(_)
			| Self::MalformedThreshold(_)
			| Self::Multipart(_) => (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS),
			Self::UnsupportedImageFormat(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, ClientError::UNSUPPORTED_IMAGE),
			Self::Image(err) => err.client_status_and_error(),

			Self::AnalysisUnavailable => (StatusCode::SERVICE_UNAVAILABLE, ClientError::ANALYSIS_UNAVAILABLE),
			Self::Analyzer(err) => err.client_status_and_error(),

			// -- Fallback.
			_ => (
				StatusCode::INTERNAL_SERVER_ERROR,
				ClientError::SERVICE_ERROR,
			),
		}
	}

	/// Sentence shown on the html pages.
	pub fn user_message(&self) -> String {
		match self {
			Self::MissingImage => "No image was uploaded. Choose a photo and try again.".to_string(),
			Self::InvalidThreshold(threshold) => format!("The display threshold must be between 0 and 100 (got {}).", threshold),
			Self::MalformedThreshold(value) => format!("The display threshold must be a number (got \"{}\").", value),
			Self::UnsupportedImageFormat(format) => format!("Unsupported image format ({}). Use JPG, PNG, BMP or TIFF.", format),
			Self::Image(_) => "The uploaded file could not be read as an image.".to_string(),
			Self::AnalysisUnavailable => "Emotion analysis is unavailable on this server.".to_string(),
			Self::Analyzer(AnalyzerError::NoFaceDetected) => "No face was detected in the photo. Try another picture.".to_string(),
			Self::Analyzer(_) => "The emotion analysis failed. Try again with another picture.".to_string(),
			_ => "Something went wrong while processing the photo.".to_string(),
		}
	}
}


#[derive(Debug, strum_macros::AsRefStr)]
#[allow(non_camel_case_types)]
pub enum ClientError {
	INVALID_PARAMS,
	UNSUPPORTED_IMAGE,
	NO_FACE_DETECTED,
	ANALYSIS_UNAVAILABLE,
	ANALYSIS_FAILED,
	SERVICE_ERROR,
}
