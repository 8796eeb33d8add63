use std::{path::{Path, PathBuf}, sync::Arc};

use crate::{
	domain::{AnalysisReport, ClassificationResult, LiveResult},
	server::{get_server_temp_dir, ServerConfig},
	tools::{
		analyzer::{build_analyzer, SharedAnalyzer},
		capture::LiveCapture,
		correction::CorrectionScale,
		file_tools::{accepted_format, TempImageFile},
		health::{check_temp_dir, SelfCheckReport},
		image_tools::{annotate_face, decode, encode_jpeg, face_label},
		log::{log_error, log_info, log_warn, LogServiceType},
	},
	Error, Result,
};

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
	pub correction_scale: CorrectionScale,
	pub default_threshold: f64,
	pub temp_dir: PathBuf,
}

impl AnalysisSettings {
	pub fn from_config(config: &ServerConfig, local_path: &Path) -> Self {
		Self {
			correction_scale: config.correction_scale,
			default_threshold: config.default_threshold,
			temp_dir: get_server_temp_dir(local_path),
		}
	}
}

#[derive(Clone)]
pub struct ModelController {
	analyzer: Option<SharedAnalyzer>,
	pub capture: Arc<LiveCapture>,
	pub health: Arc<SelfCheckReport>,
	pub settings: Arc<AnalysisSettings>,
}


// Constructor
impl ModelController {
	/// Runs the startup self check and loads the analyzer it allows.
	pub async fn new(config: &ServerConfig, local_path: &Path) -> Self {
		let settings = AnalysisSettings::from_config(config, local_path);
		let mut dependencies = vec![check_temp_dir(&settings.temp_dir).await];
		let (analyzer, analyzer_dependencies) = build_analyzer(config, local_path).await;
		dependencies.extend(analyzer_dependencies);

		let temp_ok = dependencies[0].available;
		let analyzer = analyzer.filter(|_| temp_ok);
		let health = SelfCheckReport::new(analyzer.as_ref().map(|a| a.name()), dependencies);
		health.log();

		Self::with_analyzer(analyzer, settings, health, config.frame_sample_rate)
	}

	pub fn with_analyzer(analyzer: Option<SharedAnalyzer>, settings: AnalysisSettings, health: SelfCheckReport, frame_sample_rate: u64) -> Self {
		Self {
			analyzer,
			capture: Arc::new(LiveCapture::new(frame_sample_rate)),
			health: Arc::new(health),
			settings: Arc::new(settings),
		}
	}
}


impl ModelController {
	pub fn is_available(&self) -> bool {
		self.analyzer.is_some()
	}

	fn analyzer(&self) -> Result<&SharedAnalyzer> {
		self.analyzer.as_ref().ok_or(Error::AnalysisUnavailable)
	}

	/// Display threshold to use, `requested` must be within 0-100.
	pub fn threshold(&self, requested: Option<f64>) -> Result<f64> {
		match requested {
			Some(threshold) if (0.0..=100.0).contains(&threshold) => Ok(threshold),
			Some(threshold) => Err(Error::InvalidThreshold(threshold)),
			None => Ok(self.settings.default_threshold),
		}
	}

	/// Writes the upload to a temporary file, runs the analyzer on it and removes the file.
	pub async fn classify_upload(&self, bytes: &[u8]) -> Result<ClassificationResult> {
		let analyzer = self.analyzer()?;
		let format = accepted_format(bytes)?;
		let file = TempImageFile::write(&self.settings.temp_dir, format, bytes).await?;
		match analyzer.analyze(file.path()).await {
			Ok(result) => {
				log_info(LogServiceType::Analysis, format!("{} face at {:?}: {} ({:.1}%)", analyzer.name(), result.region, result.dominant, result.dominant_confidence()));
				Ok(result)
			},
			Err(err) => {
				log_error(LogServiceType::Analysis, format!("Analysis failed: {}", err));
				Err(err.into())
			},
		}
	}

	pub async fn analyze_upload(&self, bytes: &[u8], threshold: f64) -> Result<AnalysisReport> {
		let result = self.classify_upload(bytes).await?;
		let report = AnalysisReport::new(result, self.settings.correction_scale, threshold);
		if report.was_corrected {
			log_info(LogServiceType::Analysis, format!("Corrected {} to {}", report.original_dominant, report.corrected));
		}
		Ok(report)
	}

	/// Report plus the upload annotated with the headline label, as jpeg.
	pub async fn analyze_and_annotate(&self, bytes: Vec<u8>, threshold: f64) -> Result<(AnalysisReport, Vec<u8>)> {
		let report = self.analyze_upload(&bytes, threshold).await?;
		let label = face_label(report.displayed, report.displayed_confidence);
		let region = report.region;
		let annotated = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
			let image = decode(&bytes)?;
			Ok(encode_jpeg(&annotate_face(&image, region, &label))?)
		}).await??;
		Ok((report, annotated))
	}

	/// Counts a camera frame, analyses it when sampled, and returns it annotated with the latest result.
	///
	/// Analysis failures are logged and dropped, the previous result stays in place.
	pub async fn live_frame(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
		let format = accepted_format(&bytes)?;
		let (index, sampled) = self.capture.next_frame();
		if sampled {
			if let Some(analyzer) = &self.analyzer {
				let analysis = async {
					let file = TempImageFile::write(&self.settings.temp_dir, format, &bytes).await?;
					Ok::<_, Error>(analyzer.analyze(file.path()).await?)
				}.await;
				match analysis {
					Ok(result) => {
						if !self.capture.publish(LiveResult::new(index, result)).await {
							log_info(LogServiceType::Live, format!("Frame {} result arrived after a newer one, dropped", index));
						}
					},
					Err(err) => log_warn(LogServiceType::Live, format!("Frame {} analysis dropped: {}", index, err)),
				}
			}
		}

		let Some(latest) = self.capture.try_read().await else {
			return Ok(bytes);
		};
		let label = face_label(latest.result.dominant, latest.result.dominant_confidence());
		let region = latest.result.region;
		let annotated = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
			let image = decode(&bytes)?;
			Ok(encode_jpeg(&annotate_face(&image, region, &label))?)
		}).await??;
		Ok(annotated)
	}
}


#[cfg(test)]
pub mod tests {
	use image::{Rgb, RgbImage};

	use crate::{domain::Emotion, tools::{analyzer::fixed::FixedAnalyzer, health::DependencyStatus}};

	use super::*;

	pub fn test_settings() -> AnalysisSettings {
		AnalysisSettings {
			correction_scale: CorrectionScale::Raw,
			default_threshold: 10.0,
			temp_dir: std::env::temp_dir().join(format!("emotion-lens-mc-{}", nanoid::nanoid!())),
		}
	}

	pub fn controller(analyzer: Option<Arc<FixedAnalyzer>>) -> ModelController {
		let name = analyzer.as_ref().map(|_| "fixed");
		let health = SelfCheckReport::new(name, vec![DependencyStatus::ok("temp-dir", None)]);
		ModelController::with_analyzer(analyzer.map(|a| a as SharedAnalyzer), test_settings(), health, 30)
	}

	pub fn jpeg_bytes() -> Vec<u8> {
		encode_jpeg(&RgbImage::from_pixel(64, 48, Rgb([200, 180, 160]))).unwrap()
	}

	#[tokio::test]
	async fn upload_is_corrected_and_temp_file_removed() {
		let analyzer = Arc::new(FixedAnalyzer::fearful());
		let mc = controller(Some(analyzer.clone()));
		let report = mc.analyze_upload(&jpeg_bytes(), 10.0).await.unwrap();
		assert_eq!(report.corrected, Emotion::Happy);
		assert_eq!(report.corrected_confidence, 72.0);
		assert_eq!(analyzer.calls(), 1);
		let seen = analyzer.seen_paths();
		assert_eq!(seen[0].extension().unwrap(), "jpg");
		assert!(!seen[0].exists());
	}

	#[tokio::test]
	async fn failed_analysis_removes_temp_file() {
		let analyzer = Arc::new(FixedAnalyzer::new(None));
		let mc = controller(Some(analyzer.clone()));
		let err = mc.analyze_upload(&jpeg_bytes(), 10.0).await.unwrap_err();
		assert!(matches!(err, Error::Analyzer(crate::tools::analyzer::AnalyzerError::NoFaceDetected)));
		assert!(!analyzer.seen_paths()[0].exists());
	}

	#[tokio::test]
	async fn fallback_mode_refuses_analysis() {
		let mc = controller(None);
		assert!(!mc.is_available());
		assert!(matches!(mc.analyze_upload(&jpeg_bytes(), 10.0).await, Err(Error::AnalysisUnavailable)));
	}

	#[tokio::test]
	async fn rejects_unsupported_upload() {
		let analyzer = Arc::new(FixedAnalyzer::fearful());
		let mc = controller(Some(analyzer.clone()));
		assert!(matches!(mc.analyze_upload(b"GIF89a......", 10.0).await, Err(Error::UnsupportedImageFormat(_))));
		assert_eq!(analyzer.calls(), 0);
	}

	#[test]
	fn threshold_bounds() {
		let mc = controller(None);
		assert_eq!(mc.threshold(None).unwrap(), 10.0);
		assert_eq!(mc.threshold(Some(0.0)).unwrap(), 0.0);
		assert_eq!(mc.threshold(Some(100.0)).unwrap(), 100.0);
		assert!(matches!(mc.threshold(Some(100.5)), Err(Error::InvalidThreshold(_))));
		assert!(matches!(mc.threshold(Some(-1.0)), Err(Error::InvalidThreshold(_))));
	}

	#[tokio::test]
	async fn annotated_upload_is_jpeg() {
		let mc = controller(Some(Arc::new(FixedAnalyzer::fearful())));
		let (report, jpeg) = mc.analyze_and_annotate(jpeg_bytes(), 0.0).await.unwrap();
		assert_eq!(report.ranking.len(), 4);
		assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
	}

	#[tokio::test]
	async fn live_frames_are_sampled() {
		let analyzer = Arc::new(FixedAnalyzer::fearful());
		let mc = controller(Some(analyzer.clone()));
		for _ in 0..31 {
			mc.live_frame(jpeg_bytes()).await.unwrap();
		}
		assert_eq!(analyzer.calls(), 2);
		let latest = mc.capture.try_read().await.unwrap();
		assert_eq!(latest.frame, 30);
		assert_eq!(latest.result.dominant, Emotion::Fear);
	}

	#[tokio::test]
	async fn live_failure_is_dropped() {
		let analyzer = Arc::new(FixedAnalyzer::new(None));
		let mc = controller(Some(analyzer.clone()));
		let frame = jpeg_bytes();
		let returned = mc.live_frame(frame.clone()).await.unwrap();
		assert_eq!(returned, frame);
		assert!(mc.capture.try_read().await.is_none());
		assert_eq!(analyzer.calls(), 1);
	}
}
