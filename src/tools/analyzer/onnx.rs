use std::{path::{Path, PathBuf}, sync::Arc};

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{inputs, GraphOptimizationLevel, Session, SessionOutputs, ValueType};

use crate::{domain::{ClassificationResult, Emotion, EmotionScores, FaceRegion}, tools::health::DependencyStatus};

use super::{AnalyzerError, AnalyzerResult, EmotionAnalyzer};

/// Output order of the FER+ classifier. `None` marks contempt, which is not reported.
const FERPLUS_LABELS: [Option<Emotion>; 8] = [
    Some(Emotion::Neutral),
    Some(Emotion::Happy),
    Some(Emotion::Surprise),
    Some(Emotion::Sad),
    Some(Emotion::Angry),
    Some(Emotion::Disgust),
    Some(Emotion::Fear),
    None,
];

const DEFAULT_DETECTOR_SIZE: (u32, u32) = (320, 240);
const DEFAULT_CLASSIFIER_SIZE: u32 = 64;

#[derive(Debug, Clone)]
pub struct OnnxSettings {
    pub intra_threads: usize,
    pub detection_threshold: f32,
    pub enforce_detection: bool,
}

pub fn preload_model(path: &Path, intra_threads: usize) -> AnalyzerResult<Session> {
    if !path.exists() {
        return Err(AnalyzerError::ModelNotFound(path.to_path_buf()));
    }
    Ok(Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)?)
}

pub fn model_file_statuses(detector: &Path, classifier: &Path) -> Vec<DependencyStatus> {
    [("face-detector-model", detector), ("emotion-model", classifier)].into_iter().map(|(name, path)| {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => DependencyStatus::ok(name, Some(format!("{} ({} bytes)", path.display(), meta.len()))),
            Ok(_) => DependencyStatus::failed(name, format!("{} is not a file", path.display())),
            Err(err) => DependencyStatus::failed(name, format!("{}: {}", path.display(), err)),
        }
    }).collect()
}

/// UltraFace style face detector followed by a FER+ style emotion classifier.
pub struct OnnxEmotionAnalyzer {
    pipeline: Arc<OnnxPipeline>,
    detector_path: PathBuf,
    classifier_path: PathBuf,
}

struct OnnxPipeline {
    detector: Session,
    classifier: Session,
    settings: OnnxSettings,
}

impl OnnxEmotionAnalyzer {
    pub fn load(detector_path: &Path, classifier_path: &Path, settings: OnnxSettings) -> AnalyzerResult<Self> {
        let detector = preload_model(detector_path, settings.intra_threads)?;
        let classifier = preload_model(classifier_path, settings.intra_threads)?;
        if detector.inputs.is_empty() || detector.outputs.len() < 2 {
            return Err(AnalyzerError::InvalidModel(format!("{} is not a face detector (needs scores and boxes outputs)", detector_path.display())));
        }
        if classifier.inputs.is_empty() || classifier.outputs.is_empty() {
            return Err(AnalyzerError::InvalidModel(format!("{} has no inputs or outputs", classifier_path.display())));
        }
        Ok(Self {
            pipeline: Arc::new(OnnxPipeline { detector, classifier, settings }),
            detector_path: detector_path.to_path_buf(),
            classifier_path: classifier_path.to_path_buf(),
        })
    }
}

#[async_trait]
impl EmotionAnalyzer for OnnxEmotionAnalyzer {
    fn name(&self) -> &'static str {
        "onnx"
    }

    async fn analyze(&self, path: &Path) -> AnalyzerResult<ClassificationResult> {
        let pipeline = self.pipeline.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let image = image::open(&path)?;
            pipeline.classify(&image)
        }).await?
    }

    async fn check(&self) -> Vec<DependencyStatus> {
        let mut statuses = model_file_statuses(&self.detector_path, &self.classifier_path);
        statuses.push(DependencyStatus::ok("onnxruntime", None));
        statuses
    }
}

impl OnnxPipeline {
    fn classify(&self, image: &DynamicImage) -> AnalyzerResult<ClassificationResult> {
        let (width, height) = image.dimensions();
        let region = match self.detect_face(image)? {
            Some(region) => region,
            None if self.settings.enforce_detection => return Err(AnalyzerError::NoFaceDetected),
            None => FaceRegion::whole(width, height),
        };
        let emotions = self.classify_face(image, region)?;
        ClassificationResult::from_scores(emotions, region).ok_or(AnalyzerError::NoModelOutput("emotion scores".to_string()))
    }

    fn detect_face(&self, image: &DynamicImage) -> AnalyzerResult<Option<FaceRegion>> {
        let input_info = &self.detector.inputs[0];
        let (input_width, input_height) = match &input_info.input_type {
            ValueType::Tensor { ty: _, dimensions } => match (dimensions.get(3), dimensions.get(2)) {
                (Some(w), Some(h)) if *w > 0 && *h > 0 => (*w as u32, *h as u32),
                _ => DEFAULT_DETECTOR_SIZE,
            },
            _ => DEFAULT_DETECTOR_SIZE,
        };

        let resized = image.resize_exact(input_width, input_height, FilterType::Triangle).to_rgb8();
        let mut input = Array4::<f32>::zeros((1, 3, input_height as usize, input_width as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = (pixel[channel] as f32 - 127.0) / 128.0;
            }
        }

        let scores_name = output_name(&self.detector, "scores", 0);
        let boxes_name = output_name(&self.detector, "boxes", 1);
        let outputs: SessionOutputs = self.detector.run(inputs![input_info.name.to_string() => input.view()]?)?;
        let scores: Vec<f32> = outputs[scores_name.as_str()].try_extract_tensor::<f32>()?.iter().copied().collect();
        let boxes: Vec<f32> = outputs[boxes_name.as_str()].try_extract_tensor::<f32>()?.iter().copied().collect();

        let (width, height) = image.dimensions();
        Ok(best_face(&scores, &boxes, self.settings.detection_threshold, width, height))
    }

    fn classify_face(&self, image: &DynamicImage, region: FaceRegion) -> AnalyzerResult<EmotionScores> {
        let input_info = &self.classifier.inputs[0];
        let size = match &input_info.input_type {
            ValueType::Tensor { ty: _, dimensions } => dimensions.get(2).filter(|d| **d > 0).map(|d| *d as u32),
            _ => None,
        }.unwrap_or(DEFAULT_CLASSIFIER_SIZE);

        let face = image
            .crop_imm(region.x, region.y, region.w, region.h)
            .resize_exact(size, size, FilterType::Triangle)
            .to_luma8();
        let data: Vec<f32> = face.into_raw().into_iter().map(|v| v as f32).collect();
        let input = Array4::from_shape_vec((1_usize, 1_usize, size as usize, size as usize), data)?;

        let output_name = self.classifier.outputs[0].name.clone();
        let outputs: SessionOutputs = self.classifier.run(inputs![input_info.name.to_string() => input.view()]?)?;
        let logits: Vec<f32> = outputs[output_name.as_str()].try_extract_tensor::<f32>()?.iter().copied().collect();
        scores_from_ferplus(&logits)
    }
}

fn output_name(session: &Session, preferred: &str, fallback: usize) -> String {
    session.outputs.iter()
        .find(|o| o.name == preferred)
        .or_else(|| session.outputs.get(fallback))
        .map(|o| o.name.clone())
        .unwrap_or_else(|| preferred.to_string())
}

/// Highest scoring box above `threshold`, in pixels of a `width` x `height` image.
///
/// `scores` holds `[background, face]` pairs and `boxes` normalised `[x1, y1, x2, y2]` corners.
pub fn best_face(scores: &[f32], boxes: &[f32], threshold: f32, width: u32, height: u32) -> Option<FaceRegion> {
    let count = (scores.len() / 2).min(boxes.len() / 4);
    let (index, _) = (0..count)
        .map(|i| (i, scores[i * 2 + 1]))
        .filter(|(_, score)| *score > threshold)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let corner = |value: f32, size: u32| (value.clamp(0.0, 1.0) * size as f32).round() as u32;
    let x1 = corner(boxes[index * 4], width);
    let y1 = corner(boxes[index * 4 + 1], height);
    let x2 = corner(boxes[index * 4 + 2], width);
    let y2 = corner(boxes[index * 4 + 3], height);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    FaceRegion { x: x1, y: y1, w: x2 - x1, h: y2 - y1 }.clamp(width, height)
}

/// Softmax over the classifier logits, contempt dropped, rescaled to percentages.
pub fn scores_from_ferplus(logits: &[f32]) -> AnalyzerResult<EmotionScores> {
    if logits.len() < FERPLUS_LABELS.len() {
        return Err(AnalyzerError::NoModelOutput(format!("expected {} emotion logits, got {}", FERPLUS_LABELS.len(), logits.len())));
    }
    let logits = &logits[..FERPLUS_LABELS.len()];
    let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f64> = logits.iter().map(|&x| ((x - max_logit) as f64).exp()).collect();
    let kept: f64 = exp.iter().zip(FERPLUS_LABELS.iter()).filter(|(_, label)| label.is_some()).map(|(e, _)| *e).sum();
    if kept <= 0.0 {
        return Err(AnalyzerError::NoModelOutput("emotion logits are degenerate".to_string()));
    }
    Ok(exp.iter().zip(FERPLUS_LABELS.iter())
        .filter_map(|(e, label)| label.map(|label| (label, e / kept * 100.0)))
        .collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_face_above_threshold() {
        let scores = [0.9, 0.1, 0.2, 0.8, 0.05, 0.95];
        let boxes = [
            0.0, 0.0, 0.5, 0.5,
            0.1, 0.1, 0.3, 0.3,
            0.25, 0.5, 0.75, 1.0,
        ];
        let face = best_face(&scores, &boxes, 0.7, 200, 100).unwrap();
        assert_eq!(face, FaceRegion { x: 50, y: 50, w: 100, h: 50 });
    }

    #[test]
    fn no_face_below_threshold() {
        let scores = [0.9, 0.1, 0.4, 0.6];
        let boxes = [0.0, 0.0, 0.5, 0.5, 0.1, 0.1, 0.3, 0.3];
        assert_eq!(best_face(&scores, &boxes, 0.7, 200, 100), None);
    }

    #[test]
    fn boxes_are_clamped_to_image() {
        let scores = [0.0, 1.0];
        let boxes = [-0.2, 0.5, 1.3, 1.1];
        let face = best_face(&scores, &boxes, 0.5, 100, 100).unwrap();
        assert_eq!(face, FaceRegion { x: 0, y: 50, w: 100, h: 50 });
    }

    #[test]
    fn ferplus_logits_become_percentages() {
        // happiness dominant, contempt ignored
        let logits = [1.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0];
        let scores = scores_from_ferplus(&logits).unwrap();
        assert_eq!(scores.iter().count(), 7);
        assert!((scores.iter().map(|(_, c)| c).sum::<f64>() - 100.0).abs() < 1e-9);
        assert_eq!(scores.dominant().unwrap().0, Emotion::Happy);
        assert!(scores.get(Emotion::Neutral) > scores.get(Emotion::Fear));
    }

    #[test]
    fn ferplus_rejects_short_output() {
        assert!(matches!(scores_from_ferplus(&[0.0; 4]), Err(AnalyzerError::NoModelOutput(_))));
    }

    #[test]
    fn missing_model_is_reported() {
        let missing = std::env::temp_dir().join("emotion-lens-missing-model.onnx");
        assert!(matches!(preload_model(&missing, 1), Err(AnalyzerError::ModelNotFound(_))));
        let statuses = model_file_statuses(&missing, &missing);
        assert!(statuses.iter().all(|s| !s.available));
    }
}
