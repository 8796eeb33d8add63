use std::{path::{Path, PathBuf}, sync::{atomic::{AtomicUsize, Ordering}, Mutex}};

use async_trait::async_trait;

use crate::{domain::{ClassificationResult, Emotion, EmotionScores, FaceRegion}, tools::health::DependencyStatus};

use super::{AnalyzerError, AnalyzerResult, EmotionAnalyzer};

/// Answers every call with the same result, or with no face when `result` is None.
pub struct FixedAnalyzer {
    result: Option<ClassificationResult>,
    calls: AtomicUsize,
    seen: Mutex<Vec<PathBuf>>,
}

impl FixedAnalyzer {
    pub fn new(result: Option<ClassificationResult>) -> Self {
        Self { result, calls: AtomicUsize::new(0), seen: Mutex::new(vec![]) }
    }

    /// Fear at 90 with a little happiness, on a 20x20 face at (4, 6).
    pub fn fearful() -> Self {
        let emotions = EmotionScores::new()
            .with(Emotion::Fear, 90.0)
            .with(Emotion::Happy, 5.0)
            .with(Emotion::Sad, 3.0)
            .with(Emotion::Neutral, 2.0);
        Self::new(ClassificationResult::from_scores(emotions, FaceRegion { x: 4, y: 6, w: 20, h: 20 }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmotionAnalyzer for FixedAnalyzer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn analyze(&self, path: &Path) -> AnalyzerResult<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(path.to_path_buf());
        }
        if !path.exists() {
            return Err(AnalyzerError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "image not written")));
        }
        self.result.clone().ok_or(AnalyzerError::NoFaceDetected)
    }

    async fn check(&self) -> Vec<DependencyStatus> {
        vec![DependencyStatus::ok("fixed-analyzer", None)]
    }
}
