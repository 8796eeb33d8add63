use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tools::correction::{boost_corrected, correct_emotion_smart, rank_for_display, CorrectionScale};

use super::emotion::{Emotion, EmotionScores};

/// Face bounding box in image pixels.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl FaceRegion {
    pub fn whole(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, w: width, h: height }
    }

    /// Region shrunk so it fits inside a `width` x `height` image. None if nothing is left.
    pub fn clamp(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.w.min(width - self.x);
        let h = self.h.min(height - self.y);
        if w == 0 || h == 0 {
            None
        } else {
            Some(Self { x: self.x, y: self.y, w, h })
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub dominant: Emotion,
    pub emotions: EmotionScores,
    pub region: FaceRegion,
}

impl ClassificationResult {
    /// Builds a result whose dominant label is the argmax of `emotions`.
    /// None when no label was scored.
    pub fn from_scores(emotions: EmotionScores, region: FaceRegion) -> Option<Self> {
        let (dominant, _) = emotions.dominant()?;
        Some(Self { dominant, emotions, region })
    }

    pub fn dominant_confidence(&self) -> f64 {
        self.emotions.get(self.dominant)
    }

    /// The `count` best labels.
    pub fn top(&self, count: usize) -> Vec<RankedEmotion> {
        self.emotions.ranked().into_iter().take(count).map(RankedEmotion::from).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RankedEmotion {
    pub emotion: Emotion,
    pub confidence: f64,
}

impl From<(Emotion, f64)> for RankedEmotion {
    fn from((emotion, confidence): (Emotion, f64)) -> Self {
        Self { emotion, confidence }
    }
}

/// Everything the result page and the json api show for one uploaded image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub original_dominant: Emotion,
    pub original_emotions: EmotionScores,
    pub corrected: Emotion,
    pub corrected_confidence: f64,
    pub emotions: EmotionScores,
    pub was_corrected: bool,
    /// Top label of the adjusted distribution, the one the result page headlines.
    pub displayed: Emotion,
    pub displayed_confidence: f64,
    pub threshold: f64,
    pub ranking: Vec<RankedEmotion>,
    pub region: FaceRegion,
}

impl AnalysisReport {
    pub fn new(result: ClassificationResult, scale: CorrectionScale, threshold: f64) -> Self {
        let corrected = correct_emotion_smart(result.dominant, &result.emotions, scale);
        let emotions = boost_corrected(&result.emotions, result.dominant, corrected);
        let ranking = rank_for_display(&emotions, threshold).into_iter().map(RankedEmotion::from).collect();
        let (displayed, displayed_confidence) = emotions.dominant().unwrap_or((corrected, emotions.get(corrected)));
        Self {
            original_dominant: result.dominant,
            corrected,
            corrected_confidence: emotions.get(corrected),
            was_corrected: corrected != result.dominant,
            displayed,
            displayed_confidence,
            original_emotions: result.emotions,
            emotions,
            threshold,
            ranking,
            region: result.region,
        }
    }

    /// Whether the headline label differs from what the classifier first reported.
    pub fn headline_changed(&self) -> bool {
        self.displayed != self.original_dominant
    }
}

/// Latest classification of the live camera stream.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveResult {
    pub frame: u64,
    pub captured_at: DateTime<Utc>,
    pub result: ClassificationResult,
}

impl LiveResult {
    pub fn new(frame: u64, result: ClassificationResult) -> Self {
        Self { frame, captured_at: Utc::now(), result }
    }
}
