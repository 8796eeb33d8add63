pub mod emotion;
pub mod analysis;

pub use emotion::{Emotion, EmotionScores};
pub use analysis::{AnalysisReport, ClassificationResult, FaceRegion, LiveResult};
