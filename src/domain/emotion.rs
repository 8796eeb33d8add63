use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Closed set of labels returned by the classifier.
///
/// Declaration order is the label priority order: when two labels share the
/// highest confidence, the one declared first wins.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprise,
    Fear,
    Disgust,
    Neutral,
}

impl Emotion {
    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Happy => "😊",
            Emotion::Sad => "😢",
            Emotion::Angry => "😠",
            Emotion::Surprise => "😲",
            Emotion::Fear => "😨",
            Emotion::Disgust => "🤢",
            Emotion::Neutral => "😐",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Happy => "Happiness",
            Emotion::Sad => "Sadness",
            Emotion::Angry => "Anger",
            Emotion::Surprise => "Surprise",
            Emotion::Fear => "Fear",
            Emotion::Disgust => "Disgust",
            Emotion::Neutral => "Neutral",
        }
    }

    /// Chart colour, as css hex.
    pub fn color(&self) -> &'static str {
        match self {
            Emotion::Happy => "#feca57",
            Emotion::Sad => "#45b7d1",
            Emotion::Angry => "#ff6b6b",
            Emotion::Surprise => "#96ceb4",
            Emotion::Fear => "#a55eea",
            Emotion::Disgust => "#26de81",
            Emotion::Neutral => "#95a5a6",
        }
    }
}

/// Confidence per label, as returned by the classifier (percentage like, 0-100).
///
/// Labels never reported read as zero.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct EmotionScores(BTreeMap<Emotion, f64>);

impl EmotionScores {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0.get(&emotion).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, emotion: Emotion, confidence: f64) {
        self.0.insert(emotion, confidence);
    }

    pub fn with(mut self, emotion: Emotion, confidence: f64) -> Self {
        self.set(emotion, confidence);
        self
    }

    /// Entries in label priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.0.iter().map(|(e, c)| (*e, *c))
    }

    /// Highest confidence label. Ties go to the label declared first in [`Emotion`].
    pub fn dominant(&self) -> Option<(Emotion, f64)> {
        let mut best: Option<(Emotion, f64)> = None;
        for (emotion, confidence) in self.iter() {
            match best {
                Some((_, best_confidence)) if confidence <= best_confidence => {}
                _ => best = Some((emotion, confidence)),
            }
        }
        best
    }

    /// Entries sorted by descending confidence, ties in label priority order.
    pub fn ranked(&self) -> Vec<(Emotion, f64)> {
        let mut entries: Vec<(Emotion, f64)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }
}

impl FromIterator<(Emotion, f64)> for EmotionScores {
    fn from_iter<T: IntoIterator<Item = (Emotion, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}


#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn labels_parse_lowercase() {
        assert_eq!(Emotion::from_str("surprise").unwrap(), Emotion::Surprise);
        assert_eq!(Emotion::Disgust.to_string(), "disgust");
        assert!(Emotion::from_str("contempt").is_err());
        assert_eq!(Emotion::iter().count(), 7);
    }

    #[test]
    fn missing_label_reads_zero() {
        let scores = EmotionScores::new().with(Emotion::Happy, 12.0);
        assert_eq!(scores.get(Emotion::Sad), 0.0);
        assert_eq!(scores.iter().collect::<Vec<_>>(), vec![(Emotion::Happy, 12.0)]);
    }

    #[test]
    fn dominant_tie_goes_to_priority_order() {
        let scores = EmotionScores::new()
            .with(Emotion::Neutral, 40.0)
            .with(Emotion::Sad, 40.0)
            .with(Emotion::Fear, 20.0);
        assert_eq!(scores.dominant(), Some((Emotion::Sad, 40.0)));

        let scores = EmotionScores::new()
            .with(Emotion::Disgust, 50.0)
            .with(Emotion::Happy, 50.0);
        assert_eq!(scores.dominant(), Some((Emotion::Happy, 50.0)));
    }

    #[test]
    fn dominant_of_empty_is_none() {
        assert_eq!(EmotionScores::new().dominant(), None);
    }

    #[test]
    fn ranked_descending_with_stable_ties() {
        let scores = EmotionScores::new()
            .with(Emotion::Neutral, 10.0)
            .with(Emotion::Angry, 30.0)
            .with(Emotion::Happy, 10.0)
            .with(Emotion::Fear, 50.0);
        let ranked: Vec<Emotion> = scores.ranked().into_iter().map(|(e, _)| e).collect();
        assert_eq!(ranked, vec![Emotion::Fear, Emotion::Angry, Emotion::Happy, Emotion::Neutral]);
    }

    #[test]
    fn serializes_as_label_map() {
        let scores = EmotionScores::new().with(Emotion::Happy, 80.5).with(Emotion::Sad, 19.5);
        let value = serde_json::to_value(&scores).unwrap();
        assert_eq!(value, serde_json::json!({"happy": 80.5, "sad": 19.5}));
    }
}
