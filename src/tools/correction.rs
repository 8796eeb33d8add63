use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::domain::{Emotion, EmotionScores};

/// A label present above this makes the rule replace the dominant label.
pub const OFTEN_WRONG_THRESHOLD: f64 = 0.1;
/// A likely alternative must be above this to be picked.
pub const LIKELY_CORRECT_THRESHOLD: f64 = 0.15;
/// Share of the original dominant confidence given to a corrected label.
pub const CORRECTED_CONFIDENCE_FACTOR: f64 = 0.8;

/// How the correction thresholds relate to classifier scores.
///
/// Classifier scores are percentages while the thresholds are written as probabilities.
/// `Raw` compares them as they are, which makes nearly every rule fire.
/// `Percent` scales the thresholds to the 0-100 range first.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionScale {
    #[default]
    Raw,
    Percent,
}

impl CorrectionScale {
    fn threshold(&self, threshold: f64) -> f64 {
        match self {
            CorrectionScale::Raw => threshold,
            CorrectionScale::Percent => threshold * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRule {
    pub emotion: Emotion,
    pub likely_correct: &'static [Emotion],
    pub often_wrong: &'static [Emotion],
    pub replacement: Emotion,
}

pub static CORRECTION_RULES: [CorrectionRule; 3] = [
    CorrectionRule {
        emotion: Emotion::Fear,
        likely_correct: &[Emotion::Surprise, Emotion::Sad],
        often_wrong: &[Emotion::Happy],
        replacement: Emotion::Happy,
    },
    CorrectionRule {
        emotion: Emotion::Angry,
        likely_correct: &[Emotion::Sad, Emotion::Disgust],
        often_wrong: &[Emotion::Happy],
        replacement: Emotion::Neutral,
    },
    CorrectionRule {
        emotion: Emotion::Sad,
        likely_correct: &[Emotion::Neutral, Emotion::Angry],
        often_wrong: &[Emotion::Happy],
        replacement: Emotion::Neutral,
    },
];

pub fn rule_for(emotion: Emotion) -> Option<&'static CorrectionRule> {
    CORRECTION_RULES.iter().find(|rule| rule.emotion == emotion)
}

/// Remaps the dominant label the classifier is known to confuse.
///
/// Only the dominant label selects a rule. An often wrong label above its threshold
/// returns the replacement before any likely correct label is looked at.
pub fn correct_emotion_smart(emotion: Emotion, emotions: &EmotionScores, scale: CorrectionScale) -> Emotion {
    let Some(rule) = rule_for(emotion) else {
        return emotion;
    };

    let often_wrong = scale.threshold(OFTEN_WRONG_THRESHOLD);
    if rule.often_wrong.iter().any(|wrong| emotions.get(*wrong) > often_wrong) {
        return rule.replacement;
    }

    let likely_correct = scale.threshold(LIKELY_CORRECT_THRESHOLD);
    rule.likely_correct
        .iter()
        .copied()
        .find(|likely| emotions.get(*likely) > likely_correct)
        .unwrap_or(emotion)
}

/// Scores to display once `original` was corrected to `corrected`.
pub fn boost_corrected(emotions: &EmotionScores, original: Emotion, corrected: Emotion) -> EmotionScores {
    let mut adjusted = emotions.clone();
    if corrected != original {
        let boosted = emotions.get(corrected).max(emotions.get(original) * CORRECTED_CONFIDENCE_FACTOR);
        adjusted.set(corrected, boosted);
    }
    adjusted
}

/// Descending ranking, keeping entries at or above `threshold`.
pub fn rank_for_display(emotions: &EmotionScores, threshold: f64) -> Vec<(Emotion, f64)> {
    emotions.ranked().into_iter().filter(|(_, confidence)| *confidence >= threshold).collect()
}


#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn scores(entries: &[(Emotion, f64)]) -> EmotionScores {
        entries.iter().copied().collect()
    }

    #[test]
    fn labels_without_rule_pass_through() {
        let all = scores(&[
            (Emotion::Happy, 50.0), (Emotion::Sad, 50.0), (Emotion::Angry, 50.0), (Emotion::Surprise, 50.0),
            (Emotion::Fear, 50.0), (Emotion::Disgust, 50.0), (Emotion::Neutral, 50.0),
        ]);
        for emotion in Emotion::iter().filter(|e| rule_for(*e).is_none()) {
            assert_eq!(correct_emotion_smart(emotion, &all, CorrectionScale::Raw), emotion);
            assert_eq!(correct_emotion_smart(emotion, &all, CorrectionScale::Percent), emotion);
        }
    }

    #[test]
    fn fear_with_happy_becomes_happy() {
        let dist = scores(&[(Emotion::Fear, 0.8), (Emotion::Happy, 0.11)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Raw), Emotion::Happy);
    }

    #[test]
    fn angry_with_happy_becomes_neutral() {
        let dist = scores(&[(Emotion::Angry, 0.7), (Emotion::Happy, 0.2), (Emotion::Sad, 0.5)]);
        assert_eq!(correct_emotion_smart(Emotion::Angry, &dist, CorrectionScale::Raw), Emotion::Neutral);
    }

    #[test]
    fn sad_falls_back_to_likely_neutral() {
        let dist = scores(&[(Emotion::Sad, 0.6), (Emotion::Happy, 0.1), (Emotion::Neutral, 0.16), (Emotion::Angry, 0.9)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Raw), Emotion::Neutral);
    }

    #[test]
    fn sad_likely_list_is_scanned_in_order() {
        let dist = scores(&[(Emotion::Sad, 0.6), (Emotion::Neutral, 0.15), (Emotion::Angry, 0.2)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Raw), Emotion::Angry);
    }

    #[test]
    fn sad_stays_sad_below_all_thresholds() {
        let dist = scores(&[(Emotion::Sad, 0.6), (Emotion::Happy, 0.1), (Emotion::Neutral, 0.15), (Emotion::Angry, 0.15)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Raw), Emotion::Sad);
    }

    #[test]
    fn fear_with_surprise_becomes_surprise() {
        let dist = scores(&[(Emotion::Fear, 0.6), (Emotion::Happy, 0.1), (Emotion::Surprise, 0.2), (Emotion::Sad, 0.9)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Raw), Emotion::Surprise);
    }

    #[test]
    fn fear_falls_back_to_sad() {
        let dist = scores(&[(Emotion::Fear, 0.6), (Emotion::Happy, 0.05), (Emotion::Surprise, 0.15), (Emotion::Sad, 0.2)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Raw), Emotion::Sad);
    }

    #[test]
    fn angry_with_sad_becomes_sad() {
        let dist = scores(&[(Emotion::Angry, 0.6), (Emotion::Happy, 0.1), (Emotion::Sad, 0.2), (Emotion::Disgust, 0.9)]);
        assert_eq!(correct_emotion_smart(Emotion::Angry, &dist, CorrectionScale::Raw), Emotion::Sad);
    }

    #[test]
    fn angry_falls_back_to_disgust() {
        let dist = scores(&[(Emotion::Angry, 0.6), (Emotion::Happy, 0.05), (Emotion::Sad, 0.15), (Emotion::Disgust, 0.2)]);
        assert_eq!(correct_emotion_smart(Emotion::Angry, &dist, CorrectionScale::Raw), Emotion::Disgust);
    }

    #[test]
    fn absent_labels_count_as_zero() {
        let dist = scores(&[(Emotion::Fear, 0.9)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Raw), Emotion::Fear);
    }

    #[test]
    fn often_wrong_short_circuits_likely_correct() {
        let dist = scores(&[(Emotion::Fear, 0.4), (Emotion::Surprise, 0.9), (Emotion::Happy, 0.2)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Raw), Emotion::Happy);
    }

    #[test]
    fn only_dominant_label_selects_rule() {
        // runner up fear with happy around: no rule for surprise, nothing changes
        let dist = scores(&[(Emotion::Surprise, 60.0), (Emotion::Fear, 30.0), (Emotion::Happy, 10.0)]);
        assert_eq!(correct_emotion_smart(Emotion::Surprise, &dist, CorrectionScale::Raw), Emotion::Surprise);
    }

    #[test]
    fn raw_scale_fires_on_percentages() {
        let dist = scores(&[(Emotion::Sad, 85.0), (Emotion::Happy, 0.5), (Emotion::Neutral, 12.0)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Raw), Emotion::Neutral);
        let dist = scores(&[(Emotion::Sad, 85.0), (Emotion::Happy, 0.05), (Emotion::Neutral, 0.1), (Emotion::Angry, 0.1)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Raw), Emotion::Sad);
    }

    #[test]
    fn percent_scale_uses_scaled_thresholds() {
        let dist = scores(&[(Emotion::Sad, 80.0), (Emotion::Happy, 5.0), (Emotion::Neutral, 12.0)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Percent), Emotion::Sad);
        let dist = scores(&[(Emotion::Sad, 70.0), (Emotion::Happy, 5.0), (Emotion::Neutral, 16.0)]);
        assert_eq!(correct_emotion_smart(Emotion::Sad, &dist, CorrectionScale::Percent), Emotion::Neutral);
        let dist = scores(&[(Emotion::Fear, 70.0), (Emotion::Happy, 10.5)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Percent), Emotion::Happy);
        let dist = scores(&[(Emotion::Fear, 70.0), (Emotion::Happy, 10.0), (Emotion::Surprise, 15.0)]);
        assert_eq!(correct_emotion_smart(Emotion::Fear, &dist, CorrectionScale::Percent), Emotion::Fear);
    }

    #[test]
    fn boost_takes_eighty_percent_of_original() {
        let dist = scores(&[(Emotion::Fear, 90.0), (Emotion::Happy, 5.0)]);
        let boosted = boost_corrected(&dist, Emotion::Fear, Emotion::Happy);
        assert_eq!(boosted.get(Emotion::Happy), 72.0);
        assert_eq!(boosted.get(Emotion::Fear), 90.0);
    }

    #[test]
    fn boost_keeps_higher_existing_confidence() {
        let dist = scores(&[(Emotion::Sad, 50.0), (Emotion::Neutral, 45.0)]);
        let boosted = boost_corrected(&dist, Emotion::Sad, Emotion::Neutral);
        assert_eq!(boosted.get(Emotion::Neutral), 45.0);
    }

    #[test]
    fn boost_adds_missing_label() {
        let dist = scores(&[(Emotion::Angry, 50.0), (Emotion::Happy, 20.0)]);
        let boosted = boost_corrected(&dist, Emotion::Angry, Emotion::Neutral);
        assert_eq!(boosted.get(Emotion::Neutral), 40.0);
        assert_eq!(boosted.iter().count(), 3);
    }

    #[test]
    fn no_boost_without_change() {
        let dist = scores(&[(Emotion::Happy, 90.0)]);
        assert_eq!(boost_corrected(&dist, Emotion::Happy, Emotion::Happy), dist);
    }

    #[test]
    fn threshold_is_inclusive() {
        let dist = scores(&[(Emotion::Happy, 10.0), (Emotion::Sad, 9.99), (Emotion::Neutral, 80.0)]);
        let ranked = rank_for_display(&dist, 10.0);
        assert_eq!(ranked, vec![(Emotion::Neutral, 80.0), (Emotion::Happy, 10.0)]);
    }

    #[test]
    fn scale_parses_from_config_strings() {
        assert_eq!("percent".parse::<CorrectionScale>().unwrap(), CorrectionScale::Percent);
        assert_eq!(CorrectionScale::default(), CorrectionScale::Raw);
    }
}
