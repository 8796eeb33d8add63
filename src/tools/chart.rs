//! Inline svg charts of a confidence distribution.

use std::f64::consts::PI;

use crate::domain::{Emotion, EmotionScores};

const BAR_WIDTH: f64 = 48.0;
const BAR_GAP: f64 = 16.0;
const BAR_AREA_HEIGHT: f64 = 200.0;
const PIE_RADIUS: f64 = 100.0;

/// Vertical bars for every label, scaled on 0-100. `highlight` gets a dark outline.
pub fn bar_chart(emotions: &EmotionScores, highlight: Option<Emotion>) -> String {
    let entries: Vec<(Emotion, f64)> = emotions.iter().collect();
    let width = entries.len() as f64 * (BAR_WIDTH + BAR_GAP) + BAR_GAP;
    let height = BAR_AREA_HEIGHT + 60.0;
    let mut svg = format!(r#"<svg class="chart bar-chart" viewBox="0 0 {:.0} {:.0}" xmlns="http://www.w3.org/2000/svg" role="img" aria-label="Confidence per emotion">"#, width, height);
    svg.push_str(&format!(r##"<line x1="0" y1="{0:.0}" x2="{1:.0}" y2="{0:.0}" stroke="#7f8c8d"/>"##, BAR_AREA_HEIGHT + 20.0, width));
    for (index, (emotion, confidence)) in entries.iter().enumerate() {
        let bar_height = confidence.clamp(0.0, 100.0) / 100.0 * BAR_AREA_HEIGHT;
        let x = BAR_GAP + index as f64 * (BAR_WIDTH + BAR_GAP);
        let y = BAR_AREA_HEIGHT + 20.0 - bar_height;
        let stroke = if Some(*emotion) == highlight { r##" stroke="#2c3e50" stroke-width="3""## } else { "" };
        svg.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.0}" height="{:.1}" fill="{}"{}><title>{}: {:.1}%</title></rect>"#,
            x, y, BAR_WIDTH, bar_height, emotion.color(), stroke, emotion, confidence
        ));
        svg.push_str(&format!(r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{:.1}%</text>"#, x + BAR_WIDTH / 2.0, y - 4.0, confidence));
        svg.push_str(&format!(r#"<text x="{:.1}" y="{:.0}" text-anchor="middle" font-size="12">{}</text>"#, x + BAR_WIDTH / 2.0, BAR_AREA_HEIGHT + 40.0, emotion));
    }
    svg.push_str("</svg>");
    svg
}

/// Share of each label in the distribution, as pie slices.
pub fn pie_chart(emotions: &EmotionScores) -> String {
    let size = PIE_RADIUS * 2.0 + 20.0;
    let center = size / 2.0;
    let mut svg = format!(r#"<svg class="chart pie-chart" viewBox="0 0 {0:.0} {0:.0}" xmlns="http://www.w3.org/2000/svg" role="img" aria-label="Emotion distribution">"#, size);
    let slices = pie_slices(emotions);
    if let [(emotion, _, _)] = slices.as_slice() {
        svg.push_str(&format!(r#"<circle cx="{0:.1}" cy="{0:.1}" r="{1:.1}" fill="{2}"><title>{3}</title></circle>"#, center, PIE_RADIUS, emotion.color(), emotion));
    } else {
        for (emotion, start, end) in slices {
            let (x1, y1) = polar(center, start);
            let (x2, y2) = polar(center, end);
            let large_arc = if end - start > PI { 1 } else { 0 };
            svg.push_str(&format!(
                r##"<path d="M {0:.2} {0:.2} L {1:.2} {2:.2} A {3:.1} {3:.1} 0 {4} 1 {5:.2} {6:.2} Z" fill="{7}" stroke="#fff"><title>{8}</title></path>"##,
                center, x1, y1, PIE_RADIUS, large_arc, x2, y2, emotion.color(), emotion
            ));
        }
    }
    svg.push_str("</svg>");
    svg
}

/// Labels below this share are left out of the pie, unless every label is.
const PIE_MIN_CONFIDENCE: f64 = 1.0;

/// Start and end angles, in radians from twelve o'clock, of every label above 1%.
///
/// When no label passes 1% every non zero label is drawn instead.
pub fn pie_slices(emotions: &EmotionScores) -> Vec<(Emotion, f64, f64)> {
    let mut positive: Vec<(Emotion, f64)> = emotions.iter().filter(|(_, c)| *c > PIE_MIN_CONFIDENCE).collect();
    if positive.is_empty() {
        positive = emotions.iter().filter(|(_, c)| *c > 0.0).collect();
    }
    let total: f64 = positive.iter().map(|(_, c)| c).sum();
    if total <= 0.0 {
        return vec![];
    }
    let mut angle = 0.0;
    positive.into_iter().map(|(emotion, confidence)| {
        let start = angle;
        angle += confidence / total * 2.0 * PI;
        (emotion, start, angle)
    }).collect()
}

fn polar(center: f64, angle: f64) -> (f64, f64) {
    (center + PIE_RADIUS * angle.sin(), center - PIE_RADIUS * angle.cos())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_cover_full_circle() {
        let scores = EmotionScores::new().with(Emotion::Happy, 50.0).with(Emotion::Sad, 25.0).with(Emotion::Fear, 25.0).with(Emotion::Angry, 0.0);
        let slices = pie_slices(&scores);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].0, Emotion::Happy);
        assert!((slices[0].2 - PI).abs() < 1e-9);
        assert!((slices[2].2 - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn labels_at_one_percent_or_less_are_left_out() {
        let scores = EmotionScores::new().with(Emotion::Happy, 97.0).with(Emotion::Sad, 2.0).with(Emotion::Fear, 0.5).with(Emotion::Angry, 1.0);
        let slices = pie_slices(&scores);
        assert_eq!(slices.iter().map(|(emotion, _, _)| *emotion).collect::<Vec<_>>(), vec![Emotion::Happy, Emotion::Sad]);
        assert!((slices[1].2 - 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn all_labels_drawn_when_none_passes_one_percent() {
        let scores = EmotionScores::new().with(Emotion::Happy, 0.6).with(Emotion::Sad, 0.4).with(Emotion::Fear, 0.0);
        let slices = pie_slices(&scores);
        assert_eq!(slices.len(), 2);
        assert!((slices[0].2 - 0.6 * 2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn empty_distribution_has_no_slices() {
        assert!(pie_slices(&EmotionScores::new()).is_empty());
        assert!(pie_chart(&EmotionScores::new()).ends_with("</svg>"));
    }

    #[test]
    fn single_label_is_a_circle() {
        let svg = pie_chart(&EmotionScores::new().with(Emotion::Neutral, 100.0));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn bar_chart_has_one_bar_per_label() {
        let scores = EmotionScores::new().with(Emotion::Happy, 72.0).with(Emotion::Fear, 90.0);
        let svg = bar_chart(&scores, Some(Emotion::Happy));
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("happy: 72.0%"));
        assert_eq!(svg.matches("stroke-width=\"3\"").count(), 1);
    }
}
