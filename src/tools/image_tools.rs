use std::io::Cursor;

use axum::http::StatusCode;
use derive_more::From;
use image::{codecs::jpeg::JpegEncoder, DynamicImage, Rgb, RgbImage};
use imageproc::{drawing::{draw_filled_rect_mut, draw_hollow_rect_mut}, rect::Rect};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};

use crate::{domain::{Emotion, FaceRegion}, error::ClientError};

use super::glyphs::{draw_text, text_size};

pub type ImageResult<T> = core::result::Result<T, ImageError>;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_THICKNESS: u32 = 3;
const LABEL_PADDING: u32 = 5;
const JPEG_QUALITY: u8 = 85;

#[serde_as]
#[derive(Debug, Serialize, strum_macros::AsRefStr, From)]
pub enum ImageError {
	#[from]
	Io(#[serde_as(as = "DisplayFromStr")] std::io::Error),

	#[from]
	RsImageError(#[serde_as(as = "DisplayFromStr")] image::ImageError),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for ImageError {
	fn fmt(
		&self,
		fmt: &mut core::fmt::Formatter,
	) -> core::result::Result<(), core::fmt::Error> {
		write!(fmt, "{self:?}")
	}
}

impl std::error::Error for ImageError {}

// endregion: --- Error Boilerplate

impl ImageError {
    pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
        match self {
            ImageError::RsImageError(image::ImageError::Decoding(_)) => (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ClientError::SERVICE_ERROR),
        }
    }
}

/// Caption burnt above the face box.
pub fn face_label(emotion: Emotion, confidence: f64) -> String {
    format!("{}: {:.1}%", emotion, confidence)
}

/// Label scale proportional to the image, so captions stay readable on large photos.
fn label_scale(width: u32) -> u32 {
    (width / 160).clamp(2, 8)
}

/// Draws a green box around `region` and a filled caption strip above it.
///
/// When the face touches the top of the image the caption goes inside the box.
pub fn annotate_face(image: &DynamicImage, region: FaceRegion, label: &str) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();
    let Some(region) = region.clamp(width, height) else {
        return canvas;
    };

    for inset in 0..BOX_THICKNESS {
        let w = region.w.saturating_sub(inset * 2);
        let h = region.h.saturating_sub(inset * 2);
        if w == 0 || h == 0 {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(w, h);
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
    }

    let scale = label_scale(width);
    let (text_width, text_height) = text_size(label, scale);
    if text_width == 0 {
        return canvas;
    }
    let strip_height = text_height + LABEL_PADDING * 2;
    let strip_y = if region.y >= strip_height { region.y - strip_height } else { region.y };
    let strip = Rect::at(region.x as i32, strip_y as i32).of_size(text_width + LABEL_PADDING * 2, strip_height);
    draw_filled_rect_mut(&mut canvas, strip, BOX_COLOR);
    draw_text(&mut canvas, (region.x + LABEL_PADDING) as i64, (strip_y + LABEL_PADDING) as i64, label, scale, TEXT_COLOR);
    canvas
}

pub fn encode_jpeg(image: &RgbImage) -> ImageResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    image.write_with_encoder(encoder)?;
    Ok(bytes.into_inner())
}

pub fn decode(bytes: &[u8]) -> ImageResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}
