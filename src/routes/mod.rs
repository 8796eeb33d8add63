use axum::extract::Multipart;

use crate::{Error, Result};

pub mod ping;
pub mod pages;
pub mod analyze;
pub mod live;
pub mod health;

/// Fields of the upload form, shared by the html and json routes.
#[derive(Debug, Default)]
pub struct UploadForm {
	pub image: Option<Vec<u8>>,
	pub threshold: Option<f64>,
}

impl UploadForm {
	pub fn image(&mut self) -> Result<Vec<u8>> {
		self.image.take().ok_or(Error::MissingImage)
	}
}

pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm> {
	let mut form = UploadForm::default();
	while let Some(field) = multipart.next_field().await? {
		let name = field.name().map(|n| n.to_string());
		match name.as_deref() {
			Some("image") => {
				let bytes = field.bytes().await?;
				if !bytes.is_empty() {
					form.image = Some(bytes.to_vec());
				}
			},
			Some("threshold") => {
				let text = field.text().await?;
				let text = text.trim();
				if !text.is_empty() {
					let threshold = text.parse::<f64>().map_err(|_| Error::MalformedThreshold(text.to_string()))?;
					form.threshold = Some(threshold);
				}
			},
			_ => {}
		}
	}
	Ok(form)
}
