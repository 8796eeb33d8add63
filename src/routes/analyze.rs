use axum::{extract::{Multipart, State}, http::header::CONTENT_TYPE, response::{IntoResponse, Response}, routing::post, Json, Router};
use serde_json::{json, Value};

use crate::{model::ModelController, Result};

use super::read_upload;


pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/analyze", post(handler_analyze))
		.route("/annotate", post(handler_annotate))
		.with_state(mc)
}

async fn handler_analyze(State(mc): State<ModelController>, multipart: Multipart) -> Result<Json<Value>> {
	let mut form = read_upload(multipart).await?;
	let threshold = mc.threshold(form.threshold)?;
	let report = mc.analyze_upload(&form.image()?, threshold).await?;
	let body = Json(json!(report));
	Ok(body)
}

async fn handler_annotate(State(mc): State<ModelController>, multipart: Multipart) -> Result<Response> {
	let mut form = read_upload(multipart).await?;
	let threshold = mc.threshold(form.threshold)?;
	let (_, annotated) = mc.analyze_and_annotate(form.image()?, threshold).await?;
	Ok(([(CONTENT_TYPE, mime::IMAGE_JPEG.as_ref())], annotated).into_response())
}
