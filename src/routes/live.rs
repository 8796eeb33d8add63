use axum::{extract::State, http::header::CONTENT_TYPE, response::{Html, IntoResponse, Response}, routing::{get, post}, Json, Router};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::{model::ModelController, Error, Result};

use super::pages::live_page;


pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_page))
		.route("/frame", post(handler_frame))
		.route("/latest", get(handler_latest))
		.route("/reset", post(handler_reset))
		.with_state(mc)
}

async fn handler_page(State(mc): State<ModelController>) -> Html<String> {
	Html(live_page(&mc))
}

async fn handler_frame(State(mc): State<ModelController>, body: Bytes) -> Result<Response> {
	if body.is_empty() {
		return Err(Error::MissingImage);
	}
	let frame = mc.live_frame(body.to_vec()).await?;
	Ok(([(CONTENT_TYPE, mime::IMAGE_JPEG.as_ref())], frame).into_response())
}

async fn handler_latest(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let body = match mc.capture.try_read().await {
		Some(latest) => json!({
			"frame": latest.frame,
			"frames": mc.capture.frames(),
			"capturedAt": latest.captured_at,
			"dominant": latest.result.dominant,
			"confidence": latest.result.dominant_confidence(),
			"region": latest.result.region,
			"top": latest.result.top(3),
		}),
		None => Value::Null,
	};
	Ok(Json(body))
}

async fn handler_reset(State(mc): State<ModelController>) -> Result<Json<Value>> {
	mc.capture.reset().await;
	let body = Json(json!({
		"result": {
			"success": true
		}
	}));
	Ok(body)
}
