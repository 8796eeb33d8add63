use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{model::ModelController, Result};


pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_health))
		.with_state(mc)
}

async fn handler_health(State(mc): State<ModelController>) -> Result<Json<Value>> {
	let body = Json(json!(mc.health.as_ref()));
	Ok(body)
}
