//! Server rendered html for the upload, result and live camera pages.

use axum::{extract::{Multipart, State}, response::{Html, IntoResponse, Response}, routing::{get, post}, Router};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{domain::AnalysisReport, error::Error, model::ModelController, tools::{chart::{bar_chart, pie_chart}, health::SelfCheckReport, log::{log_warn, LogServiceType}}, Result};

use super::read_upload;

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f5f6fa; color: #2c3e50; }
main { max-width: 960px; margin: 0 auto; padding: 24px; }
h1 { margin-top: 0; }
nav a { margin-right: 16px; color: #667eea; }
.card { background: #fff; border-radius: 12px; padding: 20px; margin: 16px 0; box-shadow: 0 2px 8px rgba(0,0,0,.08); }
.notice { border-left: 6px solid #ff6b6b; }
.error { border-left: 6px solid #e67e22; }
.result { text-align: center; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: #fff; }
.result .emoji { font-size: 4em; }
.correction { background: #fff3cd; border-left: 6px solid #feca57; }
.grid { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.chart { width: 100%; height: auto; }
.ranked li { list-style: none; margin: 6px 0; }
.ranked .bar { height: 10px; border-radius: 5px; background: #dfe4ea; }
.ranked .fill { height: 10px; border-radius: 5px; }
.ranked .highlight { font-weight: bold; }
img.annotated, video, #frame { max-width: 100%; border-radius: 8px; }
table { border-collapse: collapse; } td { padding: 4px 12px; }
"#;

const LIVE_SCRIPT: &str = r#"
const video = document.getElementById('camera');
const frame = document.getElementById('frame');
const latest = document.getElementById('latest');
const canvas = document.createElement('canvas');
let running = false;

async function start() {
	const stream = await navigator.mediaDevices.getUserMedia({ video: true });
	video.srcObject = stream;
	await video.play();
	running = true;
	sendFrame();
}

function stop() {
	running = false;
	if (video.srcObject) {
		video.srcObject.getTracks().forEach(track => track.stop());
		video.srcObject = null;
	}
	fetch('/live/reset', { method: 'POST' });
}

function sendFrame() {
	if (!running) return;
	canvas.width = video.videoWidth;
	canvas.height = video.videoHeight;
	canvas.getContext('2d').drawImage(video, 0, 0);
	canvas.toBlob(async blob => {
		try {
			const response = await fetch('/live/frame', { method: 'POST', headers: { 'Content-Type': 'image/jpeg' }, body: blob });
			if (response.ok) {
				const previous = frame.src;
				frame.src = URL.createObjectURL(await response.blob());
				if (previous.startsWith('blob:')) URL.revokeObjectURL(previous);
			}
		} catch (e) {}
		setTimeout(sendFrame, 33);
	}, 'image/jpeg', 0.85);
}

async function poll() {
	try {
		const response = await fetch('/live/latest');
		const result = await response.json();
		if (result) {
			latest.innerHTML = result.top.map(e => `<li>${e.emotion}: ${e.confidence.toFixed(1)}%</li>`).join('');
		} else {
			latest.innerHTML = '<li>Waiting for a face...</li>';
		}
	} catch (e) {}
}

document.getElementById('start').onclick = start;
document.getElementById('stop').onclick = stop;
setInterval(poll, 500);
"#;

pub fn routes(mc: ModelController) -> Router {
	Router::new()
		.route("/", get(handler_index))
		.route("/analyze", post(handler_analyze))
		.with_state(mc)
}

async fn handler_index(State(mc): State<ModelController>) -> Html<String> {
	Html(index_page(&mc, None))
}

async fn handler_analyze(State(mc): State<ModelController>, multipart: Multipart) -> Response {
	match analyze_form(&mc, multipart).await {
		Ok((report, annotated)) => Html(result_page(&report, &annotated)).into_response(),
		Err(err) => {
			log_warn(LogServiceType::Analysis, format!("Upload rejected: {:?}", err));
			let (status, _) = err.client_status_and_error();
			(status, Html(index_page(&mc, Some(&err)))).into_response()
		},
	}
}

async fn analyze_form(mc: &ModelController, multipart: Multipart) -> Result<(AnalysisReport, Vec<u8>)> {
	let mut form = read_upload(multipart).await?;
	let threshold = mc.threshold(form.threshold)?;
	let image = form.image()?;
	mc.analyze_and_annotate(image, threshold).await
}

pub fn escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

fn layout(title: &str, body: &str) -> String {
	format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<main>
<nav><a href="/">Upload a photo</a><a href="/live">Live camera</a></nav>
{body}
</main>
</body>
</html>"#,
		title = escape(title),
	)
}

fn fallback_notice(health: &SelfCheckReport) -> String {
	let rows: String = health.dependencies.iter().map(|dependency| {
		let state = if dependency.available { "available".to_string() } else { format!("unavailable: {}", dependency.error.clone().unwrap_or_default()) };
		format!("<tr><td>{}</td><td>{}</td></tr>", escape(&dependency.dependency), escape(&state))
	}).collect();
	format!(
		r#"<section class="card notice"><h2>Analysis unavailable</h2><p>The emotion analysis backend could not be started. Uploads are accepted but cannot be analysed until the missing dependencies below are fixed and the server restarted.</p><table>{}</table></section>"#,
		rows
	)
}

/// Upload form. In fallback mode the page explains why analysis is off.
pub fn index_page(mc: &ModelController, error: Option<&Error>) -> String {
	let mut body = String::from("<h1>Facial emotion analysis</h1>");
	if !mc.is_available() {
		body.push_str(&fallback_notice(&mc.health));
	}
	if let Some(error) = error {
		body.push_str(&format!(r#"<section class="card error"><p>{}</p></section>"#, escape(&error.user_message())));
	}
	let threshold = mc.settings.default_threshold;
	body.push_str(&format!(
		r#"<section class="card">
<form action="/analyze" method="post" enctype="multipart/form-data">
<p><input type="file" name="image" accept=".jpg,.jpeg,.png,.bmp,.tiff,.tif" required></p>
<p><label for="threshold">Display threshold: <output id="threshold-value">{threshold:.0}</output>%</label><br>
<input type="range" id="threshold" name="threshold" min="0" max="100" step="1" value="{threshold:.0}" oninput="document.getElementById('threshold-value').value = this.value"></p>
<p><button type="submit">Analyze</button></p>
</form>
</section>"#
	));
	layout("Facial emotion analysis", &body)
}

fn ranked_list(report: &AnalysisReport) -> String {
	if report.ranking.is_empty() {
		return format!("<p>No emotion reaches the {:.0}% display threshold.</p>", report.threshold);
	}
	let items: String = report.ranking.iter().map(|entry| {
		let class = if entry.emotion == report.displayed { r#" class="highlight""# } else { "" };
		format!(
			r#"<li{class}>{} {} {:.1}%<div class="bar"><div class="fill" style="width: {:.1}%; background: {}"></div></div></li>"#,
			entry.emotion.emoji(), entry.emotion.display_name(), entry.confidence, entry.confidence.clamp(0.0, 100.0), entry.emotion.color()
		)
	}).collect();
	format!(r#"<ul class="ranked">{}</ul>"#, items)
}

pub fn result_page(report: &AnalysisReport, annotated: &[u8]) -> String {
	let mut body = String::from("<h1>Analysis result</h1>");
	body.push_str(&format!(
		r#"<section class="card result"><div class="emoji">{}</div><h2>{}</h2><p>Confidence: {:.1}%</p></section>"#,
		report.displayed.emoji(), report.displayed.display_name(), report.displayed_confidence
	));
	if report.headline_changed() {
		body.push_str(&format!(
			r#"<section class="card correction"><p>Smart correction applied: {} {} &rarr; {} {}</p></section>"#,
			report.original_dominant.emoji(), report.original_dominant.display_name(), report.displayed.emoji(), report.displayed.display_name()
		));
	}
	body.push_str(&format!(
		r#"<section class="card"><img class="annotated" alt="Detected face" src="data:image/jpeg;base64,{}"></section>"#,
		STANDARD.encode(annotated)
	));
	body.push_str(&format!(
		r#"<section class="grid"><div class="card"><h3>Confidence per emotion</h3>{}</div><div class="card"><h3>Distribution</h3>{}</div></section>"#,
		bar_chart(&report.emotions, Some(report.displayed)), pie_chart(&report.emotions)
	));
	body.push_str(&format!(
		r#"<section class="card"><h3>Detected emotions (threshold {:.0}%)</h3>{}</section>"#,
		report.threshold, ranked_list(report)
	));
	layout("Analysis result", &body)
}

pub fn live_page(mc: &ModelController) -> String {
	let mut body = String::from("<h1>Live camera</h1>");
	if !mc.is_available() {
		body.push_str(&fallback_notice(&mc.health));
	}
	body.push_str(&format!(
		r#"<section class="card"><p>One frame in {} is analysed. The annotation shows the latest result.</p>
<p><button id="start">Start camera</button> <button id="stop">Stop</button></p>
<video id="camera" muted playsinline style="display: none"></video>
<img id="frame" alt="Annotated camera frame">
</section>
<section class="card"><h3>Latest result</h3><ul id="latest"><li>Waiting for a face...</li></ul></section>
<script>{}</script>"#,
		mc.capture.sample_rate(), LIVE_SCRIPT
	));
	layout("Live camera", &body)
}
