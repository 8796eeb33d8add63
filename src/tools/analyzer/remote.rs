use std::{path::Path, str::FromStr, time::Duration};

use async_trait::async_trait;
use reqwest::{multipart::{Form, Part}, Client};
use serde::Deserialize;
use serde_json::Value;

use crate::{domain::{ClassificationResult, Emotion, EmotionScores, FaceRegion}, tools::{file_tools::mime_for_path, health::DependencyStatus}};

use super::{AnalyzerError, AnalyzerResult, EmotionAnalyzer};

/// Delegates analysis to an http service answering with the DeepFace json shape.
pub struct RemoteEmotionAnalyzer {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteFace {
    dominant_emotion: Option<String>,
    emotion: serde_json::Map<String, Value>,
    region: Option<RemoteRegion>,
}

#[derive(Debug, Deserialize)]
struct RemoteRegion {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl RemoteEmotionAnalyzer {
    pub fn new(url: &str, timeout_secs: u64) -> AnalyzerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait]
impl EmotionAnalyzer for RemoteEmotionAnalyzer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, path: &Path) -> AnalyzerResult<ClassificationResult> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_else(|| "image".to_string());
        let part = Part::bytes(bytes).file_name(filename).mime_str(mime_for_path(path))?;
        let form = Form::new().part("image", part);

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            // services answering like DeepFace report a missing face as a client error
            return if status.as_u16() == 400 || status.as_u16() == 422 {
                Err(AnalyzerError::NoFaceDetected)
            } else {
                Err(AnalyzerError::RemoteStatus(status.as_u16()))
            };
        }
        let body: Value = response.json().await?;
        parse_remote_response(body)
    }

    async fn check(&self) -> Vec<DependencyStatus> {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let server = response.headers().get(reqwest::header::SERVER).and_then(|s| s.to_str().ok()).map(|s| s.to_string());
                vec![DependencyStatus::ok("remote-analyzer", server)]
            },
            Err(err) => vec![DependencyStatus::failed("remote-analyzer", format!("{}: {}", self.url, err))],
        }
    }
}

/// Reads `{dominant_emotion, emotion, region}` from an object, a list of faces, or `{results: [...]}`.
/// The first face is used and the dominant label is recomputed from the scores.
pub fn parse_remote_response(body: Value) -> AnalyzerResult<ClassificationResult> {
    let face = match body {
        Value::Array(faces) => faces.into_iter().next(),
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(faces)) => faces.into_iter().next(),
            _ => Some(Value::Object(object)),
        },
        _ => None,
    }.ok_or(AnalyzerError::NoFaceDetected)?;

    let face: RemoteFace = serde_json::from_value(face).map_err(|err| AnalyzerError::InvalidResponse(err.to_string()))?;
    if let Some(dominant) = &face.dominant_emotion {
        Emotion::from_str(dominant).map_err(|_| AnalyzerError::InvalidResponse(format!("unknown dominant emotion {}", dominant)))?;
    }

    let emotions: EmotionScores = face.emotion.iter()
        .filter_map(|(label, value)| Some((Emotion::from_str(label).ok()?, value.as_f64()?)))
        .collect();
    let region = face.region.ok_or(AnalyzerError::InvalidResponse("missing face region".to_string()))?;
    let region = FaceRegion {
        x: region.x.max(0.0).round() as u32,
        y: region.y.max(0.0).round() as u32,
        w: region.w.max(0.0).round() as u32,
        h: region.h.max(0.0).round() as u32,
    };
    ClassificationResult::from_scores(emotions, region).ok_or(AnalyzerError::InvalidResponse("no known emotion scores".to_string()))
}
