use std::{env, path::{Path, PathBuf}};
use tokio::{fs::{create_dir_all, read_to_string, File}, io::AsyncWriteExt};
use serde::{Deserialize, Serialize};
use clap::Parser;
use crate::{error::Error, tools::{analyzer::{onnx::OnnxSettings, AnalyzerKind}, correction::CorrectionScale, log::{log_info, LogServiceType}}, Result};


const ENV_PORT: &str = "EMOTION_LENS_PORT";
const ENV_DIR: &str = "EMOTION_LENS_DIR";
const ENV_ANALYZER: &str = "EMOTION_LENS_ANALYZER";
const ENV_REMOTE_URL: &str = "EMOTION_LENS_REMOTE_URL";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: Option<u16>,
    #[serde(default)]
    pub analyzer: AnalyzerKind,
    pub detector_model: Option<String>,
    pub emotion_model: Option<String>,
    pub remote_url: Option<String>,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enforce_detection: bool,
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
    #[serde(default = "default_frame_sample_rate")]
    pub frame_sample_rate: u64,
    #[serde(default = "default_display_threshold")]
    pub default_threshold: f64,
    #[serde(default)]
    pub correction_scale: CorrectionScale,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            analyzer: AnalyzerKind::default(),
            detector_model: None,
            emotion_model: None,
            remote_url: None,
            remote_timeout_secs: default_remote_timeout(),
            enforce_detection: true,
            detection_threshold: default_detection_threshold(),
            intra_threads: default_intra_threads(),
            frame_sample_rate: default_frame_sample_rate(),
            default_threshold: default_display_threshold(),
            correction_scale: CorrectionScale::default(),
        }
    }
}

impl ServerConfig {
    pub fn detector_model_path(&self, local_path: &Path) -> PathBuf {
        match &self.detector_model {
            Some(path) => PathBuf::from(path),
            None => local_path.join("models").join("version-RFB-320.onnx"),
        }
    }

    pub fn emotion_model_path(&self, local_path: &Path) -> PathBuf {
        match &self.emotion_model {
            Some(path) => PathBuf::from(path),
            None => local_path.join("models").join("emotion-ferplus-8.onnx"),
        }
    }

    pub fn onnx_settings(&self) -> OnnxSettings {
        OnnxSettings {
            intra_threads: self.intra_threads.max(1),
            detection_threshold: self.detection_threshold,
            enforce_detection: self.enforce_detection,
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Folder holding config.json, models/ and the upload cache
    #[arg(short, long)]
    pub dir: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(short = 'k', long)]
    pub docker: bool,

    /// Run the dependency self check, print it and exit
    #[arg(short, long)]
    pub check: bool,
}

fn default_remote_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_detection_threshold() -> f32 {
    0.7
}

fn default_intra_threads() -> usize {
    4
}

fn default_frame_sample_rate() -> u64 {
    30
}

fn default_display_threshold() -> f64 {
    10.0
}

pub async fn initialize_config(args: &Args) -> Result<(ServerConfig, PathBuf)> {
    let local_path = get_server_local_path(args).await?;
    log_info(LogServiceType::Register, format!("LocalPath: {:?}", local_path));
    let config = get_config_with_overrides(args, &local_path).await?;
    Ok((config, local_path))
}

pub async fn get_server_local_path(args: &Args) -> Result<PathBuf> {
    let dir_path = if let Some(argdir) = &args.dir {
        PathBuf::from(argdir)
    } else if let Ok(val) = env::var(ENV_DIR) {
        PathBuf::from(&val)
    } else if args.docker {
        PathBuf::from("/config")
    } else {
        let Some(mut dir_path) = dirs::config_local_dir() else { return Err(Error::ServerUnableToAccessServerLocalFolder); };
        dir_path.push("emotion-lens");
        dir_path
    };

    let Ok(_) = create_dir_all(&dir_path).await else { return Err(Error::ServerUnableToAccessServerLocalFolder); };

    Ok(dir_path)
}

pub fn get_server_temp_dir(local_path: &Path) -> PathBuf {
    local_path.join(".cache")
}

pub fn get_server_port(args: &Args, config: &ServerConfig) -> u16 {
    args.port
        .or_else(|| env::var(ENV_PORT).ok().and_then(|p| p.parse::<u16>().ok()))
        .or(config.port)
        .unwrap_or(8080)
}

pub async fn get_config_with_overrides(args: &Args, local_path: &Path) -> Result<ServerConfig> {
    let mut config = get_raw_config(local_path).await?;

    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Ok(val) = env::var(ENV_ANALYZER) {
        match val.parse::<AnalyzerKind>() {
            Ok(kind) => config.analyzer = kind,
            Err(_) => return Err(Error::ServerMalformatedConfigFile),
        }
    }
    if let Ok(val) = env::var(ENV_REMOTE_URL) {
        config.remote_url = Some(val);
    }

    Ok(config)
}

pub async fn get_raw_config(local_path: &Path) -> Result<ServerConfig> {
    let dir_path = local_path.join("config.json");

    if let Ok(data) = read_to_string(&dir_path).await {
        parse_config(&data)
    } else {
        let new_config = ServerConfig::default();
        let new_config_string = serde_json::to_string_pretty(&new_config)?;

        let Ok(mut file) = File::create(&dir_path).await else { return Err(Error::ServerUnableToWriteConfig); };
        if file.write_all(new_config_string.as_bytes()).await.is_err() {
            return Err(Error::ServerUnableToWriteConfig);
        }
        Ok(new_config)
    }
}

pub fn parse_config(data: &str) -> Result<ServerConfig> {
    let Ok(config) = serde_json::from_str::<ServerConfig>(data) else { return Err(Error::ServerMalformatedConfigFile); };
    if !(0.0..=100.0).contains(&config.default_threshold) || config.frame_sample_rate == 0 {
        return Err(Error::ServerMalformatedConfigFile);
    }
    Ok(config)
}
