use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::log::{log_error, log_info, LogServiceType};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    pub dependency: String,
    pub available: bool,
    pub version: Option<String>,
    pub error: Option<String>,
}

impl DependencyStatus {
    pub fn ok(dependency: &str, version: Option<String>) -> Self {
        Self { dependency: dependency.to_string(), available: true, version, error: None }
    }

    pub fn failed(dependency: &str, error: String) -> Self {
        Self { dependency: dependency.to_string(), available: false, version: None, error: Some(error) }
    }
}

/// Result of the startup self check.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelfCheckReport {
    pub version: String,
    pub analyzer: Option<String>,
    pub analysis_available: bool,
    pub checked_at: DateTime<Utc>,
    pub dependencies: Vec<DependencyStatus>,
}

impl SelfCheckReport {
    pub fn new(analyzer: Option<&str>, dependencies: Vec<DependencyStatus>) -> Self {
        let analysis_available = analyzer.is_some() && dependencies.iter().all(|d| d.available);
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            analyzer: analyzer.map(|a| a.to_string()),
            analysis_available,
            checked_at: Utc::now(),
            dependencies,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &DependencyStatus> {
        self.dependencies.iter().filter(|d| !d.available)
    }

    /// Names of the failed dependencies, comma separated.
    pub fn failure_summary(&self) -> String {
        self.failures().map(|d| d.dependency.as_str()).collect::<Vec<_>>().join(", ")
    }

    pub fn log(&self) {
        for dependency in self.dependencies.iter().filter(|d| d.available) {
            log_info(LogServiceType::Health, format!("{}: available {}", dependency.dependency, dependency.version.clone().unwrap_or_default()));
        }
        for dependency in self.failures() {
            log_error(LogServiceType::Health, format!("{}: unavailable ({})", dependency.dependency, dependency.error.clone().unwrap_or_default()));
        }
        if !self.analysis_available {
            let failed = match self.failure_summary() {
                summary if summary.is_empty() => "no analyzer configured".to_string(),
                summary => format!("failed: {}", summary),
            };
            log_error(LogServiceType::Health, format!("Emotion analysis unavailable, running in fallback mode ({})", failed));
        }
    }

    /// Plain text rendition for the `--check` command.
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("emotion-lens {}", self.version)];
        for dependency in &self.dependencies {
            let line = match (dependency.available, &dependency.error) {
                (true, _) => format!("[ok]   {} {}", dependency.dependency, dependency.version.clone().unwrap_or_default()),
                (false, Some(error)) => format!("[fail] {}: {}", dependency.dependency, error),
                (false, None) => format!("[fail] {}", dependency.dependency),
            };
            lines.push(line.trim_end().to_string());
        }
        lines.push(if self.analysis_available { "analysis available".to_string() } else { "analysis unavailable (fallback mode)".to_string() });
        lines.join("\n")
    }
}

/// Temporary upload files go in `dir`; it must accept a write and a delete.
pub async fn check_temp_dir(dir: &Path) -> DependencyStatus {
    let check_file = dir.join(format!(".write-check-{}", nanoid::nanoid!()));
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&check_file, b"ok").await?;
        tokio::fs::remove_file(&check_file).await
    }.await;
    match result {
        Ok(_) => DependencyStatus::ok("temp-dir", None),
        Err(err) => DependencyStatus::failed("temp-dir", format!("{}: {}", dir.display(), err)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_without_analyzer() {
        let report = SelfCheckReport::new(None, vec![DependencyStatus::ok("temp-dir", None)]);
        assert!(!report.analysis_available);
        assert_eq!(report.failure_summary(), "");
        assert!(report.to_text().ends_with("analysis unavailable (fallback mode)"));
    }

    #[test]
    fn failed_dependency_disables_analysis() {
        let report = SelfCheckReport::new(Some("onnx"), vec![
            DependencyStatus::ok("temp-dir", None),
            DependencyStatus::failed("emotion-model", "missing".to_string()),
        ]);
        assert!(!report.analysis_available);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failure_summary(), "emotion-model");
        assert!(report.to_text().contains("[fail] emotion-model: missing"));
    }

    #[tokio::test]
    async fn temp_dir_accepts_write_and_delete() {
        let dir = std::env::temp_dir().join(format!("emotion-lens-health-{}", nanoid::nanoid!()));
        let status = check_temp_dir(&dir).await;
        assert!(status.available);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
