use serde::{Deserialize, Deserializer, Serialize};

/// HTTP routes exposed by the daemon.
pub mod routes {
    pub const ENVIRONMENT: &str = "/api/environment";
    pub const INSTALL_LOG: &str = "/api/log";
    pub const GENERATE: &str = "/api/generate";
    pub const IMAGE_DATA: &str = "/api/image/data";
    pub const IMAGE_SAVE: &str = "/api/image/save";
}

/// Backend readiness, produced on every environment check.
///
/// `ready == false` always carries a message describing what is blocking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReadinessStatus {
    pub ready: bool,
    #[serde(default)]
    pub message: String,
}

impl ReadinessStatus {
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            ready: true,
            message: message.into(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            ready: false,
            message: message.into(),
        }
    }
}

/// Log line severity.  Serialised lowercase; anything unrecognised
/// (including the empty string) reads back as `Info`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "warning" | "warn" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Severity::parse).unwrap_or_default())
    }
}

/// One backend-emitted log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LogEntry {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    /// GetInstallLog answers with an empty entry when no line is queued.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;
pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 1024;
pub const DEFAULT_SEED: u64 = 0;

/// Parameters for one generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub steps: u32,
    pub guidance_scale: f64,
    pub width: u32,
    pub height: u32,
    pub seed: u64,
    #[serde(default)]
    pub optimize_speed: bool,
    #[serde(default)]
    pub optimize_memory: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: DEFAULT_SEED,
            optimize_speed: false,
            optimize_memory: false,
        }
    }
}

/// Outcome of a generation request.  `success == false` means `message`
/// explains the failure; `success == true` means `image_path` can be handed
/// back to the daemon for data retrieval or saving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub message: String,
}

impl GenerationResult {
    pub fn succeeded(image_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            image_path: image_path.into(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            image_path: String::new(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePathRequest {
    pub image_path: String,
}

/// Encoded image payload, ready for direct display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedImage {
    pub destination: String,
}

/// Body of every non-2xx daemon response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_use_camel_case() {
        let json = serde_json::to_value(GenerationOptions::default()).unwrap();
        assert_eq!(json["guidanceScale"], 7.5);
        assert_eq!(json["optimizeMemory"], false);
        assert_eq!(json["steps"], 20);
    }

    #[test]
    fn test_log_entry_type_field() {
        let entry: LogEntry =
            serde_json::from_str(r#"{"message":"pip done","type":"warning"}"#).unwrap();
        assert_eq!(entry.severity, Severity::Warning);
        assert!(!entry.is_empty());

        let json = serde_json::to_value(LogEntry::new("boom", Severity::Error)).unwrap();
        assert_eq!(json["type"], "error");
    }

    #[test]
    fn test_unknown_severity_defaults_to_info() {
        let entry: LogEntry = serde_json::from_str(r#"{"message":"x","type":""}"#).unwrap();
        assert_eq!(entry.severity, Severity::Info);
        let entry: LogEntry = serde_json::from_str(r#"{"message":"x","type":"debug"}"#).unwrap();
        assert_eq!(entry.severity, Severity::Info);
        let entry: LogEntry = serde_json::from_str(r#"{"message":"x"}"#).unwrap();
        assert_eq!(entry.severity, Severity::Info);
    }

    #[test]
    fn test_empty_log_entry() {
        let entry: LogEntry = serde_json::from_str(r#"{"message":"","type":""}"#).unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn test_generation_result_wire_names() {
        let result: GenerationResult = serde_json::from_str(
            r#"{"success":true,"imagePath":"/tmp/out.png","message":"ok"}"#,
        )
        .unwrap();
        assert_eq!(result, GenerationResult::succeeded("/tmp/out.png", "ok"));
    }
}
