//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{StreamError, StreamPlan};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<StreamPlan, StreamError> {
    toml::from_str(content).map_err(|e| StreamError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<StreamPlan, StreamError> {
    serde_json::from_str(content).map_err(|e| StreamError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamPlan, StreamError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[source]
uri = "rtsp://cam.local:8554/stream"
latency_ms = 150

[output]
directory = "/srv/dash"
manifest_name = "live.mpd"

[[profiles]]
id = "hd"
width = 1280
height = 720
bitrate_kbps = 3000

[timing]
reconnect_interval_secs = 3
"#;

    #[test]
    fn test_parse_toml_minimal() {
        let plan = parse_toml(MINIMAL_TOML).unwrap();
        assert_eq!(plan.source.uri, "rtsp://cam.local:8554/stream");
        assert_eq!(plan.source.latency_ms, 150);
        assert_eq!(plan.output.manifest_name, "live.mpd");
        assert_eq!(plan.timing.reconnect_interval_secs, 3);
        // 未给出的字段落到默认值
        assert_eq!(plan.source.timeout_secs, 5);
        assert_eq!(plan.timing.grace_period_ms, 1000);
        assert_eq!(plan.canonical.width, 1920);
    }

    #[test]
    fn test_parse_json() {
        let content = r#"{
            "source": { "uri": "rtsp://cam/stream" },
            "output": { "directory": "/out" },
            "profiles": [
                { "id": "sd", "width": 640, "height": 360, "bitrate_kbps": 800 }
            ]
        }"#;
        let plan = parse_json(content).unwrap();
        assert_eq!(plan.profiles[0].id, "sd");
        assert_eq!(plan.profiles[0].segment_duration_secs, 4);
    }

    #[test]
    fn test_parse_toml_invalid() {
        let result = parse_toml("source = not valid toml {");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
