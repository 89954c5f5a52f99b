//! StreamPlan - Config Loader 的输出
//!
//! 描述一个完整的流会话：live 源地址、输出布局、规范中间格式、
//! 质量档位阶梯和故障切换时序参数。会话启动后不可变。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPlan {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// live 源设置
    pub source: SourceSettings,

    /// 输出产物布局
    pub output: OutputSettings,

    /// 两路源分支共同归一化到的规范中间格式
    #[serde(default)]
    pub canonical: CanonicalFormat,

    /// 质量档位阶梯（每项一条打包分支）
    pub profiles: Vec<Profile>,

    /// 故障切换时序
    #[serde(default)]
    pub timing: TimingSettings,
}

/// Live source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Network address of the live feed (URI-like, e.g. rtsp://...)
    pub uri: String,

    /// Receive jitter buffer in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Network negotiation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_latency_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    5
}

/// Output artifact layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory receiving the manifest and all segment series
    pub directory: PathBuf,

    /// Manifest file name, fixed relative to the output directory
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
}

fn default_manifest_name() -> String {
    "manifest.mpd".to_string()
}

impl OutputSettings {
    /// Full manifest path for Packager configuration
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(&self.manifest_name)
    }
}

/// Canonical raw format produced by both source branches
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CanonicalFormat {
    pub width: u32,
    pub height: u32,
    /// Frames per second
    pub framerate: u32,
}

impl Default for CanonicalFormat {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            framerate: 25,
        }
    }
}

/// 一条打包分支的目标质量配置
///
/// 启动时从配置创建一次，之后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier, also names the segment series
    pub id: String,

    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,

    /// Target bitrate in kilobits per second
    pub bitrate_kbps: u32,

    /// Segment duration in seconds; fixed per session, so all profiles
    /// must agree on it (enforced by the config validator)
    #[serde(default = "default_segment_duration")]
    pub segment_duration_secs: u32,
}

fn default_segment_duration() -> u32 {
    4
}

/// Failover timing knobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Constant interval between live-source reconnect attempts, seconds
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,

    /// Grace delay between a ready decode chain and the switch to live,
    /// milliseconds; absorbs startup jitter before committing the switch
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
}

fn default_reconnect_interval() -> u64 {
    5
}

fn default_grace_period() -> u64 {
    1000
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            reconnect_interval_secs: default_reconnect_interval(),
            grace_period_ms: default_grace_period(),
        }
    }
}

impl TimingSettings {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl StreamPlan {
    /// Plan with the default profile ladder (fullhd + hd), used when no
    /// configuration file is given.
    pub fn with_defaults(uri: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            version: ConfigVersion::V1,
            source: SourceSettings {
                uri: uri.into(),
                latency_ms: default_latency_ms(),
                timeout_secs: default_timeout_secs(),
            },
            output: OutputSettings {
                directory: output_dir.into(),
                manifest_name: default_manifest_name(),
            },
            canonical: CanonicalFormat::default(),
            profiles: vec![
                Profile {
                    id: "fullhd".to_string(),
                    width: 1920,
                    height: 1080,
                    bitrate_kbps: 5000,
                    segment_duration_secs: default_segment_duration(),
                },
                Profile {
                    id: "hd".to_string(),
                    width: 1280,
                    height: 720,
                    bitrate_kbps: 3000,
                    segment_duration_secs: default_segment_duration(),
                },
            ],
            timing: TimingSettings::default(),
        }
    }
}
