//! 配置校验模块
//!
//! 校验规则：
//! - source.uri 非空且带 scheme
//! - output.directory / manifest_name 非空
//! - profiles 非空，profile id 唯一
//! - 分辨率与码率 > 0
//! - segment_duration 全局一致且 > 0
//! - 时序参数 > 0

use std::collections::HashSet;

use contracts::{StreamError, StreamPlan};

/// 校验 StreamPlan 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(plan: &StreamPlan) -> Result<(), StreamError> {
    validate_source(plan)?;
    validate_output(plan)?;
    validate_profiles(plan)?;
    validate_timing(plan)?;
    Ok(())
}

/// 校验 live 源设置
fn validate_source(plan: &StreamPlan) -> Result<(), StreamError> {
    if plan.source.uri.trim().is_empty() {
        return Err(StreamError::config_validation("source.uri", "must not be empty"));
    }
    if !plan.source.uri.contains("://") {
        return Err(StreamError::config_validation(
            "source.uri",
            "must be a full uri with a scheme (e.g. rtsp://...)",
        ));
    }
    if plan.source.timeout_secs == 0 {
        return Err(StreamError::config_validation(
            "source.timeout_secs",
            "must be greater than zero",
        ));
    }
    Ok(())
}

/// 校验输出布局
fn validate_output(plan: &StreamPlan) -> Result<(), StreamError> {
    if plan.output.directory.as_os_str().is_empty() {
        return Err(StreamError::config_validation(
            "output.directory",
            "must not be empty",
        ));
    }
    if plan.output.manifest_name.trim().is_empty() {
        return Err(StreamError::config_validation(
            "output.manifest_name",
            "must not be empty",
        ));
    }
    Ok(())
}

/// 校验质量档位阶梯
fn validate_profiles(plan: &StreamPlan) -> Result<(), StreamError> {
    if plan.profiles.is_empty() {
        return Err(StreamError::config_validation(
            "profiles",
            "at least one profile is required",
        ));
    }

    let mut seen = HashSet::new();
    for profile in &plan.profiles {
        if profile.id.trim().is_empty() {
            return Err(StreamError::config_validation("profiles[].id", "must not be empty"));
        }
        if !seen.insert(&profile.id) {
            return Err(StreamError::config_validation(
                format!("profiles[id={}]", profile.id),
                "duplicate profile id",
            ));
        }
        if profile.width == 0 || profile.height == 0 {
            return Err(StreamError::config_validation(
                format!("profiles[id={}]", profile.id),
                "width and height must be greater than zero",
            ));
        }
        if profile.bitrate_kbps == 0 {
            return Err(StreamError::config_validation(
                format!("profiles[id={}].bitrate_kbps", profile.id),
                "must be greater than zero",
            ));
        }
        if profile.segment_duration_secs == 0 {
            return Err(StreamError::config_validation(
                format!("profiles[id={}].segment_duration_secs", profile.id),
                "must be greater than zero",
            ));
        }
    }

    // 清单是整个会话一份，分片时长必须全局一致
    let first = plan.profiles[0].segment_duration_secs;
    if let Some(other) = plan
        .profiles
        .iter()
        .find(|p| p.segment_duration_secs != first)
    {
        return Err(StreamError::config_validation(
            format!("profiles[id={}].segment_duration_secs", other.id),
            "all profiles must share the same segment duration",
        ));
    }
    Ok(())
}

/// 校验时序参数
fn validate_timing(plan: &StreamPlan) -> Result<(), StreamError> {
    if plan.timing.reconnect_interval_secs == 0 {
        return Err(StreamError::config_validation(
            "timing.reconnect_interval_secs",
            "must be greater than zero",
        ));
    }
    if plan.canonical.width == 0 || plan.canonical.height == 0 || plan.canonical.framerate == 0 {
        return Err(StreamError::config_validation(
            "canonical",
            "width, height and framerate must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Profile;

    fn valid_plan() -> StreamPlan {
        StreamPlan::with_defaults("rtsp://cam/stream", "/srv/dash")
    }

    #[test]
    fn test_valid_plan_passes() {
        assert!(validate(&valid_plan()).is_ok());
    }

    #[test]
    fn test_empty_uri_rejected() {
        let mut plan = valid_plan();
        plan.source.uri = "  ".to_string();
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("source.uri"));
    }

    #[test]
    fn test_uri_without_scheme_rejected() {
        let mut plan = valid_plan();
        plan.source.uri = "cam.local/stream".to_string();
        assert!(validate(&plan).is_err());
    }

    #[test]
    fn test_empty_profiles_rejected() {
        let mut plan = valid_plan();
        plan.profiles.clear();
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("at least one profile"));
    }

    #[test]
    fn test_duplicate_profile_id_rejected() {
        let mut plan = valid_plan();
        let mut copy = plan.profiles[0].clone();
        copy.width = 640;
        plan.profiles.push(copy);
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_zero_bitrate_rejected() {
        let mut plan = valid_plan();
        plan.profiles[0].bitrate_kbps = 0;
        assert!(validate(&plan).is_err());
    }

    #[test]
    fn test_mixed_segment_durations_rejected() {
        let mut plan = valid_plan();
        plan.profiles.push(Profile {
            id: "sd".to_string(),
            width: 640,
            height: 360,
            bitrate_kbps: 800,
            segment_duration_secs: 2,
        });
        let err = validate(&plan).unwrap_err();
        assert!(err.to_string().contains("same segment duration"));
    }

    #[test]
    fn test_zero_reconnect_interval_rejected() {
        let mut plan = valid_plan();
        plan.timing.reconnect_interval_secs = 0;
        assert!(validate(&plan).is_err());
    }
}
