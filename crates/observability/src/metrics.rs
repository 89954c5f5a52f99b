//! 故障切换与连接状态指标收集模块
//!
//! 由连接监视器在每次状态迁移时调用。

use contracts::{ActiveInput, ConnectionState};
use metrics::{counter, gauge};

/// 记录当前连接状态
///
/// 每个状态一个 0/1 gauge，便于 Prometheus 直接绘制状态时间线。
pub fn record_connection_state(state: ConnectionState) {
    const STATES: [ConnectionState; 5] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Live,
        ConnectionState::Degraded,
        ConnectionState::Terminated,
    ];

    for s in STATES {
        let value = if s == state { 1.0 } else { 0.0 };
        gauge!("dash_streamer_connection_state", "state" => s.to_string()).set(value);
    }
}

/// 记录一次故障切换（live -> fallback）
pub fn record_failover() {
    counter!("dash_streamer_failovers_total").increment(1);
}

/// 记录一次重连尝试
pub fn record_reconnect_attempt(attempt: u64) {
    counter!("dash_streamer_reconnect_attempts_total").increment(1);
    gauge!("dash_streamer_reconnect_attempt_current").set(attempt as f64);
}

/// 记录选择器输入切换
pub fn record_switch(target: ActiveInput) {
    counter!(
        "dash_streamer_selector_switches_total",
        "target" => target.to_string()
    )
    .increment(1);
}

/// 记录引擎错误事件
///
/// `source_error` 区分可恢复的源错误与致命的管道错误。
pub fn record_engine_error(source_error: bool) {
    let kind = if source_error { "source" } else { "pipeline" };
    counter!(
        "dash_streamer_engine_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
