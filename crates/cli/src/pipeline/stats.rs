//! 会话统计与报告。

use std::time::Duration;

use failover::{SessionOutcome, SessionStats, StopReason};

/// 一次会话运行的最终报告
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// 会话结束原因
    pub reason: StopReason,

    /// 会话总时长
    pub duration: Duration,

    /// 故障切换计数
    pub stats: SessionStats,

    /// 打包分支数量
    pub active_profiles: usize,
}

impl SessionReport {
    pub fn new(outcome: SessionOutcome, duration: Duration) -> Self {
        Self {
            reason: outcome.reason,
            duration,
            stats: outcome.stats,
            active_profiles: outcome.graph.profile_branches.len(),
        }
    }

    /// 结束原因的简短标签（用于结构化日志）
    pub fn reason_label(&self) -> &'static str {
        match self.reason {
            StopReason::Requested => "requested",
            StopReason::EndOfStream => "end_of_stream",
            StopReason::PipelineFatal { .. } => "pipeline_fatal",
        }
    }

    /// 打印详细摘要
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Session Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {}", self.reason_label());
        println!("   └─ Active profiles: {}", self.active_profiles);

        println!("\nFailover");
        println!("   ├─ Switches to live: {}", self.stats.switches_to_live);
        println!("   ├─ Failovers to fallback: {}", self.stats.failovers);
        println!("   ├─ Reconnect attempts: {}", self.stats.reconnect_attempts);
        println!("   └─ Engine errors: {}", self.stats.engine_errors);

        if let StopReason::PipelineFatal { node, ref message } = self.reason {
            println!("\n⚠ Fatal pipeline error");
            println!("   └─ node {}: {}", node, message);
        }

        println!();
    }
}
