//! Re-offer auto-resolution sweeper
//!
//! 周期扫描超过响应期限仍未回应的 re-offer，逐单强制 auto-accept。
//! 条件更新保证可重入：扫描重叠或重复触发时，已被处理的订单
//! 只会产生 Conflict，不会二次 resolve。

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::orders::lifecycle::{OrderLifecycle, Trigger};
use crate::utils::{AppError, AppResult, time};

/// One sweep's outcome (also the HTTP trigger's response body)
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Orders past their deadline at scan time
    pub scanned: usize,
    pub resolved: usize,
    /// Already moved out of REOFFER_PENDING by another writer
    pub conflicts: usize,
    pub failed: usize,
}

/// Scan once and auto-resolve every due re-offer, each order independently —
/// one failure never blocks the rest.
pub async fn sweep_once(lifecycle: &OrderLifecycle) -> AppResult<SweepReport> {
    let now = time::now_millis();
    let due = lifecycle.store().due_reoffers(now).await?;

    let mut report = SweepReport {
        scanned: due.len(),
        ..Default::default()
    };

    for order in due {
        match lifecycle.apply(&order.id_string(), Trigger::AutoResolve).await {
            Ok(_) => {
                report.resolved += 1;
                tracing::info!(order = %order.order_number, "Re-offer auto-accepted");
            }
            Err(AppError::Conflict(_)) => {
                report.conflicts += 1;
                tracing::debug!(order = %order.order_number, "Already resolved, skipping");
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(order = %order.order_number, error = %e, "Auto-resolve failed");
            }
        }
    }

    if report.scanned > 0 {
        tracing::info!(
            scanned = report.scanned,
            resolved = report.resolved,
            conflicts = report.conflicts,
            failed = report.failed,
            "Re-offer sweep finished"
        );
    }
    Ok(report)
}

/// Periodic sweeper task
///
/// 注册为后台 Periodic 任务。周期是部署参数，正确性只依赖
/// 条件更新语义，与触发频率无关。
pub struct ReofferSweeper {
    lifecycle: Arc<OrderLifecycle>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReofferSweeper {
    pub fn new(lifecycle: Arc<OrderLifecycle>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            lifecycle,
            interval,
            shutdown,
        }
    }

    /// 主循环：启动先扫一轮（补上停机期间到期的订单），然后按周期触发
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Re-offer sweeper started");

        if let Err(e) = sweep_once(&self.lifecycle).await {
            tracing::error!("Startup sweep failed: {e}");
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Re-offer sweeper received shutdown signal");
                    return;
                }
            }

            if let Err(e) = sweep_once(&self.lifecycle).await {
                tracing::error!("Re-offer sweep failed: {e}");
            }
        }
    }
}
