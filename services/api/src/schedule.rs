use chrono::Utc;
use installer_market::marketplace::{
    EvaluationRepository, MarketplaceService, RecalculationSummary, WorkOrderRepository,
    WorkerGradeRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Periodically regrades every evaluated contractor so tiers follow
/// evaluations leaving the recency window even when nothing new arrives.
pub(crate) fn spawn_regrade_schedule<W, E, G>(
    service: Arc<MarketplaceService<W, E, G>>,
    period: Duration,
) -> JoinHandle<()>
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs(), "grade recalculation schedule started");

        loop {
            ticker.tick().await;
            regrade_once(service.as_ref());
        }
    })
}

pub(crate) fn regrade_once<W, E, G>(
    service: &MarketplaceService<W, E, G>,
) -> Option<RecalculationSummary>
where
    W: WorkOrderRepository + 'static,
    E: EvaluationRepository + 'static,
    G: WorkerGradeRepository + 'static,
{
    match service.recalculate_all(Utc::now()) {
        Ok(summary) => {
            info!(
                workers = summary.workers,
                graded = summary.graded,
                tier_changes = summary.tier_changes,
                "scheduled grade recalculation finished"
            );
            Some(summary)
        }
        Err(err) => {
            warn!(error = %err, "scheduled grade recalculation failed");
            None
        }
    }
}
