use std::sync::Arc;

use anyhow::{Context as _, Result};
use prometheus_metrics::Metrics;
use std_ext::ArcExt as _;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use types::{
    altair::{
        containers::{SyncAggregate, SyncCommitteeContribution},
        primitives::SubcommitteeIndex,
    },
    config::Config,
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::{
    misc::{PoolAdditionOutcome, PoolTask},
    sync_committee_agg_pool::{
        pool::Pool,
        tasks::{AddContributionTask, HandleSlotTask, SyncAggregateTask},
    },
};

pub struct Manager<P: Preset> {
    pool: Arc<Pool<P>>,
    cancellation_token: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> Manager<P> {
    #[must_use]
    pub fn new(config: Arc<Config>, metrics: Option<Arc<Metrics>>) -> Arc<Self> {
        Arc::new(Self {
            pool: Arc::new(Pool::new(config)),
            cancellation_token: CancellationToken::new(),
            metrics,
        })
    }

    pub fn on_slot(&self, slot: Slot) {
        self.spawn_detached(HandleSlotTask {
            pool: self.pool.clone_arc(),
            slot,
            metrics: self.metrics.clone(),
        })
    }

    pub async fn add_contribution(
        &self,
        contribution: SyncCommitteeContribution<P>,
    ) -> Result<PoolAdditionOutcome> {
        self.spawn_task(AddContributionTask {
            pool: self.pool.clone_arc(),
            contribution,
            metrics: self.metrics.clone(),
        })
        .await
    }

    pub fn add_contribution_detached(&self, contribution: SyncCommitteeContribution<P>) {
        self.spawn_detached(AddContributionTask {
            pool: self.pool.clone_arc(),
            contribution,
            metrics: self.metrics.clone(),
        })
    }

    pub async fn best_subcommittee_contribution(
        &self,
        slot: Slot,
        beacon_block_root: H256,
        subcommittee_index: SubcommitteeIndex,
    ) -> Result<SyncCommitteeContribution<P>> {
        self.pool
            .best_subcommittee_contribution(slot, beacon_block_root, subcommittee_index)
            .await
            .map_err(Into::into)
    }

    /// Computes the sync aggregate to include in a block proposed on top of `beacon_block_root`.
    ///
    /// Falls back to an empty sync aggregate if aggregation fails.
    pub async fn sync_aggregate(&self, slot: Slot, beacon_block_root: H256) -> SyncAggregate<P> {
        let task = SyncAggregateTask {
            pool: self.pool.clone_arc(),
            slot,
            beacon_block_root,
            cancellation_token: self.cancellation_token.child_token(),
            metrics: self.metrics.clone(),
        };

        match self.spawn_task(task).await {
            Ok(sync_aggregate) => sync_aggregate,
            Err(error) => {
                warn!("failed to compute sync aggregate (slot: {slot}): {error:?}");
                SyncAggregate::empty()
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }

    async fn spawn_task<T: PoolTask>(&self, task: T) -> Result<T::Output> {
        tokio::spawn(task.run())
            .await
            .context("sync committee aggregation pool task failed")?
    }

    fn spawn_detached(&self, task: impl PoolTask) {
        tokio::spawn(async move {
            if let Err(error) = task.run().await {
                warn!("sync committee aggregation pool task failed: {error:?}");
            }
        });
    }
}
