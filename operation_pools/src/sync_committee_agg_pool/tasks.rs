use std::sync::Arc;

use anyhow::{ensure, Result};
use bitfield::BitList;
use itertools::Itertools as _;
use prometheus_metrics::Metrics;
use rayon::iter::{IndexedParallelIterator as _, IntoParallelIterator as _, ParallelIterator as _};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use typenum::Unsigned as _;
use types::{
    altair::{
        consts::SyncCommitteeSubnetCount,
        containers::{SyncAggregate, SyncCommitteeContribution},
    },
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::{
    combiner,
    misc::{PoolAdditionOutcome, PoolTask},
    sync_committee_agg_pool::{
        pool::{self, Pool},
        types::ContributionAggregate,
    },
};

pub struct AddContributionTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub contribution: SyncCommitteeContribution<P>,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for AddContributionTask<P> {
    type Output = PoolAdditionOutcome;

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            contribution,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.sync_pool_add_contribution_times.start_timer());

        if pool.is_subset(&contribution).await {
            debug!("sync committee contribution is a known subset: {contribution:?}");

            if let Some(metrics) = metrics.as_ref() {
                metrics.received_sync_contribution_subsets.inc();
            }

            return Ok(PoolAdditionOutcome::Ignore);
        }

        Ok(pool.add_contribution(contribution).await?)
    }
}

pub struct HandleSlotTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub slot: Slot,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for HandleSlotTask<P> {
    type Output = ();

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            slot,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.sync_pool_handle_slot_times.start_timer());

        pool.on_slot(slot, metrics.as_deref()).await;

        Ok(())
    }
}

pub struct SyncAggregateTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub slot: Slot,
    pub beacon_block_root: H256,
    pub cancellation_token: CancellationToken,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for SyncAggregateTask<P> {
    type Output = SyncAggregate<P>;

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            slot,
            beacon_block_root,
            cancellation_token,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.sync_pool_sync_aggregate_times.start_timer());

        let subnets = pool.subnet_contributions(slot, beacon_block_root).await;

        tokio::task::spawn_blocking(move || {
            compute_sync_aggregate::<P>(subnets, &cancellation_token)
        })
        .await?
    }
}

/// Builds a sync aggregate from the contributions to each subnet.
///
/// Subnets are aggregated in parallel. A subnet that has no contributions, fails to aggregate,
/// or is not started before `cancellation_token` is cancelled has no participants.
pub fn compute_sync_aggregate<P: Preset>(
    subnets: Vec<Vec<ContributionAggregate<P>>>,
    cancellation_token: &CancellationToken,
) -> Result<SyncAggregate<P>> {
    ensure!(
        subnets.len() == SyncCommitteeSubnetCount::USIZE,
        "expected contributions for {} subnets, got {}",
        SyncCommitteeSubnetCount::USIZE,
        subnets.len(),
    );

    let subnet_aggregates = subnets
        .into_par_iter()
        .enumerate()
        .map(|(subnet, contributions)| {
            if cancellation_token.is_cancelled() {
                return None;
            }

            match pool::most_profitable(contributions) {
                Ok(aggregate) => aggregate,
                Err(error) => {
                    warn!("failed to aggregate sync committee contributions (subnet: {subnet}): {error}");
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    let subnet_bits = subnet_aggregates
        .iter()
        .map(|aggregate| match aggregate {
            Some(aggregate) => aggregate.aggregation_bits.clone(),
            None => BitList::full(false),
        })
        .collect_vec();

    let sync_committee_bits = BitList::concatenate(&subnet_bits)?;

    let sync_committee_signature = combiner::combine(
        subnet_aggregates
            .into_iter()
            .flatten()
            .map(|aggregate| aggregate.signature),
    );

    features::log!(
        DebugSyncAggregate,
        "computed sync aggregate (participants: {})",
        sync_committee_bits.count_ones(),
    );

    Ok(SyncAggregate {
        sync_committee_bits,
        sync_committee_signature: sync_committee_signature.into(),
    })
}
