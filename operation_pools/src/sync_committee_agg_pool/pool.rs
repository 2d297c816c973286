use std::sync::Arc;

use bitfield::BitList;
use bls::AggregateSignature;
use prometheus_metrics::Metrics;
use std_ext::ArcExt;
use tokio::sync::RwLock;
use typenum::Unsigned;
use types::{
    altair::{
        consts::SyncCommitteeSubnetCount, containers::SyncCommitteeContribution,
        primitives::SubcommitteeIndex,
    },
    config::Config,
    nonstandard::Phase,
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::{
    aggregation::{self, Aggregate},
    error::{AggregationError, Error},
    misc::PoolAdditionOutcome,
    sync_committee_agg_pool::types::{ContributionAggregate, ContributionData, ContributionMap},
};

pub struct Pool<P: Preset> {
    config: Arc<Config>,
    contributions: RwLock<ContributionMap<P>>,
}

impl<P: Preset> Pool<P> {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            contributions: RwLock::default(),
        }
    }

    pub async fn on_slot(&self, slot: Slot, metrics: Option<&Metrics>) {
        if let Some(metrics) = metrics {
            metrics.set_collection_length(
                &tynm::type_name::<Self>(),
                "contributions",
                self.contributions.read().await.len(),
            );
        }

        if let Some(previous_slot) = slot.checked_sub(1) {
            self.contributions
                .write()
                .await
                .retain(|data, _| data.slot >= previous_slot);
        }
    }

    pub async fn add_contribution(
        &self,
        contribution: SyncCommitteeContribution<P>,
    ) -> Result<PoolAdditionOutcome, Error> {
        let contribution_data = ContributionData::from(&contribution);

        let SyncCommitteeContribution {
            slot,
            subcommittee_index,
            aggregation_bits,
            signature,
            ..
        } = contribution;

        validate_subcommittee_index(subcommittee_index)?;

        let expected = P::SyncSubcommitteeSize::USIZE;
        let actual = aggregation_bits.len();

        if actual != expected {
            return Err(Error::InvalidContributionLength { expected, actual });
        }

        if aggregation_bits.not_any() {
            return Err(Error::NoParticipants);
        }

        if self.config.phase_at_slot::<P>(slot) < Phase::Altair {
            features::log!(
                DebugSyncAggregate,
                "ignoring sync committee contribution from before Altair (slot: {slot})",
            );

            return Ok(PoolAdditionOutcome::Ignore);
        }

        let aggregate = Aggregate {
            aggregation_bits,
            signature: signature.try_into()?,
        };

        let aggregates = self.aggregates(contribution_data).await;
        let mut aggregates = aggregates.write().await;

        if aggregates.iter().any(|existing| {
            aggregate
                .aggregation_bits
                .is_subset_of(&existing.aggregation_bits)
        }) {
            return Ok(PoolAdditionOutcome::Ignore);
        }

        aggregates.push(aggregate);

        Ok(PoolAdditionOutcome::Accept)
    }

    pub async fn is_subset(&self, contribution: &SyncCommitteeContribution<P>) -> bool {
        let contribution_data = ContributionData::from(contribution);

        let Some(aggregates) = self
            .contributions
            .read()
            .await
            .get(&contribution_data)
            .map(ArcExt::clone_arc)
        else {
            return false;
        };

        let is_subset = aggregates.read().await.iter().any(|aggregate| {
            contribution
                .aggregation_bits
                .is_subset_of(&aggregate.aggregation_bits)
        });

        is_subset
    }

    /// Contributions to `beacon_block_root` at `slot`, grouped by subnet in subnet order.
    pub async fn subnet_contributions(
        &self,
        slot: Slot,
        beacon_block_root: H256,
    ) -> Vec<Vec<ContributionAggregate<P>>> {
        let mut subnets = vec![];

        for subcommittee_index in 0..SyncCommitteeSubnetCount::U64 {
            let contribution_data = ContributionData {
                slot,
                beacon_block_root,
                subcommittee_index,
            };

            let aggregates = self
                .contributions
                .read()
                .await
                .get(&contribution_data)
                .map(ArcExt::clone_arc);

            let contributions = match aggregates {
                Some(aggregates) => aggregates.read().await.clone(),
                None => vec![],
            };

            subnets.push(contributions);
        }

        subnets
    }

    pub async fn best_subcommittee_contribution(
        &self,
        slot: Slot,
        beacon_block_root: H256,
        subcommittee_index: SubcommitteeIndex,
    ) -> Result<SyncCommitteeContribution<P>, Error> {
        validate_subcommittee_index(subcommittee_index)?;

        let contribution_data = ContributionData {
            slot,
            beacon_block_root,
            subcommittee_index,
        };

        let contributions = match self.contributions.read().await.get(&contribution_data) {
            Some(aggregates) => aggregates.clone_arc(),
            None => Arc::default(),
        };

        let contributions = contributions.read().await.clone();

        let aggregate = most_profitable(contributions)?.unwrap_or_else(|| Aggregate {
            aggregation_bits: BitList::full(false),
            signature: AggregateSignature::default(),
        });

        Ok(SyncCommitteeContribution {
            slot,
            beacon_block_root,
            subcommittee_index,
            aggregation_bits: aggregate.aggregation_bits,
            signature: aggregate.signature.into(),
        })
    }

    async fn aggregates(
        &self,
        data: ContributionData,
    ) -> Arc<RwLock<Vec<ContributionAggregate<P>>>> {
        if let Some(aggregates) = self.contributions.read().await.get(&data) {
            return aggregates.clone_arc();
        }

        self.contributions
            .write()
            .await
            .entry(data)
            .or_default()
            .clone_arc()
    }
}

/// Aggregates contributions to one subnet and picks the aggregate with the most participants.
///
/// Aggregates with equal bits were already merged by [`aggregation::aggregate`].
/// Of several aggregates with the most participants the first one wins.
pub fn most_profitable<N: Unsigned>(
    contributions: Vec<Aggregate<N>>,
) -> Result<Option<Aggregate<N>>, AggregationError> {
    let best = aggregation::aggregate(contributions)?
        .into_iter()
        .reduce(|best, aggregate| {
            if aggregate.participant_count() > best.participant_count() {
                aggregate
            } else {
                best
            }
        });

    Ok(best)
}

const fn validate_subcommittee_index(subcommittee_index: SubcommitteeIndex) -> Result<(), Error> {
    let subnet_count = SyncCommitteeSubnetCount::U64;

    if subcommittee_index >= subnet_count {
        return Err(Error::SubcommitteeIndexOutOfBounds {
            index: subcommittee_index,
            subnet_count,
        });
    }

    Ok(())
}
