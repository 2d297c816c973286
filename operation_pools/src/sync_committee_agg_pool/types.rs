use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use types::{
    altair::{containers::SyncCommitteeContribution, primitives::SubcommitteeIndex},
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

use crate::aggregation::Aggregate;

#[expect(type_alias_bounds)]
pub type ContributionAggregate<P: Preset> = Aggregate<P::SyncSubcommitteeSize>;

pub type ContributionMap<P> =
    HashMap<ContributionData, Arc<RwLock<Vec<ContributionAggregate<P>>>>>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContributionData {
    pub slot: Slot,
    pub beacon_block_root: H256,
    pub subcommittee_index: SubcommitteeIndex,
}

impl<P: Preset> From<&SyncCommitteeContribution<P>> for ContributionData {
    fn from(contribution: &SyncCommitteeContribution<P>) -> Self {
        let SyncCommitteeContribution {
            slot,
            beacon_block_root,
            subcommittee_index,
            ..
        } = *contribution;

        Self {
            slot,
            beacon_block_root,
            subcommittee_index,
        }
    }
}
