use bitfield::BitList;
use bls::AggregateSignatureBytes;
use serde::{Deserialize, Serialize};

use crate::{
    altair::primitives::SubcommitteeIndex,
    phase0::primitives::{Slot, H256},
    preset::Preset,
};

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncAggregate<P: Preset> {
    pub sync_committee_bits: BitList<P::SyncCommitteeSize>,
    pub sync_committee_signature: AggregateSignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncCommitteeContribution<P: Preset> {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    pub beacon_block_root: H256,
    #[serde(with = "serde_utils::string_or_native")]
    pub subcommittee_index: SubcommitteeIndex,
    pub aggregation_bits: BitList<P::SyncSubcommitteeSize>,
    pub signature: AggregateSignatureBytes,
}
