use bitfield::BitList;
use bls::AggregateSignatureBytes;
use serde::{Deserialize, Serialize};

use crate::{
    phase0::primitives::{CommitteeIndex, Epoch, Slot, H256},
    preset::Preset,
};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Attestation<P: Preset> {
    pub aggregation_bits: BitList<P::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: AggregateSignatureBytes,
}

/// The part of an attestation that all aggregation-compatible attestations share.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct AttestationData {
    #[serde(with = "serde_utils::string_or_native")]
    pub slot: Slot,
    #[serde(with = "serde_utils::string_or_native")]
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize,
)]
#[serde(deny_unknown_fields)]
pub struct Checkpoint {
    #[serde(with = "serde_utils::string_or_native")]
    pub epoch: Epoch,
    pub root: H256,
}
