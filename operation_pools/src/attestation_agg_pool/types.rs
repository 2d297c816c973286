use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::Mutex;
use types::{
    phase0::containers::{Attestation, AttestationData},
    preset::Preset,
};

use crate::aggregation::Aggregate;

#[expect(type_alias_bounds)]
pub type AttestationAggregate<P: Preset> = Aggregate<P::MaxValidatorsPerCommittee>;

// Use `BTreeMap` to make batches process attestation data in a deterministic order.
pub type BucketMap<P> = BTreeMap<AttestationData, Arc<Mutex<Buckets<P>>>>;

/// Every attestation known for one `AttestationData`.
///
/// Attestations in each bucket are kept in insertion order.
pub struct Buckets<P: Preset> {
    pub unaggregated: Vec<AttestationAggregate<P>>,
    pub aggregated: Vec<AttestationAggregate<P>>,
    pub block_included: Vec<AttestationAggregate<P>>,
    pub forkchoice: Vec<AttestationAggregate<P>>,
}

impl<P: Preset> Default for Buckets<P> {
    fn default() -> Self {
        Self {
            unaggregated: vec![],
            aggregated: vec![],
            block_included: vec![],
            forkchoice: vec![],
        }
    }
}

impl<P: Preset> Buckets<P> {
    /// Returns `true` if anything was stored since the last batch.
    pub fn has_batch_input(&self) -> bool {
        !self.unaggregated.is_empty()
            || !self.aggregated.is_empty()
            || !self.block_included.is_empty()
    }

    /// Length of the participation bits stored for this data, if anything is stored.
    pub fn committee_length(&self) -> Option<usize> {
        self.forkchoice
            .iter()
            .chain(&self.unaggregated)
            .chain(&self.aggregated)
            .chain(&self.block_included)
            .map(|aggregate| aggregate.aggregation_bits.len())
            .next()
    }

    /// Everything a batch consumes, with existing fork choice aggregates first.
    pub fn batch_input(&self) -> Vec<AttestationAggregate<P>> {
        self.forkchoice
            .iter()
            .chain(&self.unaggregated)
            .chain(&self.aggregated)
            .chain(&self.block_included)
            .cloned()
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct BatchOutcome {
    pub processed: usize,
    pub aggregates: usize,
    pub cancelled: bool,
}

pub fn to_attestation<P: Preset>(
    data: AttestationData,
    aggregate: AttestationAggregate<P>,
) -> Attestation<P> {
    let Aggregate {
        aggregation_bits,
        signature,
    } = aggregate;

    Attestation {
        aggregation_bits,
        data,
        signature: signature.into(),
    }
}
