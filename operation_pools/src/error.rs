use itertools::Itertools as _;
use thiserror::Error;
use types::{altair::primitives::SubcommitteeIndex, phase0::containers::AttestationData};

#[derive(Debug, Error)]
pub enum Error {
    #[error("unaggregated attestation must have exactly one participant (participants: {participants})")]
    NotUnaggregated { participants: usize },
    #[error("message has no participants")]
    NoParticipants,
    #[error("subcommittee index {index} is out of bounds (subnet count: {subnet_count})")]
    SubcommitteeIndexOutOfBounds {
        index: SubcommitteeIndex,
        subnet_count: u64,
    },
    #[error("attestation bits have the wrong length (expected: {expected}, actual: {actual})")]
    InvalidAttestationLength { expected: usize, actual: usize },
    #[error("contribution bits have the wrong length (expected: {expected}, actual: {actual})")]
    InvalidContributionLength { expected: usize, actual: usize },
    #[error(transparent)]
    InvalidSignature(#[from] bls::Error),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(
        "aggregation failed for {} attestation data: {}",
        .failures.len(),
        .failures.iter().format("; "),
    )]
    BatchFailed { failures: Vec<AggregationFailure> },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum AggregationError {
    #[error("participation bits differ in length (expected: {expected}, actual: {actual})")]
    LengthMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("slot {}, committee {}: {error}", .data.slot, .data.index)]
pub struct AggregationFailure {
    pub data: AttestationData,
    pub error: AggregationError,
}
