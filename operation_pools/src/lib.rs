//! Aggregation pools for attestations and sync committee contributions.
//!
//! [`AttestationAggPool`] stores attestations by their data and periodically aggregates them into
//! a set of attestations for fork choice. [`SyncCommitteeAggPool`] stores sync committee
//! contributions and builds the sync aggregate included in blocks.

pub use crate::{
    aggregation::{aggregate, Aggregate},
    attestation_agg_pool::{BatchOutcome, Manager as AttestationAggPool},
    error::{AggregationError, AggregationFailure, Error},
    manager::Manager,
    messages::PoolMessage,
    misc::PoolAdditionOutcome,
    seen_cache::SeenCache,
    sync_committee_agg_pool::{compute_sync_aggregate, Manager as SyncCommitteeAggPool},
};

pub mod combiner;

mod aggregation;
mod error;
mod manager;
mod messages;
mod misc;
mod seen_cache;

mod attestation_agg_pool {
    pub use manager::Manager;
    pub use self::types::BatchOutcome;

    mod manager;
    mod pool;
    mod tasks;
    mod types;
}

mod sync_committee_agg_pool {
    pub use manager::Manager;
    pub use tasks::compute_sync_aggregate;

    mod manager;
    mod pool;
    mod tasks;
    mod types;
}
