use std::sync::Arc;

use anyhow::Result;
use prometheus_metrics::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use types::{phase0::containers::Attestation, preset::Preset};

use crate::{
    attestation_agg_pool::{pool::Pool, types::BatchOutcome},
    error::Error,
    misc::{PoolAdditionOutcome, PoolTask},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttestationSource {
    Unaggregated,
    Aggregated,
    BlockIncluded,
}

pub struct InsertAttestationsTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub attestations: Vec<Attestation<P>>,
    pub source: AttestationSource,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for InsertAttestationsTask<P> {
    type Output = Vec<PoolAdditionOutcome>;

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            attestations,
            source,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.att_pool_insert_times.start_timer());

        let outcomes = match source {
            AttestationSource::Unaggregated => pool.save_unaggregated(attestations).await?,
            AttestationSource::Aggregated => {
                let outcomes = pool.save_aggregated(attestations).await?;

                let ignored = outcomes
                    .iter()
                    .filter(|outcome| !outcome.is_publishable())
                    .count();

                if let Some(metrics) = metrics.as_ref() {
                    metrics
                        .received_aggregated_attestation_subsets
                        .inc_by(ignored.try_into().unwrap_or(u64::MAX));
                }

                outcomes
            }
            AttestationSource::BlockIncluded => {
                let mut outcomes = Vec::with_capacity(attestations.len());

                for attestation in attestations {
                    outcomes.push(pool.save_block_included(attestation).await?);
                }

                outcomes
            }
        };

        debug!(
            "inserted attestations into pool (source: {source:?}, outcomes: {outcomes:?})",
        );

        Ok(outcomes)
    }
}

pub struct AggregateUnaggregatedTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub cancellation_token: CancellationToken,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for AggregateUnaggregatedTask<P> {
    type Output = usize;

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            cancellation_token,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.att_pool_aggregate_unaggregated_times.start_timer());

        let result = pool.aggregate_unaggregated(&cancellation_token).await;

        if let Err(Error::BatchFailed { failures }) = &result {
            report_failures(metrics.as_deref(), failures.len());
        }

        Ok(result?)
    }
}

pub struct BatchTask<P: Preset> {
    pub pool: Arc<Pool<P>>,
    pub cancellation_token: CancellationToken,
    pub metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> PoolTask for BatchTask<P> {
    type Output = BatchOutcome;

    async fn run(self) -> Result<Self::Output> {
        let Self {
            pool,
            cancellation_token,
            metrics,
        } = self;

        let _timer = metrics
            .as_ref()
            .map(|metrics| metrics.att_pool_batch_times.start_timer());

        let result = pool.batch(&cancellation_token).await;

        match &result {
            Ok(outcome) => {
                features::log!(
                    DebugAttestationBatch,
                    "attestation batch completed (processed: {}, aggregates: {}, cancelled: {})",
                    outcome.processed,
                    outcome.aggregates,
                    outcome.cancelled,
                );
            }
            Err(Error::BatchFailed { failures }) => {
                for failure in failures {
                    warn!("failed to aggregate attestations in batch: {failure}");
                }

                report_failures(metrics.as_deref(), failures.len());
            }
            Err(_) => {}
        }

        Ok(result?)
    }
}

fn report_failures(metrics: Option<&Metrics>, count: usize) {
    if let Some(metrics) = metrics {
        metrics
            .att_pool_aggregation_failures
            .inc_by(count.try_into().unwrap_or(u64::MAX));
    }
}
