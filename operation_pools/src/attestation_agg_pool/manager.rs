use std::sync::Arc;

use anyhow::{Context as _, Result};
use clock::{Tick, TickKind};
use prometheus_metrics::Metrics;
use std_ext::ArcExt as _;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use types::{
    combined::Attestation as CombinedAttestation,
    config::Config,
    phase0::containers::{Attestation, AttestationData},
    preset::Preset,
};

use crate::{
    attestation_agg_pool::{
        pool::Pool,
        tasks::{AggregateUnaggregatedTask, AttestationSource, BatchTask, InsertAttestationsTask},
        types::BatchOutcome,
    },
    misc::{PoolAdditionOutcome, PoolTask},
};

pub struct Manager<P: Preset> {
    config: Arc<Config>,
    pool: Arc<Pool<P>>,
    cancellation_token: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl<P: Preset> Manager<P> {
    #[must_use]
    pub fn new(config: Arc<Config>, metrics: Option<Arc<Metrics>>) -> Arc<Self> {
        Arc::new(Self {
            config,
            pool: Arc::new(Pool::new()),
            cancellation_token: CancellationToken::new(),
            metrics,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub async fn on_tick(&self, tick: Tick) {
        let Tick { slot, kind } = tick;

        match kind {
            TickKind::Propose => self.pool.on_slot(slot, self.metrics.as_deref()).await,
            TickKind::AttestFourth => self.aggregate_unaggregated_detached(),
            TickKind::AggregateFourth => self.batch_detached(),
            _ => {}
        }
    }

    pub async fn save_unaggregated(
        &self,
        attestations: Vec<CombinedAttestation<P>>,
    ) -> Result<Vec<PoolAdditionOutcome>> {
        self.insert(attestations, AttestationSource::Unaggregated)
            .await
    }

    pub async fn save_aggregated(
        &self,
        attestations: Vec<CombinedAttestation<P>>,
    ) -> Result<Vec<PoolAdditionOutcome>> {
        self.insert(attestations, AttestationSource::Aggregated).await
    }

    pub async fn save_block_included(
        &self,
        attestations: Vec<CombinedAttestation<P>>,
    ) -> Result<Vec<PoolAdditionOutcome>> {
        self.insert(attestations, AttestationSource::BlockIncluded)
            .await
    }

    pub async fn aggregate_unaggregated(&self) -> Result<usize> {
        self.spawn_task(AggregateUnaggregatedTask {
            pool: self.pool.clone_arc(),
            cancellation_token: self.cancellation_token.child_token(),
            metrics: self.metrics.clone(),
        })
        .await
    }

    pub fn aggregate_unaggregated_detached(&self) {
        self.spawn_detached(AggregateUnaggregatedTask {
            pool: self.pool.clone_arc(),
            cancellation_token: self.cancellation_token.child_token(),
            metrics: self.metrics.clone(),
        })
    }

    pub async fn batch(&self) -> Result<BatchOutcome> {
        self.spawn_task(BatchTask {
            pool: self.pool.clone_arc(),
            cancellation_token: self.cancellation_token.child_token(),
            metrics: self.metrics.clone(),
        })
        .await
    }

    pub fn batch_detached(&self) {
        self.spawn_detached(BatchTask {
            pool: self.pool.clone_arc(),
            cancellation_token: self.cancellation_token.child_token(),
            metrics: self.metrics.clone(),
        })
    }

    pub async fn forkchoice_attestations(&self) -> Vec<CombinedAttestation<P>> {
        self.tag(self.pool.forkchoice_attestations().await)
    }

    pub async fn unaggregated_attestations(&self) -> Vec<CombinedAttestation<P>> {
        self.tag(self.pool.unaggregated_attestations().await)
    }

    pub async fn aggregated_attestations(&self) -> Vec<CombinedAttestation<P>> {
        self.tag(self.pool.aggregated_attestations().await)
    }

    pub async fn block_included_attestations(&self) -> Vec<CombinedAttestation<P>> {
        self.tag(self.pool.block_included_attestations().await)
    }

    pub async fn best_aggregate_attestation(
        &self,
        data: AttestationData,
    ) -> Option<CombinedAttestation<P>> {
        let attestation = self.pool.best_aggregate_attestation(data).await?;
        Some(CombinedAttestation::new(&self.config, attestation))
    }

    pub async fn attestation_count(&self) -> usize {
        self.pool.attestation_count().await
    }

    /// Cancels running and future aggregation tasks.
    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }

    async fn insert(
        &self,
        attestations: Vec<CombinedAttestation<P>>,
        source: AttestationSource,
    ) -> Result<Vec<PoolAdditionOutcome>> {
        let attestations = attestations
            .into_iter()
            .map(CombinedAttestation::into_inner)
            .collect();

        self.spawn_task(InsertAttestationsTask {
            pool: self.pool.clone_arc(),
            attestations,
            source,
            metrics: self.metrics.clone(),
        })
        .await
    }

    fn tag(&self, attestations: Vec<Attestation<P>>) -> Vec<CombinedAttestation<P>> {
        attestations
            .into_iter()
            .map(|attestation| CombinedAttestation::new(&self.config, attestation))
            .collect()
    }

    async fn spawn_task<T: PoolTask>(&self, task: T) -> Result<T::Output> {
        tokio::spawn(task.run())
            .await
            .context("attestation aggregation pool task failed")?
    }

    fn spawn_detached(&self, task: impl PoolTask) {
        tokio::spawn(async move {
            if let Err(error) = task.run().await {
                warn!("attestation aggregation pool task failed: {error:?}");
            }
        });
    }
}
