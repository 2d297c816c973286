use anyhow::Result;
use prometheus::{histogram_opts, opts, Histogram, IntCounter, IntGaugeVec, Registry};
use tracing::warn;

#[derive(Debug)]
pub struct Metrics {
    // Collection lengths
    collection_lengths: IntGaugeVec,

    // Attestation aggregation pool
    pub att_pool_insert_times: Histogram,
    pub att_pool_aggregate_unaggregated_times: Histogram,
    pub att_pool_batch_times: Histogram,
    pub att_pool_aggregation_failures: IntCounter,
    pub received_aggregated_attestation_subsets: IntCounter,

    // Sync committee contribution aggregation pool
    pub sync_pool_add_contribution_times: Histogram,
    pub sync_pool_sync_aggregate_times: Histogram,
    pub sync_pool_handle_slot_times: Histogram,
    pub received_sync_contribution_subsets: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            collection_lengths: IntGaugeVec::new(
                opts!("COLLECTION_LENGTHS", "Number of items in each collection"),
                &["type", "name"],
            )?,

            att_pool_insert_times: Histogram::with_opts(histogram_opts!(
                "ATT_POOL_INSERT_TIMES",
                "Attestation agg pool insert attestation task times",
            ))?,

            att_pool_aggregate_unaggregated_times: Histogram::with_opts(histogram_opts!(
                "ATT_POOL_AGGREGATE_UNAGGREGATED_TIMES",
                "Attestation agg pool aggregate unaggregated attestations task times",
            ))?,

            att_pool_batch_times: Histogram::with_opts(histogram_opts!(
                "ATT_POOL_BATCH_TIMES",
                "Attestation agg pool batch fork choice attestations task times",
            ))?,

            att_pool_aggregation_failures: IntCounter::new(
                "ATT_POOL_AGGREGATION_FAILURES",
                "Number of attestation data roots that failed to aggregate in a batch",
            )?,

            received_aggregated_attestation_subsets: IntCounter::new(
                "RECEIVED_AGGREGATED_ATTESTATION_SUBSETS",
                "Number of received aggregated attestations that are subsets of already known aggregates",
            )?,

            sync_pool_add_contribution_times: Histogram::with_opts(histogram_opts!(
                "SYNC_POOL_ADD_CONTRIBUTION_TIMES",
                "Sync committee contribution agg pool add contribution task times",
            ))?,

            sync_pool_sync_aggregate_times: Histogram::with_opts(histogram_opts!(
                "SYNC_POOL_SYNC_AGGREGATE_TIMES",
                "Sync committee contribution agg pool compute sync aggregate times",
            ))?,

            sync_pool_handle_slot_times: Histogram::with_opts(histogram_opts!(
                "SYNC_POOL_HANDLE_SLOT_TIMES",
                "Sync committee contribution agg pool handle slot times",
            ))?,

            received_sync_contribution_subsets: IntCounter::new(
                "RECEIVED_SYNC_CONTRIBUTION_SUBSETS",
                "Number of received sync contributions that are subsets of already known contributions",
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        self.register(prometheus::default_registry())
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.collection_lengths.clone()))?;
        registry.register(Box::new(self.att_pool_insert_times.clone()))?;
        registry.register(Box::new(self.att_pool_aggregate_unaggregated_times.clone()))?;
        registry.register(Box::new(self.att_pool_batch_times.clone()))?;
        registry.register(Box::new(self.att_pool_aggregation_failures.clone()))?;
        registry.register(Box::new(self.received_aggregated_attestation_subsets.clone()))?;
        registry.register(Box::new(self.sync_pool_add_contribution_times.clone()))?;
        registry.register(Box::new(self.sync_pool_sync_aggregate_times.clone()))?;
        registry.register(Box::new(self.sync_pool_handle_slot_times.clone()))?;
        registry.register(Box::new(self.received_sync_contribution_subsets.clone()))?;

        Ok(())
    }

    // Collection Lengths
    pub fn set_collection_length(&self, typename: &str, collection_name: &str, value: usize) {
        match self
            .collection_lengths
            .get_metric_with_label_values(&[typename, collection_name])
        {
            Ok(gauge) => gauge.set(i64::try_from(value).unwrap_or(i64::MAX)),
            Err(error) => {
                warn!("unable to set length of {typename}.{collection_name}: {error:?}")
            }
        }
    }
}
