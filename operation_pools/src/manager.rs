use std::sync::Arc;

use anyhow::Result;
use futures::{channel::mpsc::UnboundedReceiver, StreamExt as _};
use tracing::info;
use types::preset::Preset;

use crate::{messages::PoolMessage, AttestationAggPool, SyncCommitteeAggPool};

pub struct Manager<P: Preset> {
    pub attestation_agg_pool: Arc<AttestationAggPool<P>>,
    pub sync_committee_agg_pool: Arc<SyncCommitteeAggPool<P>>,
    pub pool_rx: UnboundedReceiver<PoolMessage>,
}

impl<P: Preset> Manager<P> {
    #[must_use]
    pub const fn new(
        attestation_agg_pool: Arc<AttestationAggPool<P>>,
        sync_committee_agg_pool: Arc<SyncCommitteeAggPool<P>>,
        pool_rx: UnboundedReceiver<PoolMessage>,
    ) -> Self {
        Self {
            attestation_agg_pool,
            sync_committee_agg_pool,
            pool_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(message) = self.pool_rx.next().await {
            match message {
                PoolMessage::Tick(tick) => {
                    if tick.is_start_of_slot() {
                        self.sync_committee_agg_pool.on_slot(tick.slot);
                    }

                    self.attestation_agg_pool.on_tick(tick).await
                }
                PoolMessage::Stop => break,
            }
        }

        self.attestation_agg_pool.shutdown();
        self.sync_committee_agg_pool.shutdown();

        info!("operation pools stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bitfield::BitList;
    use bls::AggregateSignatureBytes;
    use clock::Tick;
    use futures::channel::mpsc;
    use std_ext::ArcExt as _;
    use types::{
        combined::Attestation as CombinedAttestation,
        config::Config,
        phase0::containers::{Attestation, AttestationData},
        preset::Minimal,
    };

    use super::*;

    #[tokio::test]
    async fn stop_message_shuts_down_pools() -> Result<()> {
        let config = Arc::new(Config::minimal());
        let attestation_agg_pool = AttestationAggPool::<Minimal>::new(config.clone_arc(), None);
        let sync_committee_agg_pool = SyncCommitteeAggPool::<Minimal>::new(config.clone_arc(), None);
        let (tx, rx) = mpsc::unbounded();

        let attestation = Attestation {
            aggregation_bits: BitList::try_from(vec![0b0000_0101])?,
            data: AttestationData {
                slot: 1,
                ..AttestationData::default()
            },
            signature: AggregateSignatureBytes::empty(),
        };

        attestation_agg_pool
            .save_unaggregated(vec![CombinedAttestation::new(&config, attestation)])
            .await?;

        let manager = Manager::new(
            attestation_agg_pool.clone_arc(),
            sync_committee_agg_pool,
            rx,
        );

        PoolMessage::Tick(Tick::start_of_slot(1)).send(&tx);
        PoolMessage::Stop.send(&tx);

        manager.run().await?;

        assert!(attestation_agg_pool.batch().await?.cancelled);
        assert_eq!(attestation_agg_pool.attestation_count().await, 1);

        Ok(())
    }
}
