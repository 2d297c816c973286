use std::{collections::HashMap, sync::Arc};

use helper_functions::misc;
use prometheus_metrics::Metrics;
use std_ext::ArcExt as _;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use types::{
    phase0::{
        containers::{Attestation, AttestationData},
        primitives::Slot,
    },
    preset::Preset,
};

use crate::{
    aggregation::{self, Aggregate},
    attestation_agg_pool::types::{
        to_attestation, AttestationAggregate, BatchOutcome, BucketMap, Buckets,
    },
    error::{AggregationFailure, Error},
    misc::PoolAdditionOutcome,
    seen_cache::SeenCache,
};

type BucketSelector<P> =
    for<'buckets> fn(&'buckets Buckets<P>) -> &'buckets [AttestationAggregate<P>];

pub struct Pool<P: Preset> {
    buckets: RwLock<BucketMap<P>>,
    seen: Mutex<SeenCache<AttestationData, P::MaxValidatorsPerCommittee>>,
}

impl<P: Preset> Default for Pool<P> {
    fn default() -> Self {
        Self {
            buckets: RwLock::default(),
            seen: Mutex::default(),
        }
    }
}

impl<P: Preset> Pool<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn on_slot(&self, slot: Slot, metrics: Option<&Metrics>) {
        if let Some(metrics) = metrics {
            let type_name = tynm::type_name::<Self>();

            metrics.set_collection_length(
                &type_name,
                "buckets",
                self.buckets.read().await.len(),
            );

            metrics.set_collection_length(&type_name, "seen", self.seen.lock().await.len());
        }

        if !misc::is_epoch_start::<P>(slot) {
            return;
        }

        let previous_epoch = misc::previous_epoch::<P>(slot);

        self.buckets
            .write()
            .await
            .retain(|data, _| data.target.epoch >= previous_epoch);

        self.seen.lock().await.clear();
    }

    /// Stores attestations signed by a single validator each.
    ///
    /// Nothing is stored if any of `attestations` is malformed.
    pub async fn save_unaggregated(
        &self,
        attestations: Vec<Attestation<P>>,
    ) -> Result<Vec<PoolAdditionOutcome>, Error> {
        let attestations = attestations
            .into_iter()
            .map(|attestation| {
                let participants = attestation.aggregation_bits.count_ones();

                if participants > 1 {
                    return Err(Error::NotUnaggregated { participants });
                }

                into_aggregate(attestation)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_lengths(&attestations).await?;

        let mut outcomes = Vec::with_capacity(attestations.len());

        for (data, aggregate) in attestations {
            let outcome = if self.is_seen(data, &aggregate).await {
                PoolAdditionOutcome::Ignore
            } else {
                let buckets = self.buckets(data).await;
                let mut buckets = buckets.lock().await;

                check_length(buckets.committee_length(), &aggregate)?;

                if buckets
                    .unaggregated
                    .iter()
                    .any(|existing| existing.aggregation_bits == aggregate.aggregation_bits)
                {
                    PoolAdditionOutcome::Ignore
                } else {
                    buckets.unaggregated.push(aggregate);
                    PoolAdditionOutcome::Accept
                }
            };

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Stores aggregates unless they add nothing to what is already known.
    ///
    /// Nothing is stored if any of `attestations` is malformed.
    pub async fn save_aggregated(
        &self,
        attestations: Vec<Attestation<P>>,
    ) -> Result<Vec<PoolAdditionOutcome>, Error> {
        let attestations = attestations
            .into_iter()
            .map(into_aggregate)
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_lengths(&attestations).await?;

        let mut outcomes = Vec::with_capacity(attestations.len());

        for (data, aggregate) in attestations {
            let outcome = if self.is_seen(data, &aggregate).await {
                PoolAdditionOutcome::Ignore
            } else {
                let buckets = self.buckets(data).await;
                let mut buckets = buckets.lock().await;

                check_length(buckets.committee_length(), &aggregate)?;
                insert_unless_subset(&mut buckets.aggregated, aggregate)
            };

            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Stores an attestation included in a block.
    ///
    /// Its participants are recorded as seen, so later gossip covering no one else is ignored.
    pub async fn save_block_included(
        &self,
        attestation: Attestation<P>,
    ) -> Result<PoolAdditionOutcome, Error> {
        let attestation = into_aggregate(attestation)?;

        self.validate_lengths(core::slice::from_ref(&attestation))
            .await?;

        let (data, aggregate) = attestation;
        let buckets = self.buckets(data).await;
        let mut buckets = buckets.lock().await;

        check_length(buckets.committee_length(), &aggregate)?;

        self.seen
            .lock()
            .await
            .seen(data, &aggregate.aggregation_bits);

        Ok(insert_unless_subset(&mut buckets.block_included, aggregate))
    }

    /// Moves unaggregated attestations into the aggregated bucket of their data.
    ///
    /// Data whose attestations fail to aggregate keep them and are reported together.
    /// Returns the number of attestation data that were aggregated.
    pub async fn aggregate_unaggregated(&self, token: &CancellationToken) -> Result<usize, Error> {
        let mut aggregated = 0;
        let mut failures = vec![];

        for (data, buckets) in self.snapshot().await {
            if token.is_cancelled() {
                break;
            }

            let mut buckets = buckets.lock().await;

            if buckets.unaggregated.is_empty() {
                continue;
            }

            let aggregates = match aggregation::aggregate(buckets.unaggregated.clone()) {
                Ok(aggregates) => aggregates,
                Err(error) => {
                    failures.push(AggregationFailure { data, error });
                    continue;
                }
            };

            let consumed = core::mem::take(&mut buckets.unaggregated);
            let mut seen = self.seen.lock().await;

            for attestation in consumed {
                seen.seen(data, &attestation.aggregation_bits);
            }

            drop(seen);

            for aggregate in aggregates {
                insert_unless_subset(&mut buckets.aggregated, aggregate);
            }

            aggregated += 1;
        }

        if failures.is_empty() {
            Ok(aggregated)
        } else {
            Err(Error::BatchFailed { failures })
        }
    }

    /// Aggregates every stored attestation into the fork choice bucket of its data.
    ///
    /// Existing fork choice aggregates take part in the aggregation, so new attestations are
    /// merged into them. The other buckets are emptied for every data that succeeds.
    /// Failures do not stop the batch and are reported together at the end.
    pub async fn batch(&self, token: &CancellationToken) -> Result<BatchOutcome, Error> {
        let mut outcome = BatchOutcome::default();
        let mut failures = vec![];

        for (data, buckets) in self.snapshot().await {
            if token.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let mut buckets = buckets.lock().await;

            if !buckets.has_batch_input() {
                continue;
            }

            match aggregation::aggregate(buckets.batch_input()) {
                Ok(aggregates) => {
                    outcome.processed += 1;
                    outcome.aggregates += aggregates.len();

                    buckets.forkchoice = aggregates;
                    buckets.unaggregated.clear();
                    buckets.aggregated.clear();
                    buckets.block_included.clear();
                }
                Err(error) => failures.push(AggregationFailure { data, error }),
            }
        }

        if failures.is_empty() {
            Ok(outcome)
        } else {
            Err(Error::BatchFailed { failures })
        }
    }

    pub async fn forkchoice_attestations(&self) -> Vec<Attestation<P>> {
        self.attestations(|buckets| buckets.forkchoice.as_slice())
            .await
    }

    pub async fn unaggregated_attestations(&self) -> Vec<Attestation<P>> {
        self.attestations(|buckets| buckets.unaggregated.as_slice())
            .await
    }

    pub async fn aggregated_attestations(&self) -> Vec<Attestation<P>> {
        self.attestations(|buckets| buckets.aggregated.as_slice())
            .await
    }

    pub async fn block_included_attestations(&self) -> Vec<Attestation<P>> {
        self.attestations(|buckets| buckets.block_included.as_slice())
            .await
    }

    pub async fn best_aggregate_attestation(
        &self,
        data: AttestationData,
    ) -> Option<Attestation<P>> {
        let buckets = self.buckets.read().await.get(&data)?.clone_arc();
        let buckets = buckets.lock().await;

        buckets
            .aggregated
            .iter()
            .chain(&buckets.unaggregated)
            .max_by_key(|aggregate| aggregate.participant_count())
            .cloned()
            .map(|aggregate| to_attestation(data, aggregate))
    }

    pub async fn attestation_count(&self) -> usize {
        let mut count = 0;

        for (_, buckets) in self.snapshot().await {
            let buckets = buckets.lock().await;

            count += buckets.unaggregated.len()
                + buckets.aggregated.len()
                + buckets.block_included.len()
                + buckets.forkchoice.len();
        }

        count
    }

    /// Fails if any of `attestations` disagrees on the committee size of its data,
    /// either with what is stored or with an earlier element of `attestations`.
    async fn validate_lengths(
        &self,
        attestations: &[(AttestationData, AttestationAggregate<P>)],
    ) -> Result<(), Error> {
        let mut committee_lengths = HashMap::new();

        for (data, aggregate) in attestations {
            let expected = match committee_lengths.get(data) {
                Some(length) => Some(*length),
                None => self.committee_length(*data).await,
            };

            check_length(expected, aggregate)?;

            committee_lengths.insert(*data, aggregate.aggregation_bits.len());
        }

        Ok(())
    }

    async fn committee_length(&self, data: AttestationData) -> Option<usize> {
        let buckets = self.buckets.read().await.get(&data).map(Arc::clone);

        if let Some(buckets) = buckets {
            let length = buckets.lock().await.committee_length();

            if length.is_some() {
                return length;
            }
        }

        self.seen.lock().await.record(&data).map(|record| record.len())
    }

    async fn is_seen(&self, data: AttestationData, aggregate: &AttestationAggregate<P>) -> bool {
        let seen = self
            .seen
            .lock()
            .await
            .is_covered(&data, &aggregate.aggregation_bits);

        if seen {
            features::log!(
                DebugAttestationPool,
                "ignoring attestation with seen participants \
                (data: {data:?}, aggregation_bits: {:?})",
                aggregate.aggregation_bits,
            );
        }

        seen
    }

    async fn buckets(&self, data: AttestationData) -> Arc<Mutex<Buckets<P>>> {
        if let Some(buckets) = self.buckets.read().await.get(&data) {
            return buckets.clone_arc();
        }

        self.buckets
            .write()
            .await
            .entry(data)
            .or_default()
            .clone_arc()
    }

    // Bucket locks must not be acquired while holding `Pool.buckets`.
    // `Pool::buckets` acquires them in the opposite order.
    async fn snapshot(&self) -> Vec<(AttestationData, Arc<Mutex<Buckets<P>>>)> {
        self.buckets
            .read()
            .await
            .iter()
            .map(|(data, buckets)| (*data, buckets.clone_arc()))
            .collect()
    }

    async fn attestations(&self, select: BucketSelector<P>) -> Vec<Attestation<P>> {
        let mut attestations = vec![];

        for (data, buckets) in self.snapshot().await {
            let buckets = buckets.lock().await;

            attestations.extend(
                select(&buckets)
                    .iter()
                    .cloned()
                    .map(|aggregate| to_attestation(data, aggregate)),
            );
        }

        attestations
    }
}

fn into_aggregate<P: Preset>(
    attestation: Attestation<P>,
) -> Result<(AttestationData, AttestationAggregate<P>), Error> {
    let Attestation {
        aggregation_bits,
        data,
        signature,
    } = attestation;

    if aggregation_bits.not_any() {
        return Err(Error::NoParticipants);
    }

    let aggregate = Aggregate {
        aggregation_bits,
        signature: signature.try_into()?,
    };

    Ok((data, aggregate))
}

fn check_length<N>(expected: Option<usize>, aggregate: &Aggregate<N>) -> Result<(), Error> {
    let actual = aggregate.aggregation_bits.len();

    match expected {
        Some(expected) if expected != actual => {
            Err(Error::InvalidAttestationLength { expected, actual })
        }
        _ => Ok(()),
    }
}

fn insert_unless_subset<N>(
    aggregates: &mut Vec<Aggregate<N>>,
    aggregate: Aggregate<N>,
) -> PoolAdditionOutcome {
    if aggregates.iter().any(|existing| {
        aggregate
            .aggregation_bits
            .is_subset_of(&existing.aggregation_bits)
    }) {
        return PoolAdditionOutcome::Ignore;
    }

    aggregates.push(aggregate);

    PoolAdditionOutcome::Accept
}

#[cfg(test)]
mod tests {
    use bitfield::BitList;
    use bls::{
        AggregateSignature, AggregateSignatureBytes, SecretKey, SecretKeyBytes, SignatureBytes,
    };
    use itertools::Itertools as _;
    use tap::{Conv as _, TryConv as _};
    use types::{phase0::containers::Checkpoint, preset::Minimal};

    use crate::{combiner, error::AggregationError};

    use super::*;

    fn data(slot: Slot) -> AttestationData {
        AttestationData {
            slot,
            target: Checkpoint {
                epoch: misc::compute_epoch_at_slot::<Minimal>(slot),
                ..Checkpoint::default()
            },
            ..AttestationData::default()
        }
    }

    fn attestation(slot: Slot, bits: &[u8]) -> Attestation<Minimal> {
        Attestation {
            aggregation_bits: BitList::try_from(bits.to_vec())
                .expect("bytes end with a delimiting bit"),
            data: data(slot),
            signature: AggregateSignatureBytes::empty(),
        }
    }

    fn wire_bits(attestations: &[Attestation<Minimal>]) -> Vec<Vec<u8>> {
        attestations
            .iter()
            .map(|attestation| attestation.aggregation_bits.clone().into())
            .collect()
    }

    #[tokio::test]
    async fn empty_pool_operations_are_total() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        assert_eq!(pool.aggregate_unaggregated(&token).await?, 0);
        assert_eq!(pool.batch(&token).await?, BatchOutcome::default());
        assert!(pool.forkchoice_attestations().await.is_empty());
        assert_eq!(pool.best_aggregate_attestation(data(0)).await, None);
        assert_eq!(pool.attestation_count().await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn save_unaggregated_rejects_multiple_participants() {
        let pool = Pool::<Minimal>::new();

        let result = pool
            .save_unaggregated(vec![
                attestation(2, &[0b0010_0100]),
                attestation(2, &[0b0011_0100]),
            ])
            .await;

        assert!(matches!(
            result,
            Err(Error::NotUnaggregated { participants: 2 }),
        ));
        assert_eq!(pool.attestation_count().await, 0);
    }

    #[tokio::test]
    async fn saves_reject_attestations_without_participants() {
        let pool = Pool::<Minimal>::new();

        assert!(matches!(
            pool.save_unaggregated(vec![attestation(2, &[0b0010_0000])]).await,
            Err(Error::NoParticipants),
        ));
        assert!(matches!(
            pool.save_aggregated(vec![attestation(2, &[0b0010_0000])]).await,
            Err(Error::NoParticipants),
        ));
        assert!(matches!(
            pool.save_block_included(attestation(2, &[0b0010_0000])).await,
            Err(Error::NoParticipants),
        ));
    }

    #[tokio::test]
    async fn saves_reject_malformed_signatures() {
        let pool = Pool::<Minimal>::new();

        let attestation = Attestation {
            signature: SignatureBytes::zero(),
            ..attestation(2, &[0b0010_0100])
        };

        assert!(matches!(
            pool.save_aggregated(vec![attestation]).await,
            Err(Error::InvalidSignature(bls::Error::InvalidSignature)),
        ));
    }

    #[tokio::test]
    async fn duplicate_unaggregated_attestations_are_ignored() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();

        let outcomes = pool
            .save_unaggregated(vec![
                attestation(2, &[0b0010_0100]),
                attestation(2, &[0b0010_0100]),
                attestation(2, &[0b0010_1000]),
            ])
            .await?;

        assert_eq!(
            outcomes,
            [
                PoolAdditionOutcome::Accept,
                PoolAdditionOutcome::Ignore,
                PoolAdditionOutcome::Accept,
            ],
        );
        assert_eq!(pool.unaggregated_attestations().await.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn aggregated_subsets_of_known_aggregates_are_ignored() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();

        let outcomes = pool
            .save_aggregated(vec![
                attestation(2, &[0b0011_1000]),
                attestation(2, &[0b0010_1000]),
                attestation(2, &[0b0010_1100]),
            ])
            .await?;

        assert_eq!(
            outcomes,
            [
                PoolAdditionOutcome::Accept,
                PoolAdditionOutcome::Ignore,
                PoolAdditionOutcome::Accept,
            ],
        );

        Ok(())
    }

    #[tokio::test]
    async fn aggregate_unaggregated_moves_results_and_marks_them_seen() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        pool.save_unaggregated(vec![
            attestation(2, &[0b0010_0100]),
            attestation(2, &[0b0010_1000]),
            attestation(3, &[0b0010_0001]),
        ])
        .await?;

        assert_eq!(pool.aggregate_unaggregated(&token).await?, 2);

        assert!(pool.unaggregated_attestations().await.is_empty());
        assert_eq!(
            wire_bits(&pool.aggregated_attestations().await),
            [vec![0b0010_1100], vec![0b0010_0001]],
        );

        let outcomes = pool
            .save_unaggregated(vec![attestation(2, &[0b0010_0100])])
            .await?;

        assert_eq!(outcomes, [PoolAdditionOutcome::Ignore]);

        Ok(())
    }

    #[tokio::test]
    async fn best_aggregate_attestation_has_most_participants() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();

        pool.save_aggregated(vec![
            attestation(2, &[0b0010_0011]),
            attestation(2, &[0b0011_1100]),
        ])
        .await?;

        let best = pool.best_aggregate_attestation(data(2)).await;

        assert_eq!(
            best.map(|attestation| Vec::from(attestation.aggregation_bits)),
            Some(vec![0b0011_1100]),
        );

        Ok(())
    }

    #[tokio::test]
    async fn batch_merges_into_forkchoice_and_clears_inputs() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        pool.save_unaggregated(vec![attestation(2, &[0b0010_0100])])
            .await?;

        assert_eq!(
            pool.batch(&token).await?,
            BatchOutcome {
                processed: 1,
                aggregates: 1,
                cancelled: false,
            },
        );

        pool.save_aggregated(vec![attestation(2, &[0b0011_1000])])
            .await?;
        pool.save_block_included(attestation(2, &[0b0011_1000]))
            .await?;

        let outcome = pool.batch(&token).await?;

        assert_eq!(outcome.processed, 1);
        assert_eq!(
            wire_bits(&pool.forkchoice_attestations().await),
            [vec![0b0011_1100]],
        );
        assert!(pool.aggregated_attestations().await.is_empty());
        assert!(pool.block_included_attestations().await.is_empty());

        // Nothing new to process.
        assert_eq!(pool.batch(&token).await?.processed, 0);

        Ok(())
    }

    #[tokio::test]
    async fn batch_reports_failures_and_commits_other_data() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        pool.save_aggregated(vec![
            attestation(2, &[0b0010_0100]),
            attestation(3, &[0b0010_0100]),
            attestation(3, &[0b0010_1000]),
        ])
        .await?;

        // Saves reject bits of another length, so put them in place directly.
        let Attestation {
            aggregation_bits, ..
        } = attestation(2, &[0b0110_0000]);

        pool.buckets(data(2)).await.lock().await.aggregated.push(Aggregate {
            aggregation_bits,
            signature: AggregateSignature::default(),
        });

        let Err(Error::BatchFailed { failures }) = pool.batch(&token).await else {
            panic!("aggregating bits of different lengths should fail");
        };

        assert_eq!(
            failures,
            [AggregationFailure {
                data: data(2),
                error: AggregationError::LengthMismatch {
                    expected: 5,
                    actual: 6,
                },
            }],
        );

        let forkchoice = pool.forkchoice_attestations().await;

        assert_eq!(
            forkchoice.iter().map(|attestation| attestation.data.slot).collect_vec(),
            [3],
        );
        assert_eq!(pool.aggregated_attestations().await.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn saves_reject_bits_of_another_committee_size() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        pool.save_aggregated(vec![attestation(2, &[0b0010_0100])])
            .await?;

        assert!(matches!(
            pool.save_aggregated(vec![attestation(2, &[0b0110_0000])]).await,
            Err(Error::InvalidAttestationLength {
                expected: 5,
                actual: 6,
            }),
        ));
        assert!(matches!(
            pool.save_unaggregated(vec![attestation(2, &[0b0100_0001])]).await,
            Err(Error::InvalidAttestationLength {
                expected: 5,
                actual: 6,
            }),
        ));
        assert!(matches!(
            pool.save_block_included(attestation(2, &[0b0110_0000])).await,
            Err(Error::InvalidAttestationLength {
                expected: 5,
                actual: 6,
            }),
        ));

        // The data keeps being batched.
        for seat in [1, 3] {
            pool.save_unaggregated(vec![attestation(2, &[0b0010_0000 | (1 << seat)])])
                .await?;

            assert_eq!(pool.batch(&token).await?.processed, 1);
        }

        // Other data may have other committee sizes.
        pool.save_aggregated(vec![attestation(3, &[0b0110_0000])])
            .await?;

        assert_eq!(pool.batch(&token).await?.processed, 1);

        assert_eq!(
            wire_bits(&pool.forkchoice_attestations().await),
            [vec![0b0010_1110], vec![0b0110_0000]],
        );

        Ok(())
    }

    #[tokio::test]
    async fn mismatched_lengths_in_one_call_store_nothing() {
        let pool = Pool::<Minimal>::new();

        let result = pool
            .save_aggregated(vec![
                attestation(2, &[0b0010_0100]),
                attestation(2, &[0b0110_0000]),
            ])
            .await;

        assert!(matches!(
            result,
            Err(Error::InvalidAttestationLength {
                expected: 5,
                actual: 6,
            }),
        ));
        assert_eq!(pool.attestation_count().await, 0);
        assert!(pool.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn seen_record_keeps_committee_size_of_emptied_buckets() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();

        pool.save_block_included(attestation(2, &[0b0010_0100]))
            .await?;

        pool.buckets(data(2)).await.lock().await.block_included.clear();

        assert!(matches!(
            pool.save_aggregated(vec![attestation(2, &[0b0110_0000])]).await,
            Err(Error::InvalidAttestationLength {
                expected: 5,
                actual: 6,
            }),
        ));

        Ok(())
    }

    const COMMITTEE_SIZE: usize = 16;
    const MESSAGE: &[u8] = b"signing root";

    fn secret_key(seat: usize) -> SecretKey {
        let byte = u8::try_from(seat + 1).expect("seats fit in a byte");

        [byte; 32]
            .conv::<SecretKeyBytes>()
            .try_conv::<SecretKey>()
            .expect("bytes encode a valid secret key")
    }

    fn signed_attestation(seat: usize) -> Attestation<Minimal> {
        let mut aggregation_bits = BitList::with_length(COMMITTEE_SIZE);
        aggregation_bits.set(seat, true);

        Attestation {
            aggregation_bits,
            data: data(2),
            signature: secret_key(seat).sign(MESSAGE).into(),
        }
    }

    fn signed_by_participants(attestation: &Attestation<Minimal>) -> bool {
        let public_keys = attestation
            .aggregation_bits
            .participants()
            .map(|seat| secret_key(seat).to_public_key())
            .collect_vec();

        attestation
            .signature
            .try_conv::<AggregateSignature>()
            .is_ok_and(|signature| combiner::verify(signature, &public_keys, MESSAGE))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn saves_during_batches_are_counted_exactly_once() -> anyhow::Result<()> {
        let pool = Arc::new(Pool::<Minimal>::new());
        let token = CancellationToken::new();
        let done = CancellationToken::new();

        let batches = tokio::spawn({
            let pool = pool.clone_arc();
            let token = token.clone();
            let done = done.clone();

            async move {
                while !done.is_cancelled() {
                    pool.batch(&token).await?;
                    tokio::task::yield_now().await;
                }

                Ok::<_, Error>(())
            }
        });

        let readers = tokio::spawn({
            let pool = pool.clone_arc();
            let done = done.clone();

            async move {
                while !done.is_cancelled() {
                    for attestation in pool.forkchoice_attestations().await {
                        assert!(signed_by_participants(&attestation));
                    }

                    tokio::task::yield_now().await;
                }
            }
        });

        let saves = (0..COMMITTEE_SIZE)
            .map(|seat| {
                let pool = pool.clone_arc();
                tokio::spawn(async move { pool.save_unaggregated(vec![signed_attestation(seat)]).await })
            })
            .collect_vec();

        for save in saves {
            assert_eq!(save.await??, [PoolAdditionOutcome::Accept]);
        }

        done.cancel();
        batches.await??;
        readers.await?;

        pool.batch(&token).await?;

        let forkchoice = pool.forkchoice_attestations().await;

        assert_eq!(forkchoice.len(), 1);
        assert_eq!(
            forkchoice[0].aggregation_bits.participants().collect_vec(),
            (0..COMMITTEE_SIZE).collect_vec(),
        );
        assert!(signed_by_participants(&forkchoice[0]));
        assert!(pool.unaggregated_attestations().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_batch_starts_nothing() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();
        let token = CancellationToken::new();

        pool.save_unaggregated(vec![attestation(2, &[0b0010_0100])])
            .await?;

        token.cancel();

        assert_eq!(
            pool.batch(&token).await?,
            BatchOutcome {
                cancelled: true,
                ..BatchOutcome::default()
            },
        );
        assert_eq!(pool.unaggregated_attestations().await.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn on_slot_prunes_old_epochs_at_epoch_start() -> Result<(), Error> {
        let pool = Pool::<Minimal>::new();

        pool.save_aggregated(vec![
            attestation(1, &[0b0010_0100]),
            attestation(9, &[0b0010_0100]),
            attestation(17, &[0b0010_0100]),
        ])
        .await?;

        pool.on_slot(15, None).await;

        assert_eq!(pool.attestation_count().await, 3);

        pool.on_slot(16, None).await;

        let slots = pool
            .aggregated_attestations()
            .await
            .into_iter()
            .map(|attestation| attestation.data.slot)
            .collect_vec();

        assert_eq!(slots, [9, 17]);

        Ok(())
    }
}
