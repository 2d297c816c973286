//! Greedy max-cover aggregation of messages that share a payload identity.
//!
//! Each round builds one aggregate. The message adding the most uncovered seats is picked
//! first, then every message that shares no seat with the seats picked so far, again in order
//! of gain. Ties go to the message that came first. A round that can only pick one message ends
//! the aggregation, so messages that could not be combined are returned as they are.
//!
//! The result is not always the smallest possible set of aggregates. Finding that is NP-hard.

use core::cmp::Reverse;

use bitfield::BitList;
use bls::{AggregateSignature, SignatureTrait};
use derivative::Derivative;
use itertools::Itertools as _;
use typenum::Unsigned;

use crate::{combiner, error::AggregationError};

#[derive(Derivative)]
#[derivative(
    Clone(bound = "S: Clone"),
    PartialEq(bound = "S: PartialEq"),
    Eq(bound = "S: Eq"),
    Debug(bound = "S: core::fmt::Debug")
)]
pub struct Aggregate<N, S = AggregateSignature> {
    pub aggregation_bits: BitList<N>,
    pub signature: S,
}

impl<N, S> Aggregate<N, S> {
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.aggregation_bits.count_ones()
    }
}

/// Combines `messages` into aggregates that together cover every seat set in `messages`.
///
/// The output only depends on the contents and order of `messages`.
/// Fewer than 2 messages are returned unchanged.
pub fn aggregate<N: Unsigned, S: SignatureTrait>(
    mut messages: Vec<Aggregate<N, S>>,
) -> Result<Vec<Aggregate<N, S>>, AggregationError> {
    if messages.len() < 2 {
        return Ok(messages);
    }

    let expected = messages[0].aggregation_bits.len();

    if let Some(mismatched) = messages
        .iter()
        .find(|message| message.aggregation_bits.len() != expected)
    {
        return Err(AggregationError::LengthMismatch {
            expected,
            actual: mismatched.aggregation_bits.len(),
        });
    }

    let mut aggregates = vec![];

    while messages.len() > 1 {
        let picked = max_cover(&messages, expected);

        if picked.len() < 2 {
            break;
        }

        let mut aggregation_bits = BitList::with_length(expected);

        for index in picked.iter().copied() {
            aggregation_bits |= &messages[index].aggregation_bits;
        }

        let signature = combiner::combine(picked.iter().map(|index| messages[*index].signature));

        messages.retain(|message| !message.aggregation_bits.is_subset_of(&aggregation_bits));

        aggregates.push(Aggregate {
            aggregation_bits,
            signature,
        });
    }

    aggregates.extend(messages);

    Ok(drop_subsets(aggregates))
}

/// Picks the indices of pairwise disjoint messages in the order they were picked.
fn max_cover<N: Unsigned, S>(messages: &[Aggregate<N, S>], length: usize) -> Vec<usize> {
    let mut covered = BitList::<N>::with_length(length);
    let mut picked = vec![];

    loop {
        let best = messages
            .iter()
            .enumerate()
            .filter(|(_, message)| !message.aggregation_bits.overlaps(&covered))
            .map(|(index, message)| (index, message.aggregation_bits.count_not_in(&covered)))
            .filter(|(_, gain)| *gain > 0)
            .min_by_key(|(index, gain)| (Reverse(*gain), *index));

        let Some((index, _)) = best else {
            break;
        };

        covered |= &messages[index].aggregation_bits;
        picked.push(index);
    }

    picked
}

/// Drops aggregates whose seats are all covered by another aggregate.
///
/// Of several aggregates with equal bits only the first is kept.
fn drop_subsets<N, S>(aggregates: Vec<Aggregate<N, S>>) -> Vec<Aggregate<N, S>> {
    let redundant = aggregates
        .iter()
        .enumerate()
        .map(|(index, aggregate)| {
            aggregates
                .iter()
                .enumerate()
                .filter(|(other_index, _)| *other_index != index)
                .any(|(other_index, other)| {
                    aggregate
                        .aggregation_bits
                        .is_subset_of(&other.aggregation_bits)
                        && (aggregate.aggregation_bits != other.aggregation_bits
                            || other_index < index)
                })
        })
        .collect_vec();

    aggregates
        .into_iter()
        .zip(redundant)
        .filter(|(_, redundant)| !redundant)
        .map(|(aggregate, _)| aggregate)
        .collect()
}
