//! Slot ticks for the Beacon Chain.
//!
//! A slot is divided into 3 intervals (propose, attest, aggregate) of 4 ticks each.
//! Pools are driven by the ticks at the start of each slot and at the end of each interval.

use anyhow::Result;
use enum_iterator::Sequence;
use thiserror::Error;
use types::phase0::primitives::Slot;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Tick {
    pub slot: Slot,
    pub kind: TickKind,
}

impl Tick {
    #[must_use]
    pub const fn start_of_slot(slot: Slot) -> Self {
        Self::new(slot, TickKind::Propose)
    }

    #[must_use]
    pub const fn new(slot: Slot, kind: TickKind) -> Self {
        Self { slot, kind }
    }

    #[must_use]
    pub const fn is_start_of_slot(self) -> bool {
        matches!(self.kind, TickKind::Propose)
    }

    pub fn next(self) -> Result<Self> {
        let Self { slot, kind } = self;

        let next = match enum_iterator::next(&kind) {
            Some(next_kind) => Self::new(slot, next_kind),
            None => Self::start_of_slot(slot.checked_add(1).ok_or(ClockError::RanOutOfSlots)?),
        };

        Ok(next)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Sequence)]
pub enum TickKind {
    Propose,
    ProposeSecond,
    ProposeThird,
    ProposeFourth,
    Attest,
    AttestSecond,
    AttestThird,
    AttestFourth,
    Aggregate,
    AggregateSecond,
    AggregateThird,
    AggregateFourth,
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("ran out of slots")]
    RanOutOfSlots,
}
