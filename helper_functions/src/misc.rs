use core::ops::Range;

use typenum::Unsigned as _;
use types::{
    phase0::{
        consts::GENESIS_EPOCH,
        primitives::{Epoch, Slot},
    },
    preset::Preset,
};

#[must_use]
pub const fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

#[must_use]
pub const fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

// `consensus-specs` uses this in at least 2 places:
// - <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md#compute_slots_since_epoch_start>
// - <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/validator.md#broadcast-attestation>
#[must_use]
pub const fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot % P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn slots_in_epoch<P: Preset>(epoch: Epoch) -> Range<Slot> {
    compute_start_slot_at_epoch::<P>(epoch)..compute_start_slot_at_epoch::<P>(epoch + 1)
}

/// The epoch before the one `slot` is in, or the genesis epoch if there is none.
#[must_use]
pub const fn previous_epoch<P: Preset>(slot: Slot) -> Epoch {
    let current_epoch = compute_epoch_at_slot::<P>(slot);

    if current_epoch > GENESIS_EPOCH {
        current_epoch - 1
    } else {
        GENESIS_EPOCH
    }
}
