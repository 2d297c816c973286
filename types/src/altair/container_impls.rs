use bitfield::BitList;
use bls::AggregateSignatureBytes;

use crate::{altair::containers::SyncAggregate, preset::Preset};

impl<P: Preset> SyncAggregate<P> {
    /// A sync aggregate with no participants.
    ///
    /// Blocks can always include it, so it stands in for one that could not be computed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            sync_committee_bits: BitList::full(false),
            sync_committee_signature: AggregateSignatureBytes::empty(),
        }
    }

    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.sync_committee_bits.count_ones()
    }
}
