use bitfield::BitList;
use bls::AggregateSignatureBytes;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    nonstandard::Phase,
    phase0::containers::{Attestation as Phase0Attestation, AttestationData},
    preset::Preset,
};

/// An attestation tagged with the phase it was produced in.
///
/// The attestation container did not change between Phase 0 and Deneb, but the phase still
/// determines which gossip topics and block bodies the attestation belongs to.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(bound = "", tag = "version", content = "data", rename_all = "lowercase")]
pub enum Attestation<P: Preset> {
    Phase0(Phase0Attestation<P>),
    Altair(Phase0Attestation<P>),
    Bellatrix(Phase0Attestation<P>),
    Capella(Phase0Attestation<P>),
    Deneb(Phase0Attestation<P>),
}

impl<P: Preset> Attestation<P> {
    /// Tags `attestation` with the phase active at its slot.
    #[must_use]
    pub fn new(config: &Config, attestation: Phase0Attestation<P>) -> Self {
        match config.phase_at_slot::<P>(attestation.data.slot) {
            Phase::Phase0 => Self::Phase0(attestation),
            Phase::Altair => Self::Altair(attestation),
            Phase::Bellatrix => Self::Bellatrix(attestation),
            Phase::Capella => Self::Capella(attestation),
            Phase::Deneb => Self::Deneb(attestation),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Phase0(_) => Phase::Phase0,
            Self::Altair(_) => Phase::Altair,
            Self::Bellatrix(_) => Phase::Bellatrix,
            Self::Capella(_) => Phase::Capella,
            Self::Deneb(_) => Phase::Deneb,
        }
    }

    #[must_use]
    pub const fn data(&self) -> AttestationData {
        self.inner().data
    }

    #[must_use]
    pub const fn aggregation_bits(&self) -> &BitList<P::MaxValidatorsPerCommittee> {
        &self.inner().aggregation_bits
    }

    #[must_use]
    pub const fn signature(&self) -> AggregateSignatureBytes {
        self.inner().signature
    }

    #[must_use]
    pub fn into_inner(self) -> Phase0Attestation<P> {
        match self {
            Self::Phase0(attestation)
            | Self::Altair(attestation)
            | Self::Bellatrix(attestation)
            | Self::Capella(attestation)
            | Self::Deneb(attestation) => attestation,
        }
    }

    const fn inner(&self) -> &Phase0Attestation<P> {
        match self {
            Self::Phase0(attestation)
            | Self::Altair(attestation)
            | Self::Bellatrix(attestation)
            | Self::Capella(attestation)
            | Self::Deneb(attestation) => attestation,
        }
    }
}
