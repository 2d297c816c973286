use core::{fmt::Debug, hash::Hash};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use typenum::{NonZero, Quot, Unsigned, U2048, U32, U512, U8};

use crate::{altair::consts::SyncCommitteeSubnetCount, config::Config};

/// Compile-time configuration variables.
///
/// Only the variables that size participation bitsets and drive pool pruning are included.
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    type MaxValidatorsPerCommittee: Unsigned + NonZero + Eq + Ord + Debug + Send + Sync;
    type SlotsPerEpoch: Unsigned + NonZero + Debug + Send + Sync;
    type SyncCommitteeSize: Unsigned + NonZero + Eq + Ord + Debug + Send + Sync;

    // Derived type-level variables
    // Each sync committee subnet covers one subcommittee.
    type SyncSubcommitteeSize: Unsigned + NonZero + Eq + Ord + Hash + Debug + Send + Sync;

    const NAME: PresetName;

    /// Returns the default configuration associated with a preset.
    ///
    /// This should only be used in tests and benchmarks.
    #[must_use]
    fn default_config() -> Config {
        Self::NAME.default_config()
    }
}

#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Debug,
    Display,
    EnumString,
    Deserialize,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresetName {
    #[default]
    Mainnet,
    Minimal,
}

impl PresetName {
    #[must_use]
    pub fn default_config(self) -> Config {
        match self {
            Self::Mainnet => Config::mainnet(),
            Self::Minimal => Config::minimal(),
        }
    }
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U32;
    type SyncCommitteeSize = U512;

    type SyncSubcommitteeSize = Quot<Self::SyncCommitteeSize, SyncCommitteeSubnetCount>;

    const NAME: PresetName = PresetName::Mainnet;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U8;
    type SyncCommitteeSize = U32;

    type SyncSubcommitteeSize = Quot<Self::SyncCommitteeSize, SyncCommitteeSubnetCount>;

    const NAME: PresetName = PresetName::Minimal;
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn sync_subcommittees_partition_the_sync_committee() {
        assert_eq!(
            <Mainnet as Preset>::SyncSubcommitteeSize::USIZE * SyncCommitteeSubnetCount::USIZE,
            <Mainnet as Preset>::SyncCommitteeSize::USIZE,
        );
        assert_eq!(
            <Minimal as Preset>::SyncSubcommitteeSize::USIZE * SyncCommitteeSubnetCount::USIZE,
            <Minimal as Preset>::SyncCommitteeSize::USIZE,
        );
        assert_eq!(<Minimal as Preset>::SyncSubcommitteeSize::USIZE, 8);
    }

    #[test_case("mainnet", PresetName::Mainnet)]
    #[test_case("minimal", PresetName::Minimal)]
    fn preset_name_parses_from_lowercase(string: &str, expected: PresetName) {
        assert_eq!(string.parse::<PresetName>().ok(), Some(expected));
        assert_eq!(expected.to_string(), string);
    }
}
