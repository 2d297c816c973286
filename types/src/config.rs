use core::num::NonZeroU64;
use std::borrow::Cow;

use enum_iterator::Sequence as _;
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use typenum::Unsigned as _;

use crate::{
    nonstandard::Phase,
    phase0::{
        consts::{FAR_FUTURE_EPOCH, GENESIS_EPOCH},
        primitives::{Epoch, Slot},
    },
    preset::{Preset, PresetName},
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
///
/// Only the variables the aggregation pools depend on are included.
/// Missing variables default to their mainnet values.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Forking
    #[serde(with = "serde_utils::string_or_native")]
    pub altair_fork_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub bellatrix_fork_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub capella_fork_epoch: Epoch,
    #[serde(with = "serde_utils::string_or_native")]
    pub deneb_fork_epoch: Epoch,

    // Time parameters
    #[serde(with = "serde_utils::string_or_native")]
    pub seconds_per_slot: NonZeroU64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("mainnet"),
            preset_base: PresetName::Mainnet,

            // Forking
            altair_fork_epoch: 74240,
            bellatrix_fork_epoch: 144_896,
            capella_fork_epoch: 194_048,
            deneb_fork_epoch: 269_568,

            // Time parameters
            seconds_per_slot: nonzero!(12_u64),
        }
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Forking
            altair_fork_epoch: FAR_FUTURE_EPOCH,
            bellatrix_fork_epoch: FAR_FUTURE_EPOCH,
            capella_fork_epoch: FAR_FUTURE_EPOCH,
            deneb_fork_epoch: FAR_FUTURE_EPOCH,

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),
        }
    }

    /// Returns a copy of the configuration with phases up to `phase` enabled from genesis
    /// and later phases unscheduled.
    ///
    /// This should only be used in tests.
    #[must_use]
    pub fn start_and_stay_in(mut self, phase: Phase) -> Self {
        for (fork_phase, fork_epoch) in self.fork_epochs_mut() {
            *fork_epoch = if fork_phase <= phase {
                GENESIS_EPOCH
            } else {
                FAR_FUTURE_EPOCH
            };
        }

        self
    }

    #[must_use]
    pub const fn fork_epoch(&self, phase: Phase) -> Epoch {
        match phase {
            Phase::Phase0 => GENESIS_EPOCH,
            Phase::Altair => self.altair_fork_epoch,
            Phase::Bellatrix => self.bellatrix_fork_epoch,
            Phase::Capella => self.capella_fork_epoch,
            Phase::Deneb => self.deneb_fork_epoch,
        }
    }

    /// Returns `None` if the phase is not scheduled.
    #[must_use]
    pub fn fork_slot<P: Preset>(&self, phase: Phase) -> Option<Slot> {
        self.fork_epoch(phase).checked_mul(P::SlotsPerEpoch::U64)
    }

    #[must_use]
    pub fn phase_at_epoch(&self, epoch: Epoch) -> Phase {
        self.fork_epochs()
            .take_while(|(_, fork_epoch)| *fork_epoch <= epoch)
            .map(|(phase, _)| phase)
            .last()
            .unwrap_or(Phase::Phase0)
    }

    #[must_use]
    pub fn phase_at_slot<P: Preset>(&self, slot: Slot) -> Phase {
        enum_iterator::all()
            .take_while(|phase| {
                self.fork_slot::<P>(*phase)
                    .is_some_and(|fork_slot| fork_slot <= slot)
            })
            .last()
            .unwrap_or(Phase::Phase0)
    }

    fn fork_epochs(&self) -> impl Iterator<Item = (Phase, Epoch)> {
        // Do not remove the type annotation.
        // It ensures that this method is up to date when new phases are added.
        let fields: [_; Phase::CARDINALITY] = [
            GENESIS_EPOCH,
            self.altair_fork_epoch,
            self.bellatrix_fork_epoch,
            self.capella_fork_epoch,
            self.deneb_fork_epoch,
        ];

        enum_iterator::all().zip(fields)
    }

    fn fork_epochs_mut(&mut self) -> impl Iterator<Item = (Phase, &mut Epoch)> {
        // Do not remove the type annotation.
        // It ensures that this method is up to date when new phases are added.
        let fields: [_; Phase::CARDINALITY - 1] = [
            &mut self.altair_fork_epoch,
            &mut self.bellatrix_fork_epoch,
            &mut self.capella_fork_epoch,
            &mut self.deneb_fork_epoch,
        ];

        enum_iterator::all().skip(1).zip(fields)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use crate::preset::{Mainnet, Minimal};

    use super::*;

    #[test_case(0, Phase::Phase0)]
    #[test_case(74239 * 32 + 31, Phase::Phase0)]
    #[test_case(74240 * 32, Phase::Altair)]
    #[test_case(194_048 * 32, Phase::Capella)]
    #[test_case(Slot::MAX, Phase::Deneb)]
    fn mainnet_phase_at_slot(slot: Slot, expected: Phase) {
        assert_eq!(Config::mainnet().phase_at_slot::<Mainnet>(slot), expected);
    }

    #[test]
    fn unscheduled_phases_are_never_reached() {
        let config = Config::minimal();

        assert_eq!(config.fork_slot::<Minimal>(Phase::Altair), None);
        assert_eq!(config.phase_at_slot::<Minimal>(Slot::MAX), Phase::Phase0);
        assert_eq!(config.phase_at_epoch(FAR_FUTURE_EPOCH - 1), Phase::Phase0);
    }

    #[test]
    fn start_and_stay_in_enables_phases_up_to_the_given_one() {
        let config = Config::minimal().start_and_stay_in(Phase::Altair);

        assert_eq!(config.phase_at_slot::<Minimal>(0), Phase::Altair);
        assert_eq!(config.phase_at_epoch(1_000_000), Phase::Altair);
        assert_eq!(config.bellatrix_fork_epoch, FAR_FUTURE_EPOCH);
    }

    #[test]
    fn deserializes_from_yaml_with_defaults() -> Result<(), serde_yaml::Error> {
        let yaml = "\
CONFIG_NAME: devnet
PRESET_BASE: minimal
ALTAIR_FORK_EPOCH: 0
BELLATRIX_FORK_EPOCH: '2'
SECONDS_PER_SLOT: 6
";

        let config = serde_yaml::from_str::<Config>(yaml)?;

        assert_eq!(config.config_name, "devnet");
        assert_eq!(config.preset_base, PresetName::Minimal);
        assert_eq!(config.altair_fork_epoch, 0);
        assert_eq!(config.bellatrix_fork_epoch, 2);
        assert_eq!(config.capella_fork_epoch, Config::mainnet().capella_fork_epoch);
        assert_eq!(config.seconds_per_slot.get(), 6);

        Ok(())
    }

    #[test]
    fn rejects_unknown_variables() {
        assert!(serde_yaml::from_str::<Config>("UNKNOWN_VARIABLE: 1").is_err());
    }

    #[test]
    fn default_config_matches_preset() {
        assert_eq!(Mainnet::default_config(), Config::mainnet());
        assert_eq!(Minimal::default_config(), Config::minimal());
    }
}
