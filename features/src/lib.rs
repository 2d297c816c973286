use core::{
    fmt::Display,
    sync::atomic::{AtomicBool, Ordering},
};

use parse_display::{Display, FromStr};
use tracing::{info, warn};
use variant_count::VariantCount;

static FEATURES: [AtomicBool; Feature::VARIANT_COUNT] =
    [const { AtomicBool::new(false) }; Feature::VARIANT_COUNT];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, FromStr, VariantCount)]
pub enum Feature {
    DebugAttestationBatch,
    DebugAttestationPool,
    DebugSyncAggregate,
}

impl Feature {
    // `Ordering::SeqCst` is slightly slower, but using other orderings could result in strange
    // behaviors. See the following for examples:
    // - <https://stackoverflow.com/questions/14861822/acquire-release-versus-sequentially-consistent-memory-order/14864466#14864466>
    // - <https://stackoverflow.com/questions/12340773/how-do-memory-order-seq-cst-and-memory-order-acq-rel-differ/12340924#12340924>
    const ORDERING: Ordering = Ordering::SeqCst;

    #[inline]
    #[must_use]
    pub fn is_enabled(self) -> bool {
        FEATURES[self as usize].load(Self::ORDERING)
    }

    #[inline]
    pub fn enable(self) {
        FEATURES[self as usize].store(true, Self::ORDERING)
    }

    pub fn log(self, message: impl Display) {
        info!(feature = %self, "{message}");
    }

    pub fn warn(self, message: impl Display) {
        warn!(feature = %self, "{message}");
    }
}

#[macro_export]
macro_rules! log {
    ($feature: ident, $($message: tt)+) => {{
        let feature = $crate::Feature::$feature;
        if feature.is_enabled() {
            feature.log(format_args!($($message)+))
        }
    }};
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn features_parse_from_their_names() {
        assert_eq!(
            "DebugSyncAggregate".parse::<Feature>().ok(),
            Some(Feature::DebugSyncAggregate),
        );
        assert!("debug_sync_aggregate".parse::<Feature>().is_err());
    }

    #[test]
    fn log_macro_only_formats_messages_of_enabled_features() {
        let formatted = Cell::new(0);

        let count = || {
            formatted.set(formatted.get() + 1);
            formatted.get()
        };

        crate::log!(DebugAttestationPool, "skipped {}", count());

        assert!(!Feature::DebugAttestationPool.is_enabled());
        assert_eq!(formatted.get(), 0);

        Feature::DebugAttestationBatch.enable();

        crate::log!(DebugAttestationBatch, "batch processed {} identities", count());

        assert!(Feature::DebugAttestationBatch.is_enabled());
        assert_eq!(formatted.get(), 1);
    }
}
