use core::{
    fmt::{Binary, Debug, Display, LowerHex, UpperHex},
    ops::Deref,
};

use derive_more::{AsMut, AsRef, From};
use serde::Serialize;
use static_assertions::assert_not_impl_any;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Uncompressed secret key scalar.
///
/// Only used to derive signing keys in tests and tools, so it cannot be printed or serialized.
#[derive(Default, AsRef, AsMut, From, Zeroize, ZeroizeOnDrop)]
#[as_ref(forward)]
#[as_mut(forward)]
pub struct SecretKeyBytes {
    pub(crate) bytes: [u8; 32],
}

assert_not_impl_any! {
    SecretKeyBytes:

    Clone,
    Copy,
    Deref,
    ToOwned,

    Debug,
    Binary,
    Display,
    LowerHex,
    UpperHex,

    Serialize,
}
