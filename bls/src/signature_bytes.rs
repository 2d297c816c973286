use derive_more::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

use crate::{consts::SIGNATURE_SIZE, Error};

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct SignatureBytes(SIGNATURE_SIZE);
}

impl_fixed_hash_serde!(SignatureBytes, SIGNATURE_SIZE);

impl hex::FromHex for SignatureBytes {
    type Error = <[u8; SIGNATURE_SIZE] as hex::FromHex>::Error;

    fn from_hex<T: AsRef<[u8]>>(digits: T) -> Result<Self, Self::Error> {
        hex::FromHex::from_hex(digits).map(Self)
    }
}

// `construct_fixed_hash!` only provides a panicking `SignatureBytes::from_slice`.
impl TryFrom<&[u8]> for SignatureBytes {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let expected = SIGNATURE_SIZE;
        let actual = bytes.len();

        if actual != expected {
            return Err(Error::InvalidSignatureLength { expected, actual });
        }

        Ok(Self::from_slice(bytes))
    }
}

impl SignatureBytes {
    /// The compressed point at infinity.
    ///
    /// It is the aggregate of zero signatures.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        let mut bytes = Self::zero();
        bytes.as_mut()[0] = 0xc0;
        bytes
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::empty()
    }
}
