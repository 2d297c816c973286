use core::hash::{Hash, Hasher};

use blst::min_pk::SecretKey as RawSecretKey;
use derive_more::Debug;

use crate::{consts::DOMAIN_SEPARATION_TAG, Error, PublicKey, SecretKeyBytes, Signature};

#[derive(Debug)]
// Inspired by `DebugSecret` from the `secrecy` crate.
#[debug("[REDACTED]")]
pub struct SecretKey(RawSecretKey);

// Prevent `SecretKey` from implementing some traits to avoid leaking secret keys.
// This could also be done by wrapping it in `secrecy::Secret`.
static_assertions::assert_not_impl_any! {
    SecretKey:

    Clone,
    Copy,
    core::ops::Deref,
    ToOwned,

    core::fmt::Display,
    core::fmt::LowerHex,
    core::fmt::UpperHex,

    serde::Serialize,
}

impl PartialEq for SecretKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_raw().to_bytes() == other.as_raw().to_bytes()
    }
}

impl Eq for SecretKey {}

impl Hash for SecretKey {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.as_raw().to_bytes().hash(hasher)
    }
}

impl TryFrom<SecretKeyBytes> for SecretKey {
    type Error = Error;

    #[inline]
    fn try_from(secret_key_bytes: SecretKeyBytes) -> Result<Self, Self::Error> {
        RawSecretKey::from_bytes(secret_key_bytes.as_ref())
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }
}

impl SecretKey {
    #[inline]
    #[must_use]
    pub fn to_bytes(&self) -> SecretKeyBytes {
        SecretKeyBytes {
            bytes: self.as_raw().to_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        self.as_raw().sk_to_pk().into()
    }

    #[inline]
    #[must_use]
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.as_raw()
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }

    const fn as_raw(&self) -> &RawSecretKey {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_round_trips_through_bytes() -> Result<(), Error> {
        let secret_key = SecretKey::try_from(SecretKeyBytes::from([0x3f; 32]))?;
        let bytes = secret_key.to_bytes();

        assert_eq!(SecretKey::try_from(bytes)?, secret_key);

        Ok(())
    }

    #[test]
    fn zero_is_not_a_valid_secret_key() {
        assert_eq!(
            SecretKey::try_from(SecretKeyBytes::default()),
            Err(Error::InvalidSecretKey),
        );
    }

    #[test]
    fn debug_does_not_leak_secret_key() -> Result<(), Error> {
        let secret_key = SecretKey::try_from(SecretKeyBytes::from([0x3f; 32]))?;

        assert_eq!(format!("{secret_key:?}"), "[REDACTED]");

        Ok(())
    }
}
