use core::fmt::Debug;

use blst::{
    min_pk::{AggregateSignature as RawAggregateSignature, Signature as RawSignature},
    BLST_ERROR,
};
use derive_more::From;
use itertools::Itertools as _;

use crate::{consts::DOMAIN_SEPARATION_TAG, Error, PublicKey, SignatureBytes};

/// Operations an aggregation pool needs from a signature scheme.
///
/// `Default` must return the aggregate of zero signatures.
pub trait SignatureTrait:
    Clone + Copy + PartialEq + Eq + Debug + Default + Send + Sync + 'static
{
    type PublicKey: 'static;

    fn aggregate_in_place(&mut self, other: Self);

    fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys Self::PublicKey>,
    ) -> bool;

    #[inline]
    #[must_use]
    fn aggregate(mut self, other: Self) -> Self {
        self.aggregate_in_place(other);
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, From)]
pub struct Signature(RawSignature);

impl Default for Signature {
    #[inline]
    fn default() -> Self {
        SignatureBytes::empty()
            .try_into()
            .expect("compressed signature constructed in SignatureBytes::empty is valid")
    }
}

impl From<Signature> for SignatureBytes {
    #[inline]
    fn from(signature: Signature) -> Self {
        Self(signature.as_raw().compress())
    }
}

impl TryFrom<SignatureBytes> for Signature {
    type Error = Error;

    #[inline]
    fn try_from(bytes: SignatureBytes) -> Result<Self, Self::Error> {
        RawSignature::uncompress(bytes.as_bytes())
            .map(Self)
            .map_err(|_| Error::InvalidSignature)
    }
}

impl SignatureTrait for Signature {
    type PublicKey = PublicKey;

    #[inline]
    fn aggregate_in_place(&mut self, other: Self) {
        let mut self_aggregate = RawAggregateSignature::from_signature(self.as_raw());
        let other_aggregate = RawAggregateSignature::from_signature(other.as_raw());
        self_aggregate.add_aggregate(&other_aggregate);
        self.0 = self_aggregate.to_signature();
    }

    fn fast_aggregate_verify<'keys>(
        &self,
        message: impl AsRef<[u8]>,
        public_keys: impl IntoIterator<Item = &'keys PublicKey>,
    ) -> bool {
        let public_keys = public_keys.into_iter().map(PublicKey::as_raw).collect_vec();

        let result = self.as_raw().fast_aggregate_verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            public_keys.as_slice(),
        );

        result == BLST_ERROR::BLST_SUCCESS
    }
}

impl Signature {
    #[must_use]
    pub fn verify(self, message: impl AsRef<[u8]>, public_key: PublicKey) -> bool {
        let result = self.as_raw().verify(
            true,
            message.as_ref(),
            DOMAIN_SEPARATION_TAG,
            &[],
            public_key.as_raw(),
            false,
        );

        result == BLST_ERROR::BLST_SUCCESS
    }

    const fn as_raw(&self) -> &RawSignature {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use tap::{Conv as _, TryConv as _};

    use crate::{SecretKey, SecretKeyBytes};

    use super::*;

    const MESSAGE: &str = "foo";

    #[test]
    fn signature_verify_succeeds_on_correct_triple() {
        let secret_key = secret_key(b'?');
        let public_key = secret_key.to_public_key();
        let signature = secret_key.sign(MESSAGE);

        assert!(signature.verify(MESSAGE, public_key));
    }

    #[test]
    fn signature_verify_fails_on_incorrect_public_key() {
        let signature = secret_key(b'?').sign(MESSAGE);
        let public_key = secret_key(b'!').to_public_key();

        assert!(!signature.verify(MESSAGE, public_key));
    }

    #[test]
    fn signature_verify_fails_on_incorrect_signature() {
        let secret_key = secret_key(b'?');
        let public_key = secret_key.to_public_key();
        let signature = Signature::default();

        assert!(!signature.verify(MESSAGE, public_key));
    }

    #[test]
    fn aggregating_with_default_is_identity() {
        let signature = secret_key(b'?').sign(MESSAGE);

        assert_eq!(signature.aggregate(Signature::default()), signature);
        assert_eq!(Signature::default().aggregate(signature), signature);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let first = secret_key(b'?').sign(MESSAGE);
        let second = secret_key(b'!').sign(MESSAGE);
        let third = secret_key(b'#').sign(MESSAGE);

        assert_eq!(
            first.aggregate(second).aggregate(third),
            third.aggregate(first).aggregate(second),
        );
    }

    #[test]
    fn fast_aggregate_verify_accepts_aggregate_of_all_signers() {
        let secret_keys = [secret_key(b'?'), secret_key(b'!')];
        let public_keys = secret_keys.iter().map(SecretKey::to_public_key).collect_vec();

        let aggregate = secret_keys
            .iter()
            .map(|secret_key| secret_key.sign(MESSAGE))
            .fold(Signature::default(), Signature::aggregate);

        assert!(aggregate.fast_aggregate_verify(MESSAGE, public_keys.iter()));
        assert!(!aggregate.fast_aggregate_verify(MESSAGE, public_keys.iter().take(1)));
    }

    #[test]
    fn default_round_trips_through_bytes() {
        assert_eq!(
            SignatureBytes::from(Signature::default()),
            SignatureBytes::empty(),
        );
    }

    #[test]
    fn zero_bytes_do_not_decode() {
        assert_eq!(
            Signature::try_from(SignatureBytes::zero()),
            Err(Error::InvalidSignature),
        );
    }

    fn secret_key(byte: u8) -> SecretKey {
        [byte; 32]
            .conv::<SecretKeyBytes>()
            .try_conv::<SecretKey>()
            .expect("bytes encode a valid secret key")
    }
}
