//! Signature combination on top of a pluggable [`SignatureTrait`] scheme.

use bls::{Error, Signature, SignatureBytes, SignatureTrait, SIGNATURE_SIZE};

/// Combines `signatures` into one aggregate.
///
/// The result does not depend on the order of `signatures`.
/// Combining zero signatures yields the identity element of the scheme.
#[must_use]
pub fn combine<S: SignatureTrait>(signatures: impl IntoIterator<Item = S>) -> S {
    signatures
        .into_iter()
        .reduce(S::aggregate)
        .unwrap_or_default()
}

pub fn decompress(bytes: &[u8]) -> Result<Signature, Error> {
    SignatureBytes::try_from(bytes)?.try_into()
}

/// Decompresses signatures stored back to back.
///
/// Fails without decompressing anything if the length is not a multiple of [`SIGNATURE_SIZE`].
pub fn decompress_concatenated(bytes: &[u8]) -> Result<Vec<Signature>, Error> {
    let remainder = bytes.len() % SIGNATURE_SIZE;

    if remainder != 0 {
        return Err(Error::InvalidSignatureLength {
            expected: bytes.len() - remainder + SIGNATURE_SIZE,
            actual: bytes.len(),
        });
    }

    bytes.chunks_exact(SIGNATURE_SIZE).map(decompress).collect()
}

/// Checks that `signature` is an aggregate of signatures over `message` by all of `public_keys`.
///
/// An aggregate with no signers is never valid.
#[must_use]
pub fn verify<'keys, S: SignatureTrait>(
    signature: S,
    public_keys: impl IntoIterator<Item = &'keys S::PublicKey>,
    message: impl AsRef<[u8]>,
) -> bool {
    let mut public_keys = public_keys.into_iter().peekable();

    if public_keys.peek().is_none() {
        return false;
    }

    signature.fast_aggregate_verify(message, public_keys)
}
