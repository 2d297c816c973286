//! BLS12-381 signatures as used by the beacon chain.
//!
//! Signatures are stored compressed ([`SignatureBytes`]) in messages and decompressed
//! ([`Signature`]) only when they need to be aggregated or verified.

pub use crate::{
    consts::{DOMAIN_SEPARATION_TAG, SIGNATURE_SIZE},
    error::Error,
    public_key::PublicKey,
    secret_key::SecretKey,
    secret_key_bytes::SecretKeyBytes,
    signature::{Signature, SignatureTrait},
    signature_bytes::SignatureBytes,
};

pub type AggregatePublicKey = PublicKey;
pub type AggregateSignature = Signature;
pub type AggregateSignatureBytes = SignatureBytes;

mod consts;
mod error;
mod public_key;
mod secret_key;
mod secret_key_bytes;
mod signature;
mod signature_bytes;
