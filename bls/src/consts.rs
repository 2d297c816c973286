pub const DOMAIN_SEPARATION_TAG: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Size of a compressed G2 point.
pub const SIGNATURE_SIZE: usize = 96;
