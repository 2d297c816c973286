use blst::min_pk::PublicKey as RawPublicKey;
use derive_more::From;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, From)]
pub struct PublicKey(RawPublicKey);

impl PublicKey {
    pub(crate) const fn as_raw(&self) -> &RawPublicKey {
        &self.0
    }
}
