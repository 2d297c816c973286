use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ReadError {
    #[error("empty slice is not a valid bit list")]
    BitListEmptySlice,
    #[error("last byte of slice has no delimiting bit")]
    BitListNoDelimitingBit,
    #[error("expected bit list to have no more than {maximum} bits, found {actual} bits")]
    BitListTooLong { maximum: usize, actual: usize },
}
