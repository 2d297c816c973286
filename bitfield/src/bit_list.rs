use core::{
    fmt::{Debug, Formatter, Result as FmtResult},
    marker::PhantomData,
    ops::BitOrAssign,
};

use bit_field::BitArray as _;
use bitvec::{bitbox, boxed::BitBox, vec::BitVec};
use derivative::Derivative;
use derive_more::{Deref, DerefMut};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use static_assertions::assert_eq_size;
use typenum::{Unsigned, U2048};

use crate::{consts::BITS_PER_BYTE, error::ReadError};

/// A list of at most `N` bits, one per committee seat.
///
/// Bit `i` is set if and only if seat `i` contributed to the message carrying the list.
/// The length is fixed when the list is created and is the same for all messages sharing a
/// payload identity.
///
/// The set operations ([`BitList::overlaps`], [`BitList::is_subset_of`], [`BitList::union`])
/// never panic on lists of different lengths. Lists of different lengths describe unrelated
/// committees, so they are treated as neither overlapping nor contained in each other.
#[derive(Deref, DerefMut, Derivative)]
#[derivative(
    Clone(bound = ""),
    PartialEq(bound = ""),
    Eq(bound = ""),
    PartialOrd(bound = ""),
    Ord(bound = ""),
    Default(bound = "")
)]
pub struct BitList<N> {
    // `bitvec` has a rather complicated API, some of which is slow due to being overly general.
    // `BitBox` keeps the length in bits next to the pointer, so no separate field is needed.
    //
    // The unused bits of the last byte are always 0.
    // The raw byte operations below rely on that.
    #[deref]
    #[deref_mut]
    bits: BitBox<u8>,
    #[derivative(PartialEq = "ignore", PartialOrd = "ignore", Ord = "ignore")]
    phantom: PhantomData<N>,
}

// The `U2048` is in reference to `MaxValidatorsPerCommittee`.
// `BitList`s with different maximum lengths should have the same size.
assert_eq_size!(BitList<U2048>, [usize; 2]);

// The wire form is the list of bytes followed by a delimiting bit marking the length.
// `0b0010_0100` is a list of 5 bits with bit 2 set.
impl<N> From<BitList<N>> for Vec<u8> {
    fn from(bit_list: BitList<N>) -> Self {
        let length = bit_list.len();
        let mut bytes = bit_list.bits.into_bitvec().into_vec();
        bytes.resize(bytes_with_delimiting_bit(length), 0);
        bytes.set_bit(length, true);
        bytes
    }
}

impl<N: Unsigned> TryFrom<Vec<u8>> for BitList<N> {
    type Error = ReadError;

    fn try_from(mut bytes: Vec<u8>) -> Result<Self, Self::Error> {
        let length = Self::measure_length(bytes.as_slice())?;
        bytes.truncate(bytes_without_delimiting_bit(length));
        Ok(Self::from_vec_with_length(bytes, length))
    }
}

// This could be a `From` impl if feature `generic_const_exprs` were stable.
#[cfg(test)]
impl<N: Unsigned, const SIZE: usize> TryFrom<[bool; SIZE]> for BitList<N> {
    type Error = ReadError;

    fn try_from(bits: [bool; SIZE]) -> Result<Self, Self::Error> {
        Self::validate_length(SIZE)?;

        let mut bit_list = Self::with_length(SIZE);

        for (index, bit) in bits.into_iter().enumerate() {
            bit_list.bits.set(index, bit);
        }

        Ok(bit_list)
    }
}

impl<N> BitOrAssign<&Self> for BitList<N> {
    fn bitor_assign(&mut self, other: &Self) {
        assert_eq!(self.len(), other.len());

        // Starting with `bitvec` 1.0.0, bitwise assignment operators should be just as fast as
        // batched updates using `BitBox::as_raw_slice` and `BitBox::as_raw_mut_slice`.
        self.bits |= &other.bits;
    }
}

// The `Binary` impl for `bitvec::slice::BitSlice` is close to what we want but not quite it.
// Bits are printed in index order, so the leftmost digit is seat 0.
impl<N> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

// `BitBox` serializes itself as a struct with multiple fields.
impl<'de, N: Unsigned> Deserialize<'de> for BitList<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_utils::prefixed_hex_or_bytes_cow::deserialize(deserializer)?
            .into_owned()
            .try_into()
            .map_err(D::Error::custom)
    }
}

impl<N> Serialize for BitList<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = Vec::from(self.clone());
        serde_utils::prefixed_hex_or_bytes_slice::serialize(bytes, serializer)
    }
}

impl<N> BitList<N> {
    #[must_use]
    pub fn full(value: bool) -> Self
    where
        N: Unsigned,
    {
        Self::new(value, N::USIZE)
    }

    #[must_use]
    pub fn with_length(length: usize) -> Self
    where
        N: Unsigned,
    {
        Self::new(false, length)
    }

    #[must_use]
    pub fn new(value: bool, length: usize) -> Self
    where
        N: Unsigned,
    {
        assert!(length <= N::USIZE);

        Self::from_bit_box(bitbox![_, _; u8::from(value); length])
    }

    pub fn concatenate<'lists, M: 'lists>(
        bit_lists: impl IntoIterator<Item = &'lists BitList<M>>,
    ) -> Result<Self, ReadError>
    where
        N: Unsigned,
    {
        let mut bits = BitVec::new();

        for bit_list in bit_lists {
            bits.extend_from_bitslice(&bit_list.bits);
        }

        let maximum = N::USIZE;
        let actual = bits.len();

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(Self::from_bit_box(bits.into_boxed_bitslice()))
    }

    /// Returns `true` if some seat is set in both lists.
    ///
    /// Lists of different lengths never overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.len() == other.len()
            && core::iter::zip(self.as_raw_slice(), other.as_raw_slice())
                .any(|(byte, other_byte)| byte & other_byte > 0)
    }

    /// Returns `true` if every seat set in `self` is also set in `other`.
    ///
    /// A list is never a subset of a list of a different length.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.len() == other.len()
            && core::iter::zip(self.as_raw_slice(), other.as_raw_slice())
                .all(|(byte, other_byte)| byte & !other_byte == 0)
    }

    /// Returns a list with every seat set in either list.
    ///
    /// If the lengths differ, the result has the greater length and the shorter list is
    /// applied to its prefix.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let (longer, shorter) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut bits = longer.bits.clone();

        for (byte, other_byte) in core::iter::zip(bits.as_raw_mut_slice(), shorter.as_raw_slice())
        {
            *byte |= other_byte;
        }

        Self::from_bit_box(bits)
    }

    /// Counts seats set in `self` but not in `other`.
    ///
    /// `other` only masks seats if the lengths match.
    #[must_use]
    pub fn count_not_in(&self, other: &Self) -> usize {
        if self.len() != other.len() {
            return self.count_ones();
        }

        core::iter::zip(self.as_raw_slice(), other.as_raw_slice())
            .map(|(byte, other_byte)| (byte & !other_byte).count_ones())
            .map(usize::try_from)
            .map(|result| result.expect("number of bits in a byte should fit in usize"))
            .sum()
    }

    /// Indices of the seats that are set, in ascending order.
    pub fn participants(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter_ones()
    }

    fn measure_length(bytes: &[u8]) -> Result<usize, ReadError>
    where
        N: Unsigned,
    {
        let leading_zeros_in_last_byte = bytes
            .last()
            .ok_or(ReadError::BitListEmptySlice)?
            .leading_zeros()
            .try_into()
            .expect("number of bits in a byte should fit in usize");

        let data_bits_in_last_byte = (BITS_PER_BYTE - 1)
            .checked_sub(leading_zeros_in_last_byte)
            .ok_or(ReadError::BitListNoDelimitingBit)?;

        let maximum = N::USIZE;
        let actual = (bytes.len() - 1) * BITS_PER_BYTE + data_bits_in_last_byte;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(actual)
    }

    fn from_vec_with_length(bytes: Vec<u8>, length: usize) -> Self {
        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(length);
        Self::from_bit_box(bits.into_boxed_bitslice())
    }

    fn from_bit_box(mut bits: BitBox<u8>) -> Self {
        bits.fill_uninitialized(false);

        Self {
            bits,
            phantom: PhantomData,
        }
    }
}

#[cfg(test)]
impl<N> BitList<N> {
    const fn validate_length(actual: usize) -> Result<(), ReadError>
    where
        N: Unsigned,
    {
        let maximum = N::USIZE;

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(())
    }
}

const fn bytes_without_delimiting_bit(length: usize) -> usize {
    length.div_ceil(BITS_PER_BYTE)
}

const fn bytes_with_delimiting_bit(length: usize) -> usize {
    length.saturating_add(1).div_ceil(BITS_PER_BYTE)
}
