//! Participation bitsets.
//!
//! A [`BitList`] records which seats of a committee or subcommittee contributed to a message.
//! Deduplication and aggregation in `operation_pools` are expressed entirely in terms of the
//! set operations defined here.

pub use crate::{bit_list::BitList, consts::BITS_PER_BYTE, error::ReadError};

mod bit_list;
mod consts;
mod error;
