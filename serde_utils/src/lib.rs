pub mod prefixed_hex_or_bytes_cow;
pub mod prefixed_hex_or_bytes_slice;
pub mod string_or_native;

mod shared;
