//! Converting octet sequences into hex strings.
//!
//! All hex output of the crate is lowercase without separators.

use std::str;


/// Encodes a octet sequence as a hex string.
///
/// The function uses `dest` as the buffer for encoding which therefore must
/// be at least twice the length of `src`. It returns a reference to this
/// buffer as a `&str`.
///
/// # Panics
///
/// The function panics if `dest` is shorter than twice the length of `src`.
pub fn encode<'a>(src: &[u8], dest: &'a mut [u8]) -> &'a str {
    let dest = &mut dest[..src.len() * 2];
    for (s, d) in src.iter().zip(dest.chunks_mut(2)) {
        d.copy_from_slice(&encode_u8(*s));
    }
    // DIGITS is ASCII only.
    unsafe { str::from_utf8_unchecked(dest) }
}

/// Encodes a octet sequence into a newly allocated hex string.
pub fn encode_string(src: &[u8]) -> String {
    let mut res = vec![0u8; src.len() * 2];
    encode(src, &mut res).into()
}

pub fn encode_u8(ch: u8) -> [u8; 2] {
    [DIGITS[usize::from(ch >> 4)], DIGITS[usize::from(ch & 0x0F)]]
}

const DIGITS: &[u8] = b"0123456789abcdef";


//============ Tests =========================================================
