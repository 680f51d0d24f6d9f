//! Caesar-shift codec behind the daily puzzle.
//!
//! Only ASCII letters rotate, each within its own case. Everything else passes
//! through untouched, so punctuation and spacing survive a round trip.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ALPHABET_LEN: u8 = 26;
pub const MIN_SHIFT: u8 = 1;
pub const MAX_SHIFT: u8 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoded {
    pub encoded: String,
    pub shift: u8,
}

/// Encode with a shift drawn uniformly from `[1, 25]`.
pub fn encode(sentence: &str) -> Encoded {
    encode_with_rng(sentence, &mut rand::thread_rng())
}

pub fn encode_with_rng<R: Rng + ?Sized>(sentence: &str, rng: &mut R) -> Encoded {
    let shift = rng.gen_range(MIN_SHIFT..=MAX_SHIFT);
    Encoded {
        encoded: encode_with_shift(sentence, shift),
        shift,
    }
}

pub fn encode_with_shift(sentence: &str, shift: u8) -> String {
    sentence.chars().map(|c| rotate(c, shift)).collect()
}

/// Rotation that undoes `shift`. Never 0: a zero rotation is shown as 26.
pub fn decode_hint(shift: u8) -> u8 {
    let rotation = (ALPHABET_LEN - shift % ALPHABET_LEN) % ALPHABET_LEN;
    if rotation == 0 {
        ALPHABET_LEN
    } else {
        rotation
    }
}

/// Applies a hint rotation to an encoded sentence.
pub fn decode(encoded: &str, rotation: u8) -> String {
    encode_with_shift(encoded, rotation)
}

pub fn verify(candidate: &str, original: &str) -> bool {
    candidate.trim().to_lowercase() == original.to_lowercase()
}

fn rotate(c: char, shift: u8) -> char {
    let base = match c {
        'a'..='z' => b'a',
        'A'..='Z' => b'A',
        _ => return c,
    };
    let offset = (c as u8 - base + shift % ALPHABET_LEN) % ALPHABET_LEN;
    (base + offset) as char
}
