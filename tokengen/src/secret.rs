//! Random symmetric secrets for `JWT_SECRET` / `REFRESH_TOKEN_SECRET`.
//!
//! The first characters guarantee one digit and (unless disabled) one special
//! character; the buffer is shuffled afterwards so their position is random.

use rand::{Rng, seq::SliceRandom};
use thiserror::Error;

pub const DIGITS: &[u8] = b"0123456789";
pub const SPECIALS: &[u8] = b"~=+%^*/()[]{}/!@#$?|<>";
const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Shortest secret the server accepts.
pub const MIN_LENGTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret length must be at least {min} (got {got})")]
    TooShort { min: usize, got: usize },
}

pub fn generate_secret<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    with_specials: bool,
) -> Result<String, SecretError> {
    if length < MIN_LENGTH {
        return Err(SecretError::TooShort {
            min: MIN_LENGTH,
            got: length,
        });
    }

    let alphabet: Vec<u8> = if with_specials {
        [LETTERS, DIGITS, SPECIALS].concat()
    } else {
        [LETTERS, DIGITS].concat()
    };

    let mut buf = Vec::with_capacity(length);
    buf.push(pick(rng, DIGITS));
    if with_specials {
        buf.push(pick(rng, SPECIALS));
    }
    while buf.len() < length {
        buf.push(pick(rng, &alphabet));
    }
    buf.shuffle(rng);

    Ok(buf.into_iter().map(char::from).collect())
}

fn pick<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8]) -> u8 {
    alphabet[rng.random_range(0..alphabet.len())]
}
