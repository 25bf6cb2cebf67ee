//! Opaque record identifiers derived from sequential counters.
//!
//! A counter is scrambled with the affine permutation
//! `x ↦ (x * multiplier + H(salt)) mod 62^length` and written as a fixed-width
//! base-62 string behind a one-character entity prefix. Because the multiplier
//! is coprime with the modulus the mapping is a bijection over
//! `[0, 62^length)`, so ids never collide until the counter space wraps.

use sha2::{Digest, Sha256};
use thiserror::Error;

pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
pub const BASE: u128 = 62;
pub const DEFAULT_LENGTH: usize = 6;
pub const DEFAULT_MULTIPLIER: u64 = 1_315_423_911;
pub const MAX_LENGTH: usize = 10;

pub const NOTEBOOK_PREFIX: char = 'b';
pub const NOTE_PREFIX: char = 'n';
pub const DEFAULT_NOTEBOOK_SALT: &str = "default_salt";
pub const DEFAULT_NOTE_SALT: &str = "default_note_salt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdCodecError {
    #[error("counter must be a non-negative integer (given value: {0})")]
    NegativeCounter(i64),
    #[error("length must be a positive integer (given value: {0})")]
    InvalidLength(usize),
    #[error("length must not exceed 10 (given value: {0})")]
    LengthOutOfRange(usize),
    #[error("salt must be a non-empty string")]
    EmptySalt,
    #[error("multiplier must be coprime with {modulus} (given value: {multiplier})")]
    MultiplierNotCoprime { multiplier: u64, modulus: u128 },
}

/// Generate a fixed-width, prefixed base-62 id for `counter`.
pub fn generate(
    prefix: char,
    counter: i64,
    length: usize,
    salt: &str,
    multiplier: u64,
) -> Result<String, IdCodecError> {
    if counter < 0 {
        return Err(IdCodecError::NegativeCounter(counter));
    }
    let codec = IdCodec::new(prefix, length, salt, multiplier)?;
    codec.encode(counter)
}

/// Codec with validated parameters, built once per entity type.
#[derive(Debug, Clone)]
pub struct IdCodec {
    prefix: char,
    length: usize,
    modulus: u128,
    multiplier: u128,
    salt_hash: u128,
}

impl IdCodec {
    pub fn new(
        prefix: char,
        length: usize,
        salt: &str,
        multiplier: u64,
    ) -> Result<Self, IdCodecError> {
        if length == 0 {
            return Err(IdCodecError::InvalidLength(length));
        }
        if length > MAX_LENGTH {
            return Err(IdCodecError::LengthOutOfRange(length));
        }
        if salt.is_empty() {
            return Err(IdCodecError::EmptySalt);
        }

        let modulus = BASE.pow(length as u32);
        if multiplier == 0 || gcd(u128::from(multiplier), modulus) != 1 {
            return Err(IdCodecError::MultiplierNotCoprime {
                multiplier,
                modulus,
            });
        }

        Ok(Self {
            prefix,
            length,
            modulus,
            multiplier: u128::from(multiplier),
            salt_hash: salt_hash(salt) % modulus,
        })
    }

    /// Total id length including the prefix.
    pub fn id_len(&self) -> usize {
        self.length + self.prefix.len_utf8()
    }

    /// Size of the collision-free counter space.
    pub fn capacity(&self) -> u128 {
        self.modulus
    }

    pub fn encode(&self, counter: i64) -> Result<String, IdCodecError> {
        if counter < 0 {
            return Err(IdCodecError::NegativeCounter(counter));
        }

        let counter = counter as u128;
        let mut permuted = (counter * self.multiplier + self.salt_hash) % self.modulus;

        let mut digits = vec![ALPHABET[0]; self.length];
        for slot in digits.iter_mut().rev() {
            *slot = ALPHABET[(permuted % BASE) as usize];
            permuted /= BASE;
        }

        let mut id = String::with_capacity(self.id_len());
        id.push(self.prefix);
        id.extend(digits.into_iter().map(char::from));
        Ok(id)
    }
}

fn salt_hash(salt: &str) -> u128 {
    let digest = Sha256::digest(salt.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u128::from(u64::from_be_bytes(head))
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}
