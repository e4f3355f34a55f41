//! Short code generation.
//!
//! Codes are drawn uniformly, with replacement, from a configured alphabet.
//! The alphabet and length are validated once when the generator is built, so
//! [`CodeGenerator::generate`] cannot fail.

use rand::Rng;

use crate::error::{StorageError, StorageResult};

/// Width of the `code` column in every relational backend.
pub const MAX_CODE_LENGTH: usize = 50;

/// Produces random fixed-length short codes.
///
/// Each call draws from the thread-local RNG, so one instance can be shared
/// across tasks behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl CodeGenerator {
    /// Builds a generator for the given alphabet and code length.
    ///
    /// Duplicate characters are collapsed so every distinct character has the
    /// same probability.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if:
    /// - the alphabet is empty
    /// - the alphabet contains a character outside `A-Z a-z 0-9 - . _ ~`
    /// - `length` is 0 or above [`MAX_CODE_LENGTH`]
    pub fn new(alphabet: &str, length: usize) -> StorageResult<Self> {
        let mut chars: Vec<char> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if !is_url_unreserved(c) {
                return Err(StorageError::configuration(format!(
                    "alphabet character {c:?} is not URL-safe"
                )));
            }
            if !chars.contains(&c) {
                chars.push(c);
            }
        }

        if chars.is_empty() {
            return Err(StorageError::configuration("alphabet must not be empty"));
        }

        if length == 0 || length > MAX_CODE_LENGTH {
            return Err(StorageError::configuration(format!(
                "code length must be between 1 and {MAX_CODE_LENGTH}, got {length}"
            )));
        }

        Ok(Self {
            alphabet: chars,
            length,
        })
    }

    /// Generates one candidate code.
    pub fn generate(&self) -> String {
        let mut rng = rand::rng();

        (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns true if `code` has the configured length and only alphabet characters.
    pub fn is_well_formed(&self, code: &str) -> bool {
        code.chars().count() == self.length && code.chars().all(|c| self.alphabet.contains(&c))
    }
}

fn is_url_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}
