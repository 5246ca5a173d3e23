//! Randomness source for credential identifiers and secrets.

use rand::RngCore;

/// Number of random bytes drawn for each identifier or secret.
const RANDOM_LEN: usize = 16;

/// Produces unguessable opaque values.
///
/// Called once per identifier or secret needed. Test doubles may return a fixed sequence.
pub trait RandomSource: Send + Sync {
    fn get(&self) -> Vec<u8>;
}

/// Cryptographically secure randomness from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn get(&self) -> Vec<u8> {
        let mut buf = vec![0u8; RANDOM_LEN];
        rand::rng().fill_bytes(&mut buf);
        buf
    }
}
