//! Session id generation for the CONNECT handshake.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters a session id is drawn from.
pub const SESSION_ID_ALPHABET: &[u8] =
    b"0123456789abcdefghjklmnopqrstvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a generated session id.
pub const SESSION_ID_LENGTH: usize = 15;

/// Random source for session ids, owned by one client.
#[derive(Debug, Clone)]
pub struct SessionIdGenerator {
    rng: StdRng,
}

impl SessionIdGenerator {
    /// Seeds from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible ids.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> String {
        (0..SESSION_ID_LENGTH)
            .map(|_| {
                let index = self.rng.gen_range(0..SESSION_ID_ALPHABET.len());
                char::from(SESSION_ID_ALPHABET[index])
            })
            .collect()
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
