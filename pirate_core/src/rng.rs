use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

// Provably-fair stream: HMAC-SHA256(server_seed, "client_seed:nonce") gives the
// first 32 bytes; each exhausted block is re-hashed for the next one.

pub type HmacSha256 = Hmac<Sha256>;

/// Source of uniform draws for the engine.
///
/// Every call to either method is one draw; the engine's draw budget is
/// counted in calls, so implementations must not batch or skip.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform value in `[0, bound)`. `bound` must be non-zero.
    fn next_below(&mut self, bound: u32) -> u32 {
        let v = (self.next_unit() * bound as f64) as u32;
        v.min(bound.saturating_sub(1))
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }

    fn next_below(&mut self, bound: u32) -> u32 {
        (**self).next_below(bound)
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Fresh 32-byte server seed from the OS, hex encoded.
pub fn generate_server_seed() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn sha256(input: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn unit_from_be(chunk: &[u8]) -> f64 {
    let v = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    (v as f64) / (u32::MAX as f64 + 1.0)
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret until rotated
    pub client_seed: String,
    pub nonce: u64,
    block: [u8; 32],
    offset: usize,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        let server_seed = server_seed.into();
        let client_seed = client_seed.into();
        let block = hmac_bytes(&server_seed, &client_seed, nonce);
        Self {
            server_seed,
            client_seed,
            nonce,
            block,
            offset: 0,
        }
    }

    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }
}

pub fn hmac_bytes(server_seed: &str, client_seed: &str, nonce: u64) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC key");
    let msg = format!("{}:{}", client_seed, nonce);
    mac.update(msg.as_bytes());
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&res);
    out
}

impl RandomSource for ProvablyFairRng {
    fn next_unit(&mut self) -> f64 {
        if self.offset + 4 > self.block.len() {
            self.block = sha256(&self.block);
            self.offset = 0;
        }
        let f = unit_from_be(&self.block[self.offset..self.offset + 4]);
        self.offset += 4;
        f
    }
}

/// Adapts any `rand` generator (e.g. `rand::rngs::OsRng`) to the engine.
#[derive(Debug, Clone, Default)]
pub struct EntropyRandom<R>(pub R);

impl<R: RngCore> RandomSource for EntropyRandom<R> {
    fn next_unit(&mut self) -> f64 {
        (self.0.next_u32() as f64) / (u32::MAX as f64 + 1.0)
    }
}

/// Replays a fixed list of unit draws, wrapping around when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Unit draw that lands in bucket `index` of `buckets` under `next_below`.
    pub fn bucket(index: u32, buckets: u32) -> f64 {
        (index as f64 + 0.5) / buckets as f64
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// Counts draws taken from the wrapped source.
#[derive(Debug, Clone)]
pub struct CountingRandom<R> {
    inner: R,
    draws: usize,
}

impl<R> CountingRandom<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, draws: 0 }
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: RandomSource> RandomSource for CountingRandom<R> {
    fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.inner.next_unit()
    }

    fn next_below(&mut self, bound: u32) -> u32 {
        self.draws += 1;
        self.inner.next_below(bound)
    }
}
