//! Seedable random source for workspace names and solution GUIDs.
//!
//! The generator is injected wherever random names are needed so a `--seed`
//! run is fully deterministic; nothing in the harness draws from a
//! process-global source.

use anyhow::Result;

const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
const GUID_TEMPLATE: &str = "HHHHHHHH-HHHH-HHHH-HHHH-HHHHHHHHHHHH";

/// Draw a fresh seed from the OS entropy source.
pub fn entropy_seed() -> Result<u64> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).map_err(|e| anyhow::anyhow!("read OS entropy: {e}"))?;
    Ok(u64::from_le_bytes(bytes))
}

/// splitmix64; small, fast, and plenty for collision-resistant directory
/// names (62^10 possible names per draw).
#[derive(Debug, Clone)]
pub struct NameRng {
    state: u64,
}

impl NameRng {
    pub fn seeded(seed: u64) -> Self {
        NameRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// One symbol index, uniform over the 62-entry alphabet. Rejection
    /// sampling on the top six bits keeps the draw unbiased.
    fn next_symbol(&mut self) -> u8 {
        loop {
            let v = (self.next_u64() >> 58) as usize;
            if v < ALPHABET.len() {
                return ALPHABET[v];
            }
        }
    }

    /// A fixed-length alphanumeric name, each character drawn independently
    /// and uniformly.
    pub fn alnum_name(&mut self, len: usize) -> String {
        let mut out = String::with_capacity(len);
        for _ in 0..len {
            out.push(self.next_symbol() as char);
        }
        out
    }

    /// An uppercase-hex GUID in the 8-4-4-4-12 shape Visual Studio solution
    /// files expect.
    pub fn csharp_guid(&mut self) -> String {
        GUID_TEMPLATE
            .chars()
            .map(|c| {
                if c == 'H' {
                    HEX_UPPER[(self.next_u64() >> 60) as usize] as char
                } else {
                    c
                }
            })
            .collect()
    }
}
