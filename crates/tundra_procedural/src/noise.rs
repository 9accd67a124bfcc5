//! # Noise Engine
//!
//! Two independent noise families feed the generators:
//!
//! - [`grid`]: lattice value noise ([`Noise`]) summed over octaves into a
//!   2D [`Grid`], plus the grid transforms the realistic generator runs
//!   (normalize, blend, marble, bias, slope, threshold search).
//! - [`improved`]: Ken Perlin's improved noise ([`ImprovedNoise`]), its
//!   octave sum ([`OctaveNoise`]) and domain warp ([`CombinedNoise`]),
//!   used by the classic generator.
//!
//! ## Determinism Guarantee
//!
//! Given the same [`WorldSeed`] every function here produces exactly the
//! same values on any platform. Random streams are `ChaCha8`, which is
//! specified bit-for-bit and does not depend on the host.

pub mod grid;
pub mod improved;

pub use grid::{Grid, InterpolationMode, Noise};
pub use improved::{CombinedNoise, ImprovedNoise, OctaveNoise};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., cave carving).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        // FNV-1a hash mixing
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }

    /// Low 32 bits, as used by the lattice hash.
    #[inline]
    #[must_use]
    pub const fn lattice_seed(self) -> i32 {
        self.0 as i32
    }

    /// Seeded random stream.
    #[must_use]
    pub fn rng(self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

impl From<i64> for WorldSeed {
    fn from(seed: i64) -> Self {
        Self(seed as u64)
    }
}

/// Quintic fade curve `6t^5 - 15t^4 + 10t^3`.
#[inline]
#[must_use]
pub(crate) fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Linear interpolation.
#[inline]
#[must_use]
pub(crate) fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

/// Fast floor function.
///
/// Faster than `f64::floor()` for our use case.
#[inline]
pub(crate) fn fast_floor(x: f64) -> i32 {
    let xi = x as i32;
    if x < f64::from(xi) { xi - 1 } else { xi }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seed_derivation() {
        let base = WorldSeed::new(42);
        let derived1 = base.derive(1);
        let derived2 = base.derive(2);
        let derived1_again = base.derive(1);

        assert_ne!(derived1, derived2, "Different purposes should give different seeds");
        assert_eq!(derived1, derived1_again, "Same purpose should give same seed");
        assert_ne!(derived1, base, "Derived seed should differ from base");
    }

    #[test]
    fn test_rng_is_reproducible() {
        let mut a = WorldSeed::new(7).rng();
        let mut b = WorldSeed::new(7).rng();
        for _ in 0..32 {
            assert_eq!(a.gen::<u32>(), b.gen::<u32>());
        }
    }

    #[test]
    fn test_fade_endpoints() {
        assert_eq!(fade(0.0), 0.0);
        assert_eq!(fade(1.0), 1.0);
        assert!((fade(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fast_floor() {
        assert_eq!(fast_floor(1.5), 1);
        assert_eq!(fast_floor(-1.5), -2);
        assert_eq!(fast_floor(-2.0), -2);
    }
}
