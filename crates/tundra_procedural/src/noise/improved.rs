//! # Improved Noise
//!
//! Ken Perlin's 2002 improved noise over a seeded permutation table.
//!
//! [`OctaveNoise`] sums independently seeded layers while halving the
//! frequency each octave. Every octave contributes at full amplitude: the
//! terrain constants of the classic generator were tuned against that sum,
//! so there is deliberately no persistence factor.

use rand::Rng;

use super::{fade, fast_floor, lerp};

/// One layer of improved Perlin noise.
#[derive(Clone)]
pub struct ImprovedNoise {
    /// 512-entry permutation table (256 entries, doubled for overflow handling).
    perm: [u8; 512],
}

impl ImprovedNoise {
    /// Builds the permutation table by Fisher-Yates shuffle from `rng`.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut perm = [0u8; 512];
        for (i, p) in perm.iter_mut().take(256).enumerate() {
            *p = i as u8;
        }
        for i in 0..256 {
            let j = rng.gen_range(i..256);
            perm.swap(i, j);
        }
        for i in 0..256 {
            perm[256 + i] = perm[i];
        }
        Self { perm }
    }

    #[inline]
    fn p(&self, index: usize) -> usize {
        usize::from(self.perm[index & 511])
    }

    /// Gradient from the low 4 bits of the hash: 12 cube-edge directions
    /// plus 4 repeats.
    #[inline]
    fn grad(hash: usize, x: f64, y: f64, z: f64) -> f64 {
        let h = hash & 15;
        let u = if h < 8 { x } else { y };
        let v = if h < 4 {
            y
        } else if h == 12 || h == 14 {
            x
        } else {
            z
        };
        (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
    }

    /// 3D noise, roughly in `[-1, 1]`, exactly 0 on lattice points.
    #[must_use]
    pub fn noise3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xf, yf, zf) = (fast_floor(x), fast_floor(y), fast_floor(z));
        let xi = (xf & 255) as usize;
        let yi = (yf & 255) as usize;
        let zi = (zf & 255) as usize;
        let x = x - f64::from(xf);
        let y = y - f64::from(yf);
        let z = z - f64::from(zf);

        let u = fade(x);
        let v = fade(y);
        let w = fade(z);

        let a = self.p(xi) + yi;
        let aa = self.p(a) + zi;
        let ab = self.p(a + 1) + zi;
        let b = self.p(xi + 1) + yi;
        let ba = self.p(b) + zi;
        let bb = self.p(b + 1) + zi;

        lerp(
            w,
            lerp(
                v,
                lerp(u, Self::grad(self.p(aa), x, y, z), Self::grad(self.p(ba), x - 1.0, y, z)),
                lerp(
                    u,
                    Self::grad(self.p(ab), x, y - 1.0, z),
                    Self::grad(self.p(bb), x - 1.0, y - 1.0, z),
                ),
            ),
            lerp(
                v,
                lerp(
                    u,
                    Self::grad(self.p(aa + 1), x, y, z - 1.0),
                    Self::grad(self.p(ba + 1), x - 1.0, y, z - 1.0),
                ),
                lerp(
                    u,
                    Self::grad(self.p(ab + 1), x, y - 1.0, z - 1.0),
                    Self::grad(self.p(bb + 1), x - 1.0, y - 1.0, z - 1.0),
                ),
            ),
        )
    }

    /// 2D slice at `z = 0`.
    #[inline]
    #[must_use]
    pub fn compute(&self, x: f64, y: f64) -> f64 {
        self.noise3d(x, y, 0.0)
    }
}

/// Sum of `octaves` improved-noise layers.
///
/// `compute(x, y) = Σ layer_i(x / 2^i, y / 2^i)`, every layer at full amplitude.
#[derive(Clone)]
pub struct OctaveNoise {
    layers: Vec<ImprovedNoise>,
}

impl OctaveNoise {
    /// Creates `octaves` layers, each seeded from the next values of `rng`.
    pub fn new<R: Rng + ?Sized>(octaves: usize, rng: &mut R) -> Self {
        Self {
            layers: (0..octaves).map(|_| ImprovedNoise::new(rng)).collect(),
        }
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub fn octaves(&self) -> usize {
        self.layers.len()
    }

    /// Samples the octave sum.
    #[must_use]
    pub fn compute(&self, x: f64, y: f64) -> f64 {
        let mut scale = 1.0;
        let mut sum = 0.0;
        for layer in &self.layers {
            sum += layer.compute(x / scale, y / scale);
            scale *= 2.0;
        }
        sum
    }
}

/// Domain warp of one octave noise by another: `a(x + b(x, y), y)`.
#[derive(Clone)]
pub struct CombinedNoise {
    a: OctaveNoise,
    b: OctaveNoise,
}

impl CombinedNoise {
    /// Combines two noise fields.
    #[must_use]
    pub fn new(a: OctaveNoise, b: OctaveNoise) -> Self {
        Self { a, b }
    }

    /// Samples the warped field.
    #[inline]
    #[must_use]
    pub fn compute(&self, x: f64, y: f64) -> f64 {
        let offset = self.b.compute(x, y);
        self.a.compute(x + offset, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::WorldSeed;

    #[test]
    fn test_permutation_is_a_permutation() {
        let noise = ImprovedNoise::new(&mut WorldSeed::new(3).rng());
        let mut seen = [false; 256];
        for &p in &noise.perm[..256] {
            seen[usize::from(p)] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(noise.perm[..256], noise.perm[256..]);
    }

    #[test]
    fn test_determinism() {
        let a = ImprovedNoise::new(&mut WorldSeed::new(12345).rng());
        let b = ImprovedNoise::new(&mut WorldSeed::new(12345).rng());
        for i in 0..200 {
            let x = f64::from(i) * 0.37 - 20.0;
            let y = f64::from(i) * 0.11 + 3.0;
            let z = f64::from(i) * 0.05;
            assert_eq!(a.noise3d(x, y, z).to_bits(), b.noise3d(x, y, z).to_bits());
        }
    }

    #[test]
    fn test_zero_on_lattice() {
        let noise = ImprovedNoise::new(&mut WorldSeed::new(9).rng());
        for x in -5..5 {
            for y in -5..5 {
                assert_eq!(noise.compute(f64::from(x), f64::from(y)), 0.0);
            }
        }
    }

    #[test]
    fn test_range() {
        let noise = ImprovedNoise::new(&mut WorldSeed::new(42).rng());
        for i in 0..10_000 {
            let x = f64::from(i) * 0.173 - 500.0;
            let y = f64::from(i) * 0.131 - 650.0;
            let v = noise.noise3d(x, y, f64::from(i) * 0.01);
            assert!((-1.1..=1.1).contains(&v), "value {v} out of range");
        }
    }

    #[test]
    fn test_octaves_full_amplitude() {
        let mut rng = WorldSeed::new(5).rng();
        let single = OctaveNoise::new(1, &mut rng.clone());
        let first_layer = ImprovedNoise::new(&mut rng);
        // With one octave the sum is exactly the first layer
        assert_eq!(single.compute(1.3, 2.7), first_layer.compute(1.3, 2.7));

        let octaves = OctaveNoise::new(8, &mut WorldSeed::new(5).rng());
        let max = (0..2000)
            .map(|i| octaves.compute(f64::from(i) * 1.3, f64::from(i) * 0.7).abs())
            .fold(0.0, f64::max);
        // No persistence: the sum exceeds a single layer's range
        assert!(max > 1.0, "octave sum should exceed unit range, got {max}");
    }

    #[test]
    fn test_combined_noise_determinism() {
        let build = || {
            let mut rng = WorldSeed::new(77).rng();
            CombinedNoise::new(OctaveNoise::new(4, &mut rng), OctaveNoise::new(4, &mut rng))
        };
        let (a, b) = (build(), build());
        assert_eq!(a.compute(12.5, 3.25).to_bits(), b.compute(12.5, 3.25).to_bits());
    }
}
