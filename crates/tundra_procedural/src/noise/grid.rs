//! # Grid Noise
//!
//! Lattice value noise and the 2D float grids it is summed into.
//!
//! [`Noise`] hashes integer lattice points into `[-1, 1]` and interpolates
//! between them with one of four [`InterpolationMode`]s. Octaves are summed
//! with a geometric amplitude `decay` into a [`Grid`], which then goes
//! through the transforms below before voxelization.

use super::WorldSeed;

/// How lattice values are blended between integer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InterpolationMode {
    /// Bilinear.
    Linear,
    /// Cosine-eased bilinear.
    #[default]
    Cosine,
    /// Cubic over a 4x4 neighbourhood.
    Bicubic,
    /// Catmull-Rom spline over a 4x4 neighbourhood.
    Spline,
}

/// Seeded lattice value noise.
#[derive(Clone, Copy, Debug)]
pub struct Noise {
    seed: i32,
    mode: InterpolationMode,
}

impl Noise {
    /// Creates a noise source.
    #[inline]
    #[must_use]
    pub const fn new(seed: WorldSeed, mode: InterpolationMode) -> Self {
        Self { seed: seed.lattice_seed(), mode }
    }

    /// Interpolation mode in use.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> InterpolationMode {
        self.mode
    }

    /// Integer lattice hash in `[-1, 1]`.
    #[inline]
    #[must_use]
    pub fn static_noise(&self, x: i32, y: i32) -> f32 {
        let mut n = self
            .seed
            .wrapping_add(x)
            .wrapping_add(y.wrapping_mul(i32::from(i16::MAX)));
        n = (n << 13) ^ n;
        let hashed = n
            .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
            .wrapping_add(1_376_312_589)
            & 0x7FFF_FFFF;
        (1.0 - f64::from(hashed) / 1_073_741_824.0) as f32
    }

    /// Noise at a real coordinate, interpolated per the mode.
    #[must_use]
    pub fn interpolated_noise(&self, x: f32, y: f32) -> f32 {
        let xi = x.floor() as i32;
        let yi = y.floor() as i32;
        let xf = x - xi as f32;
        let yf = y - yi as f32;

        match self.mode {
            InterpolationMode::Linear | InterpolationMode::Cosine => {
                let p00 = self.static_noise(xi, yi);
                let p10 = self.static_noise(xi + 1, yi);
                let p01 = self.static_noise(xi, yi + 1);
                let p11 = self.static_noise(xi + 1, yi + 1);
                let interp = if self.mode == InterpolationMode::Linear {
                    interpolate_linear
                } else {
                    interpolate_cosine
                };
                interp(interp(p00, p10, xf), interp(p01, p11, xf), yf)
            }
            InterpolationMode::Bicubic | InterpolationMode::Spline => {
                let interp = if self.mode == InterpolationMode::Bicubic {
                    interpolate_cubic
                } else {
                    interpolate_spline
                };
                let mut rows = [0.0f32; 4];
                for (row, dy) in rows.iter_mut().zip(-1..=2) {
                    let v: [f32; 4] = std::array::from_fn(|i| {
                        self.static_noise(xi + i as i32 - 1, yi + dy)
                    });
                    *row = interp(v[0], v[1], v[2], v[3], xf);
                }
                interp(rows[0], rows[1], rows[2], rows[3], yf)
            }
        }
    }

    /// Octave sum from `start_octave` to `end_octave` inclusive.
    ///
    /// Octave `n` samples at frequency `2^n` with amplitude `decay^n`.
    #[must_use]
    pub fn perlin_noise(&self, x: f32, y: f32, start_octave: i32, end_octave: i32, decay: f32) -> f32 {
        let mut frequency = 2f32.powi(start_octave);
        let mut amplitude = decay.powi(start_octave);
        let mut total = 0.0;
        for _ in start_octave..=end_octave {
            total += self.interpolated_noise(x * frequency + frequency, y * frequency + frequency)
                * amplitude;
            frequency *= 2.0;
            amplitude *= decay;
        }
        total
    }

    /// Adds the octave sum to every cell of `grid`.
    ///
    /// Coordinates are scaled by `1 / max(width, length)` so the lowest
    /// octave spans the whole map regardless of its aspect.
    pub fn perlin_noise_grid(
        &self,
        grid: &mut Grid,
        start_octave: i32,
        end_octave: i32,
        decay: f32,
        offset_x: i32,
        offset_y: i32,
    ) {
        let inv = 1.0 / grid.width.max(grid.length) as f32;
        for y in 0..grid.length {
            for x in 0..grid.width {
                let v = self.perlin_noise(
                    x as f32 * inv + offset_x as f32,
                    y as f32 * inv + offset_y as f32,
                    start_octave,
                    end_octave,
                    decay,
                );
                grid.data[y * grid.width + x] += v;
            }
        }
    }
}

#[inline]
fn interpolate_linear(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[inline]
fn interpolate_cosine(a: f32, b: f32, t: f32) -> f32 {
    let f = (1.0 - (t * std::f32::consts::PI).cos()) * 0.5;
    a * (1.0 - f) + b * f
}

#[inline]
fn interpolate_cubic(v0: f32, v1: f32, v2: f32, v3: f32, t: f32) -> f32 {
    let a0 = v3 - v2 - v0 + v1;
    let a1 = v0 - v1 - a0;
    let a2 = v2 - v0;
    let a3 = v1;
    a0 * t * t * t + a1 * t * t + a2 * t + a3
}

#[inline]
fn interpolate_spline(v0: f32, v1: f32, v2: f32, v3: f32, t: f32) -> f32 {
    0.5 * (2.0 * v1
        + (-v0 + v2) * t
        + (2.0 * v0 - 5.0 * v1 + 4.0 * v2 - v3) * t * t
        + (-v0 + 3.0 * v1 - 3.0 * v2 + v3) * t * t * t)
}

/// A `width × length` grid of `f32`, indexed `[y * width + x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    length: usize,
    data: Vec<f32>,
}

impl Grid {
    /// Zero-filled grid.
    #[must_use]
    pub fn new(width: usize, length: usize) -> Self {
        Self { width, length, data: vec![0.0; width * length] }
    }

    /// Grid filled with one value.
    #[must_use]
    pub fn filled(width: usize, length: usize, value: f32) -> Self {
        Self { width, length, data: vec![value; width * length] }
    }

    /// Grid built from a function of the cell coordinate.
    #[must_use]
    pub fn from_fn(width: usize, length: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * length);
        for y in 0..length {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, length, data }
    }

    /// Size along X.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Size along Y.
    #[inline]
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Cell value. Panics when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Sets a cell. Panics when out of range.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        self.data[y * self.width + x] = value;
    }

    /// Cell value with coordinates clamped to the edges.
    #[inline]
    #[must_use]
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.length as i64 - 1) as usize;
        self.get(x, y)
    }

    /// Raw cells.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw cells.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Smallest and largest value.
    #[must_use]
    pub fn min_max(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Rescales to `[0, 1]`.
    pub fn normalize(&mut self) {
        self.normalize_range(0.0, 1.0);
    }

    /// Rescales linearly so the minimum becomes `low` and the maximum `high`.
    ///
    /// A constant grid becomes all `low`.
    pub fn normalize_range(&mut self, low: f32, high: f32) {
        let (min, max) = self.min_max();
        let span = max - min;
        if span <= f32::EPSILON || !span.is_finite() {
            self.data.fill(low);
            return;
        }
        let scale = (high - low) / span;
        for v in &mut self.data {
            *v = low + (*v - min) * scale;
        }
    }

    /// Flips `v -> 1 - v`.
    pub fn invert(&mut self) {
        for v in &mut self.data {
            *v = 1.0 - *v;
        }
    }

    /// Sine fold `|sin(πv)|`: ridges where the field crosses 0.5.
    pub fn marble(&mut self) {
        for v in &mut self.data {
            *v = (*v * std::f32::consts::PI).sin().abs();
        }
    }

    /// Sharpens around 0.5: `clamp((v - 0.5) * steepness + 0.5, 0, 1)`.
    pub fn scale_and_clip(&mut self, steepness: f32) {
        for v in &mut self.data {
            *v = ((*v - 0.5) * steepness + 0.5).clamp(0.0, 1.0);
        }
    }

    /// `a * (1 - mask) + b * mask`, cell by cell.
    ///
    /// All three grids must share dimensions.
    #[must_use]
    pub fn blend(a: &Self, b: &Self, mask: &Self) -> Self {
        debug_assert_eq!(a.data.len(), b.data.len());
        debug_assert_eq!(a.data.len(), mask.data.len());
        let data = a
            .data
            .iter()
            .zip(&b.data)
            .zip(&mask.data)
            .map(|((&va, &vb), &m)| va * (1.0 - m) + vb * m)
            .collect();
        Self { width: a.width, length: a.length, data }
    }

    /// 5x5 Gaussian blur with clamped edges.
    #[must_use]
    pub fn gaussian_blur_5x5(&self) -> Self {
        const KERNEL: [f32; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];
        const WEIGHT: f32 = 256.0;
        Self::from_fn(self.width, self.length, |x, y| {
            let mut sum = 0.0;
            for (ky, wy) in KERNEL.iter().enumerate() {
                for (kx, wx) in KERNEL.iter().enumerate() {
                    let sx = x as i64 + kx as i64 - 2;
                    let sy = y as i64 + ky as i64 - 2;
                    sum += self.get_clamped(sx, sy) * wx * wy;
                }
            }
            sum / WEIGHT
        })
    }

    /// Central-difference gradient magnitude, in grid units per cell.
    #[must_use]
    pub fn calculate_slope(&self) -> Self {
        Self::from_fn(self.width, self.length, |x, y| {
            let (x, y) = (x as i64, y as i64);
            let dx = (self.get_clamped(x + 1, y) - self.get_clamped(x - 1, y)) * 0.5;
            let dy = (self.get_clamped(x, y + 1) - self.get_clamped(x, y - 1)) * 0.5;
            (dx * dx + dy * dy).sqrt()
        })
    }

    /// Fraction of cells strictly below `threshold`.
    #[must_use]
    pub fn calculate_coverage(&self, threshold: f32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let below = self.data.iter().filter(|&&v| v < threshold).count();
        below as f32 / self.data.len() as f32
    }

    /// Binary search for a threshold whose coverage is `target`.
    #[must_use]
    pub fn find_threshold(&self, target: f32) -> f32 {
        let (mut low, mut high) = self.min_max();
        if !low.is_finite() {
            return 0.5;
        }
        if target <= 0.0 {
            return low;
        }
        if target >= 1.0 {
            return high + f32::EPSILON;
        }
        for _ in 0..40 {
            let mid = (low + high) * 0.5;
            if self.calculate_coverage(mid) < target {
                low = mid;
            } else {
                high = mid;
            }
        }
        (low + high) * 0.5
    }

    /// Adds a smooth displacement field defined by four corners and a centre.
    ///
    /// `c00` sits at `(0, 0)`, `c10` at `(max x, 0)`, `c01` at `(0, max y)`,
    /// `c11` at the far corner. Edge midpoints are the averages of their two
    /// corners, the centre is `midpoint`. Each quadrant is cosine-interpolated
    /// between its four control points.
    pub fn apply_bias(&mut self, c00: f32, c01: f32, c10: f32, c11: f32, midpoint: f32) {
        let control = [
            [c00, (c00 + c01) * 0.5, c01],
            [(c00 + c10) * 0.5, midpoint, (c01 + c11) * 0.5],
            [c10, (c10 + c11) * 0.5, c11],
        ];
        let span_x = (self.width.max(2) - 1) as f32;
        let span_y = (self.length.max(2) - 1) as f32;
        for y in 0..self.length {
            let gy = y as f32 / span_y * 2.0;
            let qy = (gy.floor() as usize).min(1);
            let v = gy - qy as f32;
            for x in 0..self.width {
                let gx = x as f32 / span_x * 2.0;
                let qx = (gx.floor() as usize).min(1);
                let u = gx - qx as f32;
                let near = interpolate_cosine(control[qx][qy], control[qx + 1][qy], u);
                let far = interpolate_cosine(control[qx][qy + 1], control[qx + 1][qy + 1], u);
                self.data[y * self.width + x] += interpolate_cosine(near, far, v);
            }
        }
    }
}
