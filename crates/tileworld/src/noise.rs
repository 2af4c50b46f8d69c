//! Layered fractal value noise for the terrain height field.

use noise::{Fbm, MultiFractal, NoiseFn, Value};
use rand::RngCore;

use crate::rng::{GameRng, Roll};

/// Weight of the high-frequency layer added on top of the base layer.
pub const SECONDARY_WEIGHT: f64 = 0.2;
pub const BASE_OCTAVES: usize = 10;
/// Base-layer features per map width.
const BASE_FREQUENCY: f64 = 4.0;
const SECONDARY_FREQUENCY: f64 = 24.0;

fn layer(seed: u32, octaves: usize, frequency: f64) -> Fbm<Value> {
    Fbm::<Value>::new(seed).set_octaves(octaves).set_frequency(frequency)
}

/// Sample `layer` over a `size x size` grid, row-major, remapped from `[-1, 1]` to `[0, 1]`.
fn sample(layer: &Fbm<Value>, size: usize) -> Vec<f64> {
    let scale = 1.0 / size.max(1) as f64;
    let mut out = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let v = layer.get([x as f64 * scale, y as f64 * scale]);
            out.push(((v + 1.0) * 0.5).clamp(0.0, 1.0));
        }
    }
    out
}

/// The terrain height field: a ten-octave base layer plus a weighted secondary layer with 3..=5
/// octaves, capped at 1.0.
pub fn height_field(size: usize, rng: &mut GameRng) -> Vec<f32> {
    let base_seed = rng.next_u32();
    let second_octaves = rng.roll_range(3, 5) as usize;
    let second_seed = rng.next_u32();

    let base = sample(&layer(base_seed, BASE_OCTAVES, BASE_FREQUENCY), size);
    let second = sample(&layer(second_seed, second_octaves, SECONDARY_FREQUENCY), size);
    base.iter()
        .zip(&second)
        .map(|(b, s)| (b + s * SECONDARY_WEIGHT).min(1.0) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn heights_stay_in_unit_range() {
        let h = height_field(64, &mut seeded(11));
        assert_eq!(h.len(), 64 * 64);
        assert!(h.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let a = height_field(32, &mut seeded(5));
        let b = height_field(32, &mut seeded(5));
        assert_eq!(a, b);
        assert_ne!(a, height_field(32, &mut seeded(6)));
    }

    #[test]
    fn terrain_is_not_flat() {
        let h = height_field(64, &mut seeded(2));
        let lo = h.iter().copied().fold(f32::MAX, f32::min);
        let hi = h.iter().copied().fold(f32::MIN, f32::max);
        assert!(hi - lo > 0.1, "{lo}..{hi}");
    }
}
