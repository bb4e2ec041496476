//! Disc sample patterns for area lights and the camera lens.
//!
//! Samples are arranged in concentric rings; ring `rings - 1` lies on the
//! rim. Odd rings are rotated by half a sector so that neighbouring rings
//! do not line up.

use std::f32::consts::TAU;

use glint_math::Vec2;
use rand::Rng;

/// Fixed sample `(ring, sector)` on the unit disc.
pub fn disc_point(ring: u32, sector: u32, rings: u32, sectors: u32) -> Vec2 {
    let rings = rings.max(1);
    let sectors = sectors.max(1);
    let radius = (ring + 1) as f32 / rings as f32;
    let offset = if ring % 2 == 1 { 0.5 } else { 0.0 };
    let phi = TAU * (sector as f32 + offset) / sectors as f32;
    Vec2::new(radius * phi.cos(), radius * phi.sin())
}

/// Random sample inside the cell `(ring, sector)` of the unit disc, with
/// uniform density over the cell's area.
pub fn jittered_disc_point<R: Rng + ?Sized>(ring: u32, sector: u32, rings: u32, sectors: u32, rng: &mut R) -> Vec2 {
    let rings = rings.max(1);
    let sectors = sectors.max(1);
    let r0 = ring as f32 / rings as f32;
    let r1 = (ring + 1) as f32 / rings as f32;
    let radius = (r0 * r0 + rng.gen::<f32>() * (r1 * r1 - r0 * r0)).sqrt();
    let phi = TAU * (sector as f32 + rng.gen::<f32>()) / sectors as f32;
    Vec2::new(radius * phi.cos(), radius * phi.sin())
}
