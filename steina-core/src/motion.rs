//! C8 motion primitives (spec.md §4.4, §6, §9).

use crate::runtime::Motion;

/// Tilt-angle clamp (spec.md §6 constants).
pub const TILT_THRESHOLD: f64 = 15.0;
/// Compass-angle clamp (spec.md §6 constants).
pub const COMPASS_THRESHOLD: f64 = 20.0;

/// Direction argument to `getTiltAngle`/`isTilted`/`whenTilted` (spec.md
/// §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Direction argument to `isPointed` (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassDirection {
    North,
    South,
    East,
    West,
}

pub fn get_tilt_angle(motion: Motion, dir: TiltDirection) -> f64 {
    match dir {
        TiltDirection::Forward => motion.pitch,
        TiltDirection::Backward => -motion.pitch,
        TiltDirection::Left => -motion.roll,
        TiltDirection::Right => motion.roll,
    }
}

pub fn is_tilted(motion: Motion, dir: TiltDirection) -> bool {
    get_tilt_angle(motion, dir) >= TILT_THRESHOLD
}

/// Identical predicate to [`is_tilted`]; kept distinct because the hat and
/// the boolean reporter are separate opcodes at the block-metadata level
/// (spec.md §4.4).
pub fn when_tilted(motion: Motion, dir: TiltDirection) -> bool {
    is_tilted(motion, dir)
}

pub fn get_compass_angle(motion: Motion) -> f64 {
    motion.heading.rem_euclid(360.0)
}

/// Preserves the source's NORTH/other asymmetry rather than normalizing it:
/// NORTH uses a half-width window (±`COMPASS_THRESHOLD`/2) wrapping around 0,
/// while SOUTH/EAST/WEST use the full-width absolute-distance test (spec.md
/// §9 open question (a); see DESIGN.md).
pub fn is_pointed(motion: Motion, dir: CompassDirection) -> bool {
    let heading = get_compass_angle(motion);
    match dir {
        CompassDirection::North => {
            let half = COMPASS_THRESHOLD / 2.0;
            heading <= half || heading >= 360.0 - half
        }
        CompassDirection::South => (heading - 180.0).abs() <= COMPASS_THRESHOLD,
        CompassDirection::East => (heading - 90.0).abs() <= COMPASS_THRESHOLD,
        CompassDirection::West => (heading - 270.0).abs() <= COMPASS_THRESHOLD,
    }
}
