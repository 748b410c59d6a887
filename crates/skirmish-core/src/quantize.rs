//! The shared quantization grid
//!
//! The wire codec sends positions, aim points and velocities as integer step
//! counts on a fixed grid. The server snaps its authoritative state onto the
//! same grid after every step, so what a client decodes is bit-identical to
//! what the server simulated and reconciliation replays from exact values.

use glam::Vec2;

/// Grid spacing for positions, aim points and velocities (a power of two, so steps are exact)
pub const RESOLUTION: f32 = 1.0 / 16.0;

/// Playfield coordinates lie within `[-POSITION_LIMIT, POSITION_LIMIT]`
pub const POSITION_LIMIT: f32 = 4096.0;

/// Velocities lie within `[-VELOCITY_LIMIT, VELOCITY_LIMIT]`
pub const VELOCITY_LIMIT: f32 = 2048.0;

/// Grid spacing for move directions, which lie within `[-1, 1]`
pub const DIRECTION_RESOLUTION: f32 = 1.0 / 1024.0;

/// Clamp `value` into `[min, max]` and snap it to the nearest grid step above `min`
pub fn snap(value: f32, min: f32, max: f32, resolution: f32) -> f32 {
    let steps = ((value.clamp(min, max) - min) / resolution).round();
    min + steps * resolution
}

/// Snap a position or aim point onto the grid
pub fn snap_position(v: Vec2) -> Vec2 {
    Vec2::new(
        snap(v.x, -POSITION_LIMIT, POSITION_LIMIT, RESOLUTION),
        snap(v.y, -POSITION_LIMIT, POSITION_LIMIT, RESOLUTION),
    )
}

/// Snap a velocity onto the grid
pub fn snap_velocity(v: Vec2) -> Vec2 {
    Vec2::new(
        snap(v.x, -VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION),
        snap(v.y, -VELOCITY_LIMIT, VELOCITY_LIMIT, RESOLUTION),
    )
}

/// Snap a move direction onto its grid
pub fn snap_direction(v: Vec2) -> Vec2 {
    Vec2::new(
        snap(v.x, -1.0, 1.0, DIRECTION_RESOLUTION),
        snap(v.y, -1.0, 1.0, DIRECTION_RESOLUTION),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_is_idempotent() {
        let once = snap_position(Vec2::new(10.03, -7.77));
        assert_eq!(snap_position(once), once);
        assert_eq!(once, Vec2::new(10.0, -7.75));
    }

    #[test]
    fn test_direction_grid() {
        let d = snap_direction(Vec2::new(0.70710677, -3.0));
        assert_eq!(d, Vec2::new(724.0 / 1024.0, -1.0));
    }

    #[test]
    fn test_snap_clamps() {
        assert_eq!(snap_velocity(Vec2::new(1.0e6, -1.0e6)), Vec2::new(2048.0, -2048.0));
    }
}
