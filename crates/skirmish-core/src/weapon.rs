//! Weapon catalogue and firing patterns

use crate::geometry::Segment;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Kind of weapon held in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Empty,
    Pistol,
    Rifle,
    Shotgun,
    Launcher,
}

/// Static tuning for a weapon kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per ray (or per projectile contact)
    pub damage: u8,
    /// Minimum time between shots, in seconds
    pub cooldown: f32,
    /// Time to refill the magazine, in seconds
    pub reload: f32,
    /// Rounds per magazine
    pub magazine: u8,
    /// Maximum ray length for hit-scan weapons
    pub range: f32,
    /// Rays per shot for hit-scan weapons, 0 for projectile weapons
    pub pellets: u8,
    /// Perpendicular distance between neighbouring pellets
    pub spacing: f32,
    /// Launch speed of the spawned projectile
    pub projectile_speed: f32,
}

impl WeaponStats {
    /// Cooldown in whole ticks at `tick_rate`, at least one for real weapons
    pub fn cooldown_ticks(&self, tick_rate: u32) -> u32 {
        seconds_to_ticks(self.cooldown, tick_rate)
    }

    /// Reload delay in whole ticks at `tick_rate`
    pub fn reload_ticks(&self, tick_rate: u32) -> u32 {
        seconds_to_ticks(self.reload, tick_rate)
    }
}

fn seconds_to_ticks(seconds: f32, tick_rate: u32) -> u32 {
    if seconds <= 0.0 {
        0
    } else {
        ((seconds * tick_rate as f32).ceil() as u32).max(1)
    }
}

/// Number of parallel rays a shotgun blast issues
pub const SHOTGUN_PELLETS: u8 = 8;

impl WeaponKind {
    /// All kinds in wire-tag order
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::Empty,
        WeaponKind::Pistol,
        WeaponKind::Rifle,
        WeaponKind::Shotgun,
        WeaponKind::Launcher,
    ];

    /// Stable numeric tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`WeaponKind::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Tuning for this kind
    pub fn stats(self) -> WeaponStats {
        match self {
            WeaponKind::Empty => WeaponStats {
                damage: 0,
                cooldown: 0.0,
                reload: 0.0,
                magazine: 0,
                range: 0.0,
                pellets: 0,
                spacing: 0.0,
                projectile_speed: 0.0,
            },
            WeaponKind::Pistol => WeaponStats {
                damage: 20,
                cooldown: 0.35,
                reload: 1.0,
                magazine: 12,
                range: 600.0,
                pellets: 1,
                spacing: 0.0,
                projectile_speed: 0.0,
            },
            WeaponKind::Rifle => WeaponStats {
                damage: 14,
                cooldown: 0.1,
                reload: 1.5,
                magazine: 30,
                range: 900.0,
                pellets: 1,
                spacing: 0.0,
                projectile_speed: 0.0,
            },
            WeaponKind::Shotgun => WeaponStats {
                damage: 9,
                cooldown: 0.8,
                reload: 2.0,
                magazine: 6,
                range: 300.0,
                pellets: SHOTGUN_PELLETS,
                spacing: 3.0,
                projectile_speed: 0.0,
            },
            WeaponKind::Launcher => WeaponStats {
                damage: 60,
                cooldown: 1.2,
                reload: 2.5,
                magazine: 3,
                range: 0.0,
                pellets: 0,
                spacing: 0.0,
                projectile_speed: 320.0,
            },
        }
    }

    /// True for weapons resolved instantly by ray casts
    pub fn is_hitscan(self) -> bool {
        self.stats().pellets > 0
    }

    /// True for weapons that spawn a projectile entity
    pub fn is_projectile(self) -> bool {
        self.stats().projectile_speed > 0.0
    }
}

/// Unit aim direction from `origin` towards `aim`, facing +x when degenerate
pub fn aim_direction(origin: Vec2, aim: Vec2) -> Vec2 {
    let dir = (aim - origin).normalize_or_zero();
    if dir == Vec2::ZERO {
        Vec2::X
    } else {
        dir
    }
}

/// The rays a hit-scan weapon issues when fired from `origin` towards `aim`
///
/// Multi-pellet weapons fan their rays out as parallel lines offset
/// perpendicular to the aim direction, centred on it. Projectile weapons and
/// empty slots issue no rays.
pub fn fire_rays(kind: WeaponKind, origin: Vec2, aim: Vec2) -> Vec<Segment> {
    let stats = kind.stats();
    let dir = aim_direction(origin, aim);
    let perp = dir.perp();
    let centre = (stats.pellets as f32 - 1.0) * 0.5;
    (0..stats.pellets)
        .map(|i| {
            let start = origin + perp * ((i as f32 - centre) * stats.spacing);
            Segment::new(start, start + dir * stats.range)
        })
        .collect()
}
