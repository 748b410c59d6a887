//! Arena geometry: static walls, floor tiles and spawn points

use crate::error::{Error, Result};
use crate::geometry::Rect;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A floor tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u16,
    pub y: u16,
}

impl TileCoord {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Static level data
///
/// The floor is a grid of tiles that the hazard kills one by one from the
/// outer ring inwards; walls are static collision rectangles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub tile_size: f32,
    pub width: u16,
    pub height: u16,
    /// Row-major, true while the tile is alive
    tiles: Vec<bool>,
    pub walls: Vec<Rect>,
    pub spawn_points: Vec<Vec2>,
}

impl Level {
    /// Build a level, checking that the tile grid and spawns are usable
    pub fn new(
        name: impl Into<String>,
        width: u16,
        height: u16,
        tile_size: f32,
        walls: Vec<Rect>,
        spawn_points: Vec<Vec2>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || tile_size <= 0.0 {
            return Err(Error::InvalidLevel(format!(
                "empty floor {width}x{height} with tile size {tile_size}"
            )));
        }
        if spawn_points.is_empty() {
            return Err(Error::InvalidLevel("no spawn points".into()));
        }
        Ok(Self {
            name: name.into(),
            tile_size,
            width,
            height,
            tiles: vec![true; width as usize * height as usize],
            walls,
            spawn_points,
        })
    }

    /// A walled rectangular arena with a spawn point near each corner and a
    /// pillar in the middle
    pub fn arena(name: impl Into<String>, width: u16, height: u16) -> Result<Self> {
        let tile = 32.0;
        let w = width as f32 * tile;
        let h = height as f32 * tile;
        let thickness = 16.0;
        let walls = vec![
            Rect::new(-thickness, -thickness, w + 2.0 * thickness, thickness),
            Rect::new(-thickness, h, w + 2.0 * thickness, thickness),
            Rect::new(-thickness, 0.0, thickness, h),
            Rect::new(w, 0.0, thickness, h),
            Rect::new(w * 0.5 - tile * 0.5, h * 0.5 - tile * 0.5, tile, tile),
        ];
        let inset = tile * 1.5;
        let spawn_points = vec![
            Vec2::new(inset, inset),
            Vec2::new(w - inset, inset),
            Vec2::new(inset, h - inset),
            Vec2::new(w - inset, h - inset),
        ];
        Self::new(name, width, height, tile, walls, spawn_points)
    }

    /// Built-in levels known to both peers, looked up by the name sent in `LoadLevel`
    pub fn builtin(name: &str) -> Option<Self> {
        let (width, height) = match name {
            "arena_small" => (16, 12),
            "arena" => (24, 16),
            "arena_large" => (40, 28),
            _ => return None,
        };
        Self::arena(name, width, height).ok()
    }

    /// Playable area in world units
    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    fn index(&self, tile: TileCoord) -> Option<usize> {
        (tile.x < self.width && tile.y < self.height)
            .then(|| tile.y as usize * self.width as usize + tile.x as usize)
    }

    /// The tile under a world position
    pub fn tile_at(&self, position: Vec2) -> Option<TileCoord> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let x = (position.x / self.tile_size) as u32;
        let y = (position.y / self.tile_size) as u32;
        let tile = TileCoord::new(u16::try_from(x).ok()?, u16::try_from(y).ok()?);
        self.index(tile).map(|_| tile)
    }

    pub fn is_tile_alive(&self, tile: TileCoord) -> bool {
        self.index(tile).is_some_and(|i| self.tiles[i])
    }

    /// Kill a tile, returning false if it was already dead or out of range
    pub fn kill_tile(&mut self, tile: TileCoord) -> bool {
        match self.index(tile) {
            Some(i) if self.tiles[i] => {
                self.tiles[i] = false;
                true
            }
            _ => false,
        }
    }

    /// True if `position` stands on a dead tile or off the floor
    pub fn is_hazard(&self, position: Vec2) -> bool {
        self.tile_at(position)
            .map_or(true, |tile| !self.is_tile_alive(tile))
    }

    /// Distance of a tile from the nearest floor edge
    fn ring(&self, tile: TileCoord) -> u16 {
        tile.x
            .min(tile.y)
            .min(self.width - 1 - tile.x)
            .min(self.height - 1 - tile.y)
    }

    /// The next tile the hazard should kill: outermost ring first, then row-major
    pub fn next_hazard_tile(&self) -> Option<TileCoord> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| TileCoord::new(x, y)))
            .filter(|tile| self.is_tile_alive(*tile))
            .min_by_key(|tile| (self.ring(*tile), tile.y, tile.x))
    }

    /// Number of tiles still alive
    pub fn alive_tiles(&self) -> usize {
        self.tiles.iter().filter(|alive| **alive).count()
    }
}
