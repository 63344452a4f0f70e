//! Spatial model - tile-based terrain grid

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tile position in the grid. Signed so that offsets around a cell can step
/// past the map edge and be rejected by bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Euclidean distance in cells.
    pub fn distance(self, other: TilePos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Walkable,
    Water,
    Blocked,
}

impl Terrain {
    fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' | ',' => Some(Terrain::Walkable),
            '~' => Some(Terrain::Water),
            '#' => Some(Terrain::Blocked),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("map must contain at least one row")]
    Empty,
    #[error("map row {row} has width {found}, expected {expected}")]
    Ragged {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown map glyph '{glyph}' at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("tile size must be positive, got {0}")]
    TileSize(f32),
}

/// Read-only terrain classification the agents query.
pub struct WorldGrid {
    width: i32,
    height: i32,
    tile_size: f32,
    tiles: Vec<Terrain>,
    water_access: Vec<TilePos>,
}

impl WorldGrid {
    pub fn new(width: u32, height: u32, tile_size: f32) -> Self {
        let tiles = vec![Terrain::Walkable; (width * height) as usize];
        Self::from_tiles(width as i32, height as i32, tile_size, tiles)
    }

    /// Builds a grid from text rows: `.` walkable, `~` water, `#` blocked.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], tile_size: f32) -> Result<Self, GridError> {
        if !(tile_size > 0.0) {
            return Err(GridError::TileSize(tile_size));
        }
        let expected = rows
            .first()
            .map(|row| row.as_ref().chars().count())
            .ok_or(GridError::Empty)?;
        if expected == 0 {
            return Err(GridError::Empty);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != expected {
                return Err(GridError::Ragged {
                    row: y,
                    found,
                    expected,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let terrain =
                    Terrain::from_glyph(glyph).ok_or(GridError::UnknownGlyph { glyph, x, y })?;
                tiles.push(terrain);
            }
        }
        Ok(Self::from_tiles(
            expected as i32,
            rows.len() as i32,
            tile_size,
            tiles,
        ))
    }

    fn from_tiles(width: i32, height: i32, tile_size: f32, tiles: Vec<Terrain>) -> Self {
        let mut grid = Self {
            width,
            height,
            tile_size,
            tiles,
            water_access: Vec::new(),
        };
        grid.water_access = grid.collect_water_access();
        grid
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Terrain at a cell; cells outside the map are `None`.
    pub fn classify(&self, pos: TilePos) -> Option<Terrain> {
        if !self.contains(pos) {
            return None;
        }
        Some(self.tiles[(pos.y * self.width + pos.x) as usize])
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.classify(pos) == Some(Terrain::Walkable)
    }

    pub fn is_water(&self, pos: TilePos) -> bool {
        self.classify(pos) == Some(Terrain::Water)
    }

    pub fn world_to_cell(&self, position: Vec2) -> TilePos {
        TilePos {
            x: (position.x / self.tile_size).floor() as i32,
            y: (position.y / self.tile_size).floor() as i32,
        }
    }

    /// Centre of the cell in world units.
    pub fn cell_to_world(&self, pos: TilePos) -> Vec2 {
        Vec2::new(
            (pos.x as f32 + 0.5) * self.tile_size,
            (pos.y as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn terrain_at(&self, position: Vec2) -> Option<Terrain> {
        self.classify(self.world_to_cell(position))
    }

    /// In-bounds orthogonal neighbours.
    pub fn neighbors4(&self, pos: TilePos) -> Vec<TilePos> {
        [
            pos.offset(1, 0),
            pos.offset(-1, 0),
            pos.offset(0, 1),
            pos.offset(0, -1),
        ]
        .into_iter()
        .filter(|cell| self.contains(*cell))
        .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = TilePos> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| TilePos { x, y }))
    }

    pub fn walkable_cells(&self) -> impl Iterator<Item = TilePos> + '_ {
        self.cells().filter(|cell| self.is_walkable(*cell))
    }

    /// Walkable cells orthogonally adjacent to water, where an agent can
    /// stand to drink.
    pub fn water_access(&self) -> &[TilePos] {
        &self.water_access
    }

    /// Centre of the water-access cell closest to `position`.
    pub fn nearest_water_access(&self, position: Vec2) -> Option<Vec2> {
        let mut nearest = None;
        let mut nearest_distance = f32::MAX;
        for cell in &self.water_access {
            let centre = self.cell_to_world(*cell);
            let distance = position.distance(centre);
            if distance < nearest_distance {
                nearest_distance = distance;
                nearest = Some(centre);
            }
        }
        nearest
    }

    fn collect_water_access(&self) -> Vec<TilePos> {
        let mut access = Vec::new();
        for cell in self.cells() {
            if !self.is_walkable(cell) {
                continue;
            }
            if self
                .neighbors4(cell)
                .into_iter()
                .any(|neighbor| self.is_water(neighbor))
            {
                access.push(cell);
            }
        }
        access
    }
}
