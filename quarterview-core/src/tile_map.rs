use crate::coordinates::Aabb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TileId = u8;

pub const FLOOR: TileId = 0;
pub const WALL: TileId = 1;

pub fn is_solid(tile: TileId) -> bool {
    tile == WALL
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileMapError {
    #[error("tile size must be positive, got {0}")]
    InvalidTileSize(i32),
    #[error("map dimensions must not be negative, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("expected {expected} tiles for the map dimensions, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("unknown tile kind {kind} at index {index}")]
    UnknownTile { index: usize, kind: TileId },
    #[error("row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Fixed grid of tile kinds with the wall colliders derived from it.
///
/// Tiles are stored row-major. Colliders are rebuilt from the tiles on every
/// construction path and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TileMapData", into = "TileMapData")]
pub struct TileMap {
    id: String,
    width: i32,
    height: i32,
    tile_size: i32,
    tiles: Vec<TileId>,
    colliders: Vec<Aabb>,
}

/// Serialized shape of a [`TileMap`]; colliders are derived, not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMapData {
    pub id: String,
    pub width: i32,
    pub height: i32,
    pub tile_size: i32,
    pub tiles: Vec<TileId>,
}

impl TryFrom<TileMapData> for TileMap {
    type Error = TileMapError;

    fn try_from(data: TileMapData) -> Result<Self, Self::Error> {
        TileMap::new(data.id, data.width, data.height, data.tile_size, data.tiles)
    }
}

impl From<TileMap> for TileMapData {
    fn from(map: TileMap) -> Self {
        Self {
            id: map.id,
            width: map.width,
            height: map.height,
            tile_size: map.tile_size,
            tiles: map.tiles,
        }
    }
}

impl TileMap {
    pub fn new(
        id: impl Into<String>,
        width: i32,
        height: i32,
        tile_size: i32,
        tiles: Vec<TileId>,
    ) -> Result<Self, TileMapError> {
        if tile_size <= 0 {
            return Err(TileMapError::InvalidTileSize(tile_size));
        }
        if width < 0 || height < 0 {
            return Err(TileMapError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize;
        if tiles.len() != expected {
            return Err(TileMapError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        if let Some((index, &kind)) = tiles
            .iter()
            .enumerate()
            .find(|&(_, &kind)| kind != FLOOR && kind != WALL)
        {
            return Err(TileMapError::UnknownTile { index, kind });
        }

        let mut map = Self {
            id: id.into(),
            width,
            height,
            tile_size,
            tiles,
            colliders: Vec::new(),
        };
        map.rebuild_colliders();
        Ok(map)
    }

    pub fn filled(
        id: impl Into<String>,
        width: i32,
        height: i32,
        tile_size: i32,
        tile: TileId,
    ) -> Result<Self, TileMapError> {
        let count = width.max(0) as usize * height.max(0) as usize;
        Self::new(id, width, height, tile_size, vec![tile; count])
    }

    /// Builds a map from text rows where `#` is a wall and any other character is floor.
    pub fn from_ascii<S: AsRef<str>>(
        id: impl Into<String>,
        tile_size: i32,
        rows: &[S],
    ) -> Result<Self, TileMapError> {
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        let mut tiles = Vec::with_capacity(width * rows.len());

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let row_width = row.chars().count();
            if row_width != width {
                return Err(TileMapError::RaggedRow {
                    row: row_index,
                    expected: width,
                    actual: row_width,
                });
            }
            tiles.extend(row.chars().map(|c| if c == '#' { WALL } else { FLOOR }));
        }

        Self::new(id, width as i32, rows.len() as i32, tile_size, tiles)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn colliders(&self) -> &[Aabb] {
        &self.colliders
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileId> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Anything outside the grid counts as wall.
    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).map_or(true, is_solid)
    }

    pub fn bounds_aabb(&self) -> Aabb {
        Aabb::new(
            0.0,
            0.0,
            self.width as f32 * self.tile_size as f32,
            self.height as f32 * self.tile_size as f32,
        )
    }

    pub fn tile_aabb(&self, x: i32, y: i32) -> Aabb {
        let ts = self.tile_size as f32;
        Aabb::new(x as f32 * ts, y as f32 * ts, ts, ts)
    }

    pub fn world_to_tile(&self, world_x: f32, world_y: f32) -> (i32, i32) {
        let ts = self.tile_size as f32;
        ((world_x / ts).floor() as i32, (world_y / ts).floor() as i32)
    }

    /// Whether `bounds` overlaps any wall tile inside the grid.
    pub fn overlaps_wall(&self, bounds: &Aabb) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }

        let (min_x, min_y) = self.world_to_tile(bounds.x, bounds.y);
        let (max_x, max_y) = self.world_to_tile(bounds.right(), bounds.bottom());
        let (min_x, max_x) = (min_x.max(0), max_x.min(self.width - 1));
        let (min_y, max_y) = (min_y.max(0), max_y.min(self.height - 1));

        for ty in min_y..=max_y {
            for tx in min_x..=max_x {
                if self.is_wall(tx, ty) && self.tile_aabb(tx, ty).overlaps(bounds) {
                    return true;
                }
            }
        }
        false
    }

    fn rebuild_colliders(&mut self) {
        let width = self.width.max(1) as usize;
        self.colliders = self
            .tiles
            .iter()
            .enumerate()
            .filter(|&(_, &tile)| is_solid(tile))
            .map(|(index, _)| self.tile_aabb((index % width) as i32, (index / width) as i32))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> TileMap {
        TileMap::from_ascii("sample", 10, &["#...", "....", "..#.", "...."]).unwrap()
    }

    #[test]
    fn out_of_bounds_is_wall() {
        let map = sample_map();

        for &(x, y) in &[(-1, 0), (0, -1), (4, 0), (0, 4), (i32::MIN, i32::MAX), (100, -100)] {
            assert!(map.is_wall(x, y), "({x}, {y}) should be solid");
        }
        assert!(map.is_wall(0, 0));
        assert!(!map.is_wall(1, 0));
        assert!(map.is_wall(2, 2));
    }

    #[test]
    fn colliders_match_wall_tiles() {
        let map = sample_map();

        assert_eq!(
            map.colliders(),
            &[
                Aabb::new(0.0, 0.0, 10.0, 10.0),
                Aabb::new(20.0, 20.0, 10.0, 10.0)
            ]
        );
    }

    #[test]
    fn bounds_scale_by_tile_size() {
        assert_eq!(sample_map().bounds_aabb(), Aabb::new(0.0, 0.0, 40.0, 40.0));
    }

    #[test]
    fn bounds_of_huge_map_do_not_overflow() {
        let map = TileMap::filled("wide", 70_000, 1, 40_000, FLOOR).unwrap();
        let bounds = map.bounds_aabb();

        assert_eq!(bounds.w, 2_800_000_000.0);
        assert_eq!(bounds.h, 40_000.0);
    }

    #[test]
    fn rejects_invalid_construction() {
        assert_eq!(
            TileMap::new("bad", 2, 2, 10, vec![FLOOR; 3]),
            Err(TileMapError::TileCountMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            TileMap::new("bad", 2, 1, 0, vec![FLOOR; 2]),
            Err(TileMapError::InvalidTileSize(0))
        );
        assert_eq!(
            TileMap::new("bad", 2, 1, 8, vec![FLOOR, 7]),
            Err(TileMapError::UnknownTile { index: 1, kind: 7 })
        );
        assert!(matches!(
            TileMap::from_ascii("bad", 8, &["##", "#"]),
            Err(TileMapError::RaggedRow { row: 1, .. })
        ));
    }

    #[test]
    fn world_to_tile_floors_negative_coordinates() {
        let map = sample_map();
        assert_eq!(map.world_to_tile(15.0, 0.0), (1, 0));
        assert_eq!(map.world_to_tile(-0.5, -10.5), (-1, -2));
    }

    #[test]
    fn overlap_query_finds_walls_only() {
        let map = sample_map();

        assert!(map.overlaps_wall(&Aabb::new(5.0, 5.0, 4.0, 4.0)));
        assert!(!map.overlaps_wall(&Aabb::new(11.0, 11.0, 8.0, 8.0)));
        // touching the wall at (2, 2) from the left does not count
        assert!(!map.overlaps_wall(&Aabb::new(12.0, 22.0, 8.0, 4.0)));
        assert!(map.overlaps_wall(&Aabb::new(12.0, 22.0, 9.0, 4.0)));
    }

    #[test]
    fn serde_round_trip_rebuilds_colliders() {
        let map = sample_map();
        let json = serde_json::to_string(&map).unwrap();
        assert!(!json.contains("colliders"));

        let restored: TileMap = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, map);
        assert_eq!(restored.colliders().len(), 2);

        let bad = r#"{"id":"x","width":2,"height":2,"tile_size":8,"tiles":[0,1,0]}"#;
        assert!(serde_json::from_str::<TileMap>(bad).is_err());
    }

    #[test]
    fn empty_ascii_map_is_valid() {
        let map = TileMap::from_ascii::<&str>("empty", 16, &[]).unwrap();
        assert_eq!((map.width(), map.height()), (0, 0));
        assert!(map.is_wall(0, 0));
        assert!(!map.overlaps_wall(&Aabb::new(0.0, 0.0, 1.0, 1.0)));
    }
}
