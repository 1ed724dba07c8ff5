use fastrand::Rng;

use crate::tile_map::{FLOOR, TileId, TileMap, TileMapError, WALL};

pub const DEFAULT_CLUSTER_COUNT: usize = 120;
const CLUSTER_MIN_SIZE: i32 = 2;
const CLUSTER_MAX_SIZE: i32 = 7;

/// Seeded generator for the walled overworld: solid border, scattered
/// rectangular rock clusters, and an open cross road through the middle.
#[derive(Debug, Clone)]
pub struct OverworldGenerator {
    seed: u64,
    cluster_count: usize,
}

impl OverworldGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            cluster_count: DEFAULT_CLUSTER_COUNT,
        }
    }

    pub fn with_cluster_count(mut self, cluster_count: usize) -> Self {
        self.cluster_count = cluster_count;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(
        &self,
        id: impl Into<String>,
        width: i32,
        height: i32,
        tile_size: i32,
    ) -> Result<TileMap, TileMapError> {
        if width < 0 || height < 0 {
            return Err(TileMapError::InvalidDimensions { width, height });
        }

        let mut tiles = vec![FLOOR; width as usize * height as usize];
        let mut set = |x: i32, y: i32, tile: TileId| {
            tiles[y as usize * width as usize + x as usize] = tile;
        };

        if width > 0 && height > 0 {
            for x in 0..width {
                set(x, 0, WALL);
                set(x, height - 1, WALL);
            }
            for y in 0..height {
                set(0, y, WALL);
                set(width - 1, y, WALL);
            }
        }

        // Clusters need a two-tile margin inside the border to have room.
        if width > 4 && height > 4 {
            let mut rng = Rng::with_seed(self.seed);
            for _ in 0..self.cluster_count {
                let cx = rng.i32(2..=width - 3);
                let cy = rng.i32(2..=height - 3);
                let sx = rng.i32(CLUSTER_MIN_SIZE..=CLUSTER_MAX_SIZE);
                let sy = rng.i32(CLUSTER_MIN_SIZE..=CLUSTER_MAX_SIZE);

                for y in cy..(cy + sy).min(height - 2) {
                    for x in cx..(cx + sx).min(width - 2) {
                        set(x, y, WALL);
                    }
                }
            }

            for x in 2..width - 2 {
                set(x, height / 2, FLOOR);
            }
            for y in 2..height - 2 {
                set(width / 2, y, FLOOR);
            }
        }

        log::debug!(
            "generated overworld {}x{} (seed {}, {} clusters)",
            width,
            height,
            self.seed,
            self.cluster_count
        );
        TileMap::new(id, width, height, tile_size, tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(seed: u64) -> TileMap {
        OverworldGenerator::new(seed)
            .generate("overworld", 60, 40, 32)
            .unwrap()
    }

    #[test]
    fn border_is_solid() {
        let map = generate(42);

        for x in 0..map.width() {
            assert!(map.is_wall(x, 0));
            assert!(map.is_wall(x, map.height() - 1));
        }
        for y in 0..map.height() {
            assert!(map.is_wall(0, y));
            assert!(map.is_wall(map.width() - 1, y));
        }
    }

    #[test]
    fn cross_road_stays_open() {
        let map = generate(42);

        for x in 2..map.width() - 2 {
            assert!(!map.is_wall(x, map.height() / 2));
        }
        for y in 2..map.height() - 2 {
            assert!(!map.is_wall(map.width() / 2, y));
        }
    }

    #[test]
    fn same_seed_produces_same_map() {
        assert_eq!(generate(7), generate(7));
        assert_ne!(generate(7).tiles(), generate(8).tiles());
    }

    #[test]
    fn colliders_follow_generated_walls() {
        let map = generate(3);
        let walls = map.tiles().iter().filter(|&&t| t == WALL).count();
        assert_eq!(map.colliders().len(), walls);
    }

    #[test]
    fn tiny_maps_are_all_border() {
        let map = OverworldGenerator::new(1).generate("tiny", 3, 3, 8).unwrap();
        assert!(!map.is_wall(1, 1));
        assert_eq!(map.colliders().len(), 8);
    }
}
