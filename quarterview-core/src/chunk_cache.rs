use crate::config::{RenderConfig, Rgba, TilePalette};
use crate::coordinates::{Aabb, ChunkKey, Point};
use crate::job_queue::{DrainReport, JobQueue};
use crate::projection::Projection;
use crate::tile_map::TileMap;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;

const VIEW_MARGIN_CHUNKS: i32 = 1;
const VERTICES_PER_TILE: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkCacheError {
    #[error("chunk size must be positive, got {0}")]
    InvalidChunkTiles(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChunkMesh {
    vertices: Vec<Vertex>,
}

impl ChunkMesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_TILE
    }

    pub fn quads(&self) -> impl Iterator<Item = &[Vertex]> {
        self.vertices.chunks_exact(VERTICES_PER_TILE)
    }

    fn push_quad(&mut self, corners: [Point; 4], color: Rgba) {
        let [p0, p1, p2, p3] = corners;
        for position in [p0, p1, p2, p0, p2, p3] {
            self.vertices.push(Vertex { position, color });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BakedChunk {
    pub key: ChunkKey,
    pub generation: u64,
    pub mesh: ChunkMesh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub center: Point,
    pub half_extent: Point,
}

impl CameraView {
    pub fn new(center: Point, half_extent: Point) -> Self {
        Self {
            center,
            half_extent,
        }
    }

    pub fn from_size(center: Point, width: f32, height: f32) -> Self {
        Self::new(center, Point::new(width * 0.5, height * 0.5))
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.half_extent.x
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.half_extent.x
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.half_extent.y
    }

    pub fn bottom(&self) -> f32 {
        self.center.y + self.half_extent.y
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left(), self.top()),
            Point::new(self.right(), self.top()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.left(), self.bottom()),
        ]
    }
}

pub trait DrawTarget {
    fn draw_triangles(&mut self, key: ChunkKey, vertices: &[Vertex]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    pub xs: RangeInclusive<i32>,
    pub ys: RangeInclusive<i32>,
}

impl ChunkRange {
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.xs.contains(&key.x) && self.ys.contains(&key.y)
    }

    pub fn len(&self) -> usize {
        self.xs.clone().count() * self.ys.clone().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.ys
            .clone()
            .flat_map(move |y| self.xs.clone().map(move |x| ChunkKey::new(x, y)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub submitted: u64,
    pub baked: u64,
    pub discarded: u64,
    pub evicted: u64,
}

/// Lazily baked chunk meshes, driven by camera visibility.
#[derive(Debug)]
pub struct ChunkCache {
    map: Rc<TileMap>,
    chunk_tiles: i32,
    projection: Projection,
    palette: TilePalette,
    generation: u64,
    cache: HashMap<ChunkKey, ChunkMesh>,
    pending: HashSet<ChunkKey>,
    stats: CacheStats,
}

impl ChunkCache {
    pub fn new(map: Rc<TileMap>, chunk_tiles: i32) -> Result<Self, ChunkCacheError> {
        if chunk_tiles <= 0 {
            return Err(ChunkCacheError::InvalidChunkTiles(chunk_tiles));
        }

        Ok(Self {
            map,
            chunk_tiles,
            projection: Projection::Orthogonal,
            palette: TilePalette::default(),
            generation: 0,
            cache: HashMap::new(),
            pending: HashSet::new(),
            stats: CacheStats::default(),
        })
    }

    pub fn from_config(map: Rc<TileMap>, config: &RenderConfig) -> Result<Self, ChunkCacheError> {
        let mut cache = Self::new(map, config.chunk_tiles)?;
        cache.projection = config.projection;
        cache.palette = config.palette;
        Ok(cache)
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn chunk_tiles(&self) -> i32 {
        self.chunk_tiles
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// A mode change drops all cached and pending chunks; bakes queued before it are discarded.
    pub fn set_projection(&mut self, projection: Projection) {
        if self.projection == projection {
            return;
        }

        log::info!(
            "projection {:?} -> {:?}, dropping {} cached and {} pending chunks",
            self.projection,
            projection,
            self.cache.len(),
            self.pending.len()
        );
        self.projection = projection;
        self.generation = self.generation.wrapping_add(1);
        self.stats.evicted += self.cache.len() as u64;
        self.cache.clear();
        self.pending.clear();
    }

    pub fn chunk_grid(&self) -> (i32, i32) {
        let chunks = |tiles: i32| {
            if tiles <= 0 {
                1
            } else {
                (tiles - 1) / self.chunk_tiles + 1
            }
        };
        (chunks(self.map.width()), chunks(self.map.height()))
    }

    pub fn chunk_key_for_tile(&self, tile_x: i32, tile_y: i32) -> ChunkKey {
        let (grid_x, grid_y) = self.chunk_grid();
        ChunkKey::new(
            tile_x.div_euclid(self.chunk_tiles).clamp(0, grid_x - 1),
            tile_y.div_euclid(self.chunk_tiles).clamp(0, grid_y - 1),
        )
    }

    pub fn visible_range(&self, view: &CameraView) -> ChunkRange {
        let tile_size = self.map.tile_size() as f32;
        let chunk_tiles = self.chunk_tiles as f32;

        // The inverse of a rotated view is not axis-aligned, so all four corners
        // are taken back to grid space before bounding them.
        let grid_corners = view
            .corners()
            .map(|corner| self.projection.projected_to_grid(corner, tile_size));
        let footprint = Aabb::from_points(&grid_corners);

        let (grid_x, grid_y) = self.chunk_grid();
        let first = |tiles: f32, count: i32| {
            chunk_index(tiles / chunk_tiles, -VIEW_MARGIN_CHUNKS, count)
        };
        let last = |tiles: f32, count: i32| {
            chunk_index(tiles / chunk_tiles, VIEW_MARGIN_CHUNKS, count)
        };

        ChunkRange {
            xs: first(footprint.x, grid_x)..=last(footprint.right(), grid_x),
            ys: first(footprint.y, grid_y)..=last(footprint.bottom(), grid_y),
        }
    }

    pub fn append_visible_range(
        &mut self,
        view: &CameraView,
        jobs: &mut JobQueue<BakedChunk>,
    ) -> usize {
        let range = self.visible_range(view);
        let mut submitted = 0usize;

        for key in range.keys() {
            if self.cache.contains_key(&key) || self.pending.contains(&key) {
                continue;
            }

            self.pending.insert(key);
            let job = BakeJob {
                map: Rc::clone(&self.map),
                projection: self.projection,
                palette: self.palette,
                chunk_tiles: self.chunk_tiles,
                generation: self.generation,
                key,
            };
            jobs.submit(move || job.run());
            submitted += 1;
        }

        if submitted > 0 {
            self.stats.submitted += submitted as u64;
            log::debug!(
                "queued {} chunk bakes for view {:?}..={:?} x {:?}..={:?} ({} pending)",
                submitted,
                range.xs.start(),
                range.xs.end(),
                range.ys.start(),
                range.ys.end(),
                self.pending.len()
            );
        }
        submitted
    }

    /// Results from before the last projection switch are dropped.
    pub fn complete_bake(&mut self, baked: BakedChunk) -> bool {
        if baked.generation != self.generation {
            self.stats.discarded += 1;
            log::trace!("discarding stale bake for chunk {:?}", baked.key);
            return false;
        }

        self.pending.remove(&baked.key);
        self.cache.insert(baked.key, baked.mesh);
        self.stats.baked += 1;
        true
    }

    pub fn process_jobs(
        &mut self,
        jobs: &mut JobQueue<BakedChunk>,
        budget: Option<Duration>,
    ) -> DrainReport {
        jobs.drain(budget, |baked| {
            self.complete_bake(baked);
        })
    }

    pub fn draw_visible(&self, target: &mut impl DrawTarget, view: &CameraView) -> usize {
        let mut drawn = 0usize;
        for key in self.visible_range(view).keys() {
            if let Some(mesh) = self.cache.get(&key) {
                target.draw_triangles(key, mesh.vertices());
                drawn += 1;
            }
        }
        drawn
    }

    pub fn invalidate(&mut self, tile_x: i32, tile_y: i32) -> ChunkKey {
        let key = self.chunk_key_for_tile(tile_x, tile_y);
        let was_cached = self.cache.remove(&key).is_some();
        let was_pending = self.pending.remove(&key);
        if was_cached {
            self.stats.evicted += 1;
        }
        if was_cached || was_pending {
            log::debug!("invalidated chunk {:?} for tile ({}, {})", key, tile_x, tile_y);
        }
        key
    }

    pub fn is_cached(&self, key: &ChunkKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn is_pending(&self, key: &ChunkKey) -> bool {
        self.pending.contains(key)
    }

    pub fn mesh(&self, key: &ChunkKey) -> Option<&ChunkMesh> {
        self.cache.get(key)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

struct BakeJob {
    map: Rc<TileMap>,
    projection: Projection,
    palette: TilePalette,
    chunk_tiles: i32,
    generation: u64,
    key: ChunkKey,
}

impl BakeJob {
    fn run(self) -> BakedChunk {
        let mesh = bake_chunk(
            &self.map,
            &self.projection,
            &self.palette,
            self.chunk_tiles,
            self.key,
        );
        log::trace!("baked chunk {:?}: {} tiles", self.key, mesh.quad_count());
        BakedChunk {
            key: self.key,
            generation: self.generation,
            mesh,
        }
    }
}

pub fn bake_chunk(
    map: &TileMap,
    projection: &Projection,
    palette: &TilePalette,
    chunk_tiles: i32,
    key: ChunkKey,
) -> ChunkMesh {
    let start_x = key.x.saturating_mul(chunk_tiles).max(0);
    let start_y = key.y.saturating_mul(chunk_tiles).max(0);
    let end_x = start_x.saturating_add(chunk_tiles).min(map.width());
    let end_y = start_y.saturating_add(chunk_tiles).min(map.height());
    let tile_size = map.tile_size() as f32;

    let tile_count = (end_x - start_x).max(0) as usize * (end_y - start_y).max(0) as usize;
    let mut mesh = ChunkMesh {
        vertices: Vec::with_capacity(tile_count * VERTICES_PER_TILE),
    };

    for y in start_y..end_y {
        for x in start_x..end_x {
            let Some(tile) = map.tile_at(x, y) else {
                continue;
            };
            mesh.push_quad(
                projection.tile_corners(x, y, tile_size),
                palette.color_for(tile),
            );
        }
    }

    mesh
}

fn chunk_index(chunks: f32, margin: i32, count: i32) -> i32 {
    (chunks.floor() as i32)
        .saturating_add(margin)
        .clamp(0, count - 1)
}
