pub mod chunk_cache;
pub mod config;
pub mod coordinates;
pub mod job_queue;
pub mod projection;
pub mod tile_map;
pub mod worldgen;

pub use chunk_cache::{
    BakedChunk, CacheStats, CameraView, ChunkCache, ChunkCacheError, ChunkMesh, ChunkRange,
    DrawTarget, Vertex, bake_chunk,
};
pub use config::{ConfigError, RenderConfig, Rgba, TilePalette};
pub use coordinates::{Aabb, ChunkKey, Point};
pub use job_queue::{DrainReport, Job, JobQueue};
pub use projection::{IsoDims, Projection, ProjectionError};
pub use tile_map::{FLOOR, TileId, TileMap, TileMapData, TileMapError, WALL};
pub use worldgen::OverworldGenerator;
