use crate::coordinates::{Aabb, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ISO_WIDTH: f32 = 64.0;
pub const DEFAULT_ISO_HEIGHT: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ProjectionError {
    #[error("isometric diamond must have positive dimensions, got {width}x{height}")]
    DegenerateDiamond { width: f32, height: f32 },
}

/// Size of one isometric tile diamond in projection units.
///
/// Both dimensions are finite and strictly positive; [`IsoDims::new`] and
/// deserialization reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIsoDims")]
pub struct IsoDims {
    width: f32,
    height: f32,
}

#[derive(Deserialize)]
struct RawIsoDims {
    width: f32,
    height: f32,
}

impl TryFrom<RawIsoDims> for IsoDims {
    type Error = ProjectionError;

    fn try_from(raw: RawIsoDims) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height)
    }
}

impl IsoDims {
    pub fn new(width: f32, height: f32) -> Result<Self, ProjectionError> {
        let valid = |v: f32| v.is_finite() && v > f32::EPSILON;
        if !valid(width) || !valid(height) {
            return Err(ProjectionError::DegenerateDiamond { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn half_width(&self) -> f32 {
        self.width * 0.5
    }

    pub fn half_height(&self) -> f32 {
        self.height * 0.5
    }
}

impl Default for IsoDims {
    fn default() -> Self {
        Self {
            width: DEFAULT_ISO_WIDTH,
            height: DEFAULT_ISO_HEIGHT,
        }
    }
}

/// Mapping between grid space (fractional tile units) and projection space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Projection {
    /// Grid scaled by the tile size.
    #[default]
    Orthogonal,
    /// Grid rotated into diamonds; the tile size plays no part.
    Isometric(IsoDims),
}

impl Projection {
    pub fn is_isometric(&self) -> bool {
        matches!(self, Projection::Isometric(_))
    }

    pub fn grid_to_projected(&self, grid: Point, tile_size: f32) -> Point {
        match self {
            Projection::Orthogonal => Point::new(grid.x * tile_size, grid.y * tile_size),
            Projection::Isometric(iso) => Point::new(
                (grid.x - grid.y) * iso.half_width(),
                (grid.x + grid.y) * iso.half_height(),
            ),
        }
    }

    pub fn projected_to_grid(&self, projected: Point, tile_size: f32) -> Point {
        match self {
            Projection::Orthogonal => Point::new(projected.x / tile_size, projected.y / tile_size),
            Projection::Isometric(iso) => {
                let u = projected.x / iso.half_width();
                let v = projected.y / iso.half_height();
                Point::new((u + v) * 0.5, (v - u) * 0.5)
            }
        }
    }

    /// Corners of the tile at `(x, y)` in projection space, clockwise from the
    /// grid origin corner: a square in orthogonal mode, a diamond (top, right,
    /// bottom, left) in isometric mode.
    pub fn tile_corners(&self, x: i32, y: i32, tile_size: f32) -> [Point; 4] {
        let (fx, fy) = (x as f32, y as f32);
        [
            self.grid_to_projected(Point::new(fx, fy), tile_size),
            self.grid_to_projected(Point::new(fx + 1.0, fy), tile_size),
            self.grid_to_projected(Point::new(fx + 1.0, fy + 1.0), tile_size),
            self.grid_to_projected(Point::new(fx, fy + 1.0), tile_size),
        ]
    }

    /// Bounding box of a `width x height` tile map after projection.
    pub fn world_bounds(&self, width: i32, height: i32, tile_size: f32) -> Aabb {
        let (w, h) = (width as f32, height as f32);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(0.0, h),
            Point::new(w, h),
        ]
        .map(|corner| self.grid_to_projected(corner, tile_size));
        Aabb::from_points(&corners)
    }
}
