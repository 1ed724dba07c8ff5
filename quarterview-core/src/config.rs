use crate::projection::Projection;
use crate::tile_map::{TileId, WALL};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CHUNK_TILES: i32 = 32;
pub const DEFAULT_DRAIN_BUDGET_MS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid render config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("chunk size must be positive, got {0}")]
    InvalidChunkTiles(i32),
    #[error("drain budget must be a finite, non-negative number of milliseconds, got {0}")]
    InvalidDrainBudget(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// The two colors a baked chunk uses, one per tile kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilePalette {
    pub wall: Rgba,
    pub floor: Rgba,
}

impl TilePalette {
    pub fn color_for(&self, tile: TileId) -> Rgba {
        if tile == WALL { self.wall } else { self.floor }
    }
}

impl Default for TilePalette {
    fn default() -> Self {
        Self {
            wall: Rgba::opaque(70, 75, 85),
            floor: Rgba::opaque(46, 52, 64),
        }
    }
}

/// Tunables for chunk baking and the per-step job budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub chunk_tiles: i32,
    pub projection: Projection,
    /// Milliseconds of baking allowed per simulation step; zero drains everything.
    pub drain_budget_ms: f64,
    pub palette: TilePalette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chunk_tiles: DEFAULT_CHUNK_TILES,
            projection: Projection::Orthogonal,
            drain_budget_ms: DEFAULT_DRAIN_BUDGET_MS,
            palette: TilePalette::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_tiles <= 0 {
            return Err(ConfigError::InvalidChunkTiles(self.chunk_tiles));
        }
        if !self.drain_budget_ms.is_finite() || self.drain_budget_ms < 0.0 {
            return Err(ConfigError::InvalidDrainBudget(self.drain_budget_ms));
        }
        Ok(())
    }

    /// `None` when the budget is zero, meaning drain without limit.
    pub fn drain_budget(&self) -> Option<Duration> {
        if self.drain_budget_ms > 0.0 && self.drain_budget_ms.is_finite() {
            Some(Duration::from_secs_f64(self.drain_budget_ms / 1000.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::IsoDims;
    use crate::tile_map::FLOOR;

    #[test]
    fn defaults_match_demo_values() {
        let config = RenderConfig::default();
        assert_eq!(config.chunk_tiles, 32);
        assert_eq!(config.projection, Projection::Orthogonal);
        assert_eq!(config.drain_budget(), Some(Duration::from_millis(1)));
        assert_eq!(config.palette.color_for(WALL), Rgba::opaque(70, 75, 85));
        assert_eq!(config.palette.color_for(FLOOR), Rgba::opaque(46, 52, 64));
    }

    #[test]
    fn parses_partial_json_over_defaults() {
        let config = RenderConfig::from_json_str(
            r#"{"chunk_tiles": 16, "projection": {"mode": "isometric", "width": 48, "height": 24}}"#,
        )
        .unwrap();

        assert_eq!(config.chunk_tiles, 16);
        assert_eq!(
            config.projection,
            Projection::Isometric(IsoDims::new(48.0, 24.0).unwrap())
        );
        assert_eq!(config.drain_budget_ms, DEFAULT_DRAIN_BUDGET_MS);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{"chunk_tiles": 0}"#),
            Err(ConfigError::InvalidChunkTiles(0))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(r#"{"drain_budget_ms": -1.0}"#),
            Err(ConfigError::InvalidDrainBudget(_))
        ));
        assert!(matches!(
            RenderConfig::from_json_str(
                r#"{"projection": {"mode": "isometric", "width": 64, "height": 0}}"#
            ),
            Err(ConfigError::Parse(_))
        ));
        assert!(RenderConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn zero_budget_drains_unbounded() {
        let config = RenderConfig {
            drain_budget_ms: 0.0,
            ..RenderConfig::default()
        };
        assert_eq!(config.drain_budget(), None);
    }

    #[test]
    fn json_round_trip() {
        let config = RenderConfig {
            projection: Projection::Isometric(IsoDims::default()),
            ..RenderConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(RenderConfig::from_json_str(&json).unwrap(), config);
    }
}
