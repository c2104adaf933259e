//! # Streaming Configuration
//!
//! Radii, batch limits and grid geometry for the chunk manager.
//!
//! ```toml
//! chunk_size = 32.0
//! render_radius = 2
//! unload_radius = 3
//! batch_size = 2
//! grid_cells = 4
//! grid_cell_size = 8.0
//! ```
//!
//! `unload_radius` must be strictly greater than `render_radius`. The gap
//! between them is the hysteresis band: a chunk inside it is neither
//! loaded nor unloaded, so jitter at a chunk boundary cannot thrash.

use serde::{Deserialize, Serialize};

use meridian_procedural::DEFAULT_CHUNK_SIZE;

use crate::error::{StreamingError, StreamingResult};

/// Chunk manager configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunk edge length in world units.
    pub chunk_size: f32,
    /// Chebyshev radius within which chunks are loaded.
    pub render_radius: u32,
    /// Chebyshev radius beyond which chunks are unloaded.
    pub unload_radius: u32,
    /// Maximum chunk loads started per tick.
    pub batch_size: usize,
    /// Edge length of the per-chunk placement grid.
    pub grid_cells: u32,
    /// World units per placement grid cell.
    pub grid_cell_size: f32,
}

impl StreamingConfig {
    /// Production settings.
    #[must_use]
    pub fn production() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            render_radius: 2,
            unload_radius: 3,
            batch_size: 2,
            grid_cells: 4,
            grid_cell_size: DEFAULT_CHUNK_SIZE / 4.0,
        }
    }

    /// Small radii and a larger batch, for fast tests.
    #[must_use]
    pub fn test() -> Self {
        Self {
            chunk_size: 16.0,
            render_radius: 1,
            unload_radius: 2,
            batch_size: 4,
            grid_cells: 2,
            grid_cell_size: 8.0,
        }
    }

    /// Overrides both radii.
    #[must_use]
    pub fn with_radii(mut self, render_radius: u32, unload_radius: u32) -> Self {
        self.render_radius = render_radius;
        self.unload_radius = unload_radius;
        self
    }

    /// Overrides the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Parses and validates a TOML document. Missing keys take production values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on parse or validation failure.
    pub fn from_toml_str(source: &str) -> StreamingResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StreamingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the manager relies on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first violated rule.
    pub fn validate(&self) -> StreamingResult<()> {
        let fail = |msg: String| Err(StreamingError::InvalidConfig(msg));

        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return fail(format!("chunk_size must be positive, got {}", self.chunk_size));
        }
        if self.unload_radius <= self.render_radius {
            return fail(format!(
                "unload_radius ({}) must exceed render_radius ({})",
                self.unload_radius, self.render_radius
            ));
        }
        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".to_owned());
        }
        if self.grid_cells == 0 {
            return fail("grid_cells must be at least 1".to_owned());
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return fail(format!("grid_cell_size must be positive, got {}", self.grid_cell_size));
        }
        Ok(())
    }

    /// Number of chunks in a fully loaded neighborhood.
    #[must_use]
    pub const fn neighborhood_size(&self) -> usize {
        let edge = 2 * self.render_radius as usize + 1;
        edge * edge
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(StreamingConfig::production().validate().is_ok());
        assert!(StreamingConfig::test().validate().is_ok());
        assert_eq!(StreamingConfig::default(), StreamingConfig::production());
        assert_eq!(StreamingConfig::production().neighborhood_size(), 25);
    }

    #[test]
    fn test_hysteresis_required() {
        let config = StreamingConfig::production().with_radii(3, 3);
        assert!(matches!(config.validate(), Err(StreamingError::InvalidConfig(_))));
        assert!(StreamingConfig::production().with_radii(0, 1).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(StreamingConfig::production().with_batch_size(0).validate().is_err());

        let mut config = StreamingConfig::production();
        config.chunk_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = StreamingConfig::production();
        config.grid_cells = 0;
        assert!(config.validate().is_err());

        let mut config = StreamingConfig::production();
        config.grid_cell_size = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = StreamingConfig::from_toml_str("render_radius = 3\nunload_radius = 5\n").unwrap();
        assert_eq!(config.render_radius, 3);
        assert_eq!(config.unload_radius, 5);
        assert_eq!(config.batch_size, 2);

        assert!(StreamingConfig::from_toml_str("render_radius = 4\n").is_err());
        assert!(StreamingConfig::from_toml_str("batch_size = \"two\"\n").is_err());
    }
}
