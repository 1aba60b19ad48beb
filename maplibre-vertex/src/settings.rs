//! Settings for the vertex layer engine.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::error::Error;

/// Miter vectors with a component longer than this (in line widths) are replaced by a bevel.
pub const DEFAULT_MITER_LIMIT: f32 = 4.0;
/// Round caps are turned off for a whole batch of runs above this count.
pub const DEFAULT_ROUND_CAP_LIMIT: usize = 400;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct VertexSettings {
    /// Maximum number of free blocks the [`VertexArena`](crate::render::arena::VertexArena)
    /// keeps around.
    pub pool_limit: usize,
    /// Size of a tile in tile units.
    pub tile_size: f32,
    pub line: LineSettings,
    pub building: BuildingSettings,
    pub atlas: AtlasSettings,
}

impl Default for VertexSettings {
    fn default() -> Self {
        Self {
            pool_limit: 500,
            tile_size: 256.0,
            line: LineSettings::default(),
            building: BuildingSettings::default(),
            atlas: AtlasSettings::default(),
        }
    }
}

impl VertexSettings {
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let settings: VertexSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file. Missing fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.tile_size > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if !(self.line.miter_limit > 0.0) {
            return Err(Error::InvalidSettings(format!(
                "line.miter_limit must be positive, got {}",
                self.line.miter_limit
            )));
        }
        if self.atlas.tile_width == 0 || self.atlas.tile_height == 0 {
            return Err(Error::InvalidSettings(
                "atlas tiles must not be empty".to_string(),
            ));
        }
        let max_tile = i16::MAX as u32 / 8;
        if self.atlas.tile_width > max_tile || self.atlas.tile_height > max_tile {
            return Err(Error::InvalidSettings(format!(
                "atlas tile {}x{} does not fit into fixed-point texture coordinates",
                self.atlas.tile_width, self.atlas.tile_height
            )));
        }
        if 2 * self.atlas.padding_x >= self.atlas.tile_width
            || 2 * self.atlas.padding_y >= self.atlas.tile_height
        {
            return Err(Error::InvalidSettings(format!(
                "padding {}x{} leaves no room in a {}x{} atlas tile",
                self.atlas.padding_x,
                self.atlas.padding_y,
                self.atlas.tile_width,
                self.atlas.tile_height
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    pub miter_limit: f32,
    pub round_cap_limit: usize,
    /// Endpoints further than this outside the tile get no round cap.
    pub cap_guard: f32,
    /// Segments shorter than this are dropped.
    pub min_segment_length: f32,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            miter_limit: DEFAULT_MITER_LIMIT,
            round_cap_limit: DEFAULT_ROUND_CAP_LIMIT,
            cap_guard: 4.0,
            min_segment_length: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildingSettings {
    /// Height used for buildings without a height.
    pub default_height: f32,
    /// Multiplier from source heights to vertex heights.
    pub height_scale: f32,
}

impl Default for BuildingSettings {
    fn default() -> Self {
        Self {
            default_height: 100.0,
            height_scale: 10.0,
        }
    }
}

impl BuildingSettings {
    /// Vertex height of a building with the given source height.
    pub fn scaled_height(&self, height: f32) -> i16 {
        let scaled = if height == 0.0 {
            self.default_height
        } else {
            height * self.height_scale
        };
        scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AtlasSettings {
    pub tile_width: u32,
    pub tile_height: u32,
    /// Number of backing rasters the texture pool keeps for reuse.
    pub pool_fill: usize,
    pub padding_x: u32,
    pub padding_y: u32,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            tile_width: 512,
            tile_height: 256,
            pool_fill: 10,
            padding_x: 1,
            padding_y: 1,
        }
    }
}
