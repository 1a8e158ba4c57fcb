//! Job configuration
use serde::Deserialize;

use crate::error::EncodingError;
use crate::quantize::Quantizer;
use crate::types::Repeat;

/// Whether frames share one palette or each carries its own
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaletteMode {
    /// One palette computed from all frames before encoding starts.
    Global,
    /// Every frame is quantized independently.
    #[default]
    PerFrame,
}

/// Options accepted when a job is finished
///
/// Deserializes from the option objects capture front ends pass around,
/// e.g. `{"workerCount": 4, "quality": 10, "paletteMode": "global", "loop": true}`.
/// Missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Size of the worker pool, at least 1.
    #[serde(alias = "workers")]
    pub worker_count: usize,
    /// Quantizer sampling factor in 1..=20; lower is slower and more accurate.
    pub quality: u8,
    pub palette_mode: PaletteMode,
    /// Repeat forever. Ignored when `repeat` is set.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Explicit loop count for the looping extension.
    pub repeat: Option<u16>,
    pub quantizer: Quantizer,
    /// Text stored in a comment extension after the screen descriptor.
    pub comment: Option<String>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            worker_count: 2,
            quality: 10,
            palette_mode: PaletteMode::default(),
            looping: true,
            repeat: None,
            quantizer: Quantizer::default(),
            comment: None,
        }
    }
}

impl Options {
    pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=20;

    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.worker_count == 0 {
            return Err(EncodingError::InvalidInput("worker count must be at least 1"));
        }
        if !Options::QUALITY_RANGE.contains(&self.quality) {
            return Err(EncodingError::InvalidInput("quality must be within 1..=20"));
        }
        Ok(())
    }

    pub fn repeat(&self) -> Repeat {
        match self.repeat {
            Some(n) => Repeat::Finite(n),
            None if self.looping => Repeat::Infinite,
            None => Repeat::Never,
        }
    }
}
