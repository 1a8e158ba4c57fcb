//! Color reduction of true-color frames to GIF palettes
//!
//! Two strategies are available. [`Quantizer::MedianCut`] is deterministic
//! and keeps images with at most `max_colors` distinct colors lossless.
//! [`Quantizer::NeuQuant`] runs the Kohonen network from `color_quant`,
//! trading speed for smoother gradients on photographic input.
use log::debug;
use serde::Deserialize;

use crate::error::EncodingError;
use crate::types::{Palette, MAX_COLORS, N_CHANNELS};

mod median_cut;
mod neuquant;

/// Palette construction strategy
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
pub enum Quantizer {
    #[default]
    #[serde(rename = "mediancut", alias = "medianCut")]
    MedianCut,
    #[serde(rename = "neuquant", alias = "neuQuant")]
    NeuQuant,
}

impl Quantizer {
    /// Builds one palette for all `frames` (RGBA pixel slices).
    ///
    /// `quality` is the sampling stride: every `quality`-th pixel feeds the
    /// color statistics, so 1 is slowest and most accurate.
    pub fn palette(&self, frames: &[&[u8]], max_colors: usize, quality: u8) -> Result<Palette, EncodingError> {
        if frames.iter().all(|f| f.len() < N_CHANNELS) {
            return Err(EncodingError::Quantization("no pixels to quantize"));
        }
        let max_colors = max_colors.clamp(2, MAX_COLORS);
        let quality = quality.max(1);

        if let Some(colors) = distinct_colors(frames, max_colors) {
            debug!("{} distinct colors, palette is exact", colors.len());
            return Palette::new(colors);
        }
        let colors = match *self {
            Quantizer::MedianCut => median_cut::palette(frames, max_colors, quality as usize),
            Quantizer::NeuQuant => neuquant::palette(frames, max_colors, quality),
        };
        debug!("{:?} reduced input to {} colors", self, colors.len());
        Palette::dedup(colors)
    }

    /// Quantizes a single frame into its own palette and index buffer.
    pub fn quantize(&self, pixels: &[u8], max_colors: usize, quality: u8) -> Result<(Palette, Vec<u8>), EncodingError> {
        let palette = self.palette(&[pixels], max_colors, quality)?;
        let indices = palette.remap(pixels);
        Ok((palette, indices))
    }
}

/// Median-cut quantization of RGBA `pixels`, reading every pixel.
pub fn quantize(pixels: &[u8], max_colors: usize) -> Result<(Palette, Vec<u8>), EncodingError> {
    Quantizer::MedianCut.quantize(pixels, max_colors, 1)
}

/// The sorted distinct colors of `frames`, or `None` once there are more than `max_colors`.
fn distinct_colors(frames: &[&[u8]], max_colors: usize) -> Option<Vec<[u8; 3]>> {
    let mut seen = std::collections::HashSet::with_capacity(max_colors + 1);
    for frame in frames {
        for px in frame.chunks_exact(N_CHANNELS) {
            if seen.insert([px[0], px[1], px[2]]) && seen.len() > max_colors {
                return None;
            }
        }
    }
    let mut colors: Vec<_> = seen.into_iter().collect();
    colors.sort_unstable();
    Some(colors)
}
