//! Common types used by the quantizer, the encoders and the scheduler
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EncodingError;

/// RGBA images have four channels
pub const N_CHANNELS: usize = 4;
/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;
/// Largest color table GIF can express
pub const MAX_COLORS: usize = 256;

/// Disposal method
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Decoder is not required to take any action.
    Any = 0,
    /// Do not dispose. Full-canvas frames simply replace their predecessor.
    #[default]
    Keep = 1,
    /// Restore to background color.
    Background = 2,
    /// Restore to previous.
    Previous = 3,
}

/// Known block types
#[derive(Debug, Copy, Clone)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B,
}

/// Known GIF extensions
#[derive(Debug, Copy, Clone)]
pub enum Extension {
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF,
}

/// Number of times the animation is played back
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Repeat {
    /// No looping extension is written; viewers play the animation once.
    Never,
    /// Loop `n` additional times.
    Finite(u16),
    /// Loop forever.
    Infinite,
}

/// A captured frame: an opaque RGBA bitmap plus its timing
///
/// Fields are only reachable through the constructors and `with_*`
/// setters, which keep the buffer at `width * height * 4` bytes and the
/// delay at 1 or more.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) delay: u16,
    pub(crate) dispose: DisposalMethod,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) buffer: Vec<u8>,
}

impl Frame {
    /// Delay used until `with_delay` says otherwise.
    pub const DEFAULT_DELAY: u16 = 10;

    /// Creates a frame from pixels in RGBA format.
    pub fn from_rgba(width: u16, height: u16, pixels: Vec<u8>) -> Result<Frame, EncodingError> {
        if width == 0 || height == 0 {
            return Err(EncodingError::InvalidInput("frame dimensions must be non-zero"));
        }
        if pixels.len() != width as usize * height as usize * N_CHANNELS {
            return Err(EncodingError::InvalidInput(
                "pixel buffer length does not match width * height * 4",
            ));
        }
        Ok(Frame {
            delay: Frame::DEFAULT_DELAY,
            dispose: DisposalMethod::default(),
            width,
            height,
            buffer: pixels,
        })
    }

    /// Creates a frame from pixels in RGB format.
    pub fn from_rgb(width: u16, height: u16, pixels: &[u8]) -> Result<Frame, EncodingError> {
        if pixels.len() != width as usize * height as usize * PLTE_CHANNELS {
            return Err(EncodingError::InvalidInput(
                "pixel buffer length does not match width * height * 3",
            ));
        }
        let mut rgba = Vec::with_capacity(pixels.len() / PLTE_CHANNELS * N_CHANNELS);
        for v in pixels.chunks_exact(PLTE_CHANNELS) {
            rgba.extend_from_slice(&[v[0], v[1], v[2], 0xFF]);
        }
        Frame::from_rgba(width, height, rgba)
    }

    /// Sets the delay in centiseconds. GIF viewers treat 0 erratically, so it is raised to 1.
    pub fn with_delay(mut self, delay: u16) -> Frame {
        self.delay = delay.max(1);
        self
    }

    /// Sets the delay from milliseconds, rounded to the nearest centisecond.
    pub fn with_delay_ms(self, ms: u32) -> Frame {
        let cs = (ms.saturating_add(5) / 10).min(u16::MAX as u32);
        self.with_delay(cs as u16)
    }

    pub fn with_dispose(mut self, dispose: DisposalMethod) -> Frame {
        self.dispose = dispose;
        self
    }

    /// Display time in hundredths of a second, at least 1
    pub fn delay(&self) -> u16 {
        self.delay
    }

    pub fn dispose(&self) -> DisposalMethod {
        self.dispose
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGBA pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.buffer
    }
}

/// A GIF color table of up to 256 distinct colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Palette, EncodingError> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(EncodingError::InvalidInput("a palette holds between 1 and 256 colors"));
        }
        let mut seen = std::collections::HashSet::with_capacity(colors.len());
        if !colors.iter().all(|c| seen.insert(*c)) {
            return Err(EncodingError::InvalidInput("palette contains duplicate colors"));
        }
        Ok(Palette { colors })
    }

    /// Drops repeated colors, keeping the first occurrence of each.
    pub(crate) fn dedup(colors: impl IntoIterator<Item = [u8; 3]>) -> Result<Palette, EncodingError> {
        let mut seen = std::collections::HashSet::new();
        let colors: Vec<_> = colors.into_iter().filter(|c| seen.insert(*c)).collect();
        Palette::new(colors)
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Bits per entry of the serialized table, 1..=8
    pub fn table_bits(&self) -> u8 {
        let mut bits = 1;
        while (1usize << bits) < self.colors.len() {
            bits += 1;
        }
        bits
    }

    /// Number of entries in the serialized table: a power of two, at least 2
    pub fn table_size(&self) -> usize {
        1 << self.table_bits()
    }

    /// LZW minimum code size for images indexed into this palette
    pub fn min_code_size(&self) -> u8 {
        self.table_bits().max(2)
    }

    /// Index of the closest color by squared RGB distance. Ties go to the lower index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dist = distance(*c, rgb);
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// Maps RGBA pixels to palette indices. Alpha is ignored.
    pub fn remap(&self, rgba: &[u8]) -> Vec<u8> {
        let mut cache: HashMap<[u8; 3], u8> = HashMap::new();
        rgba.chunks_exact(N_CHANNELS)
            .map(|px| {
                let rgb = [px[0], px[1], px[2]];
                *cache.entry(rgb).or_insert_with(|| self.nearest(rgb))
            })
            .collect()
    }
}

/// Squared euclidean distance in RGB space
pub fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

/// A frame rewritten as palette indices
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    width: u16,
    height: u16,
    indices: Vec<u8>,
    palette: Arc<Palette>,
}

impl IndexedFrame {
    pub fn new(
        width: u16,
        height: u16,
        indices: Vec<u8>,
        palette: Arc<Palette>,
    ) -> Result<IndexedFrame, EncodingError> {
        if indices.len() != width as usize * height as usize {
            return Err(EncodingError::InvalidInput("index buffer length does not match width * height"));
        }
        if indices.iter().any(|&i| i as usize >= palette.len()) {
            return Err(EncodingError::IndexOutOfRange {
                index: indices.iter().copied().max().unwrap_or(0),
                min_code_size: palette.min_code_size(),
            });
        }
        Ok(IndexedFrame { width, height, indices, palette })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn table_size_is_a_power_of_two() {
        let sizes = [(1, 2), (2, 2), (3, 4), (5, 8), (16, 16), (17, 32), (129, 256), (256, 256)];
        for &(n, size) in sizes.iter() {
            let colors = (0..n).map(|i| [i as u8, 0, 0]).collect();
            let palette = Palette::new(colors).unwrap();
            assert_eq!(palette.table_size(), size, "{} colors", n);
        }
    }

    #[test]
    fn min_code_size_is_at_least_two() {
        let palette = Palette::new(vec![[0, 0, 0], [255, 255, 255]]).unwrap();
        assert_eq!(palette.table_bits(), 1);
        assert_eq!(palette.min_code_size(), 2);
    }

    #[test]
    fn palette_rejects_duplicates() {
        let err = Palette::new(vec![[1, 2, 3], [1, 2, 3]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(Palette::dedup(vec![[1, 2, 3], [1, 2, 3]]).unwrap().len(), 1);
    }

    #[test]
    fn nearest_prefers_lower_index_on_ties() {
        let palette = Palette::new(vec![[0, 0, 0], [20, 0, 0]]).unwrap();
        assert_eq!(palette.nearest([10, 0, 0]), 0);
        assert_eq!(palette.nearest([11, 0, 0]), 1);
        assert_eq!(palette.remap(&[19, 0, 0, 0, 1, 1, 1, 255]), [1, 0]);
    }

    #[test]
    fn indexed_frame_checks_bounds() {
        let palette = Arc::new(Palette::new(vec![[0, 0, 0], [1, 1, 1], [2, 2, 2]]).unwrap());
        assert!(IndexedFrame::new(2, 1, vec![0, 2], palette.clone()).is_ok());
        let err = IndexedFrame::new(2, 1, vec![0, 3], palette).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn frame_validation() {
        assert!(Frame::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Frame::from_rgba(0, 2, vec![]).is_err());
        let frame = Frame::from_rgb(1, 1, &[1, 2, 3]).unwrap();
        assert_eq!(frame.pixels(), [1, 2, 3, 255]);
        assert_eq!(frame.delay(), Frame::DEFAULT_DELAY);
        assert_eq!(frame.dispose(), DisposalMethod::Keep);
        assert_eq!((frame.width(), frame.height()), (1, 1));
    }

    #[test]
    fn delays() {
        let frame = Frame::from_rgba(1, 1, vec![0; 4]).unwrap();
        assert_eq!(frame.clone().with_delay(0).delay(), 1);
        assert_eq!(frame.clone().with_delay_ms(200).delay(), 20);
        assert_eq!(frame.clone().with_delay_ms(14).delay(), 1);
        assert_eq!(frame.clone().with_delay_ms(15).delay(), 2);
        assert_eq!(frame.with_delay_ms(u32::MAX).delay(), u16::MAX);
    }
}
