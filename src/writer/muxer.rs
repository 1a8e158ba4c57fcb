use std::io::prelude::*;

use log::debug;

use crate::error::EncodingError;
use crate::traits::WriteBytesExt;
use crate::types::{Block, Extension, Palette, Repeat};

use super::{flag_size, write_color_table, write_extension, write_raw_extension, ExtensionData, FrameBlock};

/// Owns the output stream of one GIF document
///
/// Frames are written in the order they are appended; the muxer never
/// reorders them.
pub struct GifMuxer<W: Write> {
	w: Option<W>,
	global_palette: bool,
	width: u16,
	height: u16,
	frames: usize,
}

impl<W: Write> GifMuxer<W> {
	/// Writes the header, the logical screen descriptor, the global color
	/// table if one is given, and the looping extension if requested.
	pub fn new(mut w: W, width: u16, height: u16, global_palette: Option<&Palette>,
			   repeat: Repeat) -> Result<Self, EncodingError> {
		w.write_all(b"GIF89a")?;
		w.write_le(width)?;
		w.write_le(height)?;
		match global_palette {
			Some(palette) => {
				// global table flag, 8 bit color resolution
				w.write_le(0b1111_0000 | flag_size(palette))?;
				w.write_le(0u8)?; // bg index
				w.write_le(0u8)?; // aspect ratio
				write_color_table(&mut w, palette)?;
			},
			None => {
				w.write_le(0u8)?; // packed field
				w.write_le(0u8)?; // bg index
				w.write_le(0u8)?; // aspect ratio
			}
		}
		write_extension(&mut w, ExtensionData::Repetitions(repeat))?;
		Ok(GifMuxer {
			w: Some(w),
			global_palette: global_palette.is_some(),
			width,
			height,
			frames: 0
		})
	}

	fn writer(&mut self) -> Result<&mut W, EncodingError> {
		self.w.as_mut().ok_or(EncodingError::Sequence)
	}

	/// Appends an encoded frame
	pub fn append_frame(&mut self, block: &FrameBlock) -> Result<(), EncodingError> {
		if self.w.is_none() {
			return Err(EncodingError::Sequence)
		}
		if block.width != self.width || block.height != self.height {
			return Err(EncodingError::InvalidInput("frame dimensions differ from the canvas"))
		}
		if !block.local_palette && !self.global_palette {
			return Err(EncodingError::InvalidInput(
				"The GIF format requires a color palette but none was given."
			))
		}
		self.writer()?.write_all(block.bytes())?;
		self.frames += 1;
		debug!("muxed frame {} ({} bytes)", self.frames, block.bytes().len());
		Ok(())
	}

	/// Writes a comment extension
	pub fn write_comment(&mut self, text: &str) -> Result<(), EncodingError> {
		let w = self.writer()?;
		write_raw_extension(w, Extension::Comment as u8, text.as_bytes())?;
		Ok(())
	}

	/// Number of frames appended so far
	pub fn frames(&self) -> usize {
		self.frames
	}

	/// Writes the trailer and hands back the finished stream
	pub fn finalize(&mut self) -> Result<W, EncodingError> {
		let mut w = self.w.take().ok_or(EncodingError::Sequence)?;
		w.write_le(Block::Trailer as u8)?;
		w.flush()?;
		Ok(w)
	}
}
