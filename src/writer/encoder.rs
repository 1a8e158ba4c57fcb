use std::io::prelude::*;
use std::sync::Arc;

use log::debug;

use crate::error::EncodingError;
use crate::lzw;
use crate::quantize::Quantizer;
use crate::traits::WriteBytesExt;
use crate::types::{Block, DisposalMethod, Frame, IndexedFrame, Palette, MAX_COLORS};

use super::{flag_size, write_color_table, write_extension, ExtensionData};

/// Where a frame takes its colors from
#[derive(Debug, Clone)]
pub enum ColorTable {
	/// Remap into the shared palette written once by the muxer.
	Global(Arc<Palette>),
	/// Quantize the frame on its own and emit a local color table.
	Local,
}

/// The encoded bytes of one frame: control extension, descriptor, optional
/// local color table and compressed image data
#[derive(Debug, Clone)]
pub struct FrameBlock {
	pub width: u16,
	pub height: u16,
	pub delay: u16,
	/// Whether the block carries its own color table
	pub local_palette: bool,
	bytes: Vec<u8>,
}

impl FrameBlock {
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}
}

/// Turns frames into frame blocks. Stateless between calls, so one
/// encoder can be shared by any number of worker threads.
#[derive(Debug, Copy, Clone)]
pub struct FrameEncoder {
	quantizer: Quantizer,
	quality: u8,
}

impl Default for FrameEncoder {
	fn default() -> FrameEncoder {
		FrameEncoder::new(Quantizer::default(), 10)
	}
}

impl FrameEncoder {
	pub fn new(quantizer: Quantizer, quality: u8) -> FrameEncoder {
		FrameEncoder { quantizer, quality }
	}

	/// Quantizes and compresses a complete frame
	pub fn encode(&self, frame: &Frame, table: &ColorTable) -> Result<FrameBlock, EncodingError> {
		let (indexed, local) = match *table {
			ColorTable::Global(ref palette) => {
				let indices = palette.remap(frame.pixels());
				(IndexedFrame::new(frame.width(), frame.height(), indices, palette.clone())?, false)
			},
			ColorTable::Local => {
				let (palette, indices) = self.quantizer.quantize(frame.pixels(), MAX_COLORS, self.quality)?;
				(IndexedFrame::new(frame.width(), frame.height(), indices, Arc::new(palette))?, true)
			}
		};
		debug!("frame {}x{} indexed into {} colors", frame.width(), frame.height(), indexed.palette().len());
		self.encode_indexed(&indexed, frame.delay(), frame.dispose(), local)
	}

	/// Writes an already indexed frame
	///
	/// Note: the palette of `indexed` is only written when `local` is set;
	/// otherwise it must be the global palette of the stream.
	pub fn encode_indexed(&self, indexed: &IndexedFrame, delay: u16, dispose: DisposalMethod,
						  local: bool) -> Result<FrameBlock, EncodingError> {
		let palette = indexed.palette();
		let mut w = Vec::with_capacity(indexed.indices().len() / 2 + 32);
		write_extension(&mut w, ExtensionData::new_control_ext(delay, dispose, false, None))?;
		w.write_le(Block::Image as u8)?;
		w.write_le(0u16)?; // left
		w.write_le(0u16)?; // top
		w.write_le(indexed.width())?;
		w.write_le(indexed.height())?;
		if local {
			w.write_le(0b1000_0000 | flag_size(palette))?;
			write_color_table(&mut w, palette)?;
		} else {
			w.write_le(0u8)?;
		}
		let min_code_size = palette.min_code_size();
		w.write_le(min_code_size)?;
		w.write_all(&lzw::compress(indexed.indices(), min_code_size)?)?;
		Ok(FrameBlock {
			width: indexed.width(),
			height: indexed.height(),
			delay,
			local_palette: local,
			bytes: w,
		})
	}
}
