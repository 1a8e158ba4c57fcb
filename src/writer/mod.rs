//! Byte-level GIF89a writers
use std::io;
use std::io::prelude::*;

use crate::traits::WriteBytesExt;
use crate::types::{Block, DisposalMethod, Extension, Palette, Repeat};

mod encoder;
mod muxer;

pub use self::encoder::{ColorTable, FrameBlock, FrameEncoder};
pub use self::muxer::GifMuxer;

pub enum ExtensionData {
	Control { flags: u8, delay: u16, trns: u8 },
	Repetitions(Repeat),
}

impl ExtensionData {
	pub fn new_control_ext(delay: u16, dispose: DisposalMethod,
						   needs_user_input: bool, trns: Option<u8>) -> ExtensionData {
		let mut flags = 0;
		let trns = match trns {
			Some(trns) => {
				flags |= 1;
				trns
			},
			None => 0
		};
		flags |= (needs_user_input as u8) << 1;
		flags |= (dispose as u8) << 2;
		ExtensionData::Control {
			flags,
			delay,
			trns
		}
	}
}

/// Writes an extension block
pub(crate) fn write_extension<W: Write>(w: &mut W, extension: ExtensionData) -> io::Result<()> {
	use self::ExtensionData::*;
	match extension {
		Control { flags, delay, trns } => {
			w.write_le(Block::Extension as u8)?;
			w.write_le(Extension::Control as u8)?;
			w.write_le(4u8)?;
			w.write_le(flags)?;
			w.write_le(delay)?;
			w.write_le(trns)?;
			w.write_le(0u8)
		}
		Repetitions(Repeat::Never) => Ok(()),
		Repetitions(repeat) => {
			let count = match repeat {
				Repeat::Finite(n) => n,
				_ => 0
			};
			w.write_le(Block::Extension as u8)?;
			w.write_le(Extension::Application as u8)?;
			w.write_le(11u8)?;
			w.write_all(b"NETSCAPE2.0")?;
			w.write_le(3u8)?;
			w.write_le(1u8)?;
			w.write_le(count)?;
			w.write_le(0u8)
		}
	}
}

/// Writes an extension with arbitrary payload, split into sub-blocks
pub(crate) fn write_raw_extension<W: Write>(w: &mut W, func: u8, data: &[u8]) -> io::Result<()> {
	w.write_le(Block::Extension as u8)?;
	w.write_le(func)?;
	for chunk in data.chunks(0xFF) {
		w.write_le(chunk.len() as u8)?;
		w.write_all(chunk)?;
	}
	w.write_le(0u8)
}

pub(crate) fn write_color_table<W: Write>(w: &mut W, palette: &Palette) -> io::Result<()> {
	for color in palette.colors() {
		w.write_all(color)?;
	}
	// Tables hold a power of two entries
	for _ in palette.len()..palette.table_size() {
		w.write_all(&[0, 0, 0])?;
	}
	Ok(())
}

/// Size field of a packed color table flag byte
pub(crate) fn flag_size(palette: &Palette) -> u8 {
	palette.table_bits() - 1
}
