//! Concurrent GIF89a encoding for sequences of captured RGBA frames.
//!
//! Frames go into an [`EncodingScheduler`]; `finish` quantizes and
//! LZW-compresses them on a worker pool and muxes the blocks, in submission
//! order, into a single GIF byte buffer.
//!
//! ```
//! use gifpipe::{EncodingScheduler, Frame, NoProgress};
//!
//! let mut scheduler = EncodingScheduler::new();
//! for shade in [0u8, 128, 255].iter() {
//!     let pixels = [*shade, *shade, *shade, 255].repeat(8 * 8);
//!     scheduler.submit_frame(Frame::from_rgba(8, 8, pixels)?.with_delay(10))?;
//! }
//! let gif = scheduler.finish(NoProgress).wait()?;
//! assert!(gif.starts_with(b"GIF89a"));
//! # Ok::<(), gifpipe::EncodingError>(())
//! ```

mod error;
mod options;
mod scheduler;
mod traits;
mod types;
mod writer;

pub mod lzw;
pub mod quantize;

pub use crate::error::{EncodingError, ErrorKind};
pub use crate::options::{Options, PaletteMode};
pub use crate::quantize::Quantizer;
pub use crate::scheduler::{
    encode_frames, progress_channel, CancelToken, EncodingJob, EncodingScheduler, NoProgress,
    ProgressReceiver, ProgressReporter, ProgressSender, Quality, State, Workers,
};
pub use crate::traits::{HasParameters, Parameter};
pub use crate::types::{DisposalMethod, Frame, IndexedFrame, Palette, Repeat};
pub use crate::writer::{ColorTable, FrameBlock, FrameEncoder, GifMuxer};
