//! Error type shared by every stage of the pipeline
use std::io;

use thiserror::Error;

/// Coarse classification of an [`EncodingError`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Degenerate quantizer input, or a job without frames.
    Quantization,
    /// Index out of palette bounds or a broken LZW invariant.
    Encoding,
    /// Muxer used after it was finalized.
    Sequence,
    /// The job was cancelled through its token.
    Cancelled,
    /// A worker thread faulted.
    WorkerFailure,
    /// Rejected frame or option values.
    InvalidInput,
    /// The output sink failed.
    Io,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("quantization failed: {0}")]
    Quantization(&'static str),
    #[error("palette index {index} does not fit minimum code size {min_code_size}")]
    IndexOutOfRange { index: u8, min_code_size: u8 },
    #[error("lzw encoder: {0}")]
    Lzw(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("frame appended after the stream was finalized")]
    Sequence,
    #[error("encoding cancelled")]
    Cancelled,
    #[error("worker failed: {0}")]
    WorkerFailure(String),
    #[error("frame {index}: {source}")]
    Frame {
        index: usize,
        #[source]
        source: Box<EncodingError>,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EncodingError {
    pub fn kind(&self) -> ErrorKind {
        use self::EncodingError::*;
        match *self {
            Quantization(_) => ErrorKind::Quantization,
            IndexOutOfRange { .. } | Lzw(_) => ErrorKind::Encoding,
            InvalidInput(_) => ErrorKind::InvalidInput,
            Sequence => ErrorKind::Sequence,
            Cancelled => ErrorKind::Cancelled,
            WorkerFailure(_) => ErrorKind::WorkerFailure,
            Frame { ref source, .. } => source.kind(),
            Io(_) => ErrorKind::Io,
        }
    }

    /// Sequence index of the frame that triggered the error, if any
    pub fn frame_index(&self) -> Option<usize> {
        match *self {
            EncodingError::Frame { index, .. } => Some(index),
            _ => None,
        }
    }

    /// Tags the error with the frame it came from.
    ///
    /// Cancellation is a job-wide condition and stays untagged.
    pub(crate) fn at_frame(self, index: usize) -> EncodingError {
        match self {
            EncodingError::Cancelled | EncodingError::Frame { .. } => self,
            other => EncodingError::Frame {
                index,
                source: Box::new(other),
            },
        }
    }
}

impl From<enough::StopReason> for EncodingError {
    fn from(_: enough::StopReason) -> Self {
        EncodingError::Cancelled
    }
}
