//! Concurrent, order-preserving encoding of a frame sequence
//!
//! Frames are collected on the caller's thread. [`EncodingScheduler::finish`]
//! hands them to a coordinating thread that dispatches every frame to a
//! bounded worker pool and appends the finished blocks to the muxer strictly
//! in submission order, whatever order the workers complete in.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use enough::Stop;
use log::{debug, info, warn};

use crate::error::EncodingError;
use crate::options::{Options, PaletteMode};
use crate::quantize::Quantizer;
use crate::traits::{HasParameters, Parameter};
use crate::types::{Frame, Repeat, MAX_COLORS};
use crate::writer::{ColorTable, FrameBlock, FrameEncoder, GifMuxer};

mod cancel;
mod ordqueue;
mod progress;

pub use self::cancel::CancelToken;
pub use self::progress::{progress_channel, NoProgress, ProgressReceiver, ProgressReporter, ProgressSender};

use self::ordqueue::OrdQueue;

/// Lifecycle of an encoding job
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Idle,
    Collecting,
    Encoding,
    Muxing,
    Finished,
    Failed,
}

impl State {
    fn from_u8(n: u8) -> State {
        match n {
            0 => State::Idle,
            1 => State::Collecting,
            2 => State::Encoding,
            3 => State::Muxing,
            4 => State::Finished,
            _ => State::Failed,
        }
    }

    /// Finished and Failed are terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Finished | State::Failed)
    }
}

#[derive(Debug, Clone)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new(state: State) -> StateCell {
        StateCell(Arc::new(AtomicU8::new(state as u8)))
    }

    fn get(&self) -> State {
        State::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: State) {
        self.0.store(state as u8, Ordering::Release)
    }
}

/// Worker pool size
#[derive(Debug, Copy, Clone)]
pub struct Workers(pub usize);

/// Quantizer sampling factor, 1..=20
#[derive(Debug, Copy, Clone)]
pub struct Quality(pub u8);

/// Collects frames and starts the concurrent encode
pub struct EncodingScheduler {
    options: Options,
    frames: Vec<Frame>,
    canvas: Option<(u16, u16)>,
    cancel: CancelToken,
}

impl HasParameters for EncodingScheduler {}

impl Parameter<EncodingScheduler> for Options {
    fn set_param(self, this: &mut EncodingScheduler) {
        this.options = self
    }
}

impl Parameter<EncodingScheduler> for PaletteMode {
    fn set_param(self, this: &mut EncodingScheduler) {
        this.options.palette_mode = self
    }
}

impl Parameter<EncodingScheduler> for Quantizer {
    fn set_param(self, this: &mut EncodingScheduler) {
        this.options.quantizer = self
    }
}

impl Parameter<EncodingScheduler> for Repeat {
    fn set_param(self, this: &mut EncodingScheduler) {
        let options = &mut this.options;
        match self {
            Repeat::Never => {
                options.looping = false;
                options.repeat = None;
            }
            Repeat::Infinite => {
                options.looping = true;
                options.repeat = None;
            }
            Repeat::Finite(n) => options.repeat = Some(n),
        }
    }
}

impl Parameter<EncodingScheduler> for Workers {
    fn set_param(self, this: &mut EncodingScheduler) {
        this.options.worker_count = self.0
    }
}

impl Parameter<EncodingScheduler> for Quality {
    fn set_param(self, this: &mut EncodingScheduler) {
        this.options.quality = self.0
    }
}

impl Default for EncodingScheduler {
    fn default() -> EncodingScheduler {
        EncodingScheduler::with_options(Options::default())
    }
}

impl EncodingScheduler {
    pub fn new() -> EncodingScheduler {
        EncodingScheduler::default()
    }

    pub fn with_options(options: Options) -> EncodingScheduler {
        EncodingScheduler {
            options,
            frames: Vec::new(),
            canvas: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> State {
        if self.frames.is_empty() {
            State::Idle
        } else {
            State::Collecting
        }
    }

    /// Token that cancels the job once it is running
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Number of frames collected so far
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Queues a frame and returns its sequence index.
    ///
    /// The first frame fixes the canvas size; later frames must match it.
    pub fn submit_frame(&mut self, frame: Frame) -> Result<usize, EncodingError> {
        let dims = (frame.width(), frame.height());
        match self.canvas {
            Some(canvas) if canvas != dims => {
                return Err(EncodingError::InvalidInput("frame dimensions differ from the first frame"))
            }
            Some(_) => (),
            None => self.canvas = Some(dims),
        }
        let index = self.frames.len();
        debug!("frame {} submitted, delay {}cs", index, frame.delay());
        self.frames.push(frame);
        Ok(index)
    }

    /// Starts encoding on a coordinating thread and returns a handle to the job.
    pub fn finish<P: ProgressReporter + 'static>(self, reporter: P) -> EncodingJob {
        let state = StateCell::new(self.state());
        let cancel = self.cancel.clone();
        let job = Job {
            options: self.options,
            frames: self.frames,
            canvas: self.canvas,
            cancel: self.cancel,
            state: state.clone(),
        };
        let handle = thread::Builder::new()
            .name("gifpipe-coordinator".into())
            .spawn(move || job.run(reporter))
            .map_err(|err| {
                state.set(State::Failed);
                EncodingError::WorkerFailure(format!("could not start coordinator: {}", err))
            });
        EncodingJob { handle, state, cancel }
    }
}

/// Handle to a running job
pub struct EncodingJob {
    handle: Result<thread::JoinHandle<Result<Vec<u8>, EncodingError>>, EncodingError>,
    state: StateCell,
    cancel: CancelToken,
}

impl EncodingJob {
    pub fn state(&self) -> State {
        self.state.get()
    }

    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    /// Blocks until the job is finished or failed
    pub fn wait(self) -> Result<Vec<u8>, EncodingError> {
        let handle = self.handle?;
        match handle.join() {
            Ok(result) => result,
            Err(payload) => {
                self.state.set(State::Failed);
                Err(EncodingError::WorkerFailure(panic_message(&*payload)))
            }
        }
    }
}

/// Encodes `frames` with `options` and blocks until the GIF is complete.
pub fn encode_frames<I>(frames: I, options: Options) -> Result<Vec<u8>, EncodingError>
where
    I: IntoIterator<Item = Frame>,
{
    let mut scheduler = EncodingScheduler::with_options(options);
    for frame in frames {
        scheduler.submit_frame(frame)?;
    }
    scheduler.finish(NoProgress).wait()
}

struct Job {
    options: Options,
    frames: Vec<Frame>,
    canvas: Option<(u16, u16)>,
    cancel: CancelToken,
    state: StateCell,
}

impl Job {
    fn run<P: ProgressReporter>(self, mut reporter: P) -> Result<Vec<u8>, EncodingError> {
        let state = self.state.clone();
        match self.encode(&mut reporter) {
            Ok(bytes) => {
                state.set(State::Finished);
                Ok(bytes)
            }
            Err(err) => {
                warn!("encoding failed: {}", err);
                state.set(State::Failed);
                Err(err)
            }
        }
    }

    fn encode(self, reporter: &mut dyn ProgressReporter) -> Result<Vec<u8>, EncodingError> {
        let Job { options, frames, canvas, cancel, state } = self;
        options.validate()?;
        let (width, height) = match canvas {
            Some(canvas) if !frames.is_empty() => canvas,
            _ => return Err(EncodingError::Quantization("no frames submitted")),
        };
        let total = frames.len();
        info!("encoding {} frames of {}x{} on {} workers", total, width, height, options.worker_count);
        state.set(State::Encoding);

        let table = match options.palette_mode {
            PaletteMode::Global => {
                let pixels: Vec<&[u8]> = frames.iter().map(Frame::pixels).collect();
                let palette = options.quantizer.palette(&pixels, MAX_COLORS, options.quality)?;
                debug!("global palette of {} colors", palette.len());
                ColorTable::Global(Arc::new(palette))
            }
            PaletteMode::PerFrame => ColorTable::Local,
        };
        let global_palette = match table {
            ColorTable::Global(ref palette) => Some(palette.clone()),
            ColorTable::Local => None,
        };
        let mut muxer = GifMuxer::new(Vec::new(), width, height, global_palette.as_deref(), options.repeat())?;
        if let Some(ref comment) = options.comment {
            muxer.write_comment(comment)?;
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.worker_count)
            .thread_name(|i| format!("gifpipe-worker-{}", i))
            .build()
            .map_err(|err| EncodingError::WorkerFailure(err.to_string()))?;
        let encoder = FrameEncoder::new(options.quantizer, options.quality);
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = crossbeam_channel::unbounded();
        for (index, frame) in frames.into_iter().enumerate() {
            let tx = tx.clone();
            let table = table.clone();
            let cancel = cancel.clone();
            let abort = abort.clone();
            pool.spawn(move || {
                let result = if abort.load(Ordering::Acquire) {
                    Err(EncodingError::Cancelled)
                } else {
                    cancel.check().map_err(EncodingError::from).and_then(|()| encode_frame(&encoder, frame, &table))
                };
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut queue = OrdQueue::new();
        for (index, result) in rx.iter() {
            let block = match result {
                Ok(block) => block,
                Err(err) => {
                    abort.store(true, Ordering::Release);
                    return Err(err.at_frame(index));
                }
            };
            debug!("frame {} encoded, {} waiting", index, queue.buffered());
            queue.push(index, block);
            while let Some(block) = queue.pop() {
                if let Err(reason) = cancel.check() {
                    abort.store(true, Ordering::Release);
                    warn!("cancelled after {} of {} frames", queue.released() - 1, total);
                    return Err(reason.into());
                }
                state.set(State::Muxing);
                let index = queue.released() - 1;
                muxer.append_frame(&block).map_err(|err| err.at_frame(index))?;
                reporter.on_progress(queue.released() as f32 / total as f32);
            }
        }
        if queue.released() != total {
            return Err(EncodingError::WorkerFailure(format!(
                "{} of {} frames never came back from the workers",
                total - queue.released(),
                total
            )));
        }
        let bytes = muxer.finalize()?;
        info!("encoded {} frames into {} bytes", total, bytes.len());
        Ok(bytes)
    }
}

/// Runs on a worker. The frame's pixels are released when it returns.
fn encode_frame(encoder: &FrameEncoder, frame: Frame, table: &ColorTable) -> Result<FrameBlock, EncodingError> {
    catch_worker_panic(|| encoder.encode(&frame, table))
}

/// Turns a panic inside `work` into `WorkerFailure`
fn catch_worker_panic<T, F>(work: F) -> Result<T, EncodingError>
where
    F: FnOnce() -> Result<T, EncodingError>,
{
    panic::catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(EncodingError::WorkerFailure(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
