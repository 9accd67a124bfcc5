//! # Generation Task
//!
//! Wraps one generator run with shared state, progress reporting and
//! cooperative cancellation.
//!
//! ## State Machine
//!
//! ```text
//! Created -> Generating (0 < progress < 100) -> Finished + result
//!                                            -> Finished + canceled, no result
//!                                            -> Finished + failed, no result
//! ```
//!
//! [`GenState::cancel`] may be called from any thread at any time. The
//! generator polls the flag between phases and inside long loops and
//! stops without producing a partial map. `finished` and the final status
//! are set on every exit path, including panics.
//!
//! ## Example
//!
//! ```rust,ignore
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let task = GenerationTask::new(params).with_channel(tx);
//! let state = task.state();
//! std::thread::spawn(move || task.run());
//! for progress in rx {
//!     println!("{}% {}", progress.percent, progress.status);
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tundra_core::{Map, MapError};

use crate::error::{GenError, GenResult};
use crate::params::GenParams;

/// Final status string of a canceled run.
pub const STATUS_CANCELED: &str = "Canceled";
/// Final status string of a successful run.
pub const STATUS_FINISHED: &str = "Finished";
/// Final status string of a failed run.
pub const STATUS_FAILED: &str = "Failed";

/// One progress update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Percent complete, 0 to 100.
    pub percent: u8,
    /// Human-readable phase.
    pub status: String,
}

/// How a run ended.
#[derive(Debug)]
pub enum GenOutcome {
    /// The map was generated.
    Finished(Arc<Map>),
    /// The run was canceled; no map exists.
    Canceled,
}

impl GenOutcome {
    /// Returns true for a canceled run.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// The generated map, cloned only if other handles to it are alive.
    #[must_use]
    pub fn into_map(self) -> Option<Map> {
        match self {
            Self::Finished(map) => Some(Arc::try_unwrap(map).unwrap_or_else(|shared| (*shared).clone())),
            Self::Canceled => None,
        }
    }
}

/// Shared, thread-safe state of one run.
#[derive(Debug, Default)]
pub struct GenState {
    canceled: AtomicBool,
    finished: AtomicBool,
    progress: AtomicU8,
    status: Mutex<String>,
    result: Mutex<Option<Arc<Map>>>,
}

impl GenState {
    /// Fresh state in `Created`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// True once cancellation was requested.
    #[inline]
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// True once the run has ended, whatever the outcome.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Last reported percentage.
    #[inline]
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    /// Last reported status.
    #[must_use]
    pub fn status(&self) -> String {
        self.status.lock().clone()
    }

    /// The generated map, once finished successfully.
    #[must_use]
    pub fn result(&self) -> Option<Arc<Map>> {
        self.result.lock().clone()
    }

    /// Takes the generated map out of the state.
    pub fn take_result(&self) -> Option<Arc<Map>> {
        self.result.lock().take()
    }

    fn update(&self, percent: u8, status: &str) {
        self.progress.store(percent.min(100), Ordering::Release);
        let mut current = self.status.lock();
        current.clear();
        current.push_str(status);
    }

    fn finish(&self, status: &str, result: Option<Arc<Map>>) {
        *self.result.lock() = result;
        *self.status.lock() = status.to_string();
        self.finished.store(true, Ordering::Release);
    }
}

/// Why a run stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Canceled,
    Failed(GenError),
}

impl From<GenError> for Interrupt {
    fn from(err: GenError) -> Self {
        Self::Failed(err)
    }
}

impl From<MapError> for Interrupt {
    fn from(err: MapError) -> Self {
        Self::Failed(GenError::Map(err))
    }
}

/// Result of one generator step.
pub(crate) type Step<T> = Result<T, Interrupt>;

enum ProgressSink {
    None,
    Callback(Box<dyn FnMut(&Progress) + Send>),
    Channel(Sender<Progress>),
}

/// Progress and cancellation handle passed through a run.
pub struct GenContext {
    state: Arc<GenState>,
    sink: ProgressSink,
}

impl GenContext {
    /// Context with its own state and no progress sink.
    #[must_use]
    pub fn detached() -> Self {
        Self { state: Arc::new(GenState::new()), sink: ProgressSink::None }
    }

    /// Shared state of this run.
    #[must_use]
    pub fn state(&self) -> &Arc<GenState> {
        &self.state
    }

    /// Enters a new phase: checks cancellation, then reports progress.
    pub(crate) fn phase(&mut self, percent: u8, status: &str) -> Step<()> {
        self.check()?;
        tracing::debug!(percent, status, "generation phase");
        self.state.update(percent, status);
        let progress = Progress { percent, status: status.to_string() };
        match &mut self.sink {
            ProgressSink::None => {}
            ProgressSink::Callback(callback) => callback(&progress),
            ProgressSink::Channel(tx) => {
                // A dropped receiver only means nobody is watching
                let _ = tx.send(progress);
            }
        }
        Ok(())
    }

    /// Polls the cancellation flag.
    #[inline]
    pub(crate) fn check(&self) -> Step<()> {
        if self.state.is_canceled() {
            Err(Interrupt::Canceled)
        } else {
            Ok(())
        }
    }
}

/// Marks the state finished if the run unwinds.
struct FinishGuard<'a>(&'a GenState);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0.finish(STATUS_FAILED, None);
        }
    }
}

/// One cancellable, progress-reporting generator run.
pub struct GenerationTask {
    params: GenParams,
    ctx: GenContext,
}

impl GenerationTask {
    /// Creates a task in `Created`.
    #[must_use]
    pub fn new(params: GenParams) -> Self {
        Self { params, ctx: GenContext::detached() }
    }

    /// Delivers progress to a callback.
    #[must_use]
    pub fn with_callback(mut self, callback: impl FnMut(&Progress) + Send + 'static) -> Self {
        self.ctx.sink = ProgressSink::Callback(Box::new(callback));
        self
    }

    /// Delivers progress to a channel.
    #[must_use]
    pub fn with_channel(mut self, tx: Sender<Progress>) -> Self {
        self.ctx.sink = ProgressSink::Channel(tx);
        self
    }

    /// Parameters of this run.
    #[must_use]
    pub fn params(&self) -> &GenParams {
        &self.params
    }

    /// Handle to the shared state, for cancellation and polling.
    #[must_use]
    pub fn state(&self) -> Arc<GenState> {
        Arc::clone(&self.ctx.state)
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.ctx.state.cancel();
    }

    /// Validates the parameters and runs the generator to completion,
    /// cancellation or failure.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidParams`] before any voxel work if the
    /// parameters are invalid, or the error that stopped the run.
    pub fn run(mut self) -> GenResult<GenOutcome> {
        let state = Arc::clone(&self.ctx.state);
        let _guard = FinishGuard(&state);

        if let Err(err) = self.params.validate() {
            tracing::warn!(generator = self.params.generator_name(), error = %err, "rejected parameters");
            state.finish(STATUS_FAILED, None);
            return Err(err);
        }

        match crate::registry::run_generator(&self.params, &mut self.ctx) {
            Ok(map) => {
                let map = Arc::new(map);
                state.update(100, STATUS_FINISHED);
                state.finish(STATUS_FINISHED, Some(Arc::clone(&map)));
                Ok(GenOutcome::Finished(map))
            }
            Err(Interrupt::Canceled) => {
                tracing::debug!(generator = self.params.generator_name(), "generation canceled");
                state.finish(STATUS_CANCELED, None);
                Ok(GenOutcome::Canceled)
            }
            Err(Interrupt::Failed(err)) => {
                tracing::error!(generator = self.params.generator_name(), error = %err, "generation failed");
                state.finish(STATUS_FAILED, None);
                Err(err)
            }
        }
    }
}

/// Runs a generator synchronously with no progress sink.
///
/// # Errors
///
/// See [`GenerationTask::run`].
pub fn generate(params: GenParams) -> GenResult<GenOutcome> {
    GenerationTask::new(params).run()
}
