//! Platform-specific stream multiplexing backends.
//!
//! Two fundamentally different OS models hide behind one interface:
//! - On Unix, a readiness backend: one `poll(2)` call reports which
//!   descriptors are readable, then each ready descriptor is read directly.
//! - On Windows, a completion backend: every handle keeps one overlapped
//!   read outstanding, and a wait call reports which one finished.
//!
//! The concrete backend is selected at compile time; there is no runtime
//! branching per call.

mod core;

pub use self::core::{Label, Poller};

#[cfg(unix)]
mod poll;

#[cfg(windows)]
mod overlapped;

#[cfg(unix)]
pub(crate) type Backend = poll::PollBackend;

#[cfg(windows)]
pub(crate) type Backend = overlapped::OverlappedBackend;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;

#[cfg(windows)]
pub(crate) mod windows;

#[cfg(windows)]
pub(crate) use windows as platform;

/// Raw readable stream handle: a file descriptor on Unix, a pipe `HANDLE`
/// on Windows.
pub type RawStream = platform::RawStream;

/// Bytes reserved in a stream's buffer before each read attempt.
///
/// A burst larger than this simply spans multiple reads and multiple
/// buffer growth steps.
pub(crate) const READ_CHUNK: usize = 512;
