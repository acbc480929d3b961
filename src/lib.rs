//! # pipemux
//!
//! **pipemux** is a small multiplexer for a fixed, named set of readable
//! OS streams, built for the common chore of draining a child process's
//! stdout and stderr pipes without deadlocking on either one.
//!
//! Given one already-open handle per label, the poller repeatedly waits
//! until at least one stream has new data or has closed, appends the new
//! bytes into that stream's growable buffer, and reports whether any
//! stream is still open. The same caller-driven, single-threaded contract
//! is kept across two very different OS I/O models:
//!
//! - **Unix**: readiness-based, one `poll(2)` call over all descriptors,
//!   then a direct read on each ready one
//! - **Windows**: completion-based, one outstanding overlapped read per
//!   pipe handle, awaited with `WaitForMultipleObjects`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipemux::{Label, Poller};
//!
//! #[derive(Clone, Copy)]
//! enum Channel {
//!     Out,
//!     Err,
//! }
//!
//! impl Label for Channel {
//!     const ALL: &'static [Self] = &[Channel::Out, Channel::Err];
//!
//!     fn index(self) -> usize {
//!         self as usize
//!     }
//! }
//!
//! let mut poller = Poller::<Channel>::new(|ch| match ch {
//!     Channel::Out => stdout_handle,
//!     Channel::Err => stderr_handle,
//! })?;
//!
//! while poller.advance()? {}
//!
//! let out = poller.buffer(Channel::Out).as_slice();
//! let err = poller.buffer(Channel::Err).as_slice();
//! ```
//!
//! The poller consumes handles, it never creates them: opening pipes and
//! spawning the child belong to the caller, and the handles must stay open
//! for the poller's lifetime.

mod buffer;
mod poller;

pub use buffer::StreamBuf;
pub use poller::{Label, Poller, RawStream};
