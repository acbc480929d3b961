//! Poller orchestration over a fixed set of labeled streams.
//!
//! The [`Poller`] owns one buffer per labeled stream plus the platform
//! backend's per-handle bookkeeping, and exposes the caller-facing
//! contract:
//! - `advance` runs one blocking round and says whether to keep polling,
//! - `buffer` / `buffer_mut` give direct access to a stream's bytes,
//! - dropping the poller tears down in-flight operations safely.

use super::{Backend, RawStream};
use crate::buffer::StreamBuf;

use std::io;
use std::marker::PhantomData;

/// A compile-time-fixed set of stream labels.
///
/// Implemented by a caller enum naming the streams to multiplex, typically
/// a child process's output channels:
///
/// ```rust,ignore
/// #[derive(Clone, Copy)]
/// enum Channel {
///     Out,
///     Err,
/// }
///
/// impl Label for Channel {
///     const ALL: &'static [Self] = &[Channel::Out, Channel::Err];
///
///     fn index(self) -> usize {
///         self as usize
///     }
/// }
/// ```
///
/// `index` must return each label's position in `ALL`. The label set, and
/// each label's handle and buffer slot, are fixed when the poller is built;
/// only a label's liveness changes afterwards.
pub trait Label: Copy + 'static {
    /// Every label, in slot order.
    const ALL: &'static [Self];

    /// This label's position in [`ALL`](Self::ALL).
    fn index(self) -> usize;
}

/// A readiness multiplexer over a fixed set of labeled byte streams.
///
/// Built over already-open, readable OS handles (the poller never opens or
/// closes them). Each call to [`advance`](Self::advance) blocks until at
/// least one stream has new data or has closed, appends whatever arrived
/// into the per-stream buffers, and reports whether any stream is still
/// open. Typical driving loop:
///
/// ```rust,ignore
/// let mut poller = Poller::<Channel>::new(|ch| handles[ch])?;
/// while poller.advance()? {}
/// let out = poller.buffer(Channel::Out).as_slice();
/// ```
///
/// On Unix this is backed by `poll(2)` over all descriptors at once; on
/// Windows by one outstanding overlapped read per pipe handle. Both
/// backends present identical observable semantics, except that the
/// Windows backend services at most one stream per round, so callers must
/// loop on `advance` rather than assume every ready stream was drained.
pub struct Poller<L: Label> {
    // Field order is load-bearing: the backend drops first, cancelling any
    // in-flight read before the buffer memory it targets is released.
    backend: Backend,

    /// One buffer per label, indexed by `Label::index`.
    buffers: Vec<StreamBuf>,

    _labels: PhantomData<L>,
}

impl<L: Label> Poller<L> {
    /// Builds a poller over one already-open readable handle per label.
    ///
    /// All buffers start empty and every stream starts active.
    pub fn new(mut handle_for: impl FnMut(L) -> RawStream) -> io::Result<Self> {
        debug_assert!(
            L::ALL.iter().enumerate().all(|(i, l)| l.index() == i),
            "Label::index must match position in Label::ALL",
        );

        let handles = L::ALL
            .iter()
            .map(|&label| handle_for(label))
            .collect::<Vec<_>>();

        let buffers = L::ALL.iter().map(|_| StreamBuf::new()).collect();

        Ok(Self {
            backend: Backend::new(&handles)?,
            buffers,
            _labels: PhantomData,
        })
    }

    /// Runs one blocking round of multiplexing.
    ///
    /// Returns `Ok(true)` while at least one stream is still open, and
    /// `Ok(false)` once every stream has reached end-of-stream. On error
    /// the poller is left partially advanced and should only be dropped.
    pub fn advance(&mut self) -> io::Result<bool> {
        self.backend.advance(&mut self.buffers)
    }

    /// The accumulated, not yet consumed bytes of `label`'s stream.
    pub fn buffer(&self, label: L) -> &StreamBuf {
        &self.buffers[label.index()]
    }

    /// Mutable buffer access, for consuming bytes between rounds.
    ///
    /// Bytes may be drained from the front with [`StreamBuf::consume`];
    /// appending remains the poller's job.
    pub fn buffer_mut(&mut self, label: L) -> &mut StreamBuf {
        &mut self.buffers[label.index()]
    }

    /// Returns `true` while `label`'s stream has not reached end-of-stream.
    pub fn is_active(&self, label: L) -> bool {
        self.backend.is_active(label.index())
    }
}
