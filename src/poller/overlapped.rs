//! Windows overlapped-I/O completion backend.
//!
//! Win32 anonymous pipes have no readiness primitive, so this backend keeps
//! exactly one overlapped read outstanding per active handle, waits for the
//! first one to complete, commits its bytes, and immediately re-issues the
//! next read for that handle.
//!
//! Responsibilities:
//! - Eagerly issue the first read per slot before the first wait (a
//!   completion can only be observed for an operation that already exists)
//! - Wait for a single completion per round, never a batch
//! - Detect broken-pipe completions and retire their slots
//! - Cancel and drain every outstanding read before the poller is dropped
//!
//! Retired handles are compacted out of the wait list (later entries shift
//! left) because `WaitForMultipleObjects` does not tolerate gaps. The wait
//! list is also bounded by the platform's 64-object wait limit; polling
//! more streams than that would need round-robin batching, which this
//! backend does not attempt.

use super::READ_CHUNK;
use super::platform::{
    RawStream, ReadStatus, sys_cancel, sys_close_event, sys_event, sys_overlapped_result,
    sys_read_overlapped, sys_wait_any,
};
use crate::buffer::StreamBuf;

use std::io;

use windows_sys::Win32::Foundation::HANDLE;
use windows_sys::Win32::System::IO::OVERLAPPED;

/// Per-slot bookkeeping for one pipe handle.
struct OpSlot {
    /// The caller's pipe handle. Not owned; never closed here.
    handle: RawStream,

    /// Operation-state record for the outstanding read.
    ///
    /// Boxed so its address stays stable while the kernel holds a pointer
    /// to it.
    overlapped: Box<OVERLAPPED>,

    /// Manual-reset event signaled when the read completes.
    event: HANDLE,

    /// An issued read has not completed yet.
    outstanding: bool,

    /// The slot reached end-of-stream and left the wait list.
    closed: bool,
}

/// Completion-based poller backend.
pub(crate) struct OverlappedBackend {
    /// One record per slot, index-stable for the poller's lifetime.
    slots: Vec<OpSlot>,

    /// Event handles of the active slots, compacted, in slot order.
    wait: Vec<HANDLE>,

    /// `wait[i]` belongs to `slots[back[i]]`.
    back: Vec<usize>,

    /// The eager first-round issue has happened.
    started: bool,
}

unsafe impl Send for OverlappedBackend {}

impl OverlappedBackend {
    /// Creates one operation record and completion event per handle.
    ///
    /// No read is issued yet; the first [`advance`](Self::advance) call
    /// does that so construction never touches the buffers.
    pub(crate) fn new(handles: &[RawStream]) -> io::Result<Self> {
        let mut slots = Vec::with_capacity(handles.len());

        for &handle in handles {
            let event = sys_event()?;

            let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { std::mem::zeroed() });
            overlapped.hEvent = event;

            slots.push(OpSlot {
                handle,
                overlapped,
                event,
                outstanding: false,
                closed: false,
            });
        }

        Ok(Self {
            slots,
            wait: Vec::with_capacity(handles.len()),
            back: Vec::with_capacity(handles.len()),
            started: false,
        })
    }

    /// Issues the next overlapped read for `slot` into its buffer.
    ///
    /// Returns `Ok(true)` when the operation is outstanding (or completed
    /// synchronously, which the wait observes the same way) and `Ok(false)`
    /// when the pipe is already broken and the slot must be retired.
    fn issue(&mut self, slot: usize, bufs: &mut [StreamBuf]) -> io::Result<bool> {
        bufs[slot].reserve(READ_CHUNK);
        let (window, len) = bufs[slot].pending_window();

        let s = &mut self.slots[slot];

        // Reuse the record for the next operation; only the event survives.
        *s.overlapped = unsafe { std::mem::zeroed() };
        s.overlapped.hEvent = s.event;

        match sys_read_overlapped(s.handle, window, len, &mut *s.overlapped) {
            Ok(ReadStatus::Pending | ReadStatus::Done(_)) => {
                s.outstanding = true;
                Ok(true)
            }
            Ok(ReadStatus::Broken) => {
                bufs[slot].commit(0);
                s.closed = true;
                Ok(false)
            }
            // Close out the reservation so the failed poller stays
            // droppable rather than tripping the buffer's reservation
            // guard on a later call.
            Err(err) => {
                bufs[slot].commit(0);
                Err(err)
            }
        }
    }

    /// Retires `index` from the wait list, closing its slot.
    fn retire(&mut self, index: usize) {
        let slot = self.back[index];
        self.wait.remove(index);
        self.back.remove(index);
        self.slots[slot].outstanding = false;
        self.slots[slot].closed = true;
    }

    /// Runs one completion round.
    ///
    /// Waits for the first outstanding read to complete, commits its bytes,
    /// and re-issues a read for that handle. At most one handle is serviced
    /// per call; callers drive this in a loop. Returns `Ok(true)` while at
    /// least one slot remains active.
    pub(crate) fn advance(&mut self, bufs: &mut [StreamBuf]) -> io::Result<bool> {
        if !self.started {
            self.started = true;

            for slot in 0..self.slots.len() {
                if self.issue(slot, bufs)? {
                    self.wait.push(self.slots[slot].event);
                    self.back.push(slot);
                }
            }
        }

        if self.wait.is_empty() {
            return Ok(false);
        }

        let index = sys_wait_any(&self.wait)?;
        let slot = self.back[index];

        let s = &mut self.slots[slot];
        match sys_overlapped_result(s.handle, &mut *s.overlapped)? {
            ReadStatus::Done(n) => {
                s.outstanding = false;
                bufs[slot].commit(n);

                // Keep exactly one operation outstanding for this handle.
                if !self.issue(slot, bufs)? {
                    self.wait.remove(index);
                    self.back.remove(index);
                }

                Ok(true)
            }
            ReadStatus::Broken => {
                bufs[slot].commit(0);
                self.retire(index);
                Ok(!self.wait.is_empty())
            }
            // sys_overlapped_result never reports Pending for a signaled
            // completion.
            ReadStatus::Pending => unreachable!("completed operation reported pending"),
        }
    }

    /// Returns `true` while the slot has not reached end-of-stream.
    pub(crate) fn is_active(&self, slot: usize) -> bool {
        !self.slots[slot].closed
    }
}

impl Drop for OverlappedBackend {
    /// Cancels and drains every outstanding read.
    ///
    /// Must run before the buffers are released: each outstanding read
    /// targets a window inside a slot's buffer, and the kernel may still
    /// write there until the cancellation has drained.
    fn drop(&mut self) {
        for s in &mut self.slots {
            if s.outstanding {
                sys_cancel(s.handle, &mut *s.overlapped);
            }
            sys_close_event(s.event);
        }
    }
}
