//! Unix `poll(2)`-based readiness backend.
//!
//! One blocking `poll` per round reports which descriptors are readable or
//! hung up; every ready descriptor is then drained with a single direct
//! read into its slot's buffer.
//!
//! Responsibilities:
//! - Wait for readiness across all still-open descriptors at once
//! - Append newly available bytes to the ready slots' buffers
//! - Detect end-of-stream (zero-byte read or hang-up) and close slots
//!
//! Closed slots are parked in place with a sentinel descriptor rather than
//! compacted out, since `poll(2)` skips negative descriptors.

use super::READ_CHUNK;
use super::platform::{RawStream, SENTINEL, sys_poll, sys_read};
use crate::buffer::StreamBuf;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, pollfd};
use std::io;

/// Readiness-based poller backend.
///
/// Holds one wait descriptor per slot, index-aligned with the slot array
/// for the lifetime of the poller.
pub(crate) struct PollBackend {
    /// Wait descriptors; a closed slot's entry is [`SENTINEL`].
    fds: Vec<pollfd>,

    /// Number of descriptors that are not yet sentinels.
    active: usize,
}

impl PollBackend {
    /// Builds one wait descriptor per handle, all initially active.
    pub(crate) fn new(handles: &[RawStream]) -> io::Result<Self> {
        let fds = handles
            .iter()
            .map(|&fd| pollfd {
                fd,
                events: POLLIN,
                revents: 0,
            })
            .collect::<Vec<_>>();

        Ok(Self {
            active: fds.len(),
            fds,
        })
    }

    /// Runs one readiness round.
    ///
    /// Blocks until at least one descriptor is readable or hung up, then
    /// services every ready descriptor in label order. Returns `Ok(true)`
    /// while at least one slot remains active.
    pub(crate) fn advance(&mut self, bufs: &mut [StreamBuf]) -> io::Result<bool> {
        // An all-sentinel set would make poll(2) block forever.
        if self.active == 0 {
            return Ok(false);
        }

        sys_poll(&mut self.fds)?;

        for (slot, pfd) in self.fds.iter_mut().enumerate() {
            if pfd.fd == SENTINEL {
                continue;
            }

            // Readable is checked before the error bits so a hang-up with
            // data still pending gets drained in the same round.
            if pfd.revents & POLLIN != 0 {
                let window = bufs[slot].reserve(READ_CHUNK);
                let n = match sys_read(pfd.fd, window) {
                    Ok(n) => n,
                    // Close out the reservation so the failed poller stays
                    // droppable; a further advance errors again instead of
                    // tripping the buffer's reservation guard.
                    Err(err) => {
                        bufs[slot].commit(0);
                        return Err(err);
                    }
                };
                bufs[slot].commit(n);

                // Zero bytes after readiness is end-of-stream, not an error.
                if n == 0 {
                    pfd.fd = SENTINEL;
                    self.active -= 1;
                }
            } else if pfd.revents & (POLLERR | POLLHUP | POLLNVAL) != 0 {
                pfd.fd = SENTINEL;
                self.active -= 1;
            }
        }

        Ok(self.active > 0)
    }

    /// Returns `true` while the slot's descriptor is still polled.
    pub(crate) fn is_active(&self, slot: usize) -> bool {
        self.fds[slot].fd != SENTINEL
    }
}
