use libc::{nfds_t, poll, pollfd, read};
use std::io;
use std::os::fd::RawFd;

/// Raw stream handle type on Unix: a plain file descriptor.
pub type RawStream = RawFd;

/// Sentinel descriptor for a slot that is no longer polled.
///
/// `poll(2)` ignores negative descriptors, so closed slots are parked in
/// place instead of being compacted out of the descriptor array.
pub(crate) const SENTINEL: RawFd = -1;

/// Blocks on `poll(2)` across the given descriptors with no timeout.
///
/// Interruption (`EINTR`) is retried transparently; any other failure is
/// returned to the caller.
pub(crate) fn sys_poll(fds: &mut [pollfd]) -> io::Result<()> {
    loop {
        let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as nfds_t, -1) };
        if rc >= 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read; zero means end-of-stream. Only called
/// after `poll` reported the descriptor readable, so the read does not
/// block even on a blocking descriptor.
pub(crate) fn sys_read(fd: RawStream, buffer: &mut [u8]) -> io::Result<usize> {
    let rc = unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) };
    if rc < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc as usize)
    }
}
