//! Windows platform abstraction layer.
//!
//! Thin wrappers over the Win32 calls the completion backend needs:
//! manual-reset events, overlapped reads, completion retrieval, the
//! multi-object wait, and best-effort cancellation.
//!
//! All wrappers translate failure into `io::Error::last_os_error()` and
//! leave policy (what counts as end-of-stream, what is fatal) to the
//! backend.

use std::io;
use std::ptr;

use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_BROKEN_PIPE, ERROR_HANDLE_EOF, ERROR_IO_PENDING, GetLastError, HANDLE,
    WAIT_FAILED, WAIT_OBJECT_0,
};
use windows_sys::Win32::Storage::FileSystem::ReadFile;
use windows_sys::Win32::System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED};
use windows_sys::Win32::System::Threading::{CreateEventW, INFINITE, WaitForMultipleObjects};

/// Raw stream handle type on Windows: a Win32 `HANDLE`.
pub type RawStream = std::os::windows::io::RawHandle;

/// Outcome of starting or finishing an overlapped read.
pub(crate) enum ReadStatus {
    /// The operation is outstanding; its completion must be awaited.
    Pending,

    /// The operation finished with this many bytes.
    Done(usize),

    /// The other end of the pipe is gone; end-of-stream.
    Broken,
}

/// Creates an unnamed manual-reset event in the nonsignaled state.
pub(crate) fn sys_event() -> io::Result<HANDLE> {
    let ev = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };
    if ev.is_null() {
        Err(io::Error::last_os_error())
    } else {
        Ok(ev)
    }
}

/// Closes a Win32 handle, ignoring failure.
pub(crate) fn sys_close_event(ev: HANDLE) {
    unsafe {
        let _ = CloseHandle(ev);
    }
}

/// Starts an overlapped read of `len` bytes into `window`.
///
/// The `OVERLAPPED` record and the window memory must both stay valid until
/// the operation completes or is cancelled and drained.
///
/// Returns [`ReadStatus::Pending`] when the operation was accepted,
/// [`ReadStatus::Done`] when it completed synchronously (the event is still
/// signaled, so the wait observes it like any other completion), and
/// [`ReadStatus::Broken`] when the pipe is already closed. Any other failure
/// is an error.
pub(crate) fn sys_read_overlapped(
    handle: RawStream,
    window: *mut u8,
    len: usize,
    overlapped: *mut OVERLAPPED,
) -> io::Result<ReadStatus> {
    let mut n: u32 = 0;
    let ok = unsafe {
        ReadFile(handle as HANDLE, window as *mut _, len as u32, &mut n, overlapped)
    };

    if ok != 0 {
        return Ok(ReadStatus::Done(n as usize));
    }

    match unsafe { GetLastError() } {
        ERROR_IO_PENDING => Ok(ReadStatus::Pending),
        ERROR_BROKEN_PIPE | ERROR_HANDLE_EOF => Ok(ReadStatus::Broken),
        _ => Err(io::Error::last_os_error()),
    }
}

/// Retrieves the result of a signaled overlapped read without waiting.
pub(crate) fn sys_overlapped_result(
    handle: RawStream,
    overlapped: *mut OVERLAPPED,
) -> io::Result<ReadStatus> {
    let mut n: u32 = 0;
    let ok = unsafe { GetOverlappedResult(handle as HANDLE, overlapped, &mut n, 0) };

    if ok != 0 {
        return Ok(ReadStatus::Done(n as usize));
    }

    match unsafe { GetLastError() } {
        ERROR_BROKEN_PIPE | ERROR_HANDLE_EOF => Ok(ReadStatus::Broken),
        _ => Err(io::Error::last_os_error()),
    }
}

/// Blocks until one of the given event handles is signaled and returns its
/// index (single-completion semantics, never a batch).
///
/// The platform caps the number of simultaneous wait objects at 64; the
/// caller's wait list must stay under that limit.
pub(crate) fn sys_wait_any(events: &[HANDLE]) -> io::Result<usize> {
    let rc = unsafe { WaitForMultipleObjects(events.len() as u32, events.as_ptr(), 0, INFINITE) };

    if rc == WAIT_FAILED {
        return Err(io::Error::last_os_error());
    }

    let index = rc.wrapping_sub(WAIT_OBJECT_0) as usize;
    if index >= events.len() {
        return Err(io::Error::other("unexpected wait status"));
    }

    Ok(index)
}

/// Requests cancellation of an outstanding overlapped read and waits for it
/// to drain, ignoring failure.
///
/// Draining matters: the operation targets buffer memory, which must not be
/// released while the kernel can still write to it.
pub(crate) fn sys_cancel(handle: RawStream, overlapped: *mut OVERLAPPED) {
    unsafe {
        let _ = CancelIoEx(handle as HANDLE, overlapped);

        let mut n: u32 = 0;
        let _ = GetOverlappedResult(handle as HANDLE, overlapped, &mut n, 1);
    }
}
