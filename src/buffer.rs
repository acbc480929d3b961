//! Growable per-stream byte queue.
//!
//! Each polled stream owns one [`StreamBuf`]. The poller appends into it
//! through a reserve/commit pair, and the caller drains it from the front
//! between rounds.
//!
//! Responsibilities:
//! - Hand out a contiguous writable window of at least a requested size
//! - Reclaim consumed front space by compaction, or grow the backing store
//! - Keep the reserved window at a stable address until it is committed
//!
//! The stable-address guarantee matters on Windows: the completion backend
//! issues an asynchronous read into the reserved window and only commits it
//! on a later round, so no operation between `reserve` and `commit` may move
//! the backing memory.

use std::slice;

/// A growable first-in-first-out byte buffer.
///
/// Bytes enter at the back through [`reserve`](Self::reserve) /
/// [`commit`](Self::commit) and leave at the front through
/// [`consume`](Self::consume). Unconsumed bytes are always contiguous and
/// visible through [`as_slice`](Self::as_slice).
///
/// Growth is amortized O(1) per appended byte: `reserve` first tries to
/// reclaim consumed front space by sliding the unread bytes down, and only
/// reallocates when that is not enough.
pub struct StreamBuf {
    /// Backing storage; `buf[head..]` holds the unconsumed bytes.
    buf: Vec<u8>,

    /// Index of the first unconsumed byte.
    head: usize,

    /// Size of the currently reserved, not yet committed window.
    ///
    /// While nonzero, `consume` must not move or release storage.
    pending: usize,
}

impl StreamBuf {
    /// Creates an empty buffer with no backing allocation.
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            head: 0,
            pending: 0,
        }
    }

    /// Reserves at least `min` contiguous writable bytes past the end of the
    /// unconsumed data and returns the window.
    ///
    /// Consumed front space is reclaimed by compaction before the backing
    /// store is grown. The window stays at a stable address until the
    /// matching [`commit`](Self::commit).
    ///
    /// # Panics
    ///
    /// Panics if a previous reservation is still pending.
    pub(crate) fn reserve(&mut self, min: usize) -> &mut [u8] {
        assert_eq!(self.pending, 0, "previous reservation not committed");

        if self.buf.capacity() - self.buf.len() < min && self.head > 0 {
            self.buf.copy_within(self.head.., 0);
            self.buf.truncate(self.buf.len() - self.head);
            self.head = 0;
        }

        if self.buf.capacity() - self.buf.len() < min {
            self.buf.reserve(min);
        }

        self.pending = min;

        // The window is spare capacity; it becomes initialized (and visible
        // through `as_slice`) only once `commit` accounts for it.
        unsafe { slice::from_raw_parts_mut(self.buf.as_mut_ptr().add(self.buf.len()), min) }
    }

    /// Marks `n` bytes of the reserved window as written, appending them to
    /// the unconsumed data.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the pending reservation.
    pub(crate) fn commit(&mut self, n: usize) {
        assert!(n <= self.pending, "commit exceeds reservation");

        unsafe {
            self.buf.set_len(self.buf.len() + n);
        }

        self.pending = 0;
    }

    /// Returns the raw address and length of the pending window.
    ///
    /// Used by the completion backend, whose in-flight read outlives the
    /// borrow returned by [`reserve`](Self::reserve).
    #[cfg(windows)]
    pub(crate) fn pending_window(&mut self) -> (*mut u8, usize) {
        debug_assert!(self.pending > 0);
        let ptr = unsafe { self.buf.as_mut_ptr().add(self.buf.len()) };
        (ptr, self.pending)
    }

    /// Drops `n` bytes from the front of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`len`](Self::len).
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consume exceeds buffered bytes");

        self.head += n;

        // Reset a fully drained buffer so future reserves start from the
        // front. Not allowed while an in-flight read targets the old end.
        if self.head == self.buf.len() && self.pending == 0 {
            self.buf.clear();
            self.head = 0;
        }
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    /// Returns `true` if no unconsumed bytes remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The unconsumed bytes, in arrival order.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.head..]
    }
}

#[cfg(test)]
mod tests {
    use super::StreamBuf;

    fn append(buf: &mut StreamBuf, bytes: &[u8]) {
        let window = buf.reserve(bytes.len());
        window[..bytes.len()].copy_from_slice(bytes);
        buf.commit(bytes.len());
    }

    #[test]
    fn test_reserve_commit_appends() {
        let mut buf = StreamBuf::new();
        assert!(buf.is_empty());

        append(&mut buf, b"hello");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice(), b"hello");

        append(&mut buf, b" world");
        assert_eq!(buf.as_slice(), b"hello world");
    }

    #[test]
    fn test_partial_commit() {
        let mut buf = StreamBuf::new();

        let window = buf.reserve(8);
        window[..3].copy_from_slice(b"abc");
        buf.commit(3);

        assert_eq!(buf.as_slice(), b"abc");
    }

    #[test]
    fn test_commit_zero_keeps_buffer() {
        let mut buf = StreamBuf::new();
        append(&mut buf, b"data");

        buf.reserve(16);
        buf.commit(0);

        assert_eq!(buf.as_slice(), b"data");
    }

    #[test]
    fn test_consume_from_front() {
        let mut buf = StreamBuf::new();
        append(&mut buf, b"hello");

        buf.consume(2);
        assert_eq!(buf.as_slice(), b"llo");

        buf.consume(3);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_compaction_preserves_unread_bytes() {
        let mut buf = StreamBuf::new();
        append(&mut buf, b"abcdefgh");
        buf.consume(6);

        // Force a reserve large enough that the consumed front space must
        // be reclaimed before (or instead of) reallocating.
        append(&mut buf, &[b'x'; 64]);

        let mut expected = b"gh".to_vec();
        expected.extend_from_slice(&[b'x'; 64]);
        assert_eq!(buf.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let mut buf = StreamBuf::new();
        let mut expected = Vec::new();

        for round in 0u32..40 {
            let chunk: Vec<u8> = (0..512u32).map(|i| ((round + i) % 251) as u8).collect();
            append(&mut buf, &chunk);
            expected.extend_from_slice(&chunk);
        }

        assert_eq!(buf.len(), expected.len());
        assert_eq!(buf.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_append_after_full_drain() {
        let mut buf = StreamBuf::new();
        append(&mut buf, b"first");
        buf.consume(5);

        append(&mut buf, b"second");
        assert_eq!(buf.as_slice(), b"second");
    }

    #[test]
    #[should_panic(expected = "consume exceeds buffered bytes")]
    fn test_consume_past_end_panics() {
        let mut buf = StreamBuf::new();
        append(&mut buf, b"ab");
        buf.consume(3);
    }

    #[test]
    #[should_panic(expected = "commit exceeds reservation")]
    fn test_commit_past_reservation_panics() {
        let mut buf = StreamBuf::new();
        buf.reserve(4);
        buf.commit(5);
    }
}
