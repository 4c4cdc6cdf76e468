use core::cell::RefCell;

use embassy_sync::blocking_mutex::{
    raw::{CriticalSectionRawMutex, RawMutex},
    Mutex,
};

use crate::Error;

/// Fixed-capacity byte ring over caller-owned storage.
///
/// The capacity must be a power of two so indices can be wrapped by masking.
/// One slot is always kept free, so a ring of capacity `C` holds at most
/// `C - 1` unread bytes and `head == tail` always means empty.
///
/// The ring itself does no locking; see [`TransmitRing`] for the shared,
/// single-writer wrapper used on the transmit side of a link.
#[derive(Debug)]
pub struct RingBuffer<'a> {
    buf: &'a mut [u8],
    mask: usize,
    head: usize,
    tail: usize,
}

impl<'a> RingBuffer<'a> {
    /// Creates a ring over `buf`, failing unless its length is a power of two.
    pub fn new(buf: &'a mut [u8]) -> Result<Self, Error> {
        let capacity = buf.len();

        if !capacity.is_power_of_two() {
            return Err(Error::CapacityNotPowerOfTwo { capacity });
        }

        Ok(Self {
            buf,
            mask: capacity - 1,
            head: 0,
            tail: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Index of the next write.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the next read.
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Bytes available for reading.
    pub fn occupied(&self) -> usize {
        self.head.wrapping_sub(self.tail) & self.mask
    }

    /// Bytes available for writing.
    pub fn space_left(&self) -> usize {
        self.mask - self.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Copies `data` in at `head`, wrapping at most once, and advances `head`.
    ///
    /// The caller must have checked `data.len() <= self.space_left()`. Writing
    /// more than that silently overwrites unread bytes.
    ///
    /// # Panics
    ///
    /// Panics if `data` is longer than the whole ring.
    pub fn write_chunk(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= self.space_left(), "write_chunk past free space");

        let head = self.head;
        let to_top = self.capacity() - head;

        if data.len() > to_top {
            let (top, bottom) = data.split_at(to_top);
            self.buf[head..].copy_from_slice(top);
            self.buf[..bottom.len()].copy_from_slice(bottom);
        } else {
            self.buf[head..head + data.len()].copy_from_slice(data);
        }

        self.head = (head + data.len()) & self.mask;
    }

    /// Returns the longest contiguous readable run starting at `tail`.
    ///
    /// When the unread region wraps, this only covers the part up to the end of
    /// the storage; call again after [`consume`](Self::consume) for the rest.
    pub fn read_span(&self) -> &[u8] {
        if self.head >= self.tail {
            &self.buf[self.tail..self.head]
        } else {
            &self.buf[self.tail..]
        }
    }

    /// Marks up to `count` bytes as read.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.occupied());
        self.tail = (self.tail + count) & self.mask;
    }

    /// Writes `byte` at `head + offset` without publishing it.
    pub(crate) fn write_ahead(&mut self, offset: usize, byte: u8) {
        let idx = (self.head + offset) & self.mask;
        self.buf[idx] = byte;
    }

    /// Publishes `count` bytes previously written with `write_ahead`.
    pub(crate) fn commit(&mut self, count: usize) {
        debug_assert!(count <= self.space_left());
        self.head = (self.head + count) & self.mask;
    }
}

/// A [`RingBuffer`] shared between producer contexts and a transport driver.
///
/// Every access runs under the ring's own `M` lock, so at most one encoder
/// writes into the ring at a time and the lock is released on every exit path
/// of the closure, early returns included. The default masks interrupts; pick
/// `ThreadModeRawMutex` or `NoopRawMutex` when all producers share one context.
pub struct TransmitRing<'a, M: RawMutex = CriticalSectionRawMutex> {
    inner: Mutex<M, RefCell<RingBuffer<'a>>>,
}

impl<'a, M: RawMutex> TransmitRing<'a, M> {
    pub fn new(ring: RingBuffer<'a>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ring)),
        }
    }

    /// Claims the ring for the duration of `f`.
    ///
    /// # Panics
    ///
    /// Panics if called again from inside `f` for the same ring.
    pub fn claim<R>(&self, f: impl FnOnce(&mut RingBuffer<'a>) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn occupied(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().occupied())
    }

    pub fn space_left(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().space_left())
    }

    /// Moves up to `out.len()` pending bytes into `out`, returning the count.
    pub fn drain_into(&self, out: &mut [u8]) -> usize {
        self.claim(|ring| {
            let mut copied = 0;

            while copied < out.len() {
                let span = ring.read_span();
                if span.is_empty() {
                    break;
                }

                let n = span.len().min(out.len() - copied);
                out[copied..copied + n].copy_from_slice(&span[..n]);
                ring.consume(n);
                copied += n;
            }

            copied
        })
    }
}

/// Flat assembly buffer with a fill count. Only the SLIP decoder fills it, one
/// unescaped byte at a time, so there is no bulk push.
pub(crate) struct Buf<const C: usize> {
    buf: [u8; C],
    len: usize,
}

impl<const C: usize> Buf<C> {
    pub const fn new() -> Self {
        Self {
            buf: [0; C],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push(&mut self, c: u8) -> bool {
        if let Some(v) = self.buf.get_mut(self.len) {
            *v = c;
            self.len += 1;
            true
        } else {
            false
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::{Buf, RingBuffer, TransmitRing};
    use crate::Error;

    #[test]
    fn test_ring_rejects_non_power_of_two() {
        let mut storage = [0u8; 300];
        assert_eq!(
            RingBuffer::new(&mut storage).unwrap_err(),
            Error::CapacityNotPowerOfTwo { capacity: 300 }
        );

        let mut empty: [u8; 0] = [];
        assert!(RingBuffer::new(&mut empty).is_err());
    }

    #[test]
    fn test_ring_space_accounting() {
        let mut storage = [0u8; 16];
        let mut ring = RingBuffer::new(&mut storage).unwrap();

        assert!(ring.is_empty());
        assert_eq!(ring.space_left(), 15);

        ring.write_chunk(&[1, 2, 3, 4, 5]);
        assert_eq!(ring.occupied(), 5);
        assert_eq!(ring.space_left(), 10);

        ring.consume(2);
        assert_eq!(ring.occupied(), 3);
        assert_eq!(ring.read_span(), &[3, 4, 5]);
    }

    #[test]
    fn test_ring_wraps_near_end() {
        let mut storage = [0u8; 256];
        let mut ring = RingBuffer::new(&mut storage).unwrap();

        // Move both indices close to the physical end
        ring.write_chunk(&[0; 200]);
        ring.consume(200);
        assert_eq!((ring.head(), ring.tail()), (200, 200));

        let data: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        ring.write_chunk(&data);
        assert_eq!(ring.head(), (200 + 250) % 256);
        assert_eq!(ring.occupied(), 250);

        let first = ring.read_span().to_vec();
        assert_eq!(first.len(), 56);
        ring.consume(first.len());

        let second = ring.read_span().to_vec();
        assert_eq!(second.len(), 194);
        ring.consume(second.len());

        assert!(ring.read_span().is_empty());
        assert_eq!(first.len() + second.len(), 250);
        assert_eq!([first, second].concat(), data);
    }

    #[test]
    fn test_consume_is_bounded_by_occupied() {
        let mut storage = [0u8; 8];
        let mut ring = RingBuffer::new(&mut storage).unwrap();

        ring.write_chunk(&[9, 9]);
        ring.consume(100);
        assert!(ring.is_empty());
        assert_eq!(ring.head(), ring.tail());
    }

    #[test]
    fn test_transmit_ring_drain_across_wrap() {
        let mut storage = [0u8; 8];
        let mut ring = RingBuffer::new(&mut storage).unwrap();
        ring.write_chunk(&[0; 6]);
        ring.consume(6);
        ring.write_chunk(&[1, 2, 3, 4, 5]);

        let tx: TransmitRing<'_> = TransmitRing::new(ring);
        let mut out = [0u8; 4];
        assert_eq!(tx.drain_into(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(tx.occupied(), 1);

        assert_eq!(tx.drain_into(&mut out), 1);
        assert_eq!(out[0], 5);
        assert_eq!(tx.drain_into(&mut out), 0);
    }

    #[test]
    fn test_transmit_ring_with_noop_mutex() {
        let mut storage = [0u8; 16];
        let ring = RingBuffer::new(&mut storage).unwrap();
        let tx = TransmitRing::<NoopRawMutex>::new(ring);

        tx.claim(|ring| ring.write_chunk(&[7, 8, 9]));
        assert_eq!(tx.occupied(), 3);
        assert_eq!(tx.space_left(), 12);

        let mut out = [0u8; 8];
        assert_eq!(tx.drain_into(&mut out), 3);
        assert_eq!(out[..3], [7, 8, 9]);
    }

    #[test]
    fn test_buf_push_until_full() {
        let mut buf = Buf::<3>::new();
        assert!(buf.push(1));
        assert!(buf.push(2));
        assert!(buf.push(3));
        assert!(!buf.push(4));
        assert_eq!(buf.data(), &[1, 2, 3]);

        buf.clear();
        assert_eq!(buf.len(), 0);
    }
}
