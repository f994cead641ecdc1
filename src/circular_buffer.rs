//! Circular buffer backing [`crate::stream`].
//!
//! Some SDR frameworks implement this with a double `mmap()` of a single
//! backing file so that a read or write always sees a contiguous slice, even
//! across the wraparound point. That trick needs `unsafe` and a temp file
//! per stream. Since nothing here needs the last drop of throughput, this
//! version gets the same external shape (a window you can read or write
//! contiguously) from a plain `VecDeque` and a couple of scratch `Vec`s
//! instead.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::stream::Tag;
use crate::Result;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

struct Inner<T> {
    data: VecDeque<T>,
    tags: Vec<Tag>,
}

/// Type-aware circular buffer shared between a [`crate::stream::WriteStream`]
/// and its [`crate::stream::ReadStream`].
pub struct Buffer<T> {
    id: usize,
    capacity: usize,
    lock: Mutex<Inner<T>>,
    cv: Condvar,
}

impl<T: Copy + Default> Buffer<T> {
    /// Create a new buffer that can hold up to `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            lock: Mutex::new(Inner {
                data: VecDeque::with_capacity(capacity.min(1 << 16)),
                tags: Vec::new(),
            }),
            cv: Condvar::new(),
        })
    }

    /// ID shared between the read and write side of a stream.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Total capacity of the buffer, in samples.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.capacity
    }

    /// Free space, in samples.
    #[must_use]
    pub fn free(&self) -> usize {
        let inner = self.lock.lock().unwrap();
        self.capacity.saturating_sub(inner.data.len())
    }

    /// True if there's nothing to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock.lock().unwrap().data.is_empty()
    }

    /// Wait until `need` samples are available to read, or a short timeout
    /// elapses. Returns the number actually available.
    #[must_use]
    pub fn wait_for_read(&self, need: usize) -> usize {
        let inner = self.lock.lock().unwrap();
        let (inner, _) = self
            .cv
            .wait_timeout_while(inner, std::time::Duration::from_millis(50), |i| {
                i.data.len() < need
            })
            .unwrap();
        inner.data.len()
    }

    /// Wait until `need` samples of space are free to write, or a short
    /// timeout elapses. Returns the number actually free.
    #[must_use]
    pub fn wait_for_write(&self, need: usize) -> usize {
        let inner = self.lock.lock().unwrap();
        let cap = self.capacity;
        let (inner, _) = self
            .cv
            .wait_timeout_while(inner, std::time::Duration::from_millis(50), |i| {
                cap.saturating_sub(i.data.len()) < need
            })
            .unwrap();
        cap.saturating_sub(inner.data.len())
    }

    /// Get a [`BufferReader`] over everything currently available, plus the
    /// tags in that window.
    pub fn read_buf(self: Arc<Self>) -> Result<(BufferReader<T>, Vec<Tag>)> {
        let tags = self.lock.lock()?.tags.clone();
        Ok((BufferReader { circ: self }, tags))
    }

    /// Get a [`BufferWriter`] with room for everything currently free.
    pub fn write_buf(self: Arc<Self>) -> Result<BufferWriter<T>> {
        let free = {
            let inner = self.lock.lock()?;
            self.capacity.saturating_sub(inner.data.len())
        };
        Ok(BufferWriter {
            circ: self,
            buf: vec![T::default(); free],
        })
    }
}

/// A read-only window into a [`Buffer`]. Nothing is actually removed from
/// the buffer until [`BufferReader::consume`] is called.
pub struct BufferReader<T> {
    circ: Arc<Buffer<T>>,
}

impl<T: Copy> BufferReader<T> {
    /// Number of samples available in this window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.circ.lock.lock().unwrap().data.len()
    }

    /// True if nothing is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the available samples.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.circ.lock.lock().unwrap().data.iter().copied().collect()
    }

    /// Iterate over the available samples.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    /// Mark the first `n` samples as consumed, removing them from the
    /// underlying buffer and rebasing any remaining tags.
    pub fn consume(&self, n: usize) {
        let mut inner = self.circ.lock.lock().unwrap();
        assert!(
            n <= inner.data.len(),
            "consume({n}) > available {}",
            inner.data.len()
        );
        inner.data.drain(..n);
        inner.tags.retain_mut(|t| {
            if t.pos() < n {
                false
            } else {
                t.set_pos(t.pos() - n);
                true
            }
        });
        drop(inner);
        self.circ.cv.notify_all();
    }
}

/// A writable scratch window that gets appended to a [`Buffer`] when
/// [`BufferWriter::produce`] is called.
pub struct BufferWriter<T> {
    circ: Arc<Buffer<T>>,
    buf: Vec<T>,
}

impl<T: Copy> BufferWriter<T> {
    /// Capacity of this window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if there's no room to write anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Mutable access to the scratch window.
    pub fn slice(&mut self) -> &mut [T] {
        &mut self.buf
    }

    /// Fill the start of the scratch window from a slice. Panics if `data`
    /// is longer than the window.
    pub fn fill_from_slice(&mut self, data: &[T]) {
        self.buf[..data.len()].copy_from_slice(data);
    }

    /// Commit the first `n` samples of the window (and `tags`, with
    /// positions relative to the start of this write) to the buffer.
    pub fn produce(&mut self, n: usize, tags: &[Tag]) {
        assert!(n <= self.buf.len(), "produce({n}) > window {}", self.buf.len());
        let mut inner = self.circ.lock.lock().unwrap();
        let base = inner.data.len();
        for t in tags {
            let mut t = t.clone();
            t.set_pos(base + t.pos());
            inner.tags.push(t);
        }
        inner.data.extend(self.buf.drain(..n));
        drop(inner);
        self.circ.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::TagValue;

    #[test]
    fn write_read_consume() {
        let b: Arc<Buffer<u8>> = Arc::new(Buffer::new(16).unwrap());
        assert!(b.clone().read_buf().unwrap().0.is_empty());
        {
            let mut w = b.clone().write_buf().unwrap();
            assert_eq!(w.len(), 16);
            w.slice()[0] = 123;
            w.produce(1, &[Tag::new(0, "x", TagValue::U64(7))]);
        }
        let (r, tags) = b.clone().read_buf().unwrap();
        assert_eq!(r.to_vec(), vec![123]);
        assert_eq!(tags, vec![Tag::new(0, "x", TagValue::U64(7))]);
        r.consume(1);
        assert!(b.clone().read_buf().unwrap().0.is_empty());
    }

    #[test]
    fn wraparound_like_behavior() {
        let b: Arc<Buffer<u8>> = Arc::new(Buffer::new(4096).unwrap());
        {
            let mut w = b.clone().write_buf().unwrap();
            let n = 4000;
            for i in 0..n {
                w.slice()[i] = (i & 0xff) as u8;
            }
            w.produce(n, &[]);
        }
        {
            let (r, _) = b.clone().read_buf().unwrap();
            assert_eq!(r.len(), 4000);
            r.consume(4000);
        }
        {
            let mut w = b.clone().write_buf().unwrap();
            let n = 100;
            for i in 0..n {
                w.slice()[i] = ((n - i) & 0xff) as u8;
            }
            w.produce(n, &[]);
        }
        let (r, _) = b.read_buf().unwrap();
        assert_eq!(r.len(), 100);
        assert_eq!(r.to_vec()[0], 100u8 & 0xff);
    }
}
