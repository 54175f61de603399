//! # Result Queue
//!
//! FIFO of formatted result lines. Any number of queries push; the endpoint's
//! reader pops. A record is freed only by popping it (or by dropping the
//! queue). Pushes from one query keep their relative order; pushes from
//! concurrent queries may interleave.

use alloc::collections::VecDeque;
use alloc::string::String;
use core::fmt;
use kernel_sync::SpinLock;

/// One formatted line of output, including its trailing newline.
#[derive(Clone, PartialEq, Eq)]
pub struct ResultRecord {
    text: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("out of memory while building a result record")]
    OutOfMemory,
    #[error("failed to format a result record")]
    Format,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("next record needs {needed} bytes")]
    BufferTooSmall { needed: usize },
}

/// Counts the bytes a format would produce.
struct Measure(usize);

impl fmt::Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

impl ResultRecord {
    /// Format a record, allocating exactly once.
    ///
    /// # Errors
    /// [`QueueError::OutOfMemory`] if the text cannot be allocated,
    /// [`QueueError::Format`] if a formatting impl fails.
    pub fn format(args: fmt::Arguments<'_>) -> Result<Self, QueueError> {
        let mut measure = Measure(0);
        fmt::write(&mut measure, args).map_err(|_| QueueError::Format)?;

        let mut text = String::new();
        text.try_reserve_exact(measure.0)
            .map_err(|_| QueueError::OutOfMemory)?;
        fmt::write(&mut text, args).map_err(|_| QueueError::Format)?;
        Ok(Self { text })
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Debug for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.text, f)
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Lock-protected FIFO of [`ResultRecord`]s.
#[derive(Default)]
pub struct ResultQueue {
    records: SpinLock<VecDeque<ResultRecord>>,
}

impl ResultQueue {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: SpinLock::new(VecDeque::new()),
        }
    }

    /// Append `record` at the tail.
    ///
    /// # Errors
    /// [`QueueError::OutOfMemory`] if the queue cannot grow; the record is
    /// dropped.
    pub fn push(&self, record: ResultRecord) -> Result<(), QueueError> {
        let mut records = self.records.lock();
        records
            .try_reserve(1)
            .map_err(|_| QueueError::OutOfMemory)?;
        records.push_back(record);
        Ok(())
    }

    /// Format and append a record.
    ///
    /// The text is formatted before the lock is taken.
    ///
    /// # Errors
    /// See [`ResultRecord::format`] and [`push`](Self::push).
    pub fn push_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), QueueError> {
        self.push(ResultRecord::format(args)?)
    }

    /// Remove and return the head record.
    #[must_use]
    pub fn pop(&self) -> Option<ResultRecord> {
        self.records.lock().pop_front()
    }

    /// Remove and return the head record if it is at most `max` bytes long.
    ///
    /// # Errors
    /// [`ReadError::BufferTooSmall`] if the head is longer; it stays queued.
    pub fn pop_if_fits(&self, max: usize) -> Result<Option<ResultRecord>, ReadError> {
        let mut records = self.records.lock();
        match records.front() {
            None => Ok(None),
            Some(head) if head.len() > max => Err(ReadError::BufferTooSmall { needed: head.len() }),
            Some(_) => Ok(records.pop_front()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl fmt::Debug for ResultQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn line(n: usize) -> ResultRecord {
        ResultRecord::format(format_args!("record {n}\n")).unwrap()
    }

    #[test]
    fn format_produces_exact_text() {
        let r = ResultRecord::format(format_args!("VA start: 0x{:x}\n", 0xffff_a000_0000_0000_u64))
            .unwrap();
        assert_eq!(r.as_str(), "VA start: 0xffffa00000000000\n");
        assert_eq!(r.len(), r.as_bytes().len());
        assert_eq!(r.to_string(), r.as_str());
    }

    #[test]
    fn drains_in_insertion_order() {
        let q = ResultQueue::new();
        for n in 0..5 {
            q.push(line(n)).unwrap();
        }
        assert_eq!(q.len(), 5);
        for n in 0..5 {
            assert_eq!(q.pop(), Some(line(n)));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn draining_empty_queue_is_idempotent() {
        let q = ResultQueue::default();
        assert_eq!(q.pop(), None);
        assert_eq!(q.pop(), None);
        assert_eq!(q.pop_if_fits(4096), Ok(None));
    }

    #[test]
    fn oversized_head_stays_queued() {
        let q = ResultQueue::new();
        q.push_fmt(format_args!("0123456789\n")).unwrap();
        assert_eq!(q.pop_if_fits(4), Err(ReadError::BufferTooSmall { needed: 11 }));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_if_fits(11).unwrap().unwrap().as_str(), "0123456789\n");
        assert!(q.is_empty());
    }

    #[test]
    fn concurrent_producers_keep_their_own_order() {
        let q = Arc::new(ResultQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for n in 0..250 {
                        q.push_fmt(format_args!("{p} {n}\n")).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut next = [0usize; 4];
        while let Some(r) = q.pop() {
            let mut parts = r.as_str().trim_end().split(' ');
            let p: usize = parts.next().unwrap().parse().unwrap();
            let n: usize = parts.next().unwrap().parse().unwrap();
            assert_eq!(n, next[p]);
            next[p] += 1;
        }
        assert_eq!(next, [250; 4]);
    }
}
