//! Pipe module: the two channel flavours a kernel talks through.
//!
//! Streaming pipes are bounded SPSC rings. The consumer suspends until data
//! shows up, and a full ring suspends the producer.
//!
//! CSR pipes model a memory-mapped status register written by the kernel and
//! polled by the host. A write never waits for the reader. Each end is consumed
//! by its single operation, so the exactly-once discipline is held by the type
//! system rather than by convention.

use crate::ids::PipeName;
use log::trace;
use rtrb::{Consumer, PopError, Producer, PushError, RingBuffer};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;
use tokio::sync::oneshot;

/// Spins before a waiting pipe end starts yielding its thread.
const SPIN_LIMIT: u32 = 64;

/// Errors raised by pipe transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipeError {
    /// Non-blocking write found the ring at capacity.
    #[error("pipe {pipe} is full")]
    Full { pipe: &'static str },
    /// The opposite end was dropped and no data is left to hand over.
    #[error("pipe {pipe} lost its peer")]
    Disconnected { pipe: &'static str },
    /// A CSR writer was dropped without ever writing.
    #[error("pipe {pipe} was never written")]
    NeverWritten { pipe: &'static str },
}

struct Wait {
    spins: u32,
}

impl Wait {
    fn new() -> Self {
        Self { spins: 0 }
    }

    fn snooze(&mut self) {
        if self.spins < SPIN_LIMIT {
            self.spins += 1;
            std::hint::spin_loop();
        } else {
            std::thread::yield_now();
        }
    }
}

/// Creates a streaming pipe able to hold `capacity` unread values.
pub fn stream_pipe<Id: PipeName, T>(
    capacity: usize,
) -> (PipeWriter<Id, T>, PipeReader<Id, T>) {
    stream_pipe_with(capacity, false)
}

pub(crate) fn stream_pipe_with<Id: PipeName, T>(
    capacity: usize,
    traced: bool,
) -> (PipeWriter<Id, T>, PipeReader<Id, T>) {
    // rtrb wants at least one slot; a zero-capacity pipe behaves like a
    // single-register handshake.
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    (
        PipeWriter {
            inner: producer,
            traced,
            _id: PhantomData,
        },
        PipeReader {
            inner: consumer,
            traced,
            _id: PhantomData,
        },
    )
}

/// Producer end of a streaming pipe.
pub struct PipeWriter<Id, T = i32> {
    inner: Producer<T>,
    traced: bool,
    _id: PhantomData<fn() -> Id>,
}

impl<Id: PipeName, T: fmt::Debug> PipeWriter<Id, T> {
    /// Appends one value, suspending while the ring is full.
    pub fn write(&mut self, value: T) -> Result<(), PipeError> {
        let mut value = value;
        let mut wait = Wait::new();
        loop {
            match self.inner.push(value) {
                Ok(()) => {
                    self.log_write();
                    return Ok(());
                }
                Err(PushError::Full(back)) => {
                    if self.inner.is_abandoned() {
                        return Err(PipeError::Disconnected { pipe: Id::NAME });
                    }
                    value = back;
                    wait.snooze();
                }
            }
        }
    }

    /// Appends one value if a slot is free.
    pub fn try_write(&mut self, value: T) -> Result<(), PipeError> {
        match self.inner.push(value) {
            Ok(()) => {
                self.log_write();
                Ok(())
            }
            Err(PushError::Full(_)) => Err(PipeError::Full { pipe: Id::NAME }),
        }
    }

    /// Free slots left in the ring.
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }

    fn log_write(&self) {
        if self.traced {
            trace!("{}: write ({} free)", Id::NAME, self.inner.slots());
        }
    }
}

/// Consumer end of a streaming pipe.
pub struct PipeReader<Id, T = i32> {
    inner: Consumer<T>,
    traced: bool,
    _id: PhantomData<fn() -> Id>,
}

impl<Id: PipeName, T: fmt::Debug> PipeReader<Id, T> {
    /// Removes the oldest value, suspending until one is available.
    ///
    /// A live producer that never writes keeps the caller suspended forever.
    /// Only a dropped producer with an empty ring ends the wait, as
    /// [`PipeError::Disconnected`].
    pub fn read(&mut self) -> Result<T, PipeError> {
        let mut wait = Wait::new();
        loop {
            match self.inner.pop() {
                Ok(value) => {
                    self.log_read(&value);
                    return Ok(value);
                }
                Err(PopError::Empty) => {
                    if self.inner.is_abandoned() {
                        // The producer may have pushed right before leaving.
                        return match self.inner.pop() {
                            Ok(value) => {
                                self.log_read(&value);
                                Ok(value)
                            }
                            Err(PopError::Empty) => {
                                Err(PipeError::Disconnected { pipe: Id::NAME })
                            }
                        };
                    }
                    wait.snooze();
                }
            }
        }
    }

    /// Removes the oldest value if there is one.
    pub fn try_read(&mut self) -> Option<T> {
        let value = self.inner.pop().ok()?;
        self.log_read(&value);
        Some(value)
    }

    /// Number of unread values.
    pub fn len(&self) -> usize {
        self.inner.slots()
    }

    /// Whether no value is waiting to be read.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn log_read(&self, value: &T) {
        if self.traced {
            trace!("{}: read {:?}", Id::NAME, value);
        }
    }
}

/// Creates a CSR pipe: one write, one read.
pub fn csr_pipe<Id: PipeName, T>() -> (CsrWriter<Id, T>, CsrReader<Id, T>) {
    csr_pipe_with(false)
}

pub(crate) fn csr_pipe_with<Id: PipeName, T>(
    traced: bool,
) -> (CsrWriter<Id, T>, CsrReader<Id, T>) {
    let (tx, rx) = oneshot::channel();
    (
        CsrWriter {
            inner: tx,
            traced,
            _id: PhantomData,
        },
        CsrReader {
            inner: rx,
            traced,
            _id: PhantomData,
        },
    )
}

/// Kernel-side end of a CSR pipe.
pub struct CsrWriter<Id, T = i32> {
    inner: oneshot::Sender<T>,
    traced: bool,
    _id: PhantomData<fn() -> Id>,
}

impl<Id: PipeName, T: fmt::Debug> CsrWriter<Id, T> {
    /// Publishes the value. Never blocks; a reader that is already gone
    /// simply misses the update.
    pub fn write(self, value: T) {
        if self.traced {
            trace!("{}: csr write {:?}", Id::NAME, value);
        }
        let _ = self.inner.send(value);
    }
}

/// Host-side end of a CSR pipe.
pub struct CsrReader<Id, T = i32> {
    inner: oneshot::Receiver<T>,
    traced: bool,
    _id: PhantomData<fn() -> Id>,
}

impl<Id: PipeName, T: fmt::Debug> CsrReader<Id, T> {
    /// Waits for the single value.
    ///
    /// Must not be called from inside an async runtime.
    pub fn read(self) -> Result<T, PipeError> {
        let value = self
            .inner
            .blocking_recv()
            .map_err(|_| PipeError::NeverWritten { pipe: Id::NAME })?;
        if self.traced {
            trace!("{}: csr read {:?}", Id::NAME, value);
        }
        Ok(value)
    }

    /// Takes the value if it has already been written.
    ///
    /// `Ok(None)` means the writer is still alive and has not written yet.
    pub fn try_read(&mut self) -> Result<Option<T>, PipeError> {
        match self.inner.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(PipeError::NeverWritten { pipe: Id::NAME })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    crate::declare_pipes!(IdIn, IdOut);

    #[test]
    fn stream_pipe_preserves_order() {
        let (mut tx, mut rx) = stream_pipe::<IdIn, i32>(8);
        for v in [3, 1, 4, 1, 5] {
            tx.write(v).unwrap();
        }
        assert_eq!(rx.len(), 5);
        let got: Vec<i32> = (0..5).map(|_| rx.read().unwrap()).collect();
        assert_eq!(got, vec![3, 1, 4, 1, 5]);
        assert!(rx.is_empty());
    }

    #[test]
    fn try_write_reports_full() {
        let (mut tx, _rx) = stream_pipe::<IdIn, i32>(2);
        tx.try_write(1).unwrap();
        tx.try_write(2).unwrap();
        assert_eq!(tx.slots(), 0);
        assert_eq!(tx.try_write(3), Err(PipeError::Full { pipe: "IdIn" }));
    }

    #[test]
    fn read_suspends_until_written() {
        let (mut tx, mut rx) = stream_pipe::<IdIn, i32>(1);
        let reader = thread::spawn(move || rx.read());
        thread::sleep(std::time::Duration::from_millis(20));
        tx.write(42).unwrap();
        assert_eq!(reader.join().unwrap(), Ok(42));
    }

    #[test]
    fn write_suspends_while_full() {
        let (mut tx, mut rx) = stream_pipe::<IdIn, i32>(1);
        tx.write(1).unwrap();
        let writer = thread::spawn(move || tx.write(2));
        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(rx.read(), Ok(1));
        assert_eq!(writer.join().unwrap(), Ok(()));
        assert_eq!(rx.read(), Ok(2));
    }

    #[test]
    fn dropped_writer_drains_then_disconnects() {
        let (mut tx, mut rx) = stream_pipe::<IdIn, i32>(4);
        tx.write(7).unwrap();
        drop(tx);
        assert_eq!(rx.read(), Ok(7));
        assert_eq!(rx.read(), Err(PipeError::Disconnected { pipe: "IdIn" }));
        assert_eq!(rx.try_read(), None);
    }

    #[test]
    fn zero_capacity_still_hands_over() {
        let (mut tx, mut rx) = stream_pipe::<IdIn, i32>(0);
        tx.write(9).unwrap();
        assert_eq!(rx.read(), Ok(9));
    }

    #[test]
    fn csr_write_then_read() {
        let (tx, rx) = csr_pipe::<IdOut, i32>();
        tx.write(65536);
        assert_eq!(rx.read(), Ok(65536));
    }

    #[test]
    fn csr_write_without_reader_does_not_block() {
        let (tx, rx) = csr_pipe::<IdOut, i32>();
        drop(rx);
        tx.write(1);
    }

    #[test]
    fn csr_missing_write_is_reported() {
        let (tx, mut rx) = csr_pipe::<IdOut, i32>();
        assert_eq!(rx.try_read(), Ok(None));
        drop(tx);
        assert_eq!(rx.try_read(), Err(PipeError::NeverWritten { pipe: "IdOut" }));
    }

    #[test]
    fn csr_read_waits_for_writer_thread() {
        let (tx, rx) = csr_pipe::<IdOut, i32>();
        let writer = thread::spawn(move || tx.write(-3));
        assert_eq!(rx.read(), Ok(-3));
        writer.join().unwrap();
    }
}
