//! Queue module: launching single-task kernels on a device.

use crate::device::{Device, DeviceError};
use crate::ids::PipeName;
use crate::invariant_rt::{
    drain_invariant_signals, new_invariant_queue, signal_invariant, SignalRx, INV_KERNEL_CLEAN,
};
use crate::kernel::SingleTask;
use crate::pipe::{self, CsrReader, CsrWriter, PipeReader, PipeWriter};
use log::{debug, info};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Work queue bound to one device.
#[derive(Debug)]
pub struct Queue {
    device: Device,
}

impl Queue {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Streaming pipe whose transactions follow the device's tracing mode.
    pub fn stream_pipe<Id: PipeName, T>(
        &self,
        capacity: usize,
    ) -> (PipeWriter<Id, T>, PipeReader<Id, T>) {
        pipe::stream_pipe_with(capacity, self.device.traces_pipes())
    }

    /// CSR pipe whose transactions follow the device's tracing mode.
    pub fn csr_pipe<Id: PipeName, T>(&self) -> (CsrWriter<Id, T>, CsrReader<Id, T>) {
        pipe::csr_pipe_with(self.device.traces_pipes())
    }

    /// Launches one invocation of `kernel` and returns its completion event.
    pub fn single_task<K: SingleTask>(
        &self,
        kernel: K,
        ports: K::Ports,
    ) -> Result<Event, DeviceError> {
        let (mut tx, rx) = new_invariant_queue();
        let started = Instant::now();
        let handle = thread::Builder::new()
            .name(K::NAME.to_string())
            .spawn(move || {
                // Contain panics so a faulting body surfaces as a device error.
                let result = catch_unwind(AssertUnwindSafe(|| kernel.run(ports, &mut tx)));
                match result {
                    Ok(Ok(())) => {
                        signal_invariant(&mut tx, INV_KERNEL_CLEAN);
                        Ok(())
                    }
                    Ok(Err(source)) => Err(DeviceError::KernelPipe {
                        kernel: K::NAME,
                        source,
                    }),
                    Err(payload) => Err(DeviceError::KernelFault {
                        kernel: K::NAME,
                        message: panic_message(payload.as_ref()),
                    }),
                }
            })
            .map_err(|source| DeviceError::Launch {
                kernel: K::NAME,
                source,
            })?;
        info!("launched {} on {}", K::NAME, self.device.name());
        Ok(Event {
            kernel: K::NAME,
            handle,
            signals: rx,
            started,
        })
    }
}

/// Completion handle of one kernel invocation.
#[must_use = "a launched kernel should be waited on"]
pub struct Event {
    kernel: &'static str,
    handle: JoinHandle<Result<(), DeviceError>>,
    signals: SignalRx,
    started: Instant,
}

/// What a finished invocation reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecStats {
    pub kernel: &'static str,
    pub elapsed: Duration,
    /// Invariant IDs signaled by the kernel, in order.
    pub signals: Vec<u8>,
}

impl Event {
    pub fn kernel(&self) -> &'static str {
        self.kernel
    }

    /// Blocks until the kernel finished.
    pub fn wait(self) -> Result<ExecStats, DeviceError> {
        let Event {
            kernel,
            handle,
            mut signals,
            started,
        } = self;
        let joined = handle.join().map_err(|payload| DeviceError::KernelFault {
            kernel,
            message: panic_message(payload.as_ref()),
        })?;
        let elapsed = started.elapsed();
        joined?;
        let signals = drain_invariant_signals(&mut signals);
        debug!("{} finished in {:?} ({} signals)", kernel, elapsed, signals.len());
        Ok(ExecStats {
            kernel,
            elapsed,
            signals,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
