//! A single-task vector-sum kernel wired to pipe interfaces.
//!
//! Two streaming pipes feed the kernel, which sums them pairwise and publishes
//! the total once through a CSR pipe. The host fills both inputs, launches the
//! kernel, waits, reads the one result back and checks it.

pub mod config;
pub mod device;
pub mod harness;
pub mod ids;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod kernel;
pub mod pipe;
pub mod queue;

pub use config::{ConfigError, RunConfig};
pub use device::{Device, DeviceError, Target};
pub use harness::{Outcome, VAddHarness};
pub use pipe::PipeError;
pub use queue::{Event, ExecStats, Queue};
