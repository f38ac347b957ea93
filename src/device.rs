//! Device module: execution targets and device selection.

use crate::config::ConfigError;
use crate::pipe::PipeError;
use std::fmt;
use thiserror::Error;

#[cfg(all(feature = "fpga_simulator", feature = "fpga_hardware"))]
compile_error!("features `fpga_simulator` and `fpga_hardware` are mutually exclusive");

/// Shown when no accelerator board can be reached.
pub const BOARD_HINT: &str =
    "when targeting hardware, make sure an accelerator board is installed and set up correctly";

/// Where kernels run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// CPU emulation of the kernel.
    Emulator,
    /// CPU execution with every pipe transaction traced.
    Simulator,
    /// A physical accelerator board.
    Hardware,
}

impl Target {
    /// Target chosen by the build's cargo features, emulator when none is set.
    pub const fn from_build() -> Self {
        if cfg!(feature = "fpga_hardware") {
            Target::Hardware
        } else if cfg!(feature = "fpga_simulator") {
            Target::Simulator
        } else {
            Target::Emulator
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::from_build()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Emulator => write!(f, "emulator"),
            Target::Simulator => write!(f, "simulator"),
            Target::Hardware => write!(f, "hardware"),
        }
    }
}

/// Device and runtime faults. Every variant is fatal to a run.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no {target} device available: {hint}")]
    NoDevice { target: Target, hint: &'static str },
    #[error("invalid run configuration")]
    Config(#[from] ConfigError),
    #[error("failed to launch kernel {kernel}")]
    Launch {
        kernel: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("kernel {kernel} faulted: {message}")]
    KernelFault {
        kernel: &'static str,
        message: String,
    },
    #[error("kernel {kernel} signaled {invariant} {signaled} times, expected once")]
    KernelContract {
        kernel: &'static str,
        invariant: &'static str,
        signaled: usize,
    },
    #[error("kernel {kernel} pipe transaction failed")]
    KernelPipe {
        kernel: &'static str,
        #[source]
        source: PipeError,
    },
    #[error("host pipe transaction failed")]
    HostPipe(#[from] PipeError),
}

/// A selected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    name: &'static str,
    target: Target,
}

impl Device {
    /// Selects the device for `target`.
    pub fn select(target: Target) -> Result<Self, DeviceError> {
        let name = match target {
            Target::Emulator => "csr-pipes CPU emulator",
            Target::Simulator => "csr-pipes cycle simulator",
            // No board backend is linked into this crate.
            Target::Hardware => {
                return Err(DeviceError::NoDevice {
                    target,
                    hint: BOARD_HINT,
                })
            }
        };
        log::info!("selected {} device: {}", target, name);
        Ok(Self { name, target })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Whether pipe transactions on this device are traced.
    pub fn traces_pipes(&self) -> bool {
        self.target == Target::Simulator
    }
}
