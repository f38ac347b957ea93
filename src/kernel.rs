//! Kernel definitions: single-task bodies and their pipe ports.

// IMPORTANT: kernel bodies run on the device thread. Do not call
// assert_invariant or any PPT logging here; signal through invariant_rt.

#![forbid(unsafe_code)]

use crate::invariant_rt::{
    signal_invariant, SignalTx, INV_ACCUMULATOR_RESET, INV_INPUT_A_DRAINED, INV_INPUT_B_DRAINED,
    INV_OUTPUT_WRITTEN,
};
use crate::pipe::{CsrWriter, PipeError, PipeReader};

crate::declare_pipes!(IdPipeA, IdPipeB, IdPipeC);

/// Streaming input A of the vector-add kernel.
pub type InputPipeA = PipeReader<IdPipeA>;
/// Streaming input B of the vector-add kernel.
pub type InputPipeB = PipeReader<IdPipeB>;
/// CSR output of the vector-add kernel.
pub type OutputPipeC = CsrWriter<IdPipeC>;

/// A kernel launched once per invocation.
///
/// The body owns its ports for the duration of the call and returns them to
/// nothing: whatever it did not consume is dropped with it.
pub trait SingleTask: Send + 'static {
    /// Name of the kernel, used for the worker thread and diagnostics.
    const NAME: &'static str;
    /// Pipe ends handed to the body.
    type Ports: Send + 'static;
    /// Runs the body to completion.
    fn run(self, ports: Self::Ports, signals: &mut SignalTx) -> Result<(), PipeError>;
}

/// Ports of [`SimpleVAdd`].
pub struct VAddPorts {
    pub a: InputPipeA,
    pub b: InputPipeB,
    pub c: OutputPipeC,
}

/// Sums `len` pairs read from pipes A and B and writes the total to C once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleVAdd {
    pub len: usize,
}

impl SingleTask for SimpleVAdd {
    const NAME: &'static str = "IdSimpleVAdd";
    type Ports = VAddPorts;

    fn run(self, ports: VAddPorts, signals: &mut SignalTx) -> Result<(), PipeError> {
        let VAddPorts { mut a, mut b, c } = ports;

        let mut sum_total: i32 = 0;
        signal_invariant(signals, INV_ACCUMULATOR_RESET);

        for _ in 0..self.len {
            let a_val = a.read()?;
            let b_val = b.read()?;
            sum_total = sum_total.wrapping_add(a_val.wrapping_add(b_val));
        }
        signal_invariant(signals, INV_INPUT_A_DRAINED);
        signal_invariant(signals, INV_INPUT_B_DRAINED);

        // The only write of this invocation; it does not wait for the host.
        c.write(sum_total);
        signal_invariant(signals, INV_OUTPUT_WRITTEN);
        Ok(())
    }
}
