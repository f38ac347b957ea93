//! Vector-add harness: feed, launch, wait, read back, verify.

use crate::config::{ConfigError, RunConfig, MAX_COUNT};
use crate::device::{Device, DeviceError};
use crate::invariant_ppt::{
    assert_invariant, CONFIG_VALID, DEVICE_SELECTED, FEED_COMPLETE, KERNEL_CONTRACT,
    LAUNCH_SINGLE, OUTPUT_READ_ONCE, RESULT_VERIFIED,
};
use crate::invariant_rt::{
    count_invariant_signals, invariant_name, INV_ACCUMULATOR_RESET, INV_INPUT_A_DRAINED,
    INV_INPUT_B_DRAINED, INV_KERNEL_CLEAN, INV_OUTPUT_WRITTEN,
};
use crate::kernel::{IdPipeA, IdPipeB, IdPipeC, SimpleVAdd, SingleTask, VAddPorts};
use crate::queue::{ExecStats, Queue};
use log::{debug, warn};

/// Result of one verified run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Value read back from the output pipe.
    pub computed: i32,
    /// Total computed on the host.
    pub expected: i32,
    pub passed: bool,
    pub stats: ExecStats,
}

impl Outcome {
    /// Console lines reporting the verdict.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(2);
        if !self.passed {
            lines.push(format!(
                "result {}, expected ({})",
                self.computed, self.expected
            ));
        }
        lines.push(if self.passed { "PASSED" } else { "FAILED" }.to_string());
        lines
    }

    /// Process exit status: 0 when the result matched, 1 otherwise.
    pub fn exit_status(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// Input vectors `a[i] = i` and `b[i] = count - i`.
///
/// Counts above [`MAX_COUNT`] are rejected, their total would not fit `i32`.
pub fn input_vectors(count: usize) -> Result<(Vec<i32>, Vec<i32>), ConfigError> {
    if count > MAX_COUNT {
        return Err(ConfigError::CountTooLarge {
            count,
            max: MAX_COUNT,
        });
    }
    let n = count as i32;
    let a = (0..n).collect();
    let b = (0..n).map(|i| n - i).collect();
    Ok((a, b))
}

/// Host-side reference total of all pairs.
pub fn expected_sum(a: &[i32], b: &[i32]) -> i32 {
    a.iter()
        .zip(b)
        .fold(0i32, |acc, (&x, &y)| acc.wrapping_add(x.wrapping_add(y)))
}

/// Drives one vector-add invocation on a selected device.
#[derive(Debug)]
pub struct VAddHarness {
    queue: Queue,
    config: RunConfig,
}

impl VAddHarness {
    /// Validates `config` and selects its device.
    pub fn new(config: RunConfig) -> Result<Self, DeviceError> {
        config.validate()?;
        assert_invariant(CONFIG_VALID, true, "run configuration validated", None);
        let device = Device::select(config.target)?;
        assert_invariant(
            DEVICE_SELECTED,
            device.target() == config.target,
            "selected device matches requested target",
            Some(device.name()),
        );
        Ok(Self {
            queue: Queue::new(device),
            config,
        })
    }

    pub fn device(&self) -> &Device {
        self.queue.device()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs [`SimpleVAdd`], feeding `a` into pipe A and `b` into pipe B.
    pub fn run(&self) -> Result<Outcome, DeviceError> {
        self.run_with(SimpleVAdd { len: self.config.count }, false)
    }

    /// Same run with the vectors fed into the opposite pipes.
    pub fn run_swapped(&self) -> Result<Outcome, DeviceError> {
        self.run_with(SimpleVAdd { len: self.config.count }, true)
    }

    /// Feeds the inputs, launches `kernel` once and verifies its output.
    pub fn run_with<K>(&self, kernel: K, swapped: bool) -> Result<Outcome, DeviceError>
    where
        K: SingleTask<Ports = VAddPorts>,
    {
        let count = self.config.count;
        let (a, b) = input_vectors(count)?;
        let expected = expected_sum(&a, &b);
        let (first, second) = if swapped { (&b, &a) } else { (&a, &b) };

        let capacity = self.config.pipe_capacity;
        let (mut a_tx, a_rx) = self.queue.stream_pipe::<IdPipeA, i32>(capacity);
        let (mut b_tx, b_rx) = self.queue.stream_pipe::<IdPipeB, i32>(capacity);
        let (c_tx, c_rx) = self.queue.csr_pipe::<IdPipeC, i32>();

        // All input is in the pipes before the kernel starts.
        let mut fed = 0;
        for (&x, &y) in first.iter().zip(second.iter()) {
            a_tx.write(x)?;
            b_tx.write(y)?;
            fed += 1;
        }
        assert_invariant(
            FEED_COMPLETE,
            fed == count,
            "each input pipe holds exactly count values",
            None,
        );
        debug!("fed {} pairs (swapped: {})", fed, swapped);

        let ports = VAddPorts {
            a: a_rx,
            b: b_rx,
            c: c_tx,
        };
        let event = self.queue.single_task(kernel, ports)?;
        assert_invariant(LAUNCH_SINGLE, true, "kernel launched once", None);
        let stats = event.wait()?;

        // A kernel breaking its signal contract is a device fault, not a host bug.
        let counts = count_invariant_signals(&stats.signals);
        for id in [
            INV_ACCUMULATOR_RESET,
            INV_INPUT_A_DRAINED,
            INV_INPUT_B_DRAINED,
            INV_OUTPUT_WRITTEN,
            INV_KERNEL_CLEAN,
        ] {
            let signaled = counts[id as usize];
            if signaled != 1 {
                return Err(DeviceError::KernelContract {
                    kernel: K::NAME,
                    invariant: invariant_name(id),
                    signaled,
                });
            }
        }
        assert_invariant(KERNEL_CONTRACT, true, "kernel signaled its contract once", None);

        // Single read, matching the kernel's single write.
        let computed = c_rx.read()?;
        assert_invariant(OUTPUT_READ_ONCE, true, "output read once", None);

        let passed = computed == expected;
        if !passed {
            warn!("result {} does not match expected {}", computed, expected);
        }
        assert_invariant(RESULT_VERIFIED, true, "result compared with reference", None);

        Ok(Outcome {
            computed,
            expected,
            passed,
            stats,
        })
    }
}
