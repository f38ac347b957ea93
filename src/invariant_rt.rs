//! Lock-free invariant signaling from a running kernel.
//!
//! Two tiers:
//! - **Kernel side**: pushes invariant IDs into an SPSC queue. No locks, no
//!   allocation, no formatting.
//! - **Host side**: drains the queue after the kernel finished and judges the
//!   contract.
//!
//! Kernel code **signals facts**. Host code **judges correctness**.
//!
//! # Example
//!
//! ```
//! use csr_pipes::invariant_rt::*;
//!
//! let (mut tx, mut rx) = new_invariant_queue();
//! signal_invariant(&mut tx, INV_OUTPUT_WRITTEN);
//! let signals = drain_invariant_signals(&mut rx);
//! contract_test_rt("output", &signals, &[INV_OUTPUT_WRITTEN]);
//! ```

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// Kernel-side invariant IDs
// ============================================================================

/// Accumulator was zeroed at invocation start.
pub const INV_ACCUMULATOR_RESET: u8 = 1;

/// The kernel performed all of its reads on input pipe A.
pub const INV_INPUT_A_DRAINED: u8 = 2;

/// The kernel performed all of its reads on input pipe B.
pub const INV_INPUT_B_DRAINED: u8 = 3;

/// The kernel wrote its CSR output.
pub const INV_OUTPUT_WRITTEN: u8 = 4;

/// Kernel body returned without error or panic.
pub const INV_KERNEL_CLEAN: u8 = 5;

// ============================================================================
// Signal queue
// ============================================================================

/// Capacity of the per-invocation signal queue.
pub const INVARIANT_QUEUE_CAPACITY: usize = 64;

/// Kernel-side end of the signal queue.
pub type SignalTx = Producer<u8>;

/// Host-side end of the signal queue.
pub type SignalRx = Consumer<u8>;

/// Creates a new signal queue pair: (kernel side, host side).
pub fn new_invariant_queue() -> (SignalTx, SignalRx) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals that an invariant held.
///
/// Never blocks: if the queue is full the signal is dropped.
#[inline]
pub fn signal_invariant(tx: &mut SignalTx, id: u8) {
    let _ = tx.push(id);
}

// ============================================================================
// Host-side verification
// ============================================================================

/// Drains every pending signal.
pub fn drain_invariant_signals(rx: &mut SignalRx) -> Vec<u8> {
    let mut signals = Vec::with_capacity(rx.slots());
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Asserts that each required invariant was signaled at least once.
///
/// # Panics
/// Panics naming the missing invariants.
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: Vec<&str> = signals
            .iter()
            .map(|&id| invariant_name(id))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        panic!(
            "Kernel contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps an invariant ID to its name (diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_ACCUMULATOR_RESET => "ACCUMULATOR_RESET",
        INV_INPUT_A_DRAINED => "INPUT_A_DRAINED",
        INV_INPUT_B_DRAINED => "INPUT_B_DRAINED",
        INV_OUTPUT_WRITTEN => "OUTPUT_WRITTEN",
        INV_KERNEL_CLEAN => "KERNEL_CLEAN",
        _ => "UNKNOWN",
    }
}
