use csr_pipes::harness::{expected_sum, input_vectors};
use csr_pipes::invariant_rt::new_invariant_queue;
use csr_pipes::kernel::{IdPipeA, IdPipeB, IdPipeC, SimpleVAdd, SingleTask, VAddPorts};
use csr_pipes::pipe::{csr_pipe, stream_pipe};
use csr_pipes::{RunConfig, Target, VAddHarness};
use proptest::prelude::*;

fn run_kernel(a_vals: &[i32], b_vals: &[i32]) -> i32 {
    let (mut a_tx, a) = stream_pipe::<IdPipeA, i32>(a_vals.len());
    let (mut b_tx, b) = stream_pipe::<IdPipeB, i32>(b_vals.len());
    let (c, c_rx) = csr_pipe::<IdPipeC, i32>();
    for (&x, &y) in a_vals.iter().zip(b_vals) {
        a_tx.write(x).unwrap();
        b_tx.write(y).unwrap();
    }
    let (mut signals, _rx) = new_invariant_queue();
    SimpleVAdd { len: a_vals.len() }
        .run(VAddPorts { a, b, c }, &mut signals)
        .unwrap();
    c_rx.read().unwrap()
}

#[test]
fn count_256_expects_65536() {
    let (a, b) = input_vectors(256).unwrap();
    assert_eq!(expected_sum(&a, &b), 65536);
}

proptest! {
    #[test]
    fn closed_form_total_is_count_squared(count in 1usize..=2048) {
        let (a, b) = input_vectors(count).unwrap();
        prop_assert_eq!(expected_sum(&a, &b) as i64, (count * count) as i64);
        prop_assert!(a.iter().zip(&b).all(|(x, y)| x + y == count as i32));
    }

    #[test]
    fn kernel_matches_host_reference(
        pairs in prop::collection::vec((any::<i32>(), any::<i32>()), 0..256),
    ) {
        let (a, b): (Vec<i32>, Vec<i32>) = pairs.into_iter().unzip();
        prop_assert_eq!(run_kernel(&a, &b), expected_sum(&a, &b));
    }

    #[test]
    fn swapping_inputs_keeps_the_total(
        pairs in prop::collection::vec((-1000i32..1000, -1000i32..1000), 0..128),
    ) {
        let (a, b): (Vec<i32>, Vec<i32>) = pairs.into_iter().unzip();
        prop_assert_eq!(run_kernel(&a, &b), run_kernel(&b, &a));
    }

    #[test]
    fn harness_passes_for_any_valid_count(count in 0usize..512) {
        let config = RunConfig::with_count(count).target(Target::Emulator);
        let harness = VAddHarness::new(config).unwrap();
        let outcome = harness.run().unwrap();
        prop_assert!(outcome.passed);
        prop_assert_eq!(outcome.computed as i64, (count * count) as i64);
    }
}
