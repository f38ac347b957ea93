use csr_pipes::invariant_rt::new_invariant_queue;
use csr_pipes::kernel::{IdPipeA, IdPipeB, IdPipeC, SimpleVAdd, SingleTask, VAddPorts};
use csr_pipes::pipe::{csr_pipe, stream_pipe};
use std::alloc::{GlobalAlloc, Layout};
use std::cell::Cell;

thread_local! {
    static ALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.with(|c| c.set(c.get() + 1));
        unsafe { std::alloc::System.alloc(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { std::alloc::System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

#[test]
fn kernel_body_does_not_allocate() {
    let count = 1024;
    let (mut a_tx, a) = stream_pipe::<IdPipeA, i32>(count);
    let (mut b_tx, b) = stream_pipe::<IdPipeB, i32>(count);
    let (c, c_rx) = csr_pipe::<IdPipeC, i32>();
    for i in 0..count as i32 {
        a_tx.write(i).unwrap();
        b_tx.write(count as i32 - i).unwrap();
    }
    let (mut signals, _signals_rx) = new_invariant_queue();
    let ports = VAddPorts { a, b, c };

    let before = ALLOC_COUNT.with(|c| c.get());
    SimpleVAdd { len: count }.run(ports, &mut signals).unwrap();
    let after = ALLOC_COUNT.with(|c| c.get());

    assert_eq!(after, before, "kernel body should not allocate");
    assert_eq!(c_rx.read(), Ok((count * count) as i32));
}
