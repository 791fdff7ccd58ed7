// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Branch-free increment sequences.
//!
//! The protected window is a straight run of single-increment instructions
//! on one register: no compare, no branch, no memory access. Sequences are
//! produced at compile time by repeated x10 expansion, which is why only
//! powers of ten from 10 to 10000 exist.

use super::{Diagnostic, Verdict, Workload};

mod sealed {
    pub trait Sealed {}
}

/// Type-level execution count.
#[derive(Debug, Clone, Copy)]
pub struct Executions<const N: u32>;

/// Execution counts that have a generated instruction sequence.
#[diagnostic::on_unimplemented(
    message = "{Self} has no unrolled increment sequence",
    note = "supported execution counts are 10, 100, 1000 and 10000"
)]
pub trait UnrolledCount: sealed::Sealed {
    const EXECUTIONS: u32;

    /// Zeroes a register, increments it `EXECUTIONS` times and returns it.
    fn increment() -> u32;
}

#[cfg(target_arch = "arm")]
mod imp {
    macro_rules! add_1 {
        () => {
            "add {acc}, {acc}, #1\n"
        };
    }

    macro_rules! add_10 {
        () => {
            concat!(
                add_1!(), add_1!(), add_1!(), add_1!(), add_1!(),
                add_1!(), add_1!(), add_1!(), add_1!(), add_1!()
            )
        };
    }

    macro_rules! add_100 {
        () => {
            concat!(
                add_10!(), add_10!(), add_10!(), add_10!(), add_10!(),
                add_10!(), add_10!(), add_10!(), add_10!(), add_10!()
            )
        };
    }

    macro_rules! add_1000 {
        () => {
            concat!(
                add_100!(), add_100!(), add_100!(), add_100!(), add_100!(),
                add_100!(), add_100!(), add_100!(), add_100!(), add_100!()
            )
        };
    }

    macro_rules! add_10000 {
        () => {
            concat!(
                add_1000!(), add_1000!(), add_1000!(), add_1000!(), add_1000!(),
                add_1000!(), add_1000!(), add_1000!(), add_1000!(), add_1000!()
            )
        };
    }

    macro_rules! unrolled {
        ($adds:ident) => {{
            let acc: u32;
            // SAFETY: only the output register is written; the stack and
            // flags are not touched. No `nomem`: the block must stay ordered
            // against the trigger stores around it.
            unsafe {
                core::arch::asm!(
                    "mov {acc}, #0",
                    $adds!(),
                    acc = out(reg) acc,
                    options(nostack, preserves_flags),
                );
            }
            acc
        }};
    }

    #[inline(always)]
    pub fn add_10() -> u32 {
        unrolled!(add_10)
    }

    #[inline(always)]
    pub fn add_100() -> u32 {
        unrolled!(add_100)
    }

    #[inline(always)]
    pub fn add_1000() -> u32 {
        unrolled!(add_1000)
    }

    #[inline(always)]
    pub fn add_10000() -> u32 {
        unrolled!(add_10000)
    }
}

// Host builds (tests, simulation) get the same straight-line shape in plain
// Rust; `black_box` keeps every increment from being folded.
#[cfg(not(target_arch = "arm"))]
mod imp {
    use crate::workload::times_ten;
    use core::hint::black_box;

    #[inline(always)]
    pub fn add_10() -> u32 {
        let mut acc = black_box(0u32);
        times_ten! { acc = black_box(acc).wrapping_add(1); }
        acc
    }

    #[inline(always)]
    pub fn add_100() -> u32 {
        let mut acc = black_box(0u32);
        times_ten! { times_ten! { acc = black_box(acc).wrapping_add(1); } }
        acc
    }

    #[inline(always)]
    pub fn add_1000() -> u32 {
        let mut acc = black_box(0u32);
        times_ten! { times_ten! { times_ten! { acc = black_box(acc).wrapping_add(1); } } }
        acc
    }

    #[inline(always)]
    pub fn add_10000() -> u32 {
        let mut acc = black_box(0u32);
        times_ten! { times_ten! { times_ten! { times_ten! {
            acc = black_box(acc).wrapping_add(1);
        } } } }
        acc
    }
}

macro_rules! supported_counts {
    ($($n:literal => $block:ident),* $(,)?) => {$(
        impl sealed::Sealed for Executions<$n> {}

        impl UnrolledCount for Executions<$n> {
            const EXECUTIONS: u32 = $n;

            #[inline(always)]
            fn increment() -> u32 {
                imp::$block()
            }
        }
    )*};
}

supported_counts! {
    10 => add_10,
    100 => add_100,
    1000 => add_1000,
    10000 => add_10000,
}

/// Increments a zeroed register `N` times without any control flow.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnrolledIncrement<const N: u32>;

impl<const N: u32> UnrolledIncrement<N>
where
    Executions<N>: UnrolledCount,
{
    pub const fn new() -> Self {
        Self
    }
}

impl<const N: u32> Workload for UnrolledIncrement<N>
where
    Executions<N>: UnrolledCount,
{
    type Observed = u32;

    const FAULT_PAYLOAD_LEN: usize = crate::COUNTER_PAYLOAD_LEN;

    #[inline(always)]
    fn run(&mut self) -> u32 {
        <Executions<N> as UnrolledCount>::increment()
    }

    fn evaluate(&self, observed: u32) -> Verdict<'_> {
        if observed == <Executions<N> as UnrolledCount>::EXECUTIONS {
            Verdict::Expected
        } else {
            Verdict::Fault(Diagnostic::counter(observed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_clean<const N: u32>() -> u32
    where
        Executions<N>: UnrolledCount,
    {
        let mut workload = UnrolledIncrement::<N>::new();
        let observed = workload.run();
        assert_eq!(workload.evaluate(observed), Verdict::Expected);
        observed
    }

    #[test]
    fn test_every_supported_count_runs_clean() {
        assert_eq!(run_clean::<10>(), 10);
        assert_eq!(run_clean::<100>(), 100);
        assert_eq!(run_clean::<1000>(), 1000);
        assert_eq!(run_clean::<10000>(), 10000);
    }

    #[test]
    fn test_divergent_register_is_reported_raw() {
        let workload = UnrolledIncrement::<100>::new();
        assert_eq!(
            workload.evaluate(99),
            Verdict::Fault(Diagnostic::Counter([99, 0, 0, 0]))
        );
        assert_eq!(
            workload.evaluate(0x0100_0064),
            Verdict::Fault(Diagnostic::Counter([0x64, 0x00, 0x00, 0x01]))
        );
    }
}
