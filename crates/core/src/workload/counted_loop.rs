// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::{Diagnostic, Verdict, Workload};

/// Increments a counter `OUTER * INNER` times in two nested loops.
///
/// The counter lives in memory and is read and written through volatile
/// accesses, so each increment is a real load/add/store. The two bounds tune
/// the window length independently.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountedLoop<const OUTER: u32, const INNER: u32>;

impl<const OUTER: u32, const INNER: u32> CountedLoop<OUTER, INNER> {
    /// Expected counter value. Fails const evaluation when the product does
    /// not fit the 32-bit payload.
    pub const TOTAL: u32 = match OUTER.checked_mul(INNER) {
        Some(total) if total > 0 => total,
        Some(_) => panic!("counted loop needs at least one iteration"),
        None => panic!("OUTER * INNER does not fit the 32-bit fault payload"),
    };

    pub const fn new() -> Self {
        let _ = Self::TOTAL;
        Self
    }
}

impl<const OUTER: u32, const INNER: u32> Workload for CountedLoop<OUTER, INNER> {
    type Observed = u32;

    const FAULT_PAYLOAD_LEN: usize = crate::COUNTER_PAYLOAD_LEN;

    #[inline(always)]
    fn run(&mut self) -> u32 {
        let mut counter: u32 = 0;
        let slot: *mut u32 = &mut counter;
        for _ in 0..OUTER {
            for _ in 0..INNER {
                // SAFETY: `slot` points at the local above for the whole loop.
                unsafe {
                    let value = core::ptr::read_volatile(slot);
                    core::ptr::write_volatile(slot, value.wrapping_add(1));
                }
            }
        }
        // SAFETY: as above.
        unsafe { core::ptr::read_volatile(slot) }
    }

    fn evaluate(&self, observed: u32) -> Verdict<'_> {
        if observed == Self::TOTAL {
            Verdict::Expected
        } else {
            Verdict::Fault(Diagnostic::counter(observed))
        }
    }
}
