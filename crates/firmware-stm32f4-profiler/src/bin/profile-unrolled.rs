// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Unrolled-Increment target: straight-line increments, no branches.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use fi_profiler_core::UnrolledIncrement;
use firmware_stm32f4_profiler::{profile, start, COUNTER_FRAME};
use panic_halt as _;

const WORKLOAD: UnrolledIncrement<{ profile::UNROLLED_EXECUTIONS }> = UnrolledIncrement::new();

#[entry]
fn main() -> ! {
    start::<_, COUNTER_FRAME>(WORKLOAD)
}
