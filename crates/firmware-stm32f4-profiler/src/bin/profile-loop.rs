// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Counted-Loop target: OUTER x INNER volatile increments per cycle.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use fi_profiler_core::CountedLoop;
use firmware_stm32f4_profiler::{profile, start, COUNTER_FRAME};
use panic_halt as _;

type LoopWorkload = CountedLoop<{ profile::LOOP_OUTER }, { profile::LOOP_INNER }>;

const WORKLOAD: LoopWorkload = LoopWorkload::new();

#[entry]
fn main() -> ! {
    start::<_, COUNTER_FRAME>(WORKLOAD)
}
