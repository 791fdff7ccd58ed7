// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Buffer-Copy target: the whole destination goes back on a fault.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use fi_profiler_core::BufferCopy;
use firmware_stm32f4_profiler::{profile, start, BUFFER_FRAME};
use panic_halt as _;

const WORKLOAD: BufferCopy<{ profile::BUFFER_SIZE }> =
    BufferCopy::new(profile::BUFFER_SOURCE, profile::BUFFER_DESTINATION);

#[entry]
fn main() -> ! {
    start::<_, BUFFER_FRAME>(WORKLOAD)
}
