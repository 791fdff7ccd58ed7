// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#![no_std]

pub mod board;

/// Workload parameters generated from `profile.yaml` (or `$FI_PROFILE`).
pub mod profile {
    include!(concat!(env!("OUT_DIR"), "/profile.rs"));
}

use fi_profiler_core::{Harness, SimpleSerial, Workload, COUNTER_PAYLOAD_LEN};

/// Frame buffer for the counter workloads: payload plus checksum.
pub const COUNTER_FRAME: usize = COUNTER_PAYLOAD_LEN + 1;

/// Frame buffer for the buffer-copy workload.
pub const BUFFER_FRAME: usize = profile::BUFFER_SIZE + 1;

/// Brings up the board and serves start commands forever.
///
/// `N` sizes the channel buffers and must exceed the workload's fault
/// payload.
pub fn start<W: Workload, const N: usize>(workload: W) -> ! {
    const { assert!(N > W::FAULT_PAYLOAD_LEN, "frame buffer cannot hold the fault payload") };

    // Nothing may preempt the trigger window.
    cortex_m::interrupt::disable();

    let board = board::init(profile::BAUD);
    let channel = SimpleSerial::<_, N>::new(board.usart);
    Harness::with_indicator(channel, board.trigger, workload, board.leds).run()
}
