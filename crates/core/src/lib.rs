// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Target-side core of the fault-injection profiler.
//!
//! The crate is `no_std` and allocation free. It provides the SimpleSerial
//! style wire framing, the [`PacketChannel`] built on top of it, the
//! [`TriggerLine`] and [`StatusIndicator`] board seams, the three
//! deterministic workloads and the [`Harness`] state machine that ties them
//! together. Boards supply a [`SerialPort`] and a [`TriggerLine`]; everything
//! else is generic and statically dispatched.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

pub mod channel;
pub mod frame;
pub mod harness;
pub mod hooks;
pub mod trigger;
pub mod workload;

mod tests;

pub use channel::{ChannelError, PacketChannel, SerialPort, SimpleSerial, TransportError};
pub use frame::{Frame, FrameError};
pub use harness::{Harness, Outcome, State};
pub use hooks::{NoIndicator, StatusIndicator};
pub use trigger::TriggerLine;
pub use workload::{
    BufferCopy, BufferInit, CountedLoop, Diagnostic, UnrolledIncrement, Verdict, Workload,
};

/// Command bytes understood by the profiling protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Host -> target: run one workload cycle. Echoed back as the ack.
    Start = b's',
    /// Target -> host: workload finished with the expected result.
    End = b'e',
    /// Target -> host: workload diverged, payload carries diagnostics.
    Fault = b'f',
    /// Target -> host: reset marker body, sent once per boot.
    Reset = b'r',
}

impl Command {
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::Start),
            b'e' => Some(Self::End),
            b'f' => Some(Self::Fault),
            b'r' => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Width of the integer carried by counter fault payloads.
pub const COUNTER_PAYLOAD_LEN: usize = core::mem::size_of::<u32>();

/// Encodes an observed counter the way fault payloads carry it.
///
/// Always little-endian, independent of the target architecture, so host
/// tooling can decode it without knowing which core produced it.
pub const fn encode_counter(value: u32) -> [u8; COUNTER_PAYLOAD_LEN] {
    value.to_le_bytes()
}

/// Inverse of [`encode_counter`]. Returns `None` unless `payload` is exactly
/// [`COUNTER_PAYLOAD_LEN`] bytes.
pub fn decode_counter(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; COUNTER_PAYLOAD_LEN] = payload.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}
