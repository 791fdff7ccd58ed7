// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Deterministic operations run inside the trigger window.
//!
//! Every workload is fully determined by its compile-time parameters, so the
//! only thing that can change its result is the injected fault. Invalid
//! parameters are rejected during const evaluation when the workload type is
//! instantiated.

mod buffer_copy;
mod counted_loop;
mod unrolled;

pub use buffer_copy::{BufferCopy, BufferInit};
pub use counted_loop::CountedLoop;
pub use unrolled::{Executions, UnrolledCount, UnrolledIncrement};

use crate::encode_counter;

/// Diagnostic bytes attached to a fault response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic<'a> {
    /// Raw observed counter, see [`encode_counter`].
    Counter([u8; crate::COUNTER_PAYLOAD_LEN]),
    /// Complete post-operation memory image.
    Buffer(&'a [u8]),
}

impl Diagnostic<'_> {
    pub fn counter(value: u32) -> Self {
        Self::Counter(encode_counter(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Counter(bytes) => bytes,
            Self::Buffer(bytes) => bytes,
        }
    }
}

/// Result of the fault predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<'a> {
    Expected,
    Fault(Diagnostic<'a>),
}

/// One protected operation and its self-check.
///
/// The harness calls `prepare`, raises the trigger, calls `run`, lowers the
/// trigger and finally calls `evaluate`. `run` must not perform I/O, yield or
/// touch anything outside the workload's own state.
pub trait Workload {
    /// What `run` observed, handed back to `evaluate`.
    type Observed: Copy;

    /// Size of the diagnostic payload a fault response carries.
    const FAULT_PAYLOAD_LEN: usize;

    /// Restores the initial state. Runs outside the trigger window.
    fn prepare(&mut self) {}

    fn run(&mut self) -> Self::Observed;

    fn evaluate(&self, observed: Self::Observed) -> Verdict<'_>;
}

/// Expands `$body` ten times. Nest for higher powers of ten.
macro_rules! times_ten {
    ($($body:tt)*) => {
        $($body)* $($body)* $($body)* $($body)* $($body)*
        $($body)* $($body)* $($body)* $($body)* $($body)*
    };
}
pub(crate) use times_ten;
