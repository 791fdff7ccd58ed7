// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Optional status outputs (LEDs on most carrier boards).
///
/// Every method defaults to doing nothing, so a board only overrides what it
/// can show. The harness calls these after the response packet is sent,
/// never inside the trigger window.
pub trait StatusIndicator {
    /// Cycle finished with the expected result.
    fn ok(&mut self, _status: u32) {}

    /// Cycle finished with a divergent result.
    fn error(&mut self, _status: u32) {}
}

/// Board without status outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIndicator;

impl StatusIndicator for NoIndicator {}
