// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Output pin observed by the fault-injection instrument.
///
/// Implementations must be a single store to the port (no read-modify-write,
/// no waiting) so both edges land a fixed number of cycles from the
/// workload.
pub trait TriggerLine {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

impl<T: TriggerLine + ?Sized> TriggerLine for &mut T {
    #[inline(always)]
    fn set_high(&mut self) {
        (**self).set_high()
    }

    #[inline(always)]
    fn set_low(&mut self) {
        (**self).set_low()
    }
}
