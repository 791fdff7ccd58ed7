// LabWired FI Profiler - Fault-Injection Test Target
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Logging shims. They forward to `tracing` when the `tracing` feature is on
//! and compile to nothing on firmware builds.

macro_rules! log_trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::trace!($($arg)+);
        }
    }};
}

macro_rules! log_debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::debug!($($arg)+);
        }
    }};
}

macro_rules! log_warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::warn!($($arg)+);
        }
    }};
}
