// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 rdpx developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for the pipeline
//!
//! Only configuration-level failures surface as errors. Everything that can
//! go wrong per pixel or per span (bad coverage, degenerate geometry,
//! out-of-range addresses) is handled as skip-this-pixel control flow so a
//! single bad triangle never aborts a frame.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, RdpError>;

/// Pipeline error type
///
/// These are fatal configuration violations, not runtime rendering
/// conditions. The command processor stops and reports them instead of
/// silently producing a wrong frame.
#[derive(Debug, Error)]
pub enum RdpError {
    /// A triangle needed more span-aux records than the arena holds.
    ///
    /// The arena capacity is fixed at construction; running out means the
    /// static sizing assumption was violated and rendering must halt
    /// rather than truncate the primitive.
    #[error("span aux arena exhausted: triangle needs {required} spans, arena holds {capacity}")]
    SpanPoolExhausted {
        /// Spans the current triangle requires
        required: usize,
        /// Configured arena capacity
        capacity: usize,
    },

    /// The RDRAM image is too small to be addressed by the pipeline.
    #[error("memory image too small: {size} bytes, minimum is {min}")]
    MemoryTooSmall {
        /// Requested size in bytes
        size: usize,
        /// Minimum accepted size in bytes
        min: usize,
    },

    /// Worker thread count of zero was requested.
    #[error("worker thread count must be at least 1")]
    InvalidWorkerCount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RdpError::SpanPoolExhausted {
            required: 5000,
            capacity: 4096,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000"));
        assert!(msg.contains("4096"));
    }
}
