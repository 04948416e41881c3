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

//! rdpx: a software implementation of the Nintendo 64 RDP pixel pipeline
//!
//! This crate reproduces, pixel for pixel, the behavior of the Reality
//! Display Processor's rasterization pipeline when fed a display list
//! written into shared memory by a host CPU. It rasterizes triangles and
//! rectangles, samples and filters textures out of a 4 KiB texture memory,
//! blends against the existing framebuffer and compressed depth buffer, and
//! writes back packed pixel and coverage data in the hardware's exact bit
//! layout.
//!
//! # Architecture
//!
//! - [`core::rdp`]: command decoding, rendering state, and the full pixel
//!   pipeline (edge walker, texture unit, combiner, blender, depth)
//! - [`core::memory`]: the shared RDRAM image, hidden coverage bits, and
//!   the DMEM window the command stream can be fetched from
//!
//! # Example
//!
//! ```
//! use rdpx::{Rdp, RdpMemory};
//!
//! let mem = RdpMemory::new(1024 * 1024).unwrap();
//! let mut rdp = Rdp::new();
//!
//! // Write a Sync_Full command (opcode 0x29) at the start of RDRAM and
//! // run it through the command processor.
//! mem.write_u32(0x000, 0x2900_0000);
//! mem.write_u32(0x004, 0x0000_0000);
//! rdp.set_start(0x000);
//! rdp.set_end(0x008);
//! rdp.process_command_list(&mem).unwrap();
//! assert!(rdp.take_full_sync());
//! ```
//!
//! # Error handling
//!
//! All fallible operations return [`core::error::Result<T>`], an alias for
//! `Result<T, RdpError>`. Per-pixel and per-span conditions are never
//! errors; a malformed triangle skips, it does not abort the frame.

pub mod core;

// Re-export commonly used types
pub use crate::core::error::{RdpError, Result};
pub use crate::core::memory::RdpMemory;
pub use crate::core::rdp::{Rdp, RdpConfig};
