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

//! RDP (Reality Display Processor) implementation
//!
//! This module implements the pixel pipeline of the RDP, the rasterizer
//! half of the Nintendo 64's RCP coprocessor. The RDP consumes a display
//! list of big-endian command words from shared memory and is responsible
//! for:
//!
//! - Decoding ~40 command opcodes (triangles, rectangles, state setters,
//!   texture loads, syncs)
//! - Rasterizing triangles and rectangles with sub-pixel coverage
//! - Sampling and filtering textures staged into the 4 KiB TMEM
//! - Combining, blending, and depth-testing every pixel bit-exactly
//! - Writing packed 16-bit or 32-bit pixels plus hidden coverage bits
//!
//! # Command stream
//!
//! Commands arrive through the `start`/`end` register pair, exactly like
//! the memory-mapped DP registers: the host writes words into RDRAM (or
//! DMEM when the XBUS flag is set), sets the range, and calls
//! [`Rdp::process_command_list`]. A command split across writes is
//! deferred, never guessed at; unknown opcodes are logged and skipped.
//!
//! # References
//!
//! - [RDP command summary](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)
//! - [N64 programming manual, RDP chapters](https://ultra64.ca/resources/documentation/)

pub mod color;
pub mod commands;
pub mod render;
pub mod state;
pub mod tables;
pub mod tmem;

#[cfg(test)]
mod tests;

use crate::core::error::{RdpError, Result};
use crate::core::memory::RdpMemory;
use color::Color;
use commands::COMMAND_LENGTH_WORDS;
use render::{Span, SpanAux};
use state::{CombineModes, DpStatus, MiscState, OtherModes, Rectangle, SpanBase, YuvFactors};
use tables::Tables;
use tmem::{TileDescriptor, Tmem};

/// Capacity of the command word buffer
const CMD_BUFFER_WORDS: usize = 0x1000;

/// Pipeline construction parameters
///
/// The span arena bounds how many scanlines one primitive may produce;
/// the walker clamps its working set to the scissor height, so the
/// default covers the full 1024-line address range with room to spare.
#[derive(Debug, Clone, Copy)]
pub struct RdpConfig {
    /// Worker threads used for span rendering (1 = render inline)
    pub workers: usize,
    /// Span-aux arena capacity, in spans
    pub span_capacity: usize,
}

impl Default for RdpConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            span_capacity: 2048,
        }
    }
}

/// The display processor
///
/// Owns all persistent rendering state plus the command buffer. The
/// shared memory image is passed in per call rather than owned, since it
/// belongs to the surrounding memory subsystem.
///
/// # Examples
///
/// ```
/// use rdpx::{Rdp, RdpMemory};
///
/// let mem = RdpMemory::new(0x100000).unwrap();
/// let mut rdp = Rdp::new();
///
/// // Set_Scissor to a 32x32 region, then Sync_Full
/// mem.write_u32(0x00, 0x2d00_0000);
/// mem.write_u32(0x04, (32 << 14) | (32 << 2));
/// mem.write_u32(0x08, 0x2900_0000);
/// mem.write_u32(0x0c, 0);
/// rdp.set_start(0);
/// rdp.set_end(0x10);
/// rdp.process_command_list(&mem).unwrap();
/// ```
pub struct Rdp {
    /// Image registers and primitive depth
    pub(crate) misc: MiscState,
    /// Mode flag word
    pub(crate) other_modes: OtherModes,
    /// Combiner mux selections
    pub(crate) combine: CombineModes,
    /// Scissor rectangle in pixels
    pub(crate) scissor: Rectangle,
    /// Per-span steps captured at triangle setup
    pub(crate) span_base: SpanBase,
    /// The eight tile descriptors
    pub(crate) tiles: [TileDescriptor; 8],
    /// Texture memory
    pub(crate) tmem: Tmem,
    /// Fill color register (two packed 16-bit pixels or one 32-bit)
    pub(crate) fill_color: u32,
    /// Blend color register
    pub(crate) blend_color: Color,
    /// Primitive color register
    pub(crate) prim_color: Color,
    /// Environment color register
    pub(crate) env_color: Color,
    /// Fog color register
    pub(crate) fog_color: Color,
    /// Chroma key scale
    pub(crate) key_scale: Color,
    /// Primitive alpha, broadcast
    pub(crate) prim_alpha: Color,
    /// Environment alpha, broadcast
    pub(crate) env_alpha: Color,
    /// Primitive LOD fraction, broadcast
    pub(crate) prim_lod_fraction: Color,
    /// YUV conversion factors
    pub(crate) yuv: YuvFactors,

    /// Buffered command words not yet executed
    pub(crate) cmd_data: Box<[u32]>,
    /// Words buffered so far
    cmd_ptr: usize,
    /// Next word to execute
    pub(crate) cmd_cur: usize,
    /// DP start register
    start: u32,
    /// DP end register
    end: u32,
    /// DP current register
    current: u32,
    /// DP status register
    status: DpStatus,
    /// Synthesized edge data for rectangle commands
    pub(crate) temp_rect_data: [u32; 44],
    /// A Sync_Full has completed and not yet been observed
    full_sync_pending: bool,

    /// Precomputed lookup tables
    pub(crate) tables: Tables,
    /// Construction parameters
    pub(crate) config: RdpConfig,
    /// Span records for the triangle being walked
    pub(crate) span_buf: Vec<Span>,
    /// Span-aux arena, fixed capacity
    pub(crate) aux_arena: Vec<SpanAux>,
}

impl Rdp {
    /// Create a pipeline with the default configuration
    pub fn new() -> Self {
        // The default configuration is always valid
        Self::with_config(RdpConfig::default()).expect("default RdpConfig must construct")
    }

    /// Create a pipeline with explicit worker/arena sizing
    ///
    /// # Errors
    ///
    /// [`RdpError::InvalidWorkerCount`] when `workers` is zero. The span
    /// arena is allocated here in full so capacity violations surface at
    /// the boundary, not mid-frame.
    pub fn with_config(config: RdpConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(RdpError::InvalidWorkerCount);
        }
        Ok(Self {
            misc: MiscState::default(),
            other_modes: OtherModes::default(),
            combine: CombineModes::default(),
            scissor: Rectangle::default(),
            span_base: SpanBase::default(),
            tiles: [TileDescriptor::default(); 8],
            tmem: Tmem::new(),
            fill_color: 0,
            blend_color: Color::ZERO,
            prim_color: Color::ZERO,
            env_color: Color::ZERO,
            fog_color: Color::ZERO,
            key_scale: Color::ZERO,
            prim_alpha: Color::ZERO,
            env_alpha: Color::ZERO,
            prim_lod_fraction: Color::ZERO,
            yuv: YuvFactors::default(),
            cmd_data: vec![0u32; CMD_BUFFER_WORDS].into_boxed_slice(),
            cmd_ptr: 0,
            cmd_cur: 0,
            start: 0,
            end: 0,
            current: 0,
            status: DpStatus::empty(),
            temp_rect_data: [0u32; 44],
            full_sync_pending: false,
            tables: Tables::new(),
            config,
            span_buf: vec![Span::default(); config.span_capacity],
            aux_arena: vec![SpanAux::default(); config.span_capacity],
        })
    }

    /// Reset all rendering state; table contents and sizing survive
    pub fn reset(&mut self) {
        self.misc = MiscState::default();
        self.other_modes = OtherModes::default();
        self.combine = CombineModes::default();
        self.scissor = Rectangle::default();
        self.span_base = SpanBase::default();
        self.tiles = [TileDescriptor::default(); 8];
        self.tmem = Tmem::new();
        self.fill_color = 0;
        self.blend_color = Color::ZERO;
        self.prim_color = Color::ZERO;
        self.env_color = Color::ZERO;
        self.fog_color = Color::ZERO;
        self.key_scale = Color::ZERO;
        self.prim_alpha = Color::ZERO;
        self.env_alpha = Color::ZERO;
        self.prim_lod_fraction = Color::ZERO;
        self.yuv = YuvFactors::default();
        self.cmd_ptr = 0;
        self.cmd_cur = 0;
        self.start = 0;
        self.end = 0;
        self.current = 0;
        self.status = DpStatus::empty();
        self.full_sync_pending = false;
    }

    /// Write the DP start register
    pub fn set_start(&mut self, addr: u32) {
        self.start = addr;
        self.current = addr;
    }

    /// Write the DP end register
    pub fn set_end(&mut self, addr: u32) {
        self.end = addr;
    }

    /// Current DP status register value
    pub fn status(&self) -> DpStatus {
        self.status
    }

    /// Replace the DP status register (XBUS / freeze control)
    pub fn set_status(&mut self, status: DpStatus) {
        self.status = status;
    }

    /// Observe and clear the Sync_Full notification
    ///
    /// Returns true once per completed Sync_Full; the presentation
    /// collaborator polls this to learn that every span of the frame has
    /// retired.
    pub fn take_full_sync(&mut self) -> bool {
        let pending = self.full_sync_pending;
        self.full_sync_pending = false;
        pending
    }

    /// Fetch one display-list word through the configured command source
    fn read_data(&self, mem: &RdpMemory, address: u32) -> u32 {
        if self.status.contains(DpStatus::XBUS_DMEM_DMA) {
            mem.dmem_read_u32(address & 0xfff)
        } else {
            mem.read_u32(address & 0xff_ffff)
        }
    }

    /// Consume the `current..end` command range
    ///
    /// Buffers incoming words and executes every complete command. A
    /// trailing command whose words have not all arrived yet stays
    /// buffered for the next call; this is the normal way hosts stream
    /// long display lists.
    ///
    /// # Errors
    ///
    /// Only fatal configuration violations (span arena exhaustion)
    /// surface here. Malformed commands and geometry never do.
    pub fn process_command_list(&mut self, mem: &RdpMemory) -> Result<()> {
        if self.status.contains(DpStatus::FREEZE) {
            return Ok(());
        }

        let length = self.end as i64 - self.current as i64;
        if length < 0 {
            self.current = self.end;
            return Ok(());
        }

        // Pull new words into the command buffer
        let mut offs = 0;
        while offs < length as u32 {
            if self.cmd_ptr >= CMD_BUFFER_WORDS {
                log::warn!("command buffer overflow, dropping trailing words");
                break;
            }
            self.cmd_data[self.cmd_ptr] = self.read_data(mem, (self.current & 0x1fff_ffff) + offs);
            self.cmd_ptr += 1;
            offs += 4;
        }
        self.current = self.end;

        while self.cmd_cur < self.cmd_ptr {
            let w1 = self.cmd_data[self.cmd_cur];
            let cmd = ((w1 >> 24) & 0x3f) as usize;
            let len = COMMAND_LENGTH_WORDS[cmd];

            if self.cmd_ptr - self.cmd_cur < len {
                // Starved: wait for the host to stream the rest
                return Ok(());
            }

            let w2 = self.cmd_data[self.cmd_cur + 1];
            log::trace!("cmd {:#04x}: {:08x} {:08x}", cmd, w1, w2);

            match cmd {
                0x00 => {} // No_Op

                0x08 => self.cmd_triangle(mem, false, false, false)?,
                0x09 => self.cmd_triangle(mem, false, false, true)?,
                0x0a => self.cmd_triangle(mem, false, true, false)?,
                0x0b => self.cmd_triangle(mem, false, true, true)?,
                0x0c => self.cmd_triangle(mem, true, false, false)?,
                0x0d => self.cmd_triangle(mem, true, false, true)?,
                0x0e => self.cmd_triangle(mem, true, true, false)?,
                0x0f => self.cmd_triangle(mem, true, true, true)?,

                0x24 => self.cmd_tex_rect(mem, false)?,
                0x25 => self.cmd_tex_rect(mem, true)?,

                // Load/pipe/tile syncs order hardware stages; spans here
                // always retire before the next command decodes
                0x26 | 0x27 | 0x28 => {}
                0x29 => self.full_sync_pending = true,

                0x2a => self.cmd_set_key_gb(w1, w2),
                0x2b => self.cmd_set_key_r(w1, w2),
                0x2c => self.cmd_set_convert(w1, w2),
                0x2d => self.cmd_set_scissor(w1, w2),
                0x2e => self.cmd_set_prim_depth(w1, w2),
                0x2f => self.cmd_set_other_modes(w1, w2),

                0x30 => self.cmd_load_tlut(w1, w2, mem),
                0x32 => self.cmd_set_tile_size(w1, w2),
                0x33 => self.cmd_load_block(w1, w2, mem),
                0x34 => self.cmd_load_tile(w1, w2, mem),
                0x35 => self.cmd_set_tile(w1, w2),

                0x36 => self.cmd_fill_rect(mem, w1, w2)?,
                0x37 => self.cmd_set_fill_color(w1, w2),
                0x38 => self.cmd_set_fog_color(w1, w2),
                0x39 => self.cmd_set_blend_color(w1, w2),
                0x3a => self.cmd_set_prim_color(w1, w2),
                0x3b => self.cmd_set_env_color(w1, w2),
                0x3c => self.cmd_set_combine(w1, w2),
                0x3d => self.cmd_set_texture_image(w1, w2),
                0x3e => self.cmd_set_mask_image(w1, w2),
                0x3f => self.cmd_set_color_image(w1, w2),

                other => {
                    log::warn!("unrecognized opcode {other:#04x}, skipping");
                }
            }

            self.cmd_cur += len;
        }

        self.cmd_ptr = 0;
        self.cmd_cur = 0;
        self.start = self.end;
        self.current = self.end;
        Ok(())
    }
}

impl Default for Rdp {
    fn default() -> Self {
        Self::new()
    }
}
