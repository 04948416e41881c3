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

//! Span rendering infrastructure
//!
//! The edge walker produces one [`Span`] plus one [`SpanAux`] scratch
//! record per scanline, and [`render_spans`] runs a span-draw routine over
//! them. Spans of one triangle have no data dependency on each other, so
//! they are distributed over a bounded pool of scoped worker threads.
//!
//! Everything a worker reads is captured by value in a [`RenderObject`]
//! before dispatch: triangle submission may race with reconfiguration for
//! the next triangle, so workers must never look at live `Rdp` state, and
//! the TMEM contents are cloned wholesale into the snapshot.

pub mod blend;
pub mod combine;
pub mod depth;
pub mod edges;
pub mod span;
pub mod texture;

use std::thread;

use crate::core::memory::RdpMemory;
use crate::core::rdp::color::Color;
use crate::core::rdp::state::{
    CombineModes, CycleType, MiscState, OtherModes, Rectangle, SpanBase, YuvFactors,
};
use crate::core::rdp::tables::{NoiseLfsr, Tables};
use crate::core::rdp::tmem::{TileDescriptor, Tmem};
use crate::core::rdp::Rdp;

/// Width of the per-span coverage array in pixels
pub const CVG_SPAN_WIDTH: usize = 1024;

/// Below this many spans the thread-spawn overhead is not worth paying
const PARALLEL_THRESHOLD: usize = 16;

/// One scanline's worth of a triangle
///
/// Interpolator start values are in the edge walker's fixed point (colors
/// and Z in 16.16 packed high/low form, texture in the same with the low
/// five bits masked).
#[derive(Debug, Clone, Copy, Default)]
pub struct Span {
    /// Framebuffer scanline
    pub scanline: i32,
    /// Span start pixel (major edge)
    pub startx: i32,
    /// Span stop pixel (minor edge), scissored
    pub stopx: i32,
    /// Right edge before scissoring; interpolation starts here
    pub unscissored_rx: i32,
    /// Red start value
    pub r: i32,
    /// Green start value
    pub g: i32,
    /// Blue start value
    pub b: i32,
    /// Alpha start value
    pub a: i32,
    /// Texture S start value
    pub s: i32,
    /// Texture T start value
    pub t: i32,
    /// Homogeneous W start value
    pub w: i32,
    /// Depth start value
    pub z: i32,
}

/// Per-span scratch state
///
/// Holds the coverage array the edge walker filled in plus every
/// intermediate color the pixel pipeline produces while walking the span.
/// These records live in a fixed arena owned by the pipeline; one triangle
/// may never need more of them than the arena holds.
#[derive(Debug, Clone)]
pub struct SpanAux {
    /// Per-pixel coverage masks, 4 bits per sub-scanline
    pub cvg: [u16; CVG_SPAN_WIDTH],
    /// Cycle-0 texel
    pub texel0: Color,
    /// Cycle-0 texel alpha, broadcast
    pub texel0_alpha: Color,
    /// Cycle-1 texel
    pub texel1: Color,
    /// Cycle-1 texel alpha, broadcast
    pub texel1_alpha: Color,
    /// Pipelined next-pixel texel
    pub next_texel: Color,
    /// Pipelined next-pixel texel alpha, broadcast
    pub next_texel_alpha: Color,
    /// First combiner stage output
    pub combined: Color,
    /// First combiner stage alpha, broadcast
    pub combined_alpha: Color,
    /// Interpolated shade color
    pub shade: Color,
    /// Shade alpha, broadcast
    pub shade_alpha: Color,
    /// Final combiner output entering the blender
    pub pixel_color: Color,
    /// Blender cycle-0 output
    pub blended_color: Color,
    /// Framebuffer color read back for blending
    pub memory_color: Color,
    /// Per-pixel noise operand
    pub noise_color: Color,
    /// Per-pixel LOD fraction, broadcast
    pub lod_fraction: Color,
    /// `0xff` minus the current blender 1b alpha
    pub inv_pixel_color_alpha: i32,
    /// Coverage of the incoming pixel (0-8)
    pub current_pix_cvg: u32,
    /// Coverage read back from memory (0-7)
    pub current_mem_cvg: u32,
    /// Coverage bit of the last sub-pixel sample
    pub current_cvg_bit: u32,
    /// Blend factor shift when pixel dz exceeds memory dz
    pub shift_a: i32,
    /// Blend factor shift when memory dz exceeds pixel dz
    pub shift_b: i32,
    /// Compressed per-pixel dz, stored alongside Z
    pub dzpix_enc: u32,
    /// Depth test verdict: blending allowed for this pixel
    pub blend_enable: bool,
    /// Coverage wrapped past full when merged with memory
    pub pre_wrap: bool,
    /// Perspective-divided S for the next pixel
    pub precomp_s: i32,
    /// Perspective-divided T for the next pixel
    pub precomp_t: i32,
    /// First pixel of the span not yet rendered
    pub start_span: bool,
    /// Deterministic noise source for this span
    pub noise: NoiseLfsr,
}

impl Default for SpanAux {
    fn default() -> Self {
        Self {
            cvg: [0u16; CVG_SPAN_WIDTH],
            texel0: Color::ZERO,
            texel0_alpha: Color::ZERO,
            texel1: Color::ZERO,
            texel1_alpha: Color::ZERO,
            next_texel: Color::ZERO,
            next_texel_alpha: Color::ZERO,
            combined: Color::ZERO,
            combined_alpha: Color::ZERO,
            shade: Color::ZERO,
            shade_alpha: Color::ZERO,
            pixel_color: Color::ZERO,
            blended_color: Color::ZERO,
            memory_color: Color::ZERO,
            noise_color: Color::ZERO,
            lod_fraction: Color::ZERO,
            inv_pixel_color_alpha: 0,
            current_pix_cvg: 0,
            current_mem_cvg: 0,
            current_cvg_bit: 0,
            shift_a: 0,
            shift_b: 0,
            dzpix_enc: 0,
            blend_enable: false,
            pre_wrap: false,
            precomp_s: 0,
            precomp_t: 0,
            start_span: true,
            noise: NoiseLfsr::new(1),
        }
    }
}

impl SpanAux {
    /// Re-arm this record for a new span
    ///
    /// The coverage array is deliberately not cleared here; the edge
    /// walker zeroes exactly the column range the span can touch.
    pub fn reset(&mut self, noise_seed: u32) {
        self.texel0 = Color::ZERO;
        self.texel1 = Color::ZERO;
        self.next_texel = Color::ZERO;
        self.combined = Color::ZERO;
        self.combined_alpha = Color::ZERO;
        self.lod_fraction = Color::ZERO;
        self.inv_pixel_color_alpha = 0;
        self.current_pix_cvg = 0;
        self.current_mem_cvg = 0;
        self.current_cvg_bit = 0;
        self.blend_enable = false;
        self.pre_wrap = false;
        self.precomp_s = 0;
        self.precomp_t = 0;
        self.start_span = true;
        self.noise = NoiseLfsr::new(noise_seed);
    }
}

/// Immutable per-triangle snapshot handed to span workers
///
/// Captured from the live rendering state at submission time. Workers
/// only ever read it.
#[derive(Clone)]
pub struct RenderObject {
    /// Image registers
    pub misc: MiscState,
    /// Mode flags
    pub other_modes: OtherModes,
    /// Per-span attribute steps
    pub span_base: SpanBase,
    /// Scissor rectangle
    pub scissor: Rectangle,
    /// Combiner selectors
    pub combine: CombineModes,
    /// Tile descriptors
    pub tiles: [TileDescriptor; 8],
    /// Tile referenced by the primitive
    pub tile_num: usize,
    /// Span walking direction
    pub flip: bool,
    /// Primitive came from a rectangle command
    pub rect: bool,
    /// Fill color register
    pub fill_color: u32,
    /// Blend color register
    pub blend_color: Color,
    /// Primitive color register
    pub prim_color: Color,
    /// Environment color register
    pub env_color: Color,
    /// Fog color register
    pub fog_color: Color,
    /// Key scale register
    pub key_scale: Color,
    /// Primitive alpha, broadcast
    pub prim_alpha: Color,
    /// Environment alpha, broadcast
    pub env_alpha: Color,
    /// Primitive LOD fraction, broadcast
    pub prim_lod_fraction: Color,
    /// YUV conversion factors
    pub yuv: YuvFactors,
    /// Texture memory snapshot
    pub tmem: Tmem,
    /// Per-tile S clamp limits, derived from the tile bounds
    pub clamp_s_diff: [i32; 8],
    /// Per-tile T clamp limits
    pub clamp_t_diff: [i32; 8],
}

impl RenderObject {
    /// Snapshot the live rendering state for one primitive
    pub fn snapshot(rdp: &Rdp, tile_num: usize, flip: bool, rect: bool) -> Self {
        let mut clamp_s_diff = [0i32; 8];
        let mut clamp_t_diff = [0i32; 8];
        for (i, tile) in rdp.tiles.iter().enumerate() {
            clamp_s_diff[i] = ((tile.sh >> 2) - (tile.sl >> 2)) & 0x3ff;
            clamp_t_diff[i] = ((tile.th >> 2) - (tile.tl >> 2)) & 0x3ff;
        }
        Self {
            misc: rdp.misc,
            other_modes: rdp.other_modes,
            span_base: rdp.span_base,
            scissor: rdp.scissor,
            combine: rdp.combine,
            tiles: rdp.tiles,
            tile_num,
            flip,
            rect,
            fill_color: rdp.fill_color,
            blend_color: rdp.blend_color,
            prim_color: rdp.prim_color,
            env_color: rdp.env_color,
            fog_color: rdp.fog_color,
            key_scale: rdp.key_scale,
            prim_alpha: rdp.prim_alpha,
            env_alpha: rdp.env_alpha,
            prim_lod_fraction: rdp.prim_lod_fraction,
            yuv: rdp.yuv,
            tmem: rdp.tmem.clone(),
            clamp_s_diff,
            clamp_t_diff,
        }
    }
}

/// Draw routine type shared by the four cycle modes
type SpanDrawFn = fn(&Span, &mut SpanAux, &RenderObject, &RdpMemory, &Tables);

/// Render a batch of spans, possibly in parallel
///
/// Each span owns a distinct scanline, so workers write disjoint pixels;
/// that invariant is what makes the shared-memory accessors sound. The
/// call joins all workers before returning, which is what gives
/// `Sync_Full` its "everything retired" meaning.
pub fn render_spans(
    object: &RenderObject,
    spans: &[Span],
    auxes: &mut [SpanAux],
    mem: &RdpMemory,
    tables: &Tables,
    workers: usize,
) {
    let draw: SpanDrawFn = match object.other_modes.cycle_type {
        CycleType::One => span::span_draw_1cycle,
        CycleType::Two => span::span_draw_2cycle,
        CycleType::Copy => span::span_draw_copy,
        CycleType::Fill => span::span_draw_fill,
    };

    if workers <= 1 || spans.len() < PARALLEL_THRESHOLD {
        for (s, aux) in spans.iter().zip(auxes.iter_mut()) {
            draw(s, aux, object, mem, tables);
        }
        return;
    }

    let chunk = spans.len().div_ceil(workers);
    thread::scope(|scope| {
        for (schunk, achunk) in spans.chunks(chunk).zip(auxes.chunks_mut(chunk)) {
            scope.spawn(move || {
                for (s, aux) in schunk.iter().zip(achunk.iter_mut()) {
                    draw(s, aux, object, mem, tables);
                }
            });
        }
    });
}
