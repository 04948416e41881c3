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

//! Depth subsystem
//!
//! Z is stored compressed: a 3-bit exponent selects one of eight precision
//! bands mapping the 18-bit linear depth into a 14-bit mantissa, with the
//! low two bits of the compressed per-pixel delta-Z ("dz") tucked into the
//! hidden bits beside the framebuffer's coverage. The comparison combines
//! a dz-derived tolerance with one of four policies: opaque,
//! interpenetrating (which eats into coverage as surfaces cross within
//! tolerance), decal, and additive coverage.
//!
//! The dz tolerance arithmetic reproduces hardware behavior that was
//! reverse engineered from test cases; it is a contract to match, not a
//! derivation.

use crate::core::memory::RdpMemory;
use crate::core::rdp::render::{RenderObject, SpanAux};
use crate::core::rdp::tables::Tables;

/// Decompress the stored Z under `zcurpixel` back to linear
#[inline(always)]
pub fn z_decompress(mem: &RdpMemory, tables: &Tables, zcurpixel: u32) -> u32 {
    tables.z_dec_table[((mem.read_u16_idx(zcurpixel) >> 2) & 0x3fff) as usize]
}

/// Reconstruct the stored dz from the depth word and hidden bits
#[inline(always)]
pub fn dz_decompress(mem: &RdpMemory, zcurpixel: u32, dzcurpixel: u32) -> u32 {
    let zval = mem.read_u16_idx(zcurpixel);
    let dzval = mem.hidden_read(dzcurpixel) as u32;
    let dz_compressed = (((zval & 3) as u32) << 2) | (dzval & 3);
    1 << dz_compressed
}

/// Compress a dz value to its 4-bit log2 encoding
#[inline(always)]
pub fn dz_compress(value: u32) -> u32 {
    let mut j = 0;
    let mut v = value;
    while v > 1 {
        j += 1;
        v >>= 1;
    }
    j
}

/// Store compressed Z and the dz encoding split across both regions
#[inline(always)]
pub fn z_store(
    mem: &RdpMemory,
    tables: &Tables,
    zcurpixel: u32,
    dzcurpixel: u32,
    z: u32,
    enc: u32,
) {
    let zval = tables.z_com_table[(z & 0x3ffff) as usize] | (enc >> 2) as u16;
    mem.write_u16_idx(zcurpixel, zval);
    mem.hidden_write(dzcurpixel, (enc & 3) as u8);
}

/// Depth test for one pixel
///
/// Beyond the pass/fail verdict this derives several blender inputs as a
/// side effect: the factor shifts from the dz comparison, the
/// blend-enable gate, the coverage-overflow flag, and (in interpenetrating
/// mode) a coverage reduction proportional to the Z overlap.
pub fn z_compare(
    mem: &RdpMemory,
    tables: &Tables,
    zcurpixel: u32,
    dzcurpixel: u32,
    sz: u32,
    dzpix: u16,
    aux: &mut SpanAux,
    object: &RenderObject,
) -> bool {
    let mut force_coplanar = false;
    let sz = sz & 0x3ffff;

    let (oz, mut dzmem, zval, rawdzmem);
    if object.other_modes.z_compare_en {
        oz = z_decompress(mem, tables, zcurpixel);
        dzmem = dz_decompress(mem, zcurpixel, dzcurpixel);
        zval = mem.read_u16_idx(zcurpixel);
        rawdzmem = (((zval & 3) as i32) << 2) | (mem.hidden_read(dzcurpixel) & 3) as i32;
    } else {
        oz = 0;
        dzmem = 1 << 0xf;
        zval = 0x3;
        rawdzmem = 0xf;
    }

    aux.dzpix_enc = dz_compress(dzpix as u32 & 0xffff);
    aux.shift_a = (aux.dzpix_enc as i32 - rawdzmem).clamp(0, 4);
    aux.shift_b = (rawdzmem - aux.dzpix_enc as i32).clamp(0, 4);

    let precision_factor = ((zval >> 13) & 0xf) as i32;
    if precision_factor < 3 {
        let dzmemmodifier = 16u32 >> precision_factor;
        if dzmem == 0x8000 {
            force_coplanar = true;
        }
        dzmem <<= 1;
        if dzmem <= dzmemmodifier {
            dzmem = dzmemmodifier;
        }
        if dzmem == 0 {
            dzmem = 0xffff;
        }
    }
    if dzmem > 0x8000 {
        dzmem = 0xffff;
    }

    let dznew = dzmem.max(dzpix as u32);
    let dznotshift = dznew;
    let dznew = dznew << 3;

    let mut farther = sz + dznew >= oz;
    let infront = sz < oz;

    if force_coplanar {
        farther = true;
    }

    let overflow = (aux.current_mem_cvg + aux.current_pix_cvg) & 8 != 0;
    aux.blend_enable = object.other_modes.force_blend
        || (!overflow && object.other_modes.antialias_en && farther);
    aux.pre_wrap = overflow;

    if object.other_modes.z_mode == 1 && infront && farther && overflow {
        let dzenc = dz_compress(dznotshift & 0xffff);
        let cvgcoeff = ((oz >> dzenc).wrapping_sub(sz >> dzenc)) & 0xf;
        aux.current_pix_cvg = (cvgcoeff * aux.current_pix_cvg) >> 3 & 0xf;
    }

    if !object.other_modes.z_compare_en {
        return true;
    }

    let diff = sz as i32 - dznew as i32;
    let mut nearer = diff <= oz as i32;
    let max = oz == 0x3ffff;
    if force_coplanar {
        nearer = true;
    }

    match object.other_modes.z_mode {
        0 | 1 => max || if overflow { infront } else { nearer },
        2 => infront || max,
        _ => farther && nearer && !max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dz_compress() {
        assert_eq!(dz_compress(1), 0);
        assert_eq!(dz_compress(2), 1);
        assert_eq!(dz_compress(0x8000), 15);
    }

    #[test]
    fn test_z_roundtrip_against_table() {
        // Decompressing a compressed Z must land exactly on the value the
        // precomputed decompression table defines; compression is lossy,
        // so this is the identity that actually holds.
        let mem = RdpMemory::new(0x10000).unwrap();
        let tables = Tables::new();
        for z in (0..0x40000u32).step_by(7) {
            z_store(&mem, &tables, 0, 0, z, 0);
            let stored = mem.read_u16_idx(0);
            let expected = tables.z_dec_table[((stored >> 2) & 0x3fff) as usize];
            assert_eq!(z_decompress(&mem, &tables, 0), expected);
        }
    }

    #[test]
    fn test_z_roundtrip_stays_in_band() {
        // Lossy compression must still keep the value within the band's
        // quantization step of the input.
        let tables = Tables::new();
        for z in (0..0x40000u32).step_by(13) {
            let stored = tables.z_com_table[z as usize];
            let dec = tables.z_dec_table[((stored >> 2) & 0x3fff) as usize];
            let err = (dec as i64 - z as i64).abs();
            assert!(err < 0x40, "z={z:#x} dec={dec:#x}");
        }
    }

    #[test]
    fn test_store_splits_enc() {
        let mem = RdpMemory::new(0x10000).unwrap();
        let tables = Tables::new();
        z_store(&mem, &tables, 4, 4, 0x1234, 0xb);
        // Top two bits of enc ride in the depth word, bottom two hide
        assert_eq!(mem.read_u16_idx(4) & 3, 0xb >> 2);
        assert_eq!(mem.hidden_read(4), 0xb & 3);
    }
}
