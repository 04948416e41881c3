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

//! Texture pipeline
//!
//! Per pixel: divide (S, T) by W through the reciprocal table (the
//! hardware approximates, it does not divide), shift and clamp/wrap/mirror
//! the result per the tile's descriptor, fetch up to four texels out of
//! the TMEM snapshot, and filter. Filtering is the RDP's three-tap
//! triangle interpolation, not a true four-tap bilinear; `mid_texel`
//! enables the exact-center four-tap average. Copy mode bypasses all of
//! it with a single unfiltered fetch.
//!
//! Out-of-range coordinates never fault: the per-axis wrap/mirror masks
//! and clamp limits fold every input into the tile.

use crate::core::rdp::color::Color;
use crate::core::rdp::render::{RenderObject, SpanAux};
use crate::core::rdp::tables::{sign16, sign_extend, Tables};
use crate::core::rdp::tmem::TileDescriptor;

/// Non-perspective coordinate path: pass S and T through
#[inline(always)]
pub fn tc_div_no_perspective(ss: i32, st: i32, _sw: i32) -> (i32, i32) {
    (sign16(ss) & 0x1ffff, sign16(st) & 0x1ffff)
}

/// Perspective division via the normalizer ROM
///
/// Returns 17-bit S and T with the over/under flags in bits 18/17; the
/// flags feed the clamp logic and the LOD clamp downstream.
pub fn tc_div(tables: &Tables, ss: i32, st: i32, sw: i32) -> (i32, i32) {
    let mut sw = sw;
    let w_carry = (sw & 0x8000 != 0) || (sw & 0x7fff == 0);
    sw &= 0x7fff;

    let mut shift = 1;
    while shift <= 14 && (sw << shift) & 0x8000 == 0 {
        shift += 1;
    }
    shift -= 1;

    let normout = ((sw << shift) & 0x3fff) as u32;
    let wnorm = ((normout & 0xff) << 2) as i32;
    let normout = (normout >> 8) as usize;

    let temppoint = tables.norm_point[normout] as i32;
    let tempslope = tables.norm_slope[normout] as i32;

    let tlu_rcp = ((-(tempslope * wnorm)) >> 10) + temppoint;

    let sprod = sign16(ss) * tlu_rcp;
    let tprod = sign16(st) * tlu_rcp;
    let tempmask = ((1 << (shift + 1)) - 1) << (29 - shift);
    let shift_value = 13 - shift;

    let outofbounds_s = sprod & tempmask;
    let outofbounds_t = tprod & tempmask;

    let (sss, sst) = if shift == 0xe {
        (sprod << 1, tprod << 1)
    } else {
        (sprod >> shift_value, tprod >> shift_value)
    };

    let mut under_s = 0;
    let mut under_t = 0;
    let mut over_s = 0;
    let mut over_t = 0;

    if outofbounds_s != tempmask && outofbounds_s != 0 {
        if sprod & (1 << 29) != 0 {
            under_s = 1;
        } else {
            over_s = 1;
        }
    }
    if outofbounds_t != tempmask && outofbounds_t != 0 {
        if tprod & (1 << 29) != 0 {
            under_t = 1;
        } else {
            over_t = 1;
        }
    }

    if w_carry {
        over_s = 1;
        over_t = 1;
    }

    (
        (sss & 0x1ffff) | (over_s << 18) | (under_s << 17),
        (sst & 0x1ffff) | (over_t << 18) | (under_t << 17),
    )
}

/// Apply the tile's coordinate shift; returns the shifted coordinate and
/// whether it passed the tile's high bound
#[inline(always)]
fn tc_shift(coord: i32, rshift: u32, lshift: u32, high_bound: i32) -> (i32, bool) {
    let mut c = sign_extend(coord, 17);
    if lshift > 0 {
        c <<= lshift;
        c = sign_extend(c & 0x1ffff, 17);
    } else {
        c >>= rshift;
    }
    let max = (c >> 3) >= high_bound;
    (c, max)
}

/// Clamp one tile-relative 10.5 coordinate to integer texel space
#[inline(always)]
fn tc_clamp(clamp: bool, clamp_diff: i32, coord: i32, frac: &mut i32, max: bool) -> i32 {
    if clamp {
        if coord < 0 {
            *frac = 0;
            0
        } else if max {
            *frac = 0;
            clamp_diff
        } else {
            coord >> 5
        }
    } else {
        coord >> 5
    }
}

/// Wrap or mirror one integer texel coordinate per the tile's mask
#[inline(always)]
fn tc_mask(tile_mask: u32, wrapped_mask: u32, mirror: bool, coord: i32) -> i32 {
    if tile_mask == 0 {
        return coord;
    }
    let maskbits = (1i32 << wrapped_mask) - 1;
    let mut c = coord;
    if mirror {
        let wrapped = (c >> tile_mask.min(31)) & 1 != 0;
        c &= maskbits;
        if wrapped {
            c = !c & maskbits;
        }
    } else {
        c &= maskbits;
    }
    c
}

/// Resolve a divided (S, T) pair into integer texel coordinates plus the
/// sub-texel fractions
#[allow(clippy::too_many_arguments)]
fn resolve_st(
    sss: i32,
    sst: i32,
    tile: &TileDescriptor,
    clamp_s_diff: i32,
    clamp_t_diff: i32,
) -> (i32, i32, i32, i32) {
    let (mut s, maxs) = tc_shift(sss, tile.rshift_s, tile.lshift_s, tile.sh);
    let (mut t, maxt) = tc_shift(sst, tile.rshift_t, tile.lshift_t, tile.th);

    // Relative to the tile origin, still in 10.5
    s -= tile.sl << 3;
    t -= tile.tl << 3;

    let mut sfrac = s & 0x1f;
    let mut tfrac = t & 0x1f;

    let si = tc_clamp(tile.clamp_s, clamp_s_diff, s, &mut sfrac, maxs);
    let ti = tc_clamp(tile.clamp_t, clamp_t_diff, t, &mut tfrac, maxt);

    (si, ti, sfrac, tfrac)
}

/// Sample one texture cycle
///
/// `bilinear` selects the hardware's three-tap triangle filter; otherwise
/// a single point sample is fetched. The `mid_texel` mode upgrades the
/// exact texel center to a four-tap average.
pub fn texture_cycle(
    sss: i32,
    sst: i32,
    tilenum: usize,
    bilinear: bool,
    object: &RenderObject,
    tables: &Tables,
) -> Color {
    let tile = &object.tiles[tilenum & 7];
    let (si, ti, sfrac, tfrac) = resolve_st(
        sss,
        sst,
        tile,
        object.clamp_s_diff[tilenum & 7],
        object.clamp_t_diff[tilenum & 7],
    );

    let en_tlut = object.other_modes.en_tlut;
    let tlut_type = object.other_modes.tlut_type;

    let mask = |c: i32, vertical: bool| -> i32 {
        if vertical {
            tc_mask(tile.mask_t, tile.wrapped_mask_t, tile.mt, c)
        } else {
            tc_mask(tile.mask_s, tile.wrapped_mask_s, tile.ms, c)
        }
    };

    if !bilinear {
        let s0 = mask(si, false);
        let t0 = mask(ti, true);
        return object
            .tmem
            .fetch(s0, t0, tile, en_tlut, tlut_type, &object.yuv, tables);
    }

    let s0 = mask(si, false);
    let s1 = mask(si + 1, false);
    let t0 = mask(ti, true);
    let t1 = mask(ti + 1, true);

    let tex00 = object
        .tmem
        .fetch(s0, t0, tile, en_tlut, tlut_type, &object.yuv, tables);
    let tex10 = object
        .tmem
        .fetch(s1, t0, tile, en_tlut, tlut_type, &object.yuv, tables);
    let tex01 = object
        .tmem
        .fetch(s0, t1, tile, en_tlut, tlut_type, &object.yuv, tables);
    let tex11 = object
        .tmem
        .fetch(s1, t1, tile, en_tlut, tlut_type, &object.yuv, tables);

    if object.other_modes.mid_texel && sfrac == 0x10 && tfrac == 0x10 {
        // Exact center: true four-tap average
        let avg = |a: i32, b: i32, c: i32, d: i32| (a + b + c + d + 2) >> 2;
        return Color::new(
            avg(tex00.r, tex10.r, tex01.r, tex11.r),
            avg(tex00.g, tex10.g, tex01.g, tex11.g),
            avg(tex00.b, tex10.b, tex01.b, tex11.b),
            avg(tex00.a, tex10.a, tex01.a, tex11.a),
        );
    }

    let upper = sfrac + tfrac >= 0x20;
    let lerp = |t0l: i32, t1l: i32, t2l: i32, t3l: i32| -> i32 {
        if upper {
            let invsf = 0x20 - sfrac;
            let invtf = 0x20 - tfrac;
            t3l + ((invsf * (t2l - t3l) + invtf * (t1l - t3l) + 0x10) >> 5)
        } else {
            t0l + ((sfrac * (t1l - t0l) + tfrac * (t2l - t0l) + 0x10) >> 5)
        }
    };

    Color::new(
        lerp(tex00.r, tex10.r, tex01.r, tex11.r),
        lerp(tex00.g, tex10.g, tex01.g, tex11.g),
        lerp(tex00.b, tex10.b, tex01.b, tex11.b),
        lerp(tex00.a, tex10.a, tex01.a, tex11.a),
    )
}

/// Copy-mode fetch: shift, wrap, and read one texel, no filtering
pub fn copy_fetch(
    sss: i32,
    sst: i32,
    tilenum: usize,
    object: &RenderObject,
    tables: &Tables,
) -> Color {
    let tile = &object.tiles[tilenum & 7];
    let (s, _) = tc_shift(sss & 0x1ffff, tile.rshift_s, tile.lshift_s, tile.sh);
    let (t, _) = tc_shift(sst & 0x1ffff, tile.rshift_t, tile.lshift_t, tile.th);
    let s = (s - (tile.sl << 3)) >> 5;
    let t = (t - (tile.tl << 3)) >> 5;
    let s = tc_mask(tile.mask_s, tile.wrapped_mask_s, tile.ms, s);
    let t = tc_mask(tile.mask_t, tile.wrapped_mask_t, tile.mt, t);
    object.tmem.fetch(
        s,
        t,
        tile,
        object.other_modes.en_tlut,
        object.other_modes.tlut_type,
        &object.yuv,
        tables,
    )
}

/// Distance metric between two 17-bit coordinates, folded to 15 bits
#[inline(always)]
fn coord_delta(curr: i32, next: i32) -> i32 {
    let mut d = sign_extend(next & 0x1ffff, 17) - sign_extend(curr & 0x1ffff, 17);
    if d & 0x20000 != 0 {
        d = !d & 0x1ffff;
    }
    d
}

/// Shared LOD math: clamp, magnification, level and fraction
fn lod_common(lod_in: i32, lodclamp: bool, object: &RenderObject) -> (u32, bool, bool, i32) {
    let mut lod = lod_in;
    if (lod & 0x4000 != 0) || lodclamp {
        lod = 0x7fff;
    } else if lod < object.misc.min_level as i32 {
        lod = object.misc.min_level as i32;
    }

    let magnify = lod < 32;
    let l_tile = log2_lod((lod >> 5) as u32 & 0xff);
    let distant = (lod & 0x6000 != 0) || l_tile >= object.misc.max_level;

    let fraction = if distant && !object.other_modes.sharpen_tex_en && !object.other_modes.detail_tex_en
    {
        0xff
    } else if magnify {
        0
    } else {
        ((lod << 3) >> l_tile) & 0xff
    };

    (l_tile, magnify, distant, fraction)
}

/// Integer log2 for the LOD level, zero below 2
fn log2_lod(v: u32) -> u32 {
    if v < 2 {
        return 0;
    }
    for i in (1..=7u32).rev() {
        if (v >> i) & 1 != 0 {
            return i;
        }
    }
    0
}

/// One-cycle LOD: pipeline the next pixel's division and derive the LOD
/// fraction from the coordinate step
#[allow(clippy::too_many_arguments)]
pub fn lod_1cycle(
    sss: &mut i32,
    sst: &mut i32,
    s: i32,
    t: i32,
    w: i32,
    dsinc: i32,
    dtinc: i32,
    dwinc: i32,
    aux: &mut SpanAux,
    object: &RenderObject,
    tables: &Tables,
) {
    let nextsw = sign16((w + dwinc) >> 16);
    let ns = sign16((s + dsinc) >> 16);
    let nt = sign16((t + dtinc) >> 16);
    let (nexts, nextt) = if object.other_modes.persp_tex_en {
        tc_div(tables, ns, nt, nextsw)
    } else {
        tc_div_no_perspective(ns, nt, nextsw)
    };
    aux.precomp_s = nexts;
    aux.precomp_t = nextt;

    if !object.other_modes.tex_lod_en {
        return;
    }

    let lodclamp = ((*sss | *sst | nexts | nextt) & 0x60000) != 0;
    let lod = coord_delta(*sss, nexts).max(coord_delta(*sst, nextt)) >> 3;
    let (_, _, _, fraction) = lod_common(lod & 0x7fff, lodclamp, object);
    aux.lod_fraction = Color::splat(fraction);
}

/// Two-cycle LOD: as [`lod_1cycle`] plus mip tile promotion
#[allow(clippy::too_many_arguments)]
pub fn lod_2cycle(
    sss: &mut i32,
    sst: &mut i32,
    s: i32,
    t: i32,
    w: i32,
    dsinc: i32,
    dtinc: i32,
    dwinc: i32,
    prim_tile: usize,
    tile1: &mut usize,
    tile2: &mut usize,
    aux: &mut SpanAux,
    object: &RenderObject,
    tables: &Tables,
) {
    let nextsw = sign16((w + dwinc) >> 16);
    let ns = sign16((s + dsinc) >> 16);
    let nt = sign16((t + dtinc) >> 16);
    let (nexts, nextt) = if object.other_modes.persp_tex_en {
        tc_div(tables, ns, nt, nextsw)
    } else {
        tc_div_no_perspective(ns, nt, nextsw)
    };
    aux.precomp_s = nexts;
    aux.precomp_t = nextt;

    if !object.other_modes.tex_lod_en {
        return;
    }

    let lodclamp = ((*sss | *sst | nexts | nextt) & 0x60000) != 0;
    let lod = coord_delta(*sss, nexts).max(coord_delta(*sst, nextt)) >> 3;
    let (l_tile, magnify, distant, fraction) = lod_common(lod & 0x7fff, lodclamp, object);
    aux.lod_fraction = Color::splat(fraction);

    let l_tile = if distant {
        object.misc.max_level as usize
    } else {
        l_tile as usize
    };

    if !object.other_modes.detail_tex_en {
        *tile1 = (prim_tile + l_tile) & 7;
        if !(distant || (!object.other_modes.sharpen_tex_en && magnify)) {
            *tile2 = (*tile1 + 1) & 7;
        } else {
            *tile2 = *tile1;
        }
    } else {
        *tile1 = if !magnify {
            (prim_tile + l_tile + 1) & 7
        } else {
            (prim_tile + 1) & 7
        };
        *tile2 = if !distant && !magnify {
            (prim_tile + l_tile + 2) & 7
        } else {
            (prim_tile + l_tile + 1) & 7
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_perspective_passthrough() {
        assert_eq!(tc_div_no_perspective(100, 200, 0x7fff), (100, 200));
        // Negative coordinates keep their 17-bit encoding
        let (s, _) = tc_div_no_perspective(-32, 0, 0);
        assert_eq!(s, (-32i32) & 0x1ffff);
    }

    #[test]
    fn test_perspective_matches_fast_path_at_unity() {
        // At unity W the reciprocal is exact, so the perspective path must
        // agree with the non-perspective path within its defined rounding.
        let tables = Tables::new();
        for coord in [0i32, 1, 7, 64, 100, 1000, 4000, 8000] {
            let (ps, pt) = tc_div(&tables, coord, coord / 2, 0x7fff);
            let (ns, nt) = tc_div_no_perspective(coord, coord / 2, 0x7fff);
            assert!(
                (ps - ns).abs() <= 4,
                "coord {coord}: perspective {ps} vs direct {ns}"
            );
            assert!((pt - nt).abs() <= 4);
        }
    }

    #[test]
    fn test_perspective_w_zero_flags_overflow() {
        let tables = Tables::new();
        let (s, t) = tc_div(&tables, 50, 50, 0);
        assert_ne!(s & (1 << 18), 0);
        assert_ne!(t & (1 << 18), 0);
    }

    #[test]
    fn test_mask_wraps_and_mirrors() {
        // mask 3 -> 8 texels
        assert_eq!(tc_mask(3, 3, false, 9), 1);
        // mirrored: second period runs backwards
        assert_eq!(tc_mask(3, 3, true, 8), 7);
        assert_eq!(tc_mask(3, 3, true, 9), 6);
        // no mask: untouched
        assert_eq!(tc_mask(0, 0, false, 1234), 1234);
    }

    #[test]
    fn test_clamp_pins_ends() {
        let mut frac = 5;
        // negative coordinate clamps to zero and kills the fraction
        assert_eq!(tc_clamp(true, 31, -10, &mut frac, false), 0);
        assert_eq!(frac, 0);
        let mut frac = 5;
        // past the high bound clamps to the tile extent
        assert_eq!(tc_clamp(true, 31, 4000, &mut frac, true), 31);
        assert_eq!(frac, 0);
        let mut frac = 5;
        // in range passes through, keeping the fraction
        assert_eq!(tc_clamp(true, 31, 0x40, &mut frac, false), 2);
        assert_eq!(frac, 5);
    }

    #[test]
    fn test_log2_lod() {
        assert_eq!(log2_lod(0), 0);
        assert_eq!(log2_lod(1), 0);
        assert_eq!(log2_lod(2), 1);
        assert_eq!(log2_lod(129), 7);
    }
}
