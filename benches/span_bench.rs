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

//! Span throughput benchmark: a full-screen fill per iteration

use criterion::{criterion_group, criterion_main, Criterion};
use rdpx::{Rdp, RdpMemory};

fn fill_frame(c: &mut Criterion) {
    let mem = RdpMemory::new(0x20_0000).unwrap();
    let mut rdp = Rdp::new();

    // 320x240, 16-bit framebuffer at 0x4000
    let list: [u32; 12] = [
        (0x3f << 24) | (2 << 19) | 319,
        0x4000,
        0x2d00_0000,
        ((320u32 << 2) << 12) | (240 << 2),
        (0x2f << 24) | (3 << 20) | (3 << 6) | (3 << 4),
        0,
        0x3700_0000,
        0xFFFF_FFFF,
        (0x36 << 24) | ((320u32 << 2) << 12) | (240 << 2),
        0,
        0x2900_0000,
        0,
    ];
    for (i, w) in list.iter().enumerate() {
        mem.write_u32((i as u32) * 4, *w);
    }
    let end = (list.len() as u32) * 4;

    c.bench_function("fill_320x240", |b| {
        b.iter(|| {
            rdp.set_start(0);
            rdp.set_end(end);
            rdp.process_command_list(&mem).unwrap();
            rdp.take_full_sync();
        })
    });
}

criterion_group!(benches, fill_frame);
criterion_main!(benches);
