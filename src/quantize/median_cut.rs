//! Median-cut palette construction over a color histogram
use std::collections::HashMap;

use crate::types::N_CHANNELS;

#[derive(Debug, Clone, Copy)]
struct Entry {
    color: [u8; 3],
    count: u32,
}

/// A run of histogram entries sharing one palette slot
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
}

impl ColorBox {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Reduces the sampled colors of `frames` to at most `max_colors` representatives.
pub(super) fn palette(frames: &[&[u8]], max_colors: usize, stride: usize) -> Vec<[u8; 3]> {
    let mut entries = histogram(frames, stride);
    let mut boxes = vec![ColorBox { start: 0, end: entries.len() }];

    while boxes.len() < max_colors {
        // Widest, most populated box first; the earliest box wins ties.
        let mut pick: Option<(usize, u64, usize)> = None;
        for (i, b) in boxes.iter().enumerate() {
            if b.len() < 2 {
                continue;
            }
            let slice = &entries[b.start..b.end];
            let (axis, range) = widest_axis(slice);
            let score = range as u64 * population(slice);
            if pick.map_or(true, |(_, best, _)| score > best) {
                pick = Some((i, score, axis));
            }
        }
        let (i, _, axis) = match pick {
            Some(pick) => pick,
            None => break,
        };
        let b = boxes[i];
        let slice = &mut entries[b.start..b.end];
        slice.sort_unstable_by_key(|e| (e.color[axis], e.color));
        let mid = b.start + median(slice);
        boxes[i] = ColorBox { start: b.start, end: mid };
        boxes.insert(i + 1, ColorBox { start: mid, end: b.end });
    }

    boxes.iter().map(|b| average(&entries[b.start..b.end])).collect()
}

/// Sampled color counts, sorted by color
fn histogram(frames: &[&[u8]], stride: usize) -> Vec<Entry> {
    let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
    for frame in frames {
        for px in frame.chunks_exact(N_CHANNELS).step_by(stride) {
            *counts.entry([px[0], px[1], px[2]]).or_insert(0) += 1;
        }
    }
    let mut entries: Vec<Entry> = counts.into_iter().map(|(color, count)| Entry { color, count }).collect();
    entries.sort_unstable_by_key(|e| e.color);
    entries
}

fn population(entries: &[Entry]) -> u64 {
    entries.iter().map(|e| e.count as u64).sum()
}

/// Channel with the largest value range. Ties resolve red, green, blue.
fn widest_axis(entries: &[Entry]) -> (usize, u8) {
    let mut lo = [u8::MAX; 3];
    let mut hi = [0u8; 3];
    for e in entries {
        for c in 0..3 {
            lo[c] = lo[c].min(e.color[c]);
            hi[c] = hi[c].max(e.color[c]);
        }
    }
    let mut best = (0, 0);
    for c in 0..3 {
        let range = hi[c] - lo[c];
        if range > best.1 {
            best = (c, range);
        }
    }
    best
}

/// Split offset where the running population reaches half, kept inside `1..len`.
fn median(entries: &[Entry]) -> usize {
    let half = population(entries).div_ceil(2);
    let mut acc = 0;
    let mut split = entries.len() - 1;
    for (i, e) in entries.iter().enumerate() {
        acc += e.count as u64;
        if acc >= half {
            split = i + 1;
            break;
        }
    }
    split.clamp(1, entries.len() - 1)
}

/// Population-weighted mean color
fn average(entries: &[Entry]) -> [u8; 3] {
    let total = population(entries);
    let mut sum = [0u64; 3];
    for e in entries {
        for c in 0..3 {
            sum[c] += e.color[c] as u64 * e.count as u64;
        }
    }
    let mut out = [0u8; 3];
    for c in 0..3 {
        out[c] = ((sum[c] + total / 2) / total) as u8;
    }
    out
}
