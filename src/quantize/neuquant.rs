use color_quant::NeuQuant;

use crate::types::N_CHANNELS;

/// Trains a NeuQuant network on all `frames`; `sample_factor` is clamped to the 1..=30 the network accepts.
pub(super) fn palette(frames: &[&[u8]], max_colors: usize, sample_factor: u8) -> Vec<[u8; 3]> {
    let len = frames.iter().map(|f| f.len()).sum();
    let mut pixels = Vec::with_capacity(len);
    for frame in frames {
        for px in frame.chunks_exact(N_CHANNELS) {
            // The network weighs alpha; frames are treated as opaque.
            pixels.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
        }
    }
    let nq = NeuQuant::new(sample_factor.clamp(1, 30) as i32, max_colors, &pixels);
    nq.color_map_rgb()
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}
