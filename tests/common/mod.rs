#![allow(dead_code)]

use gifpipe::Frame;

/// Top-level structure of a GIF stream
#[derive(Debug, Default)]
pub struct Layout {
    pub global_table: Option<Vec<[u8; 3]>>,
    pub delays: Vec<u16>,
    pub loop_count: Option<u16>,
    pub images: usize,
    pub local_tables: Vec<usize>,
    pub min_code_sizes: Vec<u8>,
    pub comments: Vec<Vec<u8>>,
}

fn sub_blocks(bytes: &[u8], pos: &mut usize) -> Vec<u8> {
    let mut data = Vec::new();
    loop {
        let len = bytes[*pos] as usize;
        *pos += 1;
        if len == 0 {
            return data;
        }
        data.extend_from_slice(&bytes[*pos..*pos + len]);
        *pos += len;
    }
}

/// Walks the block structure, panicking on anything malformed.
pub fn layout(bytes: &[u8]) -> Layout {
    assert_eq!(&bytes[..6], b"GIF89a");
    let mut layout = Layout::default();
    let packed = bytes[10];
    let mut pos = 13;
    if packed & 0x80 != 0 {
        let n = 2usize << (packed & 7);
        let table = bytes[pos..pos + 3 * n].chunks(3).map(|c| [c[0], c[1], c[2]]).collect();
        layout.global_table = Some(table);
        pos += 3 * n;
    }
    loop {
        match bytes[pos] {
            0x21 => {
                let label = bytes[pos + 1];
                pos += 2;
                let data = sub_blocks(bytes, &mut pos);
                match label {
                    0xF9 => layout.delays.push(u16::from_le_bytes([data[1], data[2]])),
                    0xFF if &data[..11] == b"NETSCAPE2.0" => {
                        layout.loop_count = Some(u16::from_le_bytes([data[12], data[13]]))
                    }
                    0xFE => layout.comments.push(data),
                    _ => (),
                }
            }
            0x2C => {
                let flags = bytes[pos + 9];
                pos += 10;
                if flags & 0x80 != 0 {
                    let n = 2usize << (flags & 7);
                    layout.local_tables.push(n);
                    pos += 3 * n;
                }
                layout.min_code_sizes.push(bytes[pos]);
                pos += 1;
                sub_blocks(bytes, &mut pos);
                layout.images += 1;
            }
            0x3B => {
                assert_eq!(pos, bytes.len() - 1, "bytes after trailer");
                return layout;
            }
            b => panic!("unexpected block {:#04x} at offset {}", b, pos),
        }
    }
}

pub struct Decoded {
    pub delay: u16,
    pub rgba: Vec<u8>,
}

/// Decodes every frame to RGBA with the `gif` crate
pub fn decode(bytes: &[u8]) -> Vec<Decoded> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(bytes).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push(Decoded {
            delay: frame.delay,
            rgba: frame.buffer.to_vec(),
        });
    }
    frames
}

pub fn solid(w: u16, h: u16, rgb: [u8; 3]) -> Frame {
    let pixels = [rgb[0], rgb[1], rgb[2], 255].repeat(w as usize * h as usize);
    Frame::from_rgba(w, h, pixels).unwrap()
}

/// Smooth two-axis gradient with `seed` shifting the hue
pub fn gradient(w: u16, h: u16, seed: u8) -> Frame {
    let mut pixels = Vec::with_capacity(w as usize * h as usize * 4);
    for y in 0..h as u32 {
        for x in 0..w as u32 {
            pixels.extend_from_slice(&[
                (x * 255 / w as u32) as u8,
                (y * 255 / h as u32) as u8,
                ((x + y) as u8).wrapping_add(seed) / 2,
                255,
            ]);
        }
    }
    Frame::from_rgba(w, h, pixels).unwrap()
}

/// Deterministic noise, expensive to quantize and compress
pub fn noise(w: u16, h: u16, seed: u32) -> Frame {
    let mut x = seed.wrapping_mul(2_654_435_761).max(1);
    let pixels = (0..w as usize * h as usize * 4)
        .map(|i| {
            if i % 4 == 3 {
                return 255;
            }
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect();
    Frame::from_rgba(w, h, pixels).unwrap()
}

/// Largest per-channel difference and mean squared RGB error
pub fn color_error(expected: &[u8], actual: &[u8]) -> (u8, f64) {
    assert_eq!(expected.len(), actual.len());
    let mut max = 0u8;
    let mut total = 0u64;
    for (a, b) in expected.chunks(4).zip(actual.chunks(4)) {
        for c in 0..3 {
            let d = (a[c] as i32 - b[c] as i32).unsigned_abs();
            max = max.max(d as u8);
            total += (d * d) as u64;
        }
    }
    (max, total as f64 / (expected.len() / 4) as f64)
}
