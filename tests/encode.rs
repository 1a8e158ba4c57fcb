mod common;

use gifpipe::{
    encode_frames, progress_channel, EncodingScheduler, ErrorKind, Frame, HasParameters, Options,
    PaletteMode, Quantizer, Repeat, Workers,
};

use common::{color_error, decode, gradient, layout, noise, solid};

fn options(palette_mode: PaletteMode, workers: usize) -> Options {
    Options {
        worker_count: workers,
        palette_mode,
        ..Options::default()
    }
}

#[test]
fn streams_are_well_formed() {
    for &mode in [PaletteMode::Global, PaletteMode::PerFrame].iter() {
        for workers in 1..4 {
            let frames = (0..5).map(|i| gradient(24, 16, i * 30).with_delay(4 + i as u16));
            let gif = encode_frames(frames, options(mode, workers)).unwrap();
            assert!(gif.starts_with(b"GIF89a"));
            assert_eq!(gif.last(), Some(&0x3B));
            let layout = layout(&gif);
            assert_eq!(layout.images, 5);
            assert_eq!(layout.delays, [4, 5, 6, 7, 8]);
            match mode {
                PaletteMode::Global => {
                    assert!(layout.global_table.is_some());
                    assert!(layout.local_tables.is_empty());
                }
                PaletteMode::PerFrame => {
                    assert!(layout.global_table.is_none());
                    assert_eq!(layout.local_tables.len(), 5);
                }
            }
        }
    }
}

#[test]
fn decodes_with_bounded_color_error() {
    let frames: Vec<Frame> = (0..4).map(|i| gradient(64, 64, i * 50).with_delay(7)).collect();
    // One table shared by four shifted gradients spans far more of the RGB
    // cube than a per-frame table does, so its cells are coarser.
    let bounds = [(PaletteMode::Global, 260.0), (PaletteMode::PerFrame, 200.0)];
    for &(mode, bound) in bounds.iter() {
        let gif = encode_frames(frames.clone(), options(mode, 2)).unwrap();
        let decoded = decode(&gif);
        assert_eq!(decoded.len(), frames.len());
        for (frame, out) in frames.iter().zip(decoded.iter()) {
            assert_eq!(out.delay, 7);
            let (max, mse) = color_error(frame.pixels(), &out.rgba);
            assert!(max <= 64, "{:?}: max channel error {}", mode, max);
            assert!(mse <= bound, "{:?}: mean squared error {}", mode, mse);
        }
    }
}

#[test]
fn neuquant_decodes_close_to_input() {
    let frames: Vec<Frame> = (0..2).map(|i| gradient(64, 64, i * 90)).collect();
    let opts = Options {
        quantizer: Quantizer::NeuQuant,
        quality: 1,
        ..Options::default()
    };
    let gif = encode_frames(frames.clone(), opts).unwrap();
    let decoded = decode(&gif);
    for (frame, out) in frames.iter().zip(decoded.iter()) {
        let (_, mse) = color_error(frame.pixels(), &out.rgba);
        assert!(mse <= 600.0, "mean squared error {}", mse);
    }
}

#[test]
fn identical_input_gives_identical_bytes() {
    let frames: Vec<Frame> = (0..6).map(|i| noise(32, 32, i)).collect();
    for &mode in [PaletteMode::Global, PaletteMode::PerFrame].iter() {
        let first = encode_frames(frames.clone(), options(mode, 1)).unwrap();
        let second = encode_frames(frames.clone(), options(mode, 4)).unwrap();
        let third = encode_frames(frames.clone(), options(mode, 4)).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }
}

#[test]
fn output_follows_submission_order() {
    // Noisy frames take far longer than solid ones, so workers finish out of order.
    let frames: Vec<Frame> = (0..12u32)
        .map(|i| {
            if i % 2 == 0 {
                noise(96, 96, i + 1)
            } else {
                solid(96, 96, [i as u8 * 20, 255 - i as u8 * 20, 128])
            }
        })
        .collect();
    let gif = encode_frames(frames.clone(), options(PaletteMode::PerFrame, 4)).unwrap();
    let decoded = decode(&gif);
    assert_eq!(decoded.len(), frames.len());
    for (i, out) in decoded.iter().enumerate() {
        let closest = frames
            .iter()
            .enumerate()
            .map(|(j, f)| (color_error(f.pixels(), &out.rgba).1, j))
            .fold((f64::MAX, usize::MAX), |best, cur| if cur.0 < best.0 { cur } else { best });
        assert_eq!(closest.1, i, "decoded frame {} resembles input {}", i, closest.1);
    }
}

#[test]
fn zero_frames_is_a_quantization_error() {
    let err = encode_frames(Vec::new(), Options::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Quantization);
}

#[test]
fn zero_delays_are_written_as_one() {
    let frames = vec![
        solid(6, 6, [1, 2, 3]).with_delay(0),
        solid(6, 6, [4, 5, 6]).with_delay_ms(0),
        solid(6, 6, [7, 8, 9]).with_delay_ms(4),
        solid(6, 6, [10, 11, 12]),
    ];
    assert!(frames.iter().all(|f| f.delay() >= 1));
    let gif = encode_frames(frames, Options::default()).unwrap();
    assert_eq!(layout(&gif).delays, [1, 1, 1, Frame::DEFAULT_DELAY]);
    assert!(decode(&gif).iter().all(|f| f.delay != 0));
}

#[test]
fn single_frame_loops_only_when_asked() {
    let frame = solid(10, 10, [9, 8, 7]);
    let looping = encode_frames(vec![frame.clone()], Options::default()).unwrap();
    let layout_looping = layout(&looping);
    assert_eq!(layout_looping.images, 1);
    assert_eq!(layout_looping.loop_count, Some(0));

    let once = Options {
        looping: false,
        ..Options::default()
    };
    let plain = encode_frames(vec![frame.clone()], once).unwrap();
    assert_eq!(layout(&plain).loop_count, None);
    assert!(!plain.windows(11).any(|w| w == b"NETSCAPE2.0"));

    let mut scheduler = EncodingScheduler::new();
    scheduler.set(Repeat::Finite(3));
    scheduler.submit_frame(frame).unwrap();
    let finite = scheduler.finish(gifpipe::NoProgress).wait().unwrap();
    assert_eq!(layout(&finite).loop_count, Some(3));
}

#[test]
fn full_palette_is_lossless() {
    let pixels: Vec<u8> = (0..=255u8).flat_map(|i| [i, 255 - i, i / 2, 255]).collect();
    let frame = Frame::from_rgba(16, 16, pixels).unwrap();
    for &mode in [PaletteMode::Global, PaletteMode::PerFrame].iter() {
        let gif = encode_frames(vec![frame.clone()], options(mode, 2)).unwrap();
        let layout = layout(&gif);
        assert_eq!(layout.min_code_sizes, [8]);
        assert_eq!(decode(&gif)[0].rgba, frame.pixels());
    }
}

#[test]
fn one_color_too_many_stays_close() {
    let mut pixels: Vec<u8> = (0..=255u8).flat_map(|i| [i, i, i, 255]).collect();
    pixels.extend_from_slice(&[255, 0, 0, 255]);
    let frame = Frame::from_rgba(257, 1, pixels).unwrap();
    let opts = Options {
        quality: 1,
        ..Options::default()
    };
    let gif = encode_frames(vec![frame.clone()], opts).unwrap();
    assert_eq!(layout(&gif).local_tables, [256]);
    let (max, _) = color_error(frame.pixels(), &decode(&gif)[0].rgba);
    assert!(max <= 32, "max channel error {}", max);
}

#[test]
fn red_green_blue_share_a_global_table() {
    let frames = [[255u8, 0, 0], [0, 255, 0], [0, 0, 255]]
        .iter()
        .map(|&rgb| Frame::from_rgb(10, 10, &rgb.repeat(100)).unwrap().with_delay(10));
    let gif = encode_frames(frames, options(PaletteMode::Global, 2)).unwrap();
    let layout = layout(&gif);
    let table = layout.global_table.unwrap();
    for color in [[255u8, 0, 0], [0, 255, 0], [0, 0, 255]].iter() {
        assert!(table.contains(color), "{:?} missing from {:?}", color, table);
    }
    assert_eq!(layout.delays, [10, 10, 10]);
    assert_eq!(layout.images, 3);
    assert!(layout.local_tables.is_empty());
    assert_eq!(layout.loop_count, Some(0));
    let decoded = decode(&gif);
    assert_eq!(&decoded[1].rgba[..4], &[0, 255, 0, 255]);
}

#[test]
fn progress_reaches_one() {
    let mut scheduler = EncodingScheduler::new();
    scheduler.set(Workers(3));
    for i in 0..5u32 {
        scheduler.submit_frame(noise(20, 20, i)).unwrap();
    }
    let (tx, rx) = progress_channel();
    scheduler.finish(tx).wait().unwrap();
    let seen: Vec<f32> = rx.try_iter().collect();
    assert_eq!(seen, [0.2, 0.4, 0.6, 0.8, 1.0]);
}

#[test]
fn comment_is_written() {
    let opts = Options {
        comment: Some("made by gifpipe".into()),
        ..Options::default()
    };
    let gif = encode_frames(vec![solid(4, 4, [1, 1, 1])], opts).unwrap();
    assert_eq!(layout(&gif).comments, [b"made by gifpipe".to_vec()]);
}

#[test]
fn options_from_json() {
    let opts: Options =
        serde_json::from_str(r#"{"workerCount": 3, "paletteMode": "global", "loop": false}"#).unwrap();
    let gif = encode_frames((0..3).map(|i| gradient(8, 8, i)), opts).unwrap();
    let layout = layout(&gif);
    assert!(layout.global_table.is_some());
    assert_eq!(layout.loop_count, None);
}
