use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use framesequence::{
    Bitmap, Color8888, DecodeOptions, FrameSequence, GifSequence, HasParameters, LoopBehavior,
    Player, ReaderSource, Registry, Stream,
};

fn samples() -> Vec<(PathBuf, Vec<u8>)> {
    let mut samples = Vec::new();
    for entry in glob::glob("tests/samples/*.gif").unwrap() {
        let path = entry.unwrap();
        let mut data = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut data).unwrap();
        samples.push((path, data));
    }
    assert!(!samples.is_empty());
    samples
}

fn sample(name: &str) -> FrameSequence {
    let mut data = Vec::new();
    File::open(format!("tests/samples/{}", name))
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    FrameSequence::decode_bytes(&data).unwrap()
}

fn full_redraw(seq: &FrameSequence, frame: usize) -> Vec<Color8888> {
    let mut out = vec![0; seq.width() * seq.height()];
    seq.create_state()
        .draw_frame(frame, &mut out, seq.width(), None)
        .unwrap();
    out
}

#[test]
fn every_sample_decodes() {
    for (path, data) in samples() {
        let seq = FrameSequence::decode_bytes(&data).unwrap();
        assert!(seq.frame_count() > 0, "{:?}", path);
        assert!(seq.width() > 0 && seq.height() > 0, "{:?}", path);
    }
}

#[test]
fn bytes_and_reader_agree() {
    for (path, data) in samples() {
        let from_bytes = FrameSequence::decode_bytes(&data).unwrap();
        let mut stream = Stream::new(ReaderSource::with_chunk_size(&data[..], 7));
        let from_reader = Registry::default()
            .decode(&mut stream, &DecodeOptions::default())
            .unwrap();
        assert_eq!(from_bytes.frame_count(), from_reader.frame_count(), "{:?}", path);
        for i in 0..from_bytes.frame_count() {
            assert_eq!(full_redraw(&from_bytes, i), full_redraw(&from_reader, i), "{:?}", path);
        }
    }
}

#[test]
fn incremental_matches_full_redraw() {
    for (path, data) in samples() {
        let seq = FrameSequence::decode_bytes(&data).unwrap();
        let count = seq.frame_count();
        let stride = seq.width() + 3;
        let mut state = seq.create_state();
        let mut canvas = vec![0; stride * seq.height()];
        let mut previous = None;
        for step in 0..3 * count {
            let frame = step % count;
            state.draw_frame(frame, &mut canvas, stride, previous).unwrap();
            let expected = full_redraw(&seq, frame);
            for (y, row) in expected.chunks(seq.width()).enumerate() {
                assert_eq!(
                    &canvas[y * stride..y * stride + seq.width()],
                    row,
                    "{:?} frame {} row {}",
                    path,
                    frame,
                    y
                );
            }
            previous = Some(frame);
        }
    }
}

#[test]
fn skipping_frames_matches_full_redraw() {
    for (path, data) in samples() {
        let seq = FrameSequence::decode_bytes(&data).unwrap();
        let count = seq.frame_count();
        let mut state = seq.create_state();
        let mut canvas = vec![0; seq.width() * seq.height()];
        let mut previous = None;
        for frame in (0..count).step_by(2).chain((1..count).rev()) {
            state.draw_frame(frame, &mut canvas, seq.width(), previous).unwrap();
            assert_eq!(canvas, full_redraw(&seq, frame), "{:?} frame {}", path, frame);
            previous = Some(frame);
        }
    }
}

#[test]
fn drawing_is_deterministic() {
    for (_, data) in samples() {
        let first = FrameSequence::decode_bytes(&data).unwrap();
        let second = FrameSequence::decode_bytes(&data).unwrap();
        for i in 0..first.frame_count() {
            assert_eq!(full_redraw(&first, i), full_redraw(&second, i));
        }
    }
}

#[test]
fn sample_properties() {
    let bounce = sample("bounce.gif");
    assert_eq!(bounce.frame_count(), 7);
    assert_eq!(bounce.default_loop_count(), 0);
    assert_eq!((bounce.width(), bounce.height()), (24, 16));
    assert!(bounce.is_opaque());
    assert_eq!(bounce.duration_ms(), 80 + 60 + 70 + 80 + 90 + 100 + 100);

    let restore = sample("restore.gif");
    assert_eq!(restore.frame_count(), 7);
    assert_eq!(restore.default_loop_count(), 3);

    let still = sample("still.gif");
    assert_eq!(still.frame_count(), 1);
    assert_eq!(still.default_loop_count(), 1);
    assert_eq!(still.duration_ms(), 0);

    let offcanvas = sample("offcanvas.gif");
    assert!(!offcanvas.is_opaque());
}

#[test]
fn restore_chain_bookkeeping() {
    let mut data = Vec::new();
    File::open("tests/samples/restore.gif")
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    let seq = GifSequence::new(&mut Stream::from_bytes(&data), &DecodeOptions::default());
    // frames 1 and 2 restore to frame 0, frame 5 to frame 3
    assert_eq!(seq.restoring_frame(1), Some(0));
    assert_eq!(seq.restoring_frame(2), Some(0));
    assert_eq!(seq.restoring_frame(5), Some(3));
    assert!(seq.preserved_frame(0) && seq.preserved_frame(3));
    assert!(!seq.preserved_frame(4));
    assert_eq!(seq.frames()[6].extensions[0].bytes, b"hello".to_vec());
}

#[test]
fn local_palette_overrides_global() {
    let seq = sample("restore.gif");
    let frame = full_redraw(&seq, 2);
    // top left pixel of frame 2 is index 0 of its own table
    assert_eq!(framesequence::to_rgba(frame[0]), [10, 20, 30, 255]);
    assert_eq!(framesequence::to_rgba(frame[11 * 20 + 10]), [255, 0, 0, 255]);
}

#[test]
fn interlaced_frame_is_deinterlaced() {
    let seq = sample("bounce.gif");
    let last = full_redraw(&seq, 6);
    let cyan = framesequence::argb(0xff, 0, 255, 255);
    for x in 0..24 {
        assert_eq!(last[x], cyan);
        assert_eq!(last[15 * 24 + x], cyan);
    }
    for y in 0..16 {
        assert_eq!(last[y * 24], cyan);
        assert_eq!(last[y * 24 + 23], cyan);
    }
}

#[test]
fn off_canvas_parts_are_clipped() {
    let seq = sample("offcanvas.gif");
    let frame = full_redraw(&seq, 2);
    assert_eq!(frame.len(), 64);
    // frame 1 was cleared to transparent, frame 2 lies fully outside the canvas
    assert_eq!(frame[7 * 8 + 7], 0);
}

#[test]
fn player_runs_every_sample() {
    for (path, data) in samples() {
        let seq = FrameSequence::decode_bytes(&data).unwrap();
        let mut player = Player::new(&seq);
        player.set(LoopBehavior::Finite(2));
        assert_eq!(player.current_frame(), Some(0));
        let mut swaps = 0;
        while !player.is_finished() && swaps < 100 {
            let delay = player.decode_next().unwrap();
            assert!(delay >= framesequence::MIN_DELAY_MS, "{:?}", path);
            assert!(player.swap());
            swaps += 1;
            let mut expected = Bitmap::new(seq.width(), seq.height());
            let stride = expected.stride();
            let frame = player.current_frame().unwrap();
            seq.create_state()
                .draw_frame(frame, expected.pixels_mut(), stride, None)
                .unwrap();
            assert_eq!(player.front().to_rgba(), expected.to_rgba(), "{:?}", path);
        }
        assert!(player.is_finished(), "{:?}", path);
        assert_eq!(player.current_loop(), 2);
        assert_eq!(player.current_frame(), Some(seq.frame_count() - 1));
        assert!(swaps >= 2 * seq.frame_count() - 1, "{:?}", path);
    }
}
