use super::*;
use crate::foundation::core::Fps;

fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("enrichflow_png_{name}_{}", std::process::id()))
}

fn half_red(width: u32, height: u32) -> FrameRGBA {
    // premultiplied red at 50% alpha
    let data = [128u8, 0, 0, 128].repeat((width * height) as usize);
    FrameRGBA {
        width,
        height,
        data,
        premultiplied: true,
    }
}

#[test]
fn write_png_flattens_over_background() {
    let dir = scratch_dir("single");
    let path = dir.join("out.png");
    write_png(&path, &half_red(4, 3), [0, 0, 255, 255]).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 3));
    let px = img.get_pixel(1, 1).0;
    assert_eq!(px[3], 255);
    assert_eq!(px[0], 128);
    assert!((126..=128).contains(&px[2]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sequence_sink_names_frames_by_index() {
    let dir = scratch_dir("seq");
    let mut sink = PngSequenceSink::new(&dir, [255, 255, 255, 255]);
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::default(),
    })
    .unwrap();
    sink.push_frame(FrameIndex(0), &half_red(2, 2)).unwrap();
    sink.push_frame(FrameIndex(7), &half_red(2, 2)).unwrap();
    assert!(sink.push_frame(FrameIndex(7), &half_red(2, 2)).is_err());
    sink.end().unwrap();

    assert_eq!(sink.written(), 2);
    assert!(dir.join("frame_00000.png").is_file());
    assert!(dir.join("frame_00007.png").is_file());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sequence_sink_rejects_size_mismatch() {
    let dir = scratch_dir("mismatch");
    let mut sink = PngSequenceSink::new(&dir, [255, 255, 255, 255]);
    sink.begin(SinkConfig {
        width: 4,
        height: 4,
        fps: Fps::default(),
    })
    .unwrap();
    let err = sink.push_frame(FrameIndex(0), &half_red(2, 2)).unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
    let _ = std::fs::remove_dir_all(&dir);
}
