use super::*;
use crate::foundation::core::Fps;
use crate::scene::layout::Variant;

fn sink_cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::default(),
    }
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("enrichflow_ffmpeg_{name}_{}", std::process::id()))
}

fn args(cmd: &Command) -> Vec<String> {
    cmd.get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn background_comes_from_config() {
    let cfg = SimConfig {
        background_rgba: [1, 2, 3, 255],
        ..SimConfig::default()
    };
    let sink = FfmpegSink::for_config(&cfg, "out.mp4");
    assert_eq!(sink.background, [1, 2, 3, 255]);
    assert!(sink.overwrite);
    assert_eq!(sink.out_path(), Path::new("out.mp4"));
}

#[test]
fn command_matches_canvas_and_rate() {
    let canvas = Variant::Push.canvas();
    let cmd = encoder_command(
        Path::new("clip.mp4"),
        &sink_cfg(canvas.width, canvas.height),
        false,
    );
    let a = args(&cmd);
    assert_eq!(a[0], "-n");
    let pos = |flag: &str| a.iter().position(|x| x == flag).unwrap();
    assert_eq!(a[pos("-s") + 1], "1400x600");
    assert_eq!(a[pos("-r") + 1], "60/1");
    assert!(pos("-r") < pos("-i"));
    assert!(a.contains(&"-an".to_string()));
    assert_eq!(a.last().unwrap(), "clip.mp4");
}

#[test]
fn frame_buffer_size_is_computed_in_usize() {
    assert_eq!(rgba_len(1400, 600), 1400 * 600 * 4);
    assert_eq!(rgba_len(65_536, 32_768), 1usize << 33);
}

#[test]
fn odd_dimensions_are_rejected_before_spawning() {
    let mut sink = FfmpegSink::for_config(&SimConfig::default(), scratch("odd").join("a.mp4"));
    let err = sink.begin(sink_cfg(15, 10)).unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
    assert!(sink.encoder.is_none());
}

#[test]
fn existing_output_is_kept_without_overwrite() {
    let dir = scratch("keep");
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("taken.mp4");
    std::fs::write(&out, b"old").unwrap();

    let mut sink = FfmpegSink::for_config(&SimConfig::default(), &out).overwrite(false);
    let err = sink.begin(sink_cfg(1400, 800)).unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
    assert_eq!(std::fs::read(&out).unwrap(), b"old");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn push_and_end_before_begin_fail() {
    let mut sink = FfmpegSink::for_config(&SimConfig::default(), scratch("early").join("a.mp4"));
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 16],
        premultiplied: true,
    };
    assert!(matches!(
        sink.push_frame(FrameIndex(0), &frame),
        Err(FlowError::Encode(_))
    ));
    assert!(matches!(sink.end(), Err(FlowError::Encode(_))));
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let dir = scratch("parent");
    let out = dir.join("a").join("b").join("out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(out.parent().unwrap().is_dir());
    ensure_parent_dir(Path::new("bare.mp4")).unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}
