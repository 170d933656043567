use super::*;

#[test]
fn fps_maps_frames_to_milliseconds() {
    let fps = Fps::new(50, 1).unwrap();
    assert_eq!(fps.frame_to_ms(FrameIndex(0)), 0.0);
    assert!((fps.frame_to_ms(FrameIndex(25)) - 500.0).abs() < 1e-9);
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn faded_scales_alpha_only() {
    let c = Rgba8::new(14, 121, 178, 180);
    assert_eq!(c.faded(0.5), Rgba8::new(14, 121, 178, 90));
    assert_eq!(c.faded(2.0), c);
    assert_eq!(c.faded(-1.0).a, 0);
}
