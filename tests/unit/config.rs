use super::*;

#[test]
fn defaults_validate() {
    let cfg = SimConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.variant, Variant::Comet);
    assert_eq!(cfg.spawn_probability, 0.05);
    assert_eq!(cfg.particle_params().canvas_height, 800.0);
}

#[test]
fn missing_fields_take_defaults() {
    let cfg = SimConfig::from_json_str(r#"{ "variant": "push", "seed": 9 }"#).unwrap();
    assert_eq!(cfg.variant, Variant::Push);
    assert_eq!(cfg.seed, 9);
    assert_eq!(cfg.timings, FailureTimings::default());
    assert_eq!(cfg.particle_params().canvas_height, 600.0);
}

#[test]
fn nested_timings_merge_with_defaults() {
    let cfg = SimConfig::from_json_str(r#"{ "timings": { "fade_ms": 500 } }"#).unwrap();
    assert_eq!(cfg.timings.fade_ms, 500.0);
    assert_eq!(cfg.timings.restore_delay_ms, 2000.0);
}

#[test]
fn invalid_values_are_rejected() {
    let cases = [
        r#"{ "spawn_probability": 1.5 }"#,
        r#"{ "progress_step": 0 }"#,
        r#"{ "trail_spawn_rate": -0.1 }"#,
        r#"{ "fps": { "num": 0, "den": 1 } }"#,
        r#"{ "timings": { "interval_min_ms": 9000, "interval_max_ms": 1000 } }"#,
    ];
    for json in cases {
        let err = SimConfig::from_json_str(json).unwrap_err();
        assert!(
            matches!(err, FlowError::Validation(_)),
            "{json} gave {err}"
        );
    }
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = SimConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, FlowError::Serde(_)));
    let err = SimConfig::from_json_str(r#"{ "variant": "orbit" }"#).unwrap_err();
    assert!(matches!(err, FlowError::Serde(_)));
}

#[test]
fn json_round_trips() {
    let mut cfg = SimConfig::default();
    cfg.variant = Variant::Silo;
    cfg.icons_dir = Some("assets/icons".into());
    let text = cfg.to_json_pretty().unwrap();
    assert_eq!(SimConfig::from_json_str(&text).unwrap(), cfg);
}
