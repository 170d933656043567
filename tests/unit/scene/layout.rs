use super::*;

#[test]
fn every_variant_has_three_one_based_branches() {
    for variant in Variant::ALL {
        let layout = Layout::for_variant(variant);
        let ids: Vec<u8> = layout.branches().iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        for b in layout.branches() {
            assert_eq!(layout.node(b.service).kind, NodeKind::Service);
            assert_eq!(layout.node(b.silo).kind, NodeKind::Enrichment);
            assert_eq!(layout.edges()[b.inbound.0].owner, EdgeOwner::Inbound(b.id));
            assert_eq!(layout.edges()[b.outbound.0].owner, EdgeOwner::Outbound(b.id));
        }
    }
}

#[test]
fn pipeline_lengths_match_variants() {
    assert_eq!(Variant::Silo.pipeline().len(), 3);
    assert_eq!(Variant::Validation.pipeline().len(), 4);
    assert_eq!(Variant::Comet.pipeline().len(), 5);
    assert_eq!(Variant::Push.pipeline().len(), 5);
    assert_eq!(Variant::Push.pipeline()[4], Stage::Return);
}

#[test]
fn silo_variant_has_no_validation_or_return_loop() {
    let layout = Layout::for_variant(Variant::Silo);
    assert!(layout.validation().is_none());
    assert!(layout.return_loop().is_none());
    assert_eq!(layout.edges().len(), 7);
}

#[test]
fn return_loop_runs_from_validation_to_metadata() {
    let layout = Layout::for_variant(Variant::Comet);
    let lp = layout.return_loop().unwrap();
    let v = layout.center(layout.validation().unwrap());
    let m = layout.center(layout.metadata());
    for path in [ReturnPath::Top, ReturnPath::Bottom] {
        let start = lp.point_at(path, 0.0);
        let end = lp.point_at(path, 1.0);
        assert!((start - v).hypot() < 1e-9);
        assert!((end - m).hypot() < 1e-6);
    }
    assert!(lp.point_at(ReturnPath::Top, 0.5).y < v.y);
    assert!(lp.point_at(ReturnPath::Bottom, 0.5).y > v.y);
    assert!(lp.collision.is_none());
}

#[test]
fn push_collision_points_sit_on_the_loop() {
    let layout = Layout::for_variant(Variant::Push);
    assert_eq!(layout.canvas().height, 600);
    let lp = layout.return_loop().unwrap();
    let top = lp.collision_point(ReturnPath::Top).unwrap();
    let bottom = lp.collision_point(ReturnPath::Bottom).unwrap();
    assert!((lp.point_at(ReturnPath::Top, 1.0 / 3.0) - top).hypot() < 1e-9);
    assert!((lp.point_at(ReturnPath::Bottom, 1.0 / 3.0) - bottom).hypot() < 1e-9);
}

#[test]
fn variant_parses_case_insensitively() {
    assert_eq!("Comet".parse::<Variant>().unwrap(), Variant::Comet);
    assert_eq!(" push ".parse::<Variant>().unwrap(), Variant::Push);
    assert!("orbit".parse::<Variant>().is_err());
}
