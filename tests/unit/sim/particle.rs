use super::*;
use crate::scene::layout::Variant;
use crate::sim::failure::FailureTimings;
use rand::SeedableRng;
use rand::rngs::SmallRng;

struct Rig {
    layout: Layout,
    controller: FailureController,
    pool: TrailPool,
    params: ParticleParams,
    rng: SmallRng,
}

impl Rig {
    fn new(variant: Variant) -> Self {
        let mut rng = SmallRng::seed_from_u64(17);
        let layout = Layout::for_variant(variant);
        let controller = FailureController::new(FailureTimings::default(), &layout, &mut rng);
        Self {
            params: ParticleParams {
                canvas_height: f64::from(layout.canvas().height),
                ..ParticleParams::default()
            },
            layout,
            controller,
            pool: TrailPool::new(),
            rng,
        }
    }

    fn spawn(&mut self) -> Particle {
        Particle::spawn(&self.layout, &self.controller, &mut self.rng)
    }

    fn tick(&mut self, p: &mut Particle) -> Option<NodeId> {
        p.advance(
            &self.layout,
            &self.controller,
            &mut self.pool,
            &self.params,
            &mut self.rng,
        )
    }
}

#[test]
fn choose_target_avoids_exclusion_when_possible() {
    let mut rng = SmallRng::seed_from_u64(1);
    let all = [BranchId(1), BranchId(2), BranchId(3)];
    for _ in 0..100 {
        let t = choose_target(&all, Some(BranchId(2)), &mut rng).unwrap();
        assert_ne!(t, BranchId(2));
    }
    assert_eq!(
        choose_target(&[BranchId(2)], Some(BranchId(2)), &mut rng),
        Some(BranchId(2))
    );
    assert_eq!(choose_target(&[], None, &mut rng), None);
}

#[test]
fn spawn_starts_at_depositor_with_active_target() {
    let mut rig = Rig::new(Variant::Comet);
    rig.controller.force_failure(BranchId(1), 0.0);
    for _ in 0..50 {
        let p = rig.spawn();
        assert_eq!(p.position(), rig.layout.center(rig.layout.depositor()));
        assert_eq!(p.stage(), 0);
        assert_eq!(p.progress(), 0.0);
        assert_eq!(p.fate(), Fate::InFlight);
        assert_eq!(p.color(), REGISTRY_BLUE);
        assert_ne!(p.target(), Some(BranchId(1)));
        assert!(p.target().is_some());
    }
}

#[test]
fn progress_steps_and_stage_increments_once() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    for i in 1..50 {
        rig.tick(&mut p);
        assert_eq!(p.stage(), 0);
        assert!((p.progress() - 0.02 * f64::from(i)).abs() < 1e-9);
    }
    let arrived = rig.tick(&mut p);
    assert_eq!(p.stage(), 1);
    assert_eq!(p.progress(), 0.0);
    assert_eq!(arrived, Some(rig.layout.metadata()));
}

#[test]
fn ingest_is_linear_and_dispatch_is_eased() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    p.target = Some(BranchId(1));
    for _ in 0..25 {
        rig.tick(&mut p);
    }
    assert!((p.position().x - 325.0).abs() < 1e-6);
    assert!((p.position().y - 400.0).abs() < 1e-6);

    for _ in 0..(25 + 12) {
        rig.tick(&mut p);
    }
    // metadata (450,400) -> service 1 (750,200) at eased t = ease(0.24)
    let e = Ease::InOutQuad.apply(0.24);
    assert!((p.position().x - (450.0 + 300.0 * e)).abs() < 1e-6);
    assert!((p.position().y - (400.0 - 200.0 * e)).abs() < 1e-6);
}

#[test]
fn healthy_particle_completes_every_stage() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    let target = p.target().unwrap();
    let branch = *rig.layout.branch(target).unwrap();

    let mut arrivals = Vec::new();
    let mut ticks = 0;
    while !p.is_finished(4) {
        if let Some(node) = rig.tick(&mut p) {
            arrivals.push((ticks + 1, node));
        }
        ticks += 1;
        assert!(ticks <= 200);
    }
    assert_eq!(ticks, 200);
    assert_eq!(p.stage(), 4);
    assert_eq!(p.target(), Some(target));
    assert_eq!(
        arrivals,
        vec![
            (50, rig.layout.metadata()),
            (100, branch.service),
            (150, branch.silo),
            (200, rig.layout.validation().unwrap()),
        ]
    );
}

#[test]
fn failing_target_reroutes_at_dispatch() {
    let mut rig = Rig::new(Variant::Comet);
    let mut p = rig.spawn();
    p.target = Some(BranchId(2));
    for _ in 0..10 {
        rig.tick(&mut p);
    }
    rig.controller.force_failure(BranchId(2), 0.0);
    for _ in 0..40 {
        rig.tick(&mut p);
    }
    assert_eq!(p.stage(), 1);
    assert_eq!(p.fate(), Fate::InFlight);
    assert!(matches!(p.target(), Some(BranchId(1)) | Some(BranchId(3))));
}

#[test]
fn failing_target_reroutes_at_enrich() {
    let mut rig = Rig::new(Variant::Comet);
    let mut p = rig.spawn();
    p.target = Some(BranchId(2));
    for _ in 0..60 {
        rig.tick(&mut p);
    }
    rig.controller.force_failure(BranchId(2), 0.0);
    for _ in 0..40 {
        rig.tick(&mut p);
    }
    assert_eq!(p.stage(), 2);
    assert_eq!(p.fate(), Fate::InFlight);
    assert_ne!(p.target(), Some(BranchId(2)));
}

#[test]
fn failure_during_enrich_rejects_on_the_spot() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    p.target = Some(BranchId(3));
    for _ in 0..110 {
        rig.tick(&mut p);
    }
    assert_eq!(p.stage(), 2);
    let silo = rig.layout.branch(BranchId(3)).unwrap().silo;
    let where_rejected = p.position();

    rig.controller.force_failure(BranchId(3), 0.0);
    let arrived = rig.tick(&mut p);
    assert_eq!(arrived, None);
    assert_eq!(p.fate(), Fate::Rejected { from: where_rejected });
    assert_eq!(p.stage(), 3);
    assert_eq!(p.color().r, MUTED_GREY.r);

    let mut ticks = 1;
    while !p.is_finished(4) {
        assert_ne!(rig.tick(&mut p), Some(silo));
        ticks += 1;
    }
    assert_eq!(ticks, 50);
    assert!(p.color().a < 10);
}

#[test]
fn missing_target_is_chosen_at_first_recheck() {
    let mut rig = Rig::new(Variant::Comet);
    let mut p = rig.spawn();
    p.target = None;
    for _ in 0..50 {
        rig.tick(&mut p);
    }
    assert_eq!(p.fate(), Fate::InFlight);
    assert!(p.target().is_some());
}

#[test]
fn discard_arc_follows_quadratic_bezier() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    let from = Point::new(100.0, 500.0);
    p.fate = Fate::Rejected { from };
    p.stage = 3;
    p.progress = 0.48;
    rig.tick(&mut p);
    assert!((p.position().x - 300.0).abs() < 1e-6);
    assert!((p.position().y - 350.0).abs() < 1e-6);
    assert_eq!(p.color().a, 90);
}

#[test]
fn comet_discards_at_validation() {
    let mut rig = Rig::new(Variant::Comet);
    rig.params.discard_rate = 1;
    let mut p = rig.spawn();
    p.stage = 3;
    p.progress = 0.98;
    p.pos = rig.layout.center(rig.layout.validation().unwrap());
    rig.tick(&mut p);
    assert_eq!(p.stage(), 4);
    assert!(matches!(p.fate(), Fate::Discarded { .. }));
    assert_eq!(p.color().r, MUTED_GREY.r);
}

#[test]
fn push_returns_are_never_discarded() {
    let mut rig = Rig::new(Variant::Push);
    rig.params.discard_rate = 1;
    let mut p = rig.spawn();
    p.stage = 3;
    p.progress = 0.99;
    p.pos = rig.layout.center(rig.layout.validation().unwrap());
    rig.tick(&mut p);
    assert_eq!(p.stage(), 4);
    assert_eq!(p.fate(), Fate::InFlight);
    assert_eq!(p.color(), VALIDATION_GOLD);

    let mut ticks = 0;
    while p.fate() != Fate::Collided {
        rig.tick(&mut p);
        ticks += 1;
        assert!(ticks < 60, "never collided");
    }
}

#[test]
fn no_arrival_at_a_failing_service() {
    let mut rig = Rig::new(Variant::Validation);
    let mut p = rig.spawn();
    p.target = Some(BranchId(2));
    p.stage = 1;
    p.progress = 0.99;
    p.pos = rig.layout.center(rig.layout.metadata());
    let failing = rig.layout.branch(BranchId(2)).unwrap().service;

    rig.controller.force_failure(BranchId(2), 0.0);
    let arrived = rig.tick(&mut p);
    assert_eq!(arrived, None);
    assert_ne!(arrived, Some(failing));
    assert_eq!(p.stage(), 2);
    assert_eq!(p.fate(), Fate::InFlight);
    assert_ne!(p.target(), Some(BranchId(2)));
}

#[test]
fn returning_particle_leaves_pooled_trails() {
    let mut rig = Rig::new(Variant::Comet);
    rig.params.discard_rate = 0;
    let mut p = rig.spawn();
    p.stage = 4;
    for _ in 0..20 {
        rig.tick(&mut p);
    }
    assert_eq!(p.fate(), Fate::InFlight);
    assert_eq!(p.color(), VALIDATION_GOLD);
    assert_eq!(p.trails().len(), 4);
    assert_eq!(rig.pool.live_count(), 4);

    p.release_all_trails(&mut rig.pool);
    assert_eq!(rig.pool.live_count(), 0);
    assert_eq!(rig.pool.capacity(), 4);
}

#[test]
fn blocked_return_collides_and_bursts() {
    let mut rig = Rig::new(Variant::Push);
    let mut p = rig.spawn();
    p.stage = 4;
    p.return_path = ReturnPath::Bottom;
    let hit = rig
        .layout
        .return_loop()
        .unwrap()
        .collision_point(ReturnPath::Bottom)
        .unwrap();

    let mut ticks = 0;
    while p.fate() != Fate::Collided {
        rig.tick(&mut p);
        ticks += 1;
        assert!(ticks < 25, "never collided");
    }
    assert!((p.position() - hit).hypot() < COLLISION_RADIUS);
    assert!((2..=4).contains(&p.burst().len()));
    assert!(!p.is_finished(5));

    let frozen = p.position();
    for _ in 0..13 {
        rig.tick(&mut p);
    }
    assert_eq!(p.position(), frozen);
    assert!(p.is_finished(5));
}
