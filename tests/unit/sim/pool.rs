use super::*;
use crate::foundation::core::{Point, Rgba8};

fn trail(x: f64) -> TrailParticle {
    TrailParticle::new(Point::new(x, 0.0), 4.0, Rgba8::new(253, 194, 33, 255))
}

#[test]
fn released_slots_are_reused_before_growing() {
    let mut pool = TrailPool::new();
    let a = pool.acquire(trail(1.0));
    let b = pool.acquire(trail(2.0));
    assert_eq!(pool.capacity(), 2);

    pool.release(a);
    assert_eq!(pool.live_count(), 1);
    assert!(pool.get(a).is_none());

    let c = pool.acquire(trail(3.0));
    assert_eq!(c, a);
    assert_eq!(pool.capacity(), 2);
    assert_eq!(pool.get(c).unwrap().pos.x, 3.0);
    assert_eq!(pool.get(b).unwrap().pos.x, 2.0);

    pool.acquire(trail(4.0));
    assert_eq!(pool.capacity(), 3);
    assert_eq!(pool.live_count(), 3);
}

#[test]
fn double_release_does_not_duplicate_free_slot() {
    let mut pool = TrailPool::new();
    let a = pool.acquire(trail(1.0));
    pool.release(a);
    pool.release(a);
    let x = pool.acquire(trail(2.0));
    let y = pool.acquire(trail(3.0));
    assert_ne!(x, y);
    assert_eq!(pool.capacity(), 2);
}

#[test]
fn update_only_touches_live_slots() {
    let mut pool = TrailPool::new();
    let a = pool.acquire(trail(1.0));
    let b = pool.acquire(trail(2.0));
    pool.release(b);
    pool.update();
    assert!((pool.get(a).unwrap().opacity - 0.75).abs() < 1e-12);
    assert_eq!(pool.live().count(), 1);
}
