use kurbo::{ParamCurve, Point, QuadBez, Vec2};

/// Fraction of `duration_ms` covered by `elapsed_ms`, clamped to `[0, 1]`.
///
/// A zero duration completes immediately.
pub fn phase_progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

/// Sample an axis-aligned ellipse at `angle` (radians, y pointing down).
pub fn ellipse_point(center: Point, radii: Vec2, angle: f64) -> Point {
    Point::new(
        center.x + radii.x * angle.cos(),
        center.y + radii.y * angle.sin(),
    )
}

/// Point on the quadratic Bezier `p0 -> ctrl -> p2` at parameter `t`.
pub fn quad_point(p0: Point, ctrl: Point, p2: Point, t: f64) -> Point {
    QuadBez::new(p0, ctrl, p2).eval(t.clamp(0.0, 1.0))
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
