use rand::Rng;

use crate::foundation::core::{Point, Rgba8, Vec2};
use crate::scene::layout::NodeId;

/// Lifetime a dispersing particle starts with.
pub const DISPERSION_LIFETIME: f64 = 255.0;
const DISPERSION_ACCEL: Vec2 = Vec2::new(0.0, 0.2);

/// Parameters of one dispersion burst.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstStyle {
    pub count: (usize, usize), // inclusive
    pub vx: (f64, f64),
    pub vy: (f64, f64),
    pub size: (f64, f64),
    pub decay: f64,
    pub color: Rgba8,
}

impl BurstStyle {
    /// Burst released at a silo once it has faded out.
    pub const FAILURE: Self = Self {
        count: (15, 20),
        vx: (-3.0, 3.0),
        vy: (-5.0, -2.0),
        size: (3.0, 8.0),
        decay: 4.0,
        color: Rgba8::new(14, 121, 178, 255),
    };

    /// Burst released where a returning particle hits a blocked path.
    pub const COLLISION: Self = Self {
        count: (2, 4),
        vx: (-3.0, 2.0),
        vy: (-3.0, -1.0),
        size: (3.0, 8.0),
        decay: 20.0,
        color: Rgba8::new(253, 194, 33, 255),
    };

    /// Sample a full burst at `origin`.
    pub fn spawn(&self, origin: Point, rng: &mut impl Rng) -> Vec<DispersingParticle> {
        let n = rng.random_range(self.count.0..=self.count.1);
        (0..n)
            .map(|_| {
                let vel = Vec2::new(
                    rng.random_range(self.vx.0..self.vx.1),
                    rng.random_range(self.vy.0..self.vy.1),
                );
                let size = rng.random_range(self.size.0..self.size.1);
                DispersingParticle::new(origin, vel, size, self.decay, self.color)
            })
            .collect()
    }
}

/// Short-lived ballistic particle.
#[derive(Clone, Debug, PartialEq)]
pub struct DispersingParticle {
    pub pos: Point,
    pub vel: Vec2,
    pub lifetime: f64,
    pub decay: f64,
    pub color: Rgba8,
    initial_size: f64,
}

impl DispersingParticle {
    pub fn new(pos: Point, vel: Vec2, size: f64, decay: f64, color: Rgba8) -> Self {
        Self {
            pos,
            vel,
            lifetime: DISPERSION_LIFETIME,
            decay,
            color,
            initial_size: size,
        }
    }

    pub fn update(&mut self) {
        self.vel += DISPERSION_ACCEL;
        self.pos += self.vel;
        self.lifetime -= self.decay;
    }

    /// Diameter, shrinking linearly with the remaining lifetime.
    pub fn size(&self) -> f64 {
        self.initial_size * (self.lifetime / DISPERSION_LIFETIME).max(0.0)
    }

    /// Remaining lifetime as an opacity in `[0, 1]`.
    pub fn opacity(&self) -> f64 {
        (self.lifetime / DISPERSION_LIFETIME).clamp(0.0, 1.0)
    }

    pub fn is_alive(&self, canvas_height: f64) -> bool {
        self.lifetime > 0.0 && self.pos.y <= canvas_height
    }
}

/// Advance a burst one tick and drop its dead particles.
pub fn update_burst(burst: &mut Vec<DispersingParticle>, canvas_height: f64) {
    for p in burst.iter_mut() {
        p.update();
    }
    burst.retain(|p| p.is_alive(canvas_height));
}

/// Fading halo on a node a particle just reached.
#[derive(Clone, Debug, PartialEq)]
pub struct GlowEffect {
    pub node: NodeId,
    pub pos: Point,
    pub intensity: f64,
}

impl GlowEffect {
    pub const DECAY: f64 = 0.05;

    pub fn new(node: NodeId, pos: Point) -> Self {
        Self {
            node,
            pos,
            intensity: 1.0,
        }
    }

    pub fn update(&mut self) {
        self.intensity -= Self::DECAY;
    }

    pub fn is_alive(&self) -> bool {
        self.intensity > 0.0
    }
}

/// Fading dot left behind a returning particle.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailParticle {
    pub pos: Point,
    pub size: f64,
    pub color: Rgba8,
    pub opacity: f64,
}

impl TrailParticle {
    pub const INITIAL_OPACITY: f64 = 0.8;
    pub const DECAY: f64 = 0.05;

    pub fn new(pos: Point, size: f64, color: Rgba8) -> Self {
        Self {
            pos,
            size,
            color,
            opacity: Self::INITIAL_OPACITY,
        }
    }

    pub fn update(&mut self) {
        self.opacity -= Self::DECAY;
    }

    pub fn is_alive(&self) -> bool {
        self.opacity > 0.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sim/effects.rs"]
mod tests;
