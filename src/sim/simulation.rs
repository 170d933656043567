use rand::Rng;

use crate::config::SimConfig;
use crate::scene::layout::{Layout, Variant};
use crate::sim::effects::GlowEffect;
use crate::sim::failure::FailureController;
use crate::sim::particle::{Fate, Particle, ParticleParams};
use crate::sim::pool::TrailPool;

/// Running totals of particle outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SimStats {
    pub spawned: u64,
    pub completed: u64,
    pub rejected: u64,
    pub discarded: u64,
    pub collided: u64,
}

/// Explicit simulation context: layout, failure controller, particles and effects.
///
/// Ticked once per frame; the renderer only reads it.
#[derive(Debug)]
pub struct Simulation {
    layout: Layout,
    controller: FailureController,
    particles: Vec<Particle>,
    pool: TrailPool,
    glows: Vec<GlowEffect>,
    params: ParticleParams,
    spawn_probability: f64,
    failures_enabled: bool,
    now_ms: f64,
    stats: SimStats,
}

impl Simulation {
    /// Build a simulation from an already validated config.
    pub fn new(cfg: &SimConfig, rng: &mut impl Rng) -> Self {
        let layout = Layout::for_variant(cfg.variant);
        let controller = FailureController::new(cfg.timings.clone(), &layout, rng);
        Self {
            layout,
            controller,
            particles: Vec::new(),
            pool: TrailPool::new(),
            glows: Vec::new(),
            params: cfg.particle_params(),
            spawn_probability: cfg.spawn_probability,
            failures_enabled: cfg.failures_enabled,
            now_ms: 0.0,
            stats: SimStats::default(),
        }
    }

    /// Advance one frame to the simulation clock `now_ms`.
    pub fn step(&mut self, now_ms: f64, rng: &mut impl Rng) {
        self.now_ms = now_ms;
        let canvas_height = self.params.canvas_height;

        if self.failures_enabled {
            self.controller.update(now_ms, rng, canvas_height);
        } else {
            self.controller.update_dispersion(canvas_height);
        }

        if rng.random_bool(self.spawn_probability) {
            self.spawn_particle(rng);
        }

        self.pool.update();
        for particle in &mut self.particles {
            let arrived = particle.advance(
                &self.layout,
                &self.controller,
                &mut self.pool,
                &self.params,
                rng,
            );
            if let Some(node) = arrived {
                self.glows
                    .push(GlowEffect::new(node, self.layout.center(node)));
            }
            particle.release_dead_trails(&mut self.pool);
        }

        let pipeline_len = self.layout.pipeline().len();
        let pool = &mut self.pool;
        let stats = &mut self.stats;
        self.particles.retain_mut(|p| {
            if !p.is_finished(pipeline_len) {
                return true;
            }
            p.release_all_trails(pool);
            match p.fate() {
                Fate::InFlight => stats.completed += 1,
                Fate::Rejected { .. } => stats.rejected += 1,
                Fate::Discarded { .. } => stats.discarded += 1,
                Fate::Collided => stats.collided += 1,
            }
            false
        });

        for glow in &mut self.glows {
            glow.update();
        }
        self.glows.retain(GlowEffect::is_alive);
    }

    /// Spawn a particle at the pipeline entry right away.
    pub fn spawn_particle(&mut self, rng: &mut impl Rng) -> &Particle {
        let particle = Particle::spawn(&self.layout, &self.controller, rng);
        self.stats.spawned += 1;
        self.particles.push(particle);
        &self.particles[self.particles.len() - 1]
    }

    pub fn variant(&self) -> Variant {
        self.layout.variant()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn controller(&self) -> &FailureController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FailureController {
        &mut self.controller
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn trails(&self) -> &TrailPool {
        &self.pool
    }

    pub fn glows(&self) -> &[GlowEffect] {
        &self.glows
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sim/simulation.rs"]
mod tests;
