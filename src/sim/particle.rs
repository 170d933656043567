use rand::Rng;
use rand::seq::IndexedRandom;

use crate::animation::ease::Ease;
use crate::foundation::core::{Point, Rgba8, Vec2};
use crate::foundation::math::quad_point;
use crate::scene::layout::{BranchId, Layout, NodeId, ReturnPath, Stage};
use crate::sim::effects::{BurstStyle, DispersingParticle, TrailParticle, update_burst};
use crate::sim::failure::FailureController;
use crate::sim::pool::{TrailPool, TrailSlot};

/// Registry blue, used while ingesting and dispatching.
pub const REGISTRY_BLUE: Rgba8 = Rgba8::new(14, 121, 178, PARTICLE_ALPHA);
/// Service plum, used while enriching and proposing.
pub const SERVICE_PLUM: Rgba8 = Rgba8::new(59, 28, 50, PARTICLE_ALPHA);
/// Validation gold, used while returning.
pub const VALIDATION_GOLD: Rgba8 = Rgba8::new(253, 194, 33, PARTICLE_ALPHA);
/// Muted grey for rejected and discarded particles.
pub const MUTED_GREY: Rgba8 = Rgba8::new(200, 200, 200, PARTICLE_ALPHA);

const PARTICLE_ALPHA: u8 = 180;
const PARTICLE_SIZE: f64 = 10.0;

/// Horizontal reach of the discard arc.
pub const DISCARD_DISTANCE: f64 = 400.0;
/// Height of the discard arc's control point above its start.
pub const DISCARD_HEIGHT: f64 = 300.0;
/// Distance at which a returning particle hits a blocked path.
pub const COLLISION_RADIUS: f64 = 20.0;

/// What happens to a particle from here on.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub enum Fate {
    /// Still routed through the pipeline.
    InFlight,
    /// Its branch went down before it committed; flying the discard arc from `from`.
    Rejected { from: Point },
    /// Dropped by validation; flying the discard arc from `from`.
    Discarded { from: Point },
    /// Hit a blocked return path; only its burst remains.
    Collided,
}

/// Per-tick tuning shared by every particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleParams {
    pub progress_step: f64,
    /// A returning particle is discarded with probability `1 / discard_rate`.
    pub discard_rate: u32,
    pub trail_spawn_rate: f64,
    pub canvas_height: f64,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            progress_step: 0.02,
            discard_rate: 3,
            trail_spawn_rate: 0.2,
            canvas_height: 800.0,
        }
    }
}

impl ParticleParams {
    fn trail_every(&self) -> u32 {
        if self.trail_spawn_rate <= 0.0 {
            return 0;
        }
        (1.0 / self.trail_spawn_rate).round().max(1.0) as u32
    }
}

/// Pick uniformly among `available`, avoiding `exclude` unless it is the only choice.
pub fn choose_target(
    available: &[BranchId],
    exclude: Option<BranchId>,
    rng: &mut impl Rng,
) -> Option<BranchId> {
    let preferred: Vec<BranchId> = available
        .iter()
        .copied()
        .filter(|b| Some(*b) != exclude)
        .collect();
    if preferred.is_empty() {
        available.choose(rng).copied()
    } else {
        preferred.choose(rng).copied()
    }
}

/// A data token travelling the pipeline.
#[derive(Clone, Debug)]
pub struct Particle {
    pos: Point,
    stage: usize,
    progress: f64,
    target: Option<BranchId>,
    color: Rgba8,
    size: f64,
    return_path: ReturnPath,
    fate: Fate,
    trails: Vec<TrailSlot>,
    trail_counter: u32,
    burst: Vec<DispersingParticle>,
}

impl Particle {
    /// New particle at the depositor, targeting a branch that is not failing.
    pub fn spawn(
        layout: &Layout,
        controller: &FailureController,
        rng: &mut impl Rng,
    ) -> Self {
        let target = choose_target(&controller.active_branches(), None, rng);
        let return_path = if rng.random_bool(0.5) {
            ReturnPath::Top
        } else {
            ReturnPath::Bottom
        };
        Self {
            pos: layout.center(layout.depositor()),
            stage: 0,
            progress: 0.0,
            target,
            color: REGISTRY_BLUE,
            size: PARTICLE_SIZE,
            return_path,
            fate: Fate::InFlight,
            trails: Vec::new(),
            trail_counter: 0,
            burst: Vec::new(),
        }
    }

    pub fn position(&self) -> Point {
        self.pos
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn target(&self) -> Option<BranchId> {
        self.target
    }

    pub fn color(&self) -> Rgba8 {
        self.color
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn return_path(&self) -> ReturnPath {
        self.return_path
    }

    pub fn fate(&self) -> Fate {
        self.fate
    }

    pub fn trails(&self) -> &[TrailSlot] {
        &self.trails
    }

    pub fn burst(&self) -> &[DispersingParticle] {
        &self.burst
    }

    /// `true` once the particle has left the pipeline or its collision burst has decayed.
    pub fn is_finished(&self, pipeline_len: usize) -> bool {
        match self.fate {
            Fate::Collided => self.burst.is_empty(),
            _ => self.stage >= pipeline_len,
        }
    }

    /// Advance one tick. Returns the node reached this tick, if any.
    pub fn advance(
        &mut self,
        layout: &Layout,
        controller: &FailureController,
        pool: &mut TrailPool,
        params: &ParticleParams,
        rng: &mut impl Rng,
    ) -> Option<NodeId> {
        if self.fate == Fate::Collided {
            update_burst(&mut self.burst, params.canvas_height);
            return None;
        }
        let pipeline = layout.pipeline();
        let Some(&current) = pipeline.get(self.stage) else {
            return None;
        };

        if self.fate == Fate::InFlight
            && current == Stage::Enrich
            && self.target.is_none_or(|t| controller.is_failing(t))
        {
            self.reject(pipeline.len());
        }

        let mut arrived = None;
        self.progress += params.progress_step;
        if self.progress >= 1.0 {
            let completed = pipeline[self.stage];
            self.progress = 0.0;
            self.stage += 1;
            if self.fate == Fate::InFlight {
                // no glow on a branch that is fading out
                let at_branch = matches!(completed, Stage::Dispatch | Stage::Enrich);
                arrived = self.arrival_node(layout, completed).filter(|_| {
                    !at_branch || self.target.is_some_and(|t| !controller.is_failing(t))
                });
                if let Some(&next) = pipeline.get(self.stage) {
                    self.enter_stage(next, layout, controller, params, rng);
                }
            }
        }

        if self.stage < pipeline.len() {
            self.update_position(layout, pipeline[self.stage]);
            self.update_color(pipeline[self.stage]);
            if self.fate == Fate::InFlight && pipeline[self.stage] == Stage::Return {
                self.emit_trail(layout, pool, params, rng);
                self.check_collision(layout, rng);
            }
        }
        arrived
    }

    /// Drop trail slots whose particle has faded out.
    pub fn release_dead_trails(&mut self, pool: &mut TrailPool) {
        self.trails.retain(|slot| {
            let alive = pool.get(*slot).is_some_and(TrailParticle::is_alive);
            if !alive {
                pool.release(*slot);
            }
            alive
        });
    }

    /// Hand every trail slot back to the pool.
    pub fn release_all_trails(&mut self, pool: &mut TrailPool) {
        for slot in self.trails.drain(..) {
            pool.release(slot);
        }
    }

    fn enter_stage(
        &mut self,
        next: Stage,
        layout: &Layout,
        controller: &FailureController,
        params: &ParticleParams,
        rng: &mut impl Rng,
    ) {
        match next {
            Stage::Dispatch | Stage::Enrich => {
                if !self.recheck_target(controller, rng) {
                    self.reject(layout.pipeline().len());
                }
            }
            Stage::Return => {
                if layout.variant().discards_at_validation()
                    && params.discard_rate > 0
                    && rng.random_ratio(1, params.discard_rate)
                {
                    self.fate = Fate::Discarded { from: self.pos };
                }
            }
            Stage::Ingest | Stage::Propose => {}
        }
    }

    /// Keep the target if it is healthy, otherwise reroute. `false` when nothing is active.
    fn recheck_target(&mut self, controller: &FailureController, rng: &mut impl Rng) -> bool {
        if let Some(t) = self.target
            && !controller.is_failing(t)
        {
            return true;
        }
        let previous = self.target;
        match choose_target(&controller.active_branches(), previous, rng) {
            Some(next) => {
                tracing::trace!(?previous, ?next, "particle rerouted");
                self.target = Some(next);
                true
            }
            None => false,
        }
    }

    fn reject(&mut self, pipeline_len: usize) {
        self.fate = Fate::Rejected { from: self.pos };
        self.stage = pipeline_len.saturating_sub(1);
        self.progress = 0.0;
    }

    fn arrival_node(&self, layout: &Layout, completed: Stage) -> Option<NodeId> {
        let branch = self.target.and_then(|t| layout.branch(t));
        match completed {
            Stage::Ingest | Stage::Return => Some(layout.metadata()),
            Stage::Dispatch => branch.map(|b| b.service),
            Stage::Enrich => branch.map(|b| b.silo),
            Stage::Propose => layout.validation(),
        }
    }

    fn update_position(&mut self, layout: &Layout, stage: Stage) {
        let t = self.progress;
        match self.fate {
            Fate::Rejected { from } | Fate::Discarded { from } => {
                let ctrl = from + Vec2::new(DISCARD_DISTANCE / 2.0, -DISCARD_HEIGHT);
                let end = from + Vec2::new(DISCARD_DISTANCE, 0.0);
                self.pos = quad_point(from, ctrl, end, t);
                return;
            }
            Fate::Collided => return,
            Fate::InFlight => {}
        }
        let branch = self.target.and_then(|b| layout.branch(b));
        let next = match stage {
            Stage::Ingest => Some(
                layout
                    .center(layout.depositor())
                    .lerp(layout.center(layout.metadata()), Ease::Linear.apply(t)),
            ),
            Stage::Dispatch => branch.map(|b| {
                layout
                    .center(layout.metadata())
                    .lerp(layout.center(b.service), Ease::InOutQuad.apply(t))
            }),
            Stage::Enrich => branch.map(|b| {
                layout
                    .center(b.service)
                    .lerp(layout.center(b.silo), Ease::Linear.apply(t))
            }),
            Stage::Propose => branch.zip(layout.validation()).map(|(b, v)| {
                layout
                    .center(b.silo)
                    .lerp(layout.center(v), Ease::Linear.apply(t))
            }),
            Stage::Return => layout
                .return_loop()
                .map(|lp| lp.point_at(self.return_path, t)),
        };
        if let Some(p) = next {
            self.pos = p;
        }
    }

    fn update_color(&mut self, stage: Stage) {
        self.color = match self.fate {
            Fate::Rejected { .. } | Fate::Discarded { .. } => {
                MUTED_GREY.with_alpha((f64::from(PARTICLE_ALPHA) * (1.0 - self.progress)) as u8)
            }
            Fate::Collided => self.color,
            Fate::InFlight => match stage {
                Stage::Ingest | Stage::Dispatch => REGISTRY_BLUE,
                Stage::Enrich | Stage::Propose => SERVICE_PLUM,
                Stage::Return => VALIDATION_GOLD,
            },
        };
    }

    fn emit_trail(
        &mut self,
        layout: &Layout,
        pool: &mut TrailPool,
        params: &ParticleParams,
        rng: &mut impl Rng,
    ) {
        let every = params.trail_every();
        if every == 0 || !layout.variant().emits_trails() {
            return;
        }
        self.trail_counter += 1;
        if self.trail_counter.is_multiple_of(every) {
            let size = rng.random_range(3.0..8.0);
            let slot = pool.acquire(TrailParticle::new(self.pos, size, self.color));
            self.trails.push(slot);
        }
    }

    fn check_collision(&mut self, layout: &Layout, rng: &mut impl Rng) {
        let Some(hit) = layout
            .return_loop()
            .and_then(|lp| lp.collision_point(self.return_path))
        else {
            return;
        };
        if (self.pos - hit).hypot() < COLLISION_RADIUS {
            tracing::trace!(x = self.pos.x, y = self.pos.y, "particle collided");
            self.fate = Fate::Collided;
            self.burst = BurstStyle::COLLISION.spawn(self.pos, rng);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sim/particle.rs"]
mod tests;
