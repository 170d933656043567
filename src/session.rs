use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::assets::icons::IconStore;
use crate::config::SimConfig;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FlowError, FlowResult};
use crate::render::backend::{
    BackendKind, FrameRGBA, RenderBackend, RenderSettings, create_backend,
};
use crate::sim::failure::ServiceStatus;
use crate::sim::simulation::{SimStats, Simulation};

/// Top-level scheduler.
///
/// Owns the simulation context, its seeded random source, the renderer and the icons. The
/// simulation clock is derived from the frame index, so the same config and seed always produce
/// the same frames.
pub struct Session {
    cfg: SimConfig,
    sim: Simulation,
    rng: SmallRng,
    backend: Box<dyn RenderBackend>,
    icons: IconStore,
    next_frame: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("variant", &self.cfg.variant)
            .field("seed", &self.cfg.seed)
            .field("next_frame", &self.next_frame)
            .field("icons", &self.icons.len())
            .finish_non_exhaustive()
    }
}

/// Per-branch snapshot within a [`TraceLine`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct BranchTrace {
    pub id: u8,
    pub status: ServiceStatus,
    pub failure_stage: u8,
    pub restoration_substage: u8,
    /// service, service label, inbound, inbound label, outbound, outbound label, silo, silo label
    pub opacities: [f64; 8],
    pub dispersing: usize,
}

/// One line of `trace` output: the state after simulating a frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TraceLine {
    pub frame: u64,
    pub now_ms: f64,
    pub branches: Vec<BranchTrace>,
    pub particles: usize,
    pub trails_live: usize,
    pub trails_capacity: usize,
    pub glows: usize,
    pub stats: SimStats,
}

impl Session {
    /// Validate `cfg`, load icons and build the simulation.
    #[tracing::instrument(
        level = "debug",
        skip(cfg),
        fields(variant = %cfg.variant, seed = cfg.seed)
    )]
    pub fn new(cfg: SimConfig) -> FlowResult<Self> {
        cfg.validate()?;

        let icons = match cfg.icons_dir.as_deref() {
            Some(dir) => IconStore::load(dir),
            None => IconStore::empty(),
        };
        let settings = RenderSettings {
            clear_rgba: Some(cfg.background_rgba),
        };
        let backend = create_backend(BackendKind::Cpu, &settings);

        let mut rng = SmallRng::seed_from_u64(cfg.seed);
        let sim = Simulation::new(&cfg, &mut rng);

        tracing::info!(
            variant = %cfg.variant,
            icons = icons.len(),
            "session ready"
        );
        Ok(Self {
            cfg,
            sim,
            rng,
            backend,
            icons,
            next_frame: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Mutable access for scripted scenarios (forcing failures, spawning particles).
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    pub fn icons(&self) -> &IconStore {
        &self.icons
    }

    /// The last simulated frame, if any.
    pub fn current_frame(&self) -> Option<FrameIndex> {
        self.next_frame.checked_sub(1).map(FrameIndex)
    }

    /// Simulate the next frame and return its index.
    pub fn advance(&mut self) -> FrameIndex {
        let idx = FrameIndex(self.next_frame);
        let now_ms = self.cfg.fps.frame_to_ms(idx);
        self.sim.step(now_ms, &mut self.rng);
        self.next_frame += 1;
        tracing::trace!(frame = idx.0, now_ms, "frame simulated");
        idx
    }

    /// Simulate frames until `target` has been simulated.
    pub fn advance_to(&mut self, target: FrameIndex) -> FlowResult<()> {
        if let Some(current) = self.current_frame()
            && current.0 > target.0
        {
            return Err(FlowError::validation(format!(
                "cannot rewind from frame {} to frame {}",
                current.0, target.0
            )));
        }
        while self.next_frame <= target.0 {
            self.advance();
        }
        Ok(())
    }

    /// Render the current simulation state.
    pub fn render_current(&mut self) -> FlowResult<FrameRGBA> {
        self.backend.render(&self.sim, &self.icons)
    }

    /// Simulate up to and including `frame`, then render it.
    #[tracing::instrument(level = "debug", skip(self), fields(frame = frame.0))]
    pub fn render_frame(&mut self, frame: FrameIndex) -> FlowResult<FrameRGBA> {
        self.advance_to(frame)?;
        self.render_current()
    }

    /// Simulate and render `frames` further frames, streaming each into `sink`.
    #[tracing::instrument(level = "debug", skip(self, sink))]
    pub fn run_to_sink(&mut self, frames: u64, sink: &mut dyn FrameSink) -> FlowResult<()> {
        let canvas = self.sim.layout().canvas();
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.cfg.fps,
        })?;
        for _ in 0..frames {
            let idx = self.advance();
            let frame = self.render_current()?;
            sink.push_frame(idx, &frame)?;
        }
        sink.end()?;

        let stats = self.sim.stats();
        tracing::info!(
            frames,
            spawned = stats.spawned,
            completed = stats.completed,
            rejected = stats.rejected,
            discarded = stats.discarded,
            collided = stats.collided,
            "run finished"
        );
        Ok(())
    }

    /// Snapshot of the state after the last simulated frame.
    pub fn trace_line(&self) -> TraceLine {
        let branches = self
            .sim
            .controller()
            .states()
            .iter()
            .map(|s| BranchTrace {
                id: s.id().0,
                status: s.status(),
                failure_stage: s.failure_stage(),
                restoration_substage: s.restoration_substage(),
                opacities: s.opacities().as_array(),
                dispersing: s.dispersion().len(),
            })
            .collect();
        TraceLine {
            frame: self.current_frame().map_or(0, |f| f.0),
            now_ms: self.sim.now_ms(),
            branches,
            particles: self.sim.particles().len(),
            trails_live: self.sim.trails().live_count(),
            trails_capacity: self.sim.trails().capacity(),
            glows: self.sim.glows().len(),
            stats: self.sim.stats(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/session.rs"]
mod tests;
