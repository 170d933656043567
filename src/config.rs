use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, Rgba8};
use crate::foundation::error::{FlowError, FlowResult};
use crate::scene::layout::Variant;
use crate::sim::failure::FailureTimings;
use crate::sim::particle::ParticleParams;

/// Everything a [`crate::Session`] needs to simulate and render a diagram.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Diagram flavor.
    pub variant: Variant,
    /// Seed of the simulation's random source.
    pub seed: u64,
    /// Output frame rate; also drives the simulation clock.
    pub fps: Fps,
    /// Frames rendered by `render` and `trace`.
    pub frames: u64,
    /// Chance per frame of spawning a data particle.
    pub spawn_probability: f64,
    /// Stage progress added per frame.
    pub progress_step: f64,
    /// Whether the failure controller runs at all.
    pub failures_enabled: bool,
    /// Returning particles are discarded with probability `1 / discard_rate` (0 disables).
    pub discard_rate: u32,
    /// Trail particles emitted per frame while returning.
    pub trail_spawn_rate: f64,
    /// Directory holding the node icons. Icons are skipped when absent.
    pub icons_dir: Option<PathBuf>,
    /// Straight RGBA background.
    pub background_rgba: [u8; 4],
    /// Failure cycle durations.
    pub timings: FailureTimings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            seed: 0,
            fps: Fps::default(),
            frames: 600,
            spawn_probability: 0.05,
            progress_step: 0.02,
            failures_enabled: true,
            discard_rate: 3,
            trail_spawn_rate: 0.2,
            icons_dir: None,
            background_rgba: [252, 253, 255, 255],
            timings: FailureTimings::default(),
        }
    }
}

impl SimConfig {
    /// Read and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> FlowResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> FlowResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| FlowError::serde(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> FlowResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FlowError::serde(e.to_string()))
    }

    pub fn validate(&self) -> FlowResult<()> {
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(FlowError::validation("fps num/den must be > 0"));
        }
        if !self.spawn_probability.is_finite() || !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(FlowError::validation(format!(
                "spawn_probability must be in [0, 1], got {}",
                self.spawn_probability
            )));
        }
        if !self.progress_step.is_finite() || self.progress_step <= 0.0 || self.progress_step > 1.0
        {
            return Err(FlowError::validation(format!(
                "progress_step must be in (0, 1], got {}",
                self.progress_step
            )));
        }
        if !self.trail_spawn_rate.is_finite() || !(0.0..=1.0).contains(&self.trail_spawn_rate) {
            return Err(FlowError::validation(format!(
                "trail_spawn_rate must be in [0, 1], got {}",
                self.trail_spawn_rate
            )));
        }
        self.timings.validate()
    }

    pub fn background(&self) -> Rgba8 {
        Rgba8::from(self.background_rgba)
    }

    pub fn particle_params(&self) -> ParticleParams {
        ParticleParams {
            progress_step: self.progress_step,
            discard_rate: self.discard_rate,
            trail_spawn_rate: self.trail_spawn_rate,
            canvas_height: f64::from(self.variant.canvas().height),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
