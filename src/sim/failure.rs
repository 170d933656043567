use rand::Rng;
use rand::seq::IndexedRandom;

use crate::foundation::core::Point;
use crate::foundation::error::{FlowError, FlowResult};
use crate::foundation::math::phase_progress;
use crate::scene::layout::{Branch, BranchId, EdgeId, Layout, NodeId};
use crate::sim::effects::{BurstStyle, DispersingParticle, update_burst};

/// Durations driving the failure cycle, in milliseconds.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FailureTimings {
    pub interval_min_ms: f64,
    pub interval_max_ms: f64,
    pub fade_ms: f64,
    pub restore_delay_ms: f64,
    /// Service, inbound edge, outbound edge, silo.
    pub restore_substage_ms: [f64; 4],
}

impl Default for FailureTimings {
    fn default() -> Self {
        Self {
            interval_min_ms: 5000.0,
            interval_max_ms: 15000.0,
            fade_ms: 1000.0,
            restore_delay_ms: 2000.0,
            restore_substage_ms: [250.0, 250.0, 200.0, 200.0],
        }
    }
}

impl FailureTimings {
    pub fn validate(&self) -> FlowResult<()> {
        let all = [
            ("interval_min_ms", self.interval_min_ms),
            ("interval_max_ms", self.interval_max_ms),
            ("fade_ms", self.fade_ms),
            ("restore_delay_ms", self.restore_delay_ms),
        ]
        .into_iter()
        .chain(
            self.restore_substage_ms
                .iter()
                .map(|v| ("restore_substage_ms", *v)),
        );
        for (name, v) in all {
            if !v.is_finite() || v < 0.0 {
                return Err(FlowError::validation(format!(
                    "timings.{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.interval_min_ms >= self.interval_max_ms {
            return Err(FlowError::validation(
                "timings.interval_min_ms must be < timings.interval_max_ms",
            ));
        }
        Ok(())
    }

    fn sample_interval(&self, rng: &mut impl Rng) -> f64 {
        rng.random_range(self.interval_min_ms..self.interval_max_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceStatus {
    Active,
    Failing,
}

/// Independent opacities of every visual element a branch owns.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BranchOpacity {
    pub service_body: f64,
    pub service_label: f64,
    pub inbound_edge: f64,
    pub inbound_label: f64,
    pub outbound_edge: f64,
    pub outbound_label: f64,
    pub silo_body: f64,
    pub silo_label: f64,
}

impl BranchOpacity {
    pub const OPAQUE: Self = Self {
        service_body: 1.0,
        service_label: 1.0,
        inbound_edge: 1.0,
        inbound_label: 1.0,
        outbound_edge: 1.0,
        outbound_label: 1.0,
        silo_body: 1.0,
        silo_label: 1.0,
    };

    pub fn as_array(&self) -> [f64; 8] {
        [
            self.service_body,
            self.service_label,
            self.inbound_edge,
            self.inbound_label,
            self.outbound_edge,
            self.outbound_label,
            self.silo_body,
            self.silo_label,
        ]
    }
}

impl Default for BranchOpacity {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// Element brought back during one restoration substage, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RestoreStep {
    Service,
    Inbound,
    Outbound,
    Silo,
}

impl RestoreStep {
    fn index(self) -> usize {
        match self {
            Self::Service => 0,
            Self::Inbound => 1,
            Self::Outbound => 2,
            Self::Silo => 3,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::Service => Some(Self::Inbound),
            Self::Inbound => Some(Self::Outbound),
            Self::Outbound => Some(Self::Silo),
            Self::Silo => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
enum Phase {
    /// Stage 0: edges and service fade out.
    FadeLinks,
    /// Stage 1: silo fades out.
    FadeSilo,
    /// Stage 2: burst released, waiting out the restore delay.
    Dispersed,
    /// Stage 2, restoring one element at a time.
    Restoring(RestoreStep),
}

/// Availability and visual state of one branch.
#[derive(Clone, Debug)]
pub struct ServiceState {
    id: BranchId,
    service: NodeId,
    silo: NodeId,
    inbound: EdgeId,
    outbound: EdgeId,
    silo_center: Point,
    status: ServiceStatus,
    opacity: BranchOpacity,
    phase: Phase,
    stage_start_ms: f64,
    dispersion: Vec<DispersingParticle>,
}

impl ServiceState {
    fn new(layout: &Layout, branch: &Branch) -> Self {
        Self {
            id: branch.id,
            service: branch.service,
            silo: branch.silo,
            inbound: branch.inbound,
            outbound: branch.outbound,
            silo_center: layout.center(branch.silo),
            status: ServiceStatus::Active,
            opacity: BranchOpacity::OPAQUE,
            phase: Phase::FadeLinks,
            stage_start_ms: 0.0,
            dispersion: Vec::new(),
        }
    }

    pub fn id(&self) -> BranchId {
        self.id
    }

    pub fn service(&self) -> NodeId {
        self.service
    }

    pub fn silo(&self) -> NodeId {
        self.silo
    }

    pub fn inbound(&self) -> EdgeId {
        self.inbound
    }

    pub fn outbound(&self) -> EdgeId {
        self.outbound
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn is_failing(&self) -> bool {
        self.status == ServiceStatus::Failing
    }

    pub fn opacities(&self) -> &BranchOpacity {
        &self.opacity
    }

    /// 0 while edges and service fade, 1 while the silo fades, 2 afterwards.
    pub fn failure_stage(&self) -> u8 {
        match self.phase {
            Phase::FadeLinks => 0,
            Phase::FadeSilo => 1,
            Phase::Dispersed | Phase::Restoring(_) => 2,
        }
    }

    /// Index of the restoration substage in progress, 0 when not restoring.
    pub fn restoration_substage(&self) -> u8 {
        match self.phase {
            Phase::Restoring(step) => step.index() as u8,
            _ => 0,
        }
    }

    pub fn restore_step(&self) -> Option<RestoreStep> {
        match self.phase {
            Phase::Restoring(step) => Some(step),
            _ => None,
        }
    }

    pub fn stage_start_ms(&self) -> f64 {
        self.stage_start_ms
    }

    pub fn dispersion(&self) -> &[DispersingParticle] {
        &self.dispersion
    }

    /// Bring the branch back to a fully visible `Active` state.
    pub fn reset(&mut self) {
        self.status = ServiceStatus::Active;
        self.opacity = BranchOpacity::OPAQUE;
        self.phase = Phase::FadeLinks;
        self.stage_start_ms = 0.0;
        self.dispersion.clear();
    }

    fn fail(&mut self, now_ms: f64) {
        self.status = ServiceStatus::Failing;
        self.phase = Phase::FadeLinks;
        self.stage_start_ms = now_ms;
    }

    /// Drive the current phase; loops so a long tick can cross several boundaries.
    fn advance(&mut self, now_ms: f64, timings: &FailureTimings, rng: &mut impl Rng) {
        while self.is_failing() && self.step(now_ms, timings, rng) {}
    }

    /// Apply progress of the current phase. Returns `true` when the phase completed.
    fn step(&mut self, now_ms: f64, timings: &FailureTimings, rng: &mut impl Rng) -> bool {
        let elapsed = now_ms - self.stage_start_ms;
        let phase = self.phase;
        let o = &mut self.opacity;
        match phase {
            Phase::FadeLinks => {
                let p = phase_progress(elapsed, timings.fade_ms);
                let v = 1.0 - p;
                o.service_body = v;
                o.service_label = v;
                o.inbound_edge = v;
                o.inbound_label = v;
                o.outbound_edge = v;
                o.outbound_label = v;
                if p < 1.0 {
                    return false;
                }
                self.phase = Phase::FadeSilo;
                self.stage_start_ms += timings.fade_ms;
            }
            Phase::FadeSilo => {
                let p = phase_progress(elapsed, timings.fade_ms);
                o.silo_body = 1.0 - p;
                o.silo_label = 1.0 - p;
                if p < 1.0 {
                    return false;
                }
                self.dispersion = BurstStyle::FAILURE.spawn(self.silo_center, rng);
                tracing::debug!(branch = %self.id, "silo dispersed");
                self.phase = Phase::Dispersed;
                self.stage_start_ms += timings.fade_ms;
            }
            Phase::Dispersed => {
                if phase_progress(elapsed, timings.restore_delay_ms) < 1.0 {
                    return false;
                }
                self.phase = Phase::Restoring(RestoreStep::Service);
                self.stage_start_ms += timings.restore_delay_ms;
            }
            Phase::Restoring(step) => {
                let duration = timings.restore_substage_ms[step.index()];
                let p = phase_progress(elapsed, duration);
                let (body, label) = match step {
                    RestoreStep::Service => (&mut o.service_body, &mut o.service_label),
                    RestoreStep::Inbound => (&mut o.inbound_edge, &mut o.inbound_label),
                    RestoreStep::Outbound => (&mut o.outbound_edge, &mut o.outbound_label),
                    RestoreStep::Silo => (&mut o.silo_body, &mut o.silo_label),
                };
                *body = p;
                *label = p;
                if p < 1.0 {
                    return false;
                }
                match step.next() {
                    Some(next) => {
                        self.phase = Phase::Restoring(next);
                        self.stage_start_ms += duration;
                    }
                    None => {
                        tracing::info!(branch = %self.id, "branch restored");
                        self.reset();
                    }
                }
            }
        }
        true
    }
}

/// Takes one branch offline at a time and restores it in strict stages.
#[derive(Clone, Debug)]
pub struct FailureController {
    states: Vec<ServiceState>,
    timings: FailureTimings,
    last_failure_ms: f64,
    last_failed: Option<BranchId>,
    interval_ms: f64,
}

impl FailureController {
    pub fn new(timings: FailureTimings, layout: &Layout, rng: &mut impl Rng) -> Self {
        let states = layout
            .branches()
            .iter()
            .map(|b| ServiceState::new(layout, b))
            .collect();
        let interval_ms = timings.sample_interval(rng);
        Self {
            states,
            timings,
            last_failure_ms: 0.0,
            last_failed: None,
            interval_ms,
        }
    }

    /// Advance timers, opacities and dispersion bursts to `now_ms`.
    pub fn update(&mut self, now_ms: f64, rng: &mut impl Rng, canvas_height: f64) {
        if !self.any_failing() && now_ms - self.last_failure_ms > self.interval_ms {
            self.trigger_failure(now_ms, rng);
        }
        for state in &mut self.states {
            state.advance(now_ms, &self.timings, rng);
        }
        self.update_dispersion(canvas_height);
    }

    /// Advance only the decorative dispersion bursts.
    pub fn update_dispersion(&mut self, canvas_height: f64) {
        for state in &mut self.states {
            update_burst(&mut state.dispersion, canvas_height);
        }
    }

    /// Fail a random eligible branch.
    ///
    /// Eligible branches are `Active` and not the last one to fail. With none eligible the next
    /// attempt is postponed by a fresh interval and no branch changes.
    pub fn trigger_failure(&mut self, now_ms: f64, rng: &mut impl Rng) -> Option<BranchId> {
        if self.any_failing() {
            return None;
        }
        self.last_failure_ms = now_ms;
        self.interval_ms = self.timings.sample_interval(rng);

        let eligible: Vec<BranchId> = self
            .states
            .iter()
            .filter(|s| !s.is_failing() && Some(s.id) != self.last_failed)
            .map(|s| s.id)
            .collect();
        let Some(&id) = eligible.choose(rng) else {
            tracing::debug!(now_ms, "no eligible branch, postponing failure");
            return None;
        };
        self.fail_branch(id, now_ms);
        Some(id)
    }

    /// Flip `id` to failing right away. Refused while another branch is failing.
    pub fn force_failure(&mut self, id: BranchId, now_ms: f64) -> bool {
        if self.any_failing() || !self.states.iter().any(|s| s.id == id) {
            return false;
        }
        self.last_failure_ms = now_ms;
        self.fail_branch(id, now_ms);
        true
    }

    fn fail_branch(&mut self, id: BranchId, now_ms: f64) {
        if let Some(state) = self.states.iter_mut().find(|s| s.id == id) {
            state.fail(now_ms);
            self.last_failed = Some(id);
            tracing::info!(branch = %id, now_ms, "branch failing");
        }
    }

    pub fn failing_branches(&self) -> Vec<BranchId> {
        self.states
            .iter()
            .filter(|s| s.is_failing())
            .map(|s| s.id)
            .collect()
    }

    pub fn active_branches(&self) -> Vec<BranchId> {
        self.states
            .iter()
            .filter(|s| !s.is_failing())
            .map(|s| s.id)
            .collect()
    }

    pub fn is_failing(&self, id: BranchId) -> bool {
        self.state(id).is_some_and(ServiceState::is_failing)
    }

    pub fn states(&self) -> &[ServiceState] {
        &self.states
    }

    pub fn state(&self, id: BranchId) -> Option<&ServiceState> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn timings(&self) -> &FailureTimings {
        &self.timings
    }

    pub fn last_failed(&self) -> Option<BranchId> {
        self.last_failed
    }

    pub fn last_failure_ms(&self) -> f64 {
        self.last_failure_ms
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    fn any_failing(&self) -> bool {
        self.states.iter().any(ServiceState::is_failing)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sim/failure.rs"]
mod tests;
