//! enrichflow animates a metadata-enrichment pipeline diagram.
//!
//! Data particles travel from a depositor through a metadata registry to one of three service
//! branches, get enriched in a silo and come back. Branches fail and recover on a timer, and
//! in-flight particles reroute or get rejected around the failing one.
//!
//! - Build a [`SimConfig`] (or load one from JSON)
//! - Create a [`Session`]
//! - Render single frames or stream frames into a [`FrameSink`]
#![forbid(unsafe_code)]

pub mod animation;
pub mod assets;
pub mod config;
/// Frame sinks: in-memory, PNG and MP4 through `ffmpeg`.
pub mod encode;
pub mod foundation;
/// Rendering backend(s).
pub mod render;
/// Fixed diagram geometry per variant.
pub mod scene;
pub mod session;
/// Frame-driven simulation: particles, effects and the failure cycle.
pub mod sim;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Point, Rgba8, Vec2};
pub use crate::foundation::error::{FlowError, FlowResult};

pub use crate::animation::ease::{Ease, ease_in_out_quad};
pub use crate::assets::icons::{IconKey, IconStore};
pub use crate::config::SimConfig;
pub use crate::encode::ffmpeg::FfmpegSink;
pub use crate::encode::png::{PngSequenceSink, write_png};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::render::backend::{
    BackendKind, FrameRGBA, RenderBackend, RenderSettings, create_backend,
};
pub use crate::scene::layout::{BranchId, Layout, NodeKind, Stage, Variant};
pub use crate::session::{BranchTrace, Session, TraceLine};
pub use crate::sim::failure::{FailureController, FailureTimings, ServiceStatus};
pub use crate::sim::particle::{Fate, Particle, choose_target};
pub use crate::sim::simulation::{SimStats, Simulation};
