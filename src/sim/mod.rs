/// Decorative particles: glows, trails and dispersion bursts.
pub mod effects;
/// Branch failure and staged restoration.
pub mod failure;
/// Data particles and failure-aware routing.
pub mod particle;
/// Slot arena for trail particles.
pub mod pool;
/// Per-frame simulation context.
pub mod simulation;
