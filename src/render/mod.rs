/// Frame type, backend trait and backend selection.
pub mod backend;
/// CPU rasterizer powered by `vello_cpu`.
pub mod cpu;
