/// Core value types: frames, frame rates, canvas and colors.
pub mod core;
/// Error taxonomy.
pub mod error;
/// Small numeric and geometric helpers.
pub mod math;
