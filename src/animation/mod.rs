/// Easing curves for stage interpolation.
pub mod ease;
