/// SVG parsing.
pub mod decode;
/// Node icon store.
pub mod icons;
/// SVG rasterization to premultiplied RGBA8.
pub mod svg_raster;
