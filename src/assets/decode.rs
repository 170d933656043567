use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::FlowResult;

/// Parsed SVG document.
#[derive(Clone, Debug)]
pub struct PreparedSvg {
    pub tree: Arc<usvg::Tree>,
}

impl PreparedSvg {
    /// Intrinsic `(width, height)` of the document.
    pub fn size(&self) -> (f32, f32) {
        let size = self.tree.size();
        (size.width(), size.height())
    }
}

pub fn parse_svg(bytes: &[u8]) -> FlowResult<PreparedSvg> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;
    Ok(PreparedSvg {
        tree: Arc::new(tree),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
