use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::assets::decode::parse_svg;
use crate::assets::svg_raster::rasterize_svg_to_premul_rgba8;
use crate::foundation::error::{FlowError, FlowResult};
use crate::scene::layout::NodeKind;

/// Edge length icons are rasterized at, in pixels.
pub const ICON_SIZE: u32 = 75;

/// Which icon a node shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconKey {
    Depositor,
    Metadata,
    Service,
    Enrich,
    Validation,
}

impl IconKey {
    pub const ALL: [IconKey; 5] = [
        Self::Depositor,
        Self::Metadata,
        Self::Service,
        Self::Enrich,
        Self::Validation,
    ];

    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Depositor => Self::Depositor,
            NodeKind::Metadata => Self::Metadata,
            NodeKind::Service => Self::Service,
            NodeKind::Enrichment => Self::Enrich,
            NodeKind::Validation => Self::Validation,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Depositor => "depositor.svg",
            Self::Metadata => "metadata.svg",
            Self::Service => "service.svg",
            Self::Enrich => "enrich.svg",
            Self::Validation => "validation.svg",
        }
    }
}

/// Icon rasterized once, ready to draw.
#[derive(Clone, Debug)]
pub struct Icon {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Icons loaded before the first frame. Missing or broken files are simply absent.
#[derive(Clone, Debug, Default)]
pub struct IconStore {
    icons: HashMap<IconKey, Icon>,
}

impl IconStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every known icon from `dir`, logging and skipping any that fail.
    #[tracing::instrument(level = "debug", skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Self {
        let mut icons = HashMap::new();
        for key in IconKey::ALL {
            let path = dir.join(key.file_name());
            match load_icon(&path) {
                Ok(icon) => {
                    icons.insert(key, icon);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "icon unavailable");
                }
            }
        }
        tracing::debug!(loaded = icons.len(), "icons loaded");
        Self { icons }
    }

    pub fn get(&self, key: IconKey) -> Option<&Icon> {
        self.icons.get(&key)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

fn load_icon(path: &Path) -> FlowResult<Icon> {
    let bytes = std::fs::read(path)
        .map_err(|e| FlowError::asset(format!("failed to read '{}': {e}", path.display())))?;
    let svg = parse_svg(&bytes)?;
    let rgba8_premul = rasterize_svg_to_premul_rgba8(&svg.tree, ICON_SIZE, ICON_SIZE)?;
    Ok(Icon {
        width: ICON_SIZE,
        height: ICON_SIZE,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/icons.rs"]
mod tests;
