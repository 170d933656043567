use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::sink::{FrameSink, SinkConfig, flatten_premul_over_bg_to_opaque_rgba8};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FlowError, FlowResult};
use crate::render::backend::FrameRGBA;

/// Write `frame` as an opaque PNG, flattening premultiplied alpha over `bg_rgba`.
pub fn write_png(path: &Path, frame: &FrameRGBA, bg_rgba: [u8; 4]) -> FlowResult<()> {
    let mut opaque = vec![0u8; frame.data.len()];
    if frame.premultiplied {
        flatten_premul_over_bg_to_opaque_rgba8(&mut opaque, &frame.data, bg_rgba)?;
    } else {
        opaque.copy_from_slice(&frame.data);
    }

    ensure_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        &opaque,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "png written");
    Ok(())
}

/// Sink writing every frame as `frame_NNNNN.png` into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    bg_rgba: [u8; 4],
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    written: usize,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>, bg_rgba: [u8; 4]) -> Self {
        Self {
            dir: dir.into(),
            bg_rgba,
            cfg: None,
            last_idx: None,
            written: 0,
        }
    }

    /// Path a given frame is written to.
    pub fn frame_path(&self, idx: FrameIndex) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", idx.0))
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> FlowResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FlowResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FlowError::encode("png sink not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(FlowError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(FlowError::encode("png sink received out-of-order frame"));
        }
        self.last_idx = Some(idx);

        write_png(&self.frame_path(idx), frame, self.bg_rgba)?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> FlowResult<()> {
        tracing::info!(dir = %self.dir.display(), frames = self.written, "png sequence finished");
        self.cfg = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
