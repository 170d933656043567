use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::config::SimConfig;
use crate::encode::sink::{FrameSink, SinkConfig, flatten_premul_over_bg_to_opaque_rgba8};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FlowError, FlowResult};
use crate::render::backend::FrameRGBA;

/// Streams opaque frames into the system `ffmpeg`, producing an H.264 MP4 with no audio track.
#[derive(Debug)]
pub struct FfmpegSink {
    out_path: PathBuf,
    overwrite: bool,
    background: [u8; 4],
    encoder: Option<Encoder>,
    opaque: Vec<u8>,
    last_idx: Option<FrameIndex>,
}

#[derive(Debug)]
struct Encoder {
    child: Child,
    stdin: ChildStdin,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
    width: u32,
    height: u32,
}

impl FfmpegSink {
    /// Sink writing to `out_path`, flattening over the config's background.
    pub fn for_config(cfg: &SimConfig, out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            background: cfg.background_rgba,
            encoder: None,
            opaque: Vec::new(),
            last_idx: None,
        }
    }

    /// Whether an existing output file may be replaced. Defaults to `true`.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> FlowResult<()> {
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(FlowError::validation(format!(
                "mp4 output needs even dimensions, got {}x{}",
                cfg.width, cfg.height
            )));
        }
        if !self.overwrite && self.out_path.exists() {
            return Err(FlowError::validation(format!(
                "'{}' exists and overwriting is disabled",
                self.out_path.display()
            )));
        }
        ensure_parent_dir(&self.out_path)?;
        if !is_ffmpeg_on_path() {
            return Err(FlowError::encode("`ffmpeg` not found on PATH"));
        }

        let mut child = encoder_command(&self.out_path, &cfg, self.overwrite)
            .spawn()
            .map_err(|e| FlowError::encode(format!("spawn ffmpeg: {e}")))?;
        let (Some(stdin), Some(mut stderr)) = (child.stdin.take(), child.stderr.take()) else {
            return Err(FlowError::encode("ffmpeg pipes unavailable"));
        };
        // ffmpeg blocks if its stderr pipe fills up
        let stderr = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        });

        tracing::info!(
            out = %self.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            "encoding mp4"
        );
        self.opaque = vec![0u8; rgba_len(cfg.width, cfg.height)];
        self.last_idx = None;
        self.encoder = Some(Encoder {
            child,
            stdin,
            stderr,
            width: cfg.width,
            height: cfg.height,
        });
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> FlowResult<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(FlowError::encode("mp4 sink used before begin"));
        };
        if self.last_idx.is_some_and(|last| idx <= last) {
            return Err(FlowError::encode(format!("frame {} pushed out of order", idx.0)));
        }
        if (frame.width, frame.height) != (encoder.width, encoder.height) {
            return Err(FlowError::validation(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width, frame.height, encoder.width, encoder.height
            )));
        }
        self.last_idx = Some(idx);

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.opaque, &frame.data, self.background)?;
        encoder
            .stdin
            .write_all(&self.opaque)
            .map_err(|e| FlowError::encode(format!("write frame {} to ffmpeg: {e}", idx.0)))
    }

    fn end(&mut self) -> FlowResult<()> {
        let Some(Encoder {
            mut child,
            stdin,
            stderr,
            ..
        }) = self.encoder.take()
        else {
            return Err(FlowError::encode("mp4 sink ended before begin"));
        };
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| FlowError::encode(format!("wait for ffmpeg: {e}")))?;
        let log = stderr
            .join()
            .map_err(|_| FlowError::encode("ffmpeg stderr reader panicked"))?
            .unwrap_or_default();
        if !status.success() {
            return Err(FlowError::encode(format!(
                "ffmpeg failed ({status}): {}",
                String::from_utf8_lossy(&log).trim()
            )));
        }

        tracing::info!(out = %self.out_path.display(), "mp4 written");
        Ok(())
    }
}

/// Raw RGBA on stdin at the sink's rate, yuv420p H.264 out.
fn encoder_command(out_path: &Path, cfg: &SinkConfig, overwrite: bool) -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .arg(if overwrite { "-y" } else { "-n" })
        .args(["-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
        .args(["-s", &format!("{}x{}", cfg.width, cfg.height)])
        .args(["-r", &format!("{}/{}", cfg.fps.num, cfg.fps.den)])
        .args(["-i", "pipe:0", "-an", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .args(["-movflags", "+faststart"])
        .arg(out_path);
    cmd
}

fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FlowResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg -version` runs successfully.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
