use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "enrichflow", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Raise the log level (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print one JSON line of simulation state per frame.
    Trace(TraceArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// JSON config file. Missing keys take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Diagram variant: silo, validation, comet or push.
    #[arg(long)]
    variant: Option<enrichflow::Variant>,

    /// Seed of the random source.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding the node icons.
    #[arg(long)]
    icons: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame index (0-based). Frames `0..=N` are simulated first.
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Number of frames; defaults to the config's `frames`.
    #[arg(long)]
    frames: Option<u64>,

    /// Fail instead of replacing an existing output file.
    #[arg(long)]
    no_overwrite: bool,
}

#[derive(Args, Debug)]
struct TraceArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Number of frames; defaults to the config's `frames`.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Trace(args) => cmd_trace(args),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(common: &CommonArgs) -> anyhow::Result<enrichflow::SimConfig> {
    let mut cfg = match &common.config {
        Some(path) => enrichflow::SimConfig::from_json_file(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => enrichflow::SimConfig::default(),
    };
    if let Some(variant) = common.variant {
        cfg.variant = variant;
    }
    if let Some(seed) = common.seed {
        cfg.seed = seed;
    }
    if let Some(icons) = &common.icons {
        cfg.icons_dir = Some(icons.clone());
    }
    cfg.validate().context("validate config")?;
    Ok(cfg)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common)?;
    let bg = cfg.background_rgba;
    let mut session = enrichflow::Session::new(cfg).context("create session")?;

    let frame = session
        .render_frame(enrichflow::FrameIndex(args.frame))
        .with_context(|| format!("render frame {}", args.frame))?;
    enrichflow::write_png(&args.out, &frame, bg)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common)?;
    let frames = args.frames.unwrap_or(cfg.frames);
    let mut sink =
        enrichflow::FfmpegSink::for_config(&cfg, &args.out).overwrite(!args.no_overwrite);
    let mut session = enrichflow::Session::new(cfg).context("create session")?;

    session
        .run_to_sink(frames, &mut sink)
        .with_context(|| format!("render mp4 '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_trace(args: TraceArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.common)?;
    let frames = args.frames.unwrap_or(cfg.frames);
    let mut session = enrichflow::Session::new(cfg).context("create session")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for _ in 0..frames {
        session.advance();
        serde_json::to_writer(&mut out, &session.trace_line()).context("serialize trace line")?;
        writeln!(out).context("write trace line")?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}
