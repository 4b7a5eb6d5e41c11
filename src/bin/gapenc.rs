use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gapenc::timm::{self, FuncId};
use gapenc::util::split_frame_filename;
use gapenc::{
    AviEncodeJob, AviEncodeParams, EncodeProgress, EncoderQuery, FetchRequest, Fetched,
    FilterMacro, FrameRange, FrameSource, GapResult, ImageSequenceSource, SettingsStore,
    VideoCodec, VideoSize,
};

#[derive(Parser, Debug)]
#[command(name = "gapenc", version, about = "Assemble numbered frames into AVI files")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a frame range (and optional WAV audio) into an AVI file.
    Encode(EncodeArgs),
    /// Print the header facts of a WAV file.
    WavInfo {
        /// WAV file.
        path: PathBuf,
    },
    /// Print the stream layout of an AVI file.
    Inspect {
        /// AVI file.
        path: PathBuf,
    },
    /// Answer an encoder introspection query (menu_name, video_extension, short_description, gui_proc).
    Query {
        /// Query key.
        key: String,
    },
    /// Filter macro files.
    Fmac {
        #[command(subcommand)]
        cmd: FmacCommand,
    },
    /// Print an acceleration characteristic curve.
    Accel {
        /// Characteristic, -100..=100.
        #[arg(long, allow_hyphen_values = true)]
        characteristic: i32,
        /// Number of samples from 0 to 1.
        #[arg(long, default_value_t = 11)]
        samples: usize,
    },
}

#[derive(Subcommand, Debug)]
enum FmacCommand {
    /// List the entries of a macro file.
    Show {
        /// Macro file.
        path: PathBuf,
    },
    /// Apply a macro to a settings store file.
    Apply {
        /// Macro file.
        path: PathBuf,
        /// Settings store (JSON); created when missing.
        #[arg(long)]
        settings: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Frame filename prefix, e.g. `frames/anim_` for `frames/anim_000001.png`.
    #[arg(long, required_unless_present = "frame", conflicts_with = "frame")]
    basename: Option<String>,

    /// Frame filename extension, with leading dot.
    #[arg(long, default_value = ".png")]
    ext: String,

    /// Any frame of the sequence, e.g. `frames/anim_0003.png`; basename, extension and digit
    /// count are taken from it.
    #[arg(long)]
    frame: Option<PathBuf>,

    /// First frame number; defaults to the number of `--frame`.
    #[arg(long)]
    from: Option<u32>,

    /// Last frame number (may be below `--from` for reverse order).
    #[arg(long)]
    to: u32,

    /// Output width; defaults to the first frame's width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height; defaults to the first frame's height.
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second.
    #[arg(long, default_value_t = 25.0)]
    fps: f64,

    /// Codec: JPEG, MJPG, RAW, RGB, PNG or XVID.
    #[arg(long)]
    codec: Option<String>,

    /// Encoder parameters JSON; flags given here override it.
    #[arg(long)]
    params: Option<PathBuf>,

    /// JPEG quality 1..=100.
    #[arg(long)]
    quality: Option<u8>,

    /// Encode JPEG frames as two fields.
    #[arg(long)]
    interlaced: bool,

    /// Never copy already-encoded frames.
    #[arg(long)]
    no_passthrough: bool,

    /// 16-bit PCM WAV to interleave.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Output AVI path.
    #[arg(long)]
    out: PathBuf,

    /// Log per-stage timing at the end.
    #[arg(long)]
    timing: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::WavInfo { path } => cmd_wav_info(&path),
        Command::Inspect { path } => cmd_inspect(&path),
        Command::Query { key } => {
            let q: EncoderQuery = key.parse()?;
            println!("{}", gapenc::query_avi_encoder(q));
            Ok(())
        }
        Command::Fmac { cmd } => cmd_fmac(cmd),
        Command::Accel {
            characteristic,
            samples,
        } => {
            for (i, v) in gapenc::accel::accel_curve(characteristic, samples)?
                .into_iter()
                .enumerate()
            {
                println!("{:.4} {v:.6}", i as f64 / (samples - 1) as f64);
            }
            Ok(())
        }
    }
}

/// `GAP_DEBUG` / `GAP_DEBUG_ENC` turn debug output on unless they start with `n` or `N`.
fn debug_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.starts_with(['n', 'N']))
}

fn init_logging() {
    let debug = ["GAP_DEBUG", "GAP_DEBUG_ENC"]
        .iter()
        .any(|k| debug_requested(std::env::var(k).ok().as_deref()));
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let mut params = match &args.params {
        Some(p) => AviEncodeParams::from_json_path(p)?,
        None => AviEncodeParams::default(),
    };
    if let Some(c) = &args.codec {
        params.codec = c.parse::<VideoCodec>()?;
    }
    if let Some(q) = args.quality {
        params.jpeg.quality = q;
    }
    if args.interlaced {
        params.jpeg.interlaced = true;
    }
    if args.no_passthrough {
        params.allow_passthrough = false;
    }

    let (mut source, from) = sequence_source(&args)?;
    let size = match (args.width, args.height) {
        (Some(w), Some(h)) => VideoSize::new(w, h)?,
        (w, h) => {
            let first = source.path_of(from);
            let (fw, fh) = image::image_dimensions(&first)
                .with_context(|| format!("read size of '{}'", first.display()))?;
            VideoSize::new(w.unwrap_or(fw), h.unwrap_or(fh))?
        }
    };

    let job = AviEncodeJob {
        range: FrameRange::new(from, args.to),
        size,
        fps: gapenc::Fps::from_f64(args.fps)?,
        params,
        audio: args.audio.clone(),
        output: args.out.clone(),
    };

    let registry = timm::global();
    let mut timed = TimedSource {
        fetch_id: registry.func_id("fetch"),
        inner: &mut source,
    };
    let mut progress = LogProgress::default();
    let total_id = registry.func_id("encode_avi");
    let stats = {
        let _t = registry.guard(total_id);
        gapenc::encode_avi(&mut timed, &job, &mut progress)
            .with_context(|| format!("encode '{}'", args.out.display()))?
    };
    if args.timing {
        registry.log_report();
    }

    eprintln!(
        "wrote {} ({} frames: {} reused, {} encoded; {} audio bytes)",
        args.out.display(),
        stats.frames_total,
        stats.frames_reused,
        stats.frames_encoded,
        stats.audio_bytes
    );
    Ok(())
}

fn sequence_source(args: &EncodeArgs) -> anyhow::Result<(ImageSequenceSource, u32)> {
    if let Some(frame) = &args.frame {
        let text = frame.to_string_lossy();
        let name = split_frame_filename(&text)
            .with_context(|| format!("'{text}' has no frame number"))?;
        let from = args.from.unwrap_or(name.nr);
        return Ok((ImageSequenceSource::from_frame_name(&name), from));
    }
    let basename = args.basename.clone().context("--basename or --frame is required")?;
    let from = args.from.context("--from is required with --basename")?;
    Ok((ImageSequenceSource::new(basename, args.ext.clone()), from))
}

struct TimedSource<'a, S: FrameSource> {
    inner: &'a mut S,
    fetch_id: FuncId,
}

impl<S: FrameSource> FrameSource for TimedSource<'_, S> {
    fn fetch(&mut self, frame_nr: u32, req: &FetchRequest) -> GapResult<Fetched> {
        let _t = timm::global().guard(self.fetch_id);
        self.inner.fetch(frame_nr, req)
    }
}

#[derive(Default)]
struct LogProgress {
    last_decile: u32,
}

impl EncodeProgress for LogProgress {
    fn report(&mut self, frame_nr: u32, fraction: f64) {
        let decile = (fraction * 10.0).floor() as u32;
        if decile > self.last_decile {
            self.last_decile = decile;
            tracing::info!(frame = frame_nr, percent = decile * 10, "progress");
        }
    }
}

fn cmd_wav_info(path: &Path) -> anyhow::Result<()> {
    let info = gapenc::read_wav_info(path)?;
    println!("format_tag:      {}", info.format_tag);
    println!("channels:        {}", info.channels);
    println!("sample_rate:     {}", info.sample_rate);
    println!("bits_per_sample: {}", info.bits_per_sample);
    println!("block_align:     {}", info.bytes_per_sample);
    println!("data_offset:     {}", info.data_offset);
    println!("data_len:        {}", info.data_len);
    println!("samples:         {}", info.sample_count());
    println!("duration_secs:   {:.3}", info.duration_secs());
    Ok(())
}

fn cmd_inspect(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("read '{}'", path.display()))?;
    let s = gapenc::read_avi_summary(&bytes)?;
    println!("video:        {} {}x{}", s.video_fourcc_str(), s.width, s.height);
    println!("rate:         {}/{}", s.video_rate.0, s.video_rate.1);
    println!("frames:       {} (header {})", s.video_chunks.len(), s.total_frames);
    println!(
        "keyframes:    {}",
        s.keyframes.iter().filter(|&&k| k).count()
    );
    match s.audio {
        Some(a) => println!(
            "audio:        {} ch, {} Hz, {} bit, {} chunks, {} bytes",
            a.channels,
            a.sample_rate,
            a.bits_per_sample,
            s.audio_chunks.len(),
            s.audio_bytes()
        ),
        None => println!("audio:        none"),
    }
    Ok(())
}

fn cmd_fmac(cmd: FmacCommand) -> anyhow::Result<()> {
    match cmd {
        FmacCommand::Show { path } => {
            let fmac = FilterMacro::load(&path)?;
            for e in fmac.entries() {
                println!("{} ({} bytes)", e.plugin, e.data.len());
            }
        }
        FmacCommand::Apply { path, settings } => {
            let fmac = FilterMacro::load(&path)?;
            let mut store = SettingsStore::load_from(&settings)?;
            let n = fmac
                .apply_to(&mut store)
                .with_context(|| format!("apply '{}'", path.display()))?;
            store.save_to(&settings)?;
            eprintln!("applied {n} entries to {}", settings.display());
        }
    }
    Ok(())
}
