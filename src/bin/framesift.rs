use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framesift::{
    FfmpegLogLevel, FrameSampler, FrameSource, ImageEncoding, MediaFile, OperationType,
    ProgressCallback, ProgressInfo, SamplerOptions, SceneChangeDetector, SceneDetectionOptions,
    SceneDetector,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framesift sample input.mp4 --out frames --max-frames 7\n  framesift sample input.mp4 --out frames --format jpg --quality 80 --progress\n  framesift sample input.mp4 --dry-run --json\n  framesift scenes input.mp4 --start 0:30 --end 2:00 --json\n  framesift metadata input.mp4\n  framesift completions zsh > _framesift";

#[derive(Debug, Parser)]
#[command(
    name = "framesift",
    version,
    about = "Pick a small, representative set of frames from a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while scanning and decoding.
    #[arg(long, global = true)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample representative frames and write them to a directory.
    #[command(
        about = "Sample representative frames",
        after_help = "Examples:\n  framesift sample input.mp4 --out frames\n  framesift sample input.mp4 --out frames --max-frames 12 --threshold 20 --format jpg"
    )]
    Sample {
        /// Input media path.
        input: PathBuf,
        /// Output directory for the sampled frames.
        #[arg(long, required_unless_present = "dry_run")]
        out: Option<PathBuf>,
        /// Maximum number of frames to return.
        #[arg(long, default_value_t = framesift::DEFAULT_MAX_FRAMES)]
        max_frames: usize,
        /// Scene-change threshold (mean absolute luma difference, 0-255).
        #[arg(long, default_value_t = framesift::DEFAULT_SCENE_THRESHOLD)]
        threshold: f64,
        /// Image format for written frames (png, jpg).
        #[arg(long, default_value = "png")]
        format: String,
        /// JPEG quality (1-100).
        #[arg(long, default_value_t = 85)]
        quality: u8,
        /// Only print the chosen timestamps; decode nothing.
        #[arg(long)]
        dry_run: bool,
        /// Print the manifest as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List scene cuts in a time window.
    #[command(
        about = "Detect scene cuts",
        after_help = "Examples:\n  framesift scenes input.mp4\n  framesift scenes input.mp4 --start 00:01:00 --end 00:02:30 --max 20"
    )]
    Scenes {
        /// Input media path.
        input: PathBuf,
        /// Window start (seconds or [HH:]MM:SS[.ms]).
        #[arg(long)]
        start: Option<String>,
        /// Window end (seconds or [HH:]MM:SS[.ms]). Defaults to the end of the video.
        #[arg(long)]
        end: Option<String>,
        /// Maximum number of cuts to report.
        #[arg(long, default_value_t = 10)]
        max: usize,
        /// Scene-change threshold (mean absolute luma difference, 0-255).
        #[arg(long, default_value_t = framesift::DEFAULT_SCENE_THRESHOLD)]
        threshold: f64,
        /// Print cuts as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print metadata for a media file.
    #[command(about = "Print media metadata", visible_alias = "probe")]
    Metadata {
        /// Input media path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() {
            return Err(format!("invalid time value: {trimmed}").into());
        }
        return Ok(Duration::try_from_secs_f64(seconds.max(0.0))?);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    if !seconds.is_finite() {
        return Err(format!("invalid time value: {trimmed}").into());
    }
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Ok(Duration::try_from_secs_f64(total_seconds.max(0.0))?)
}

fn parse_encoding(format: &str, quality: u8) -> Option<ImageEncoding> {
    match format.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => Some(ImageEncoding::Png),
        "jpg" | "jpeg" => Some(ImageEncoding::Jpeg { quality }),
        _ => None,
    }
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level
            .parse()
            .map_err(|_| format!("unsupported --log-level: {level}"))?;
        framesift::set_ffmpeg_log_level(parsed);
    } else if !global.verbose {
        framesift::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }

    Ok(())
}

/// Drives an indicatif bar from sampler progress.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let label = match info.operation {
            OperationType::SceneDetection => "scanning",
            OperationType::FrameDecoding => "decoding",
            _ => "working",
        };
        if info.current <= 1 {
            self.bar.reset();
            self.bar.set_length(info.total.unwrap_or(0));
        }
        if let Some(total) = info.total {
            self.bar.set_length(total.max(info.current));
        }
        self.bar.set_position(info.current);
        match info.current_time {
            Some(time) => self.bar.set_message(format!("{label} {time:.2}s")),
            None => self.bar.set_message(label),
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    let progress = if cli.global.progress {
        Some(Arc::new(BarProgress::new()?))
    } else {
        None
    };

    match cli.command {
        Commands::Sample {
            input,
            out,
            max_frames,
            threshold,
            format,
            quality,
            dry_run,
            json,
        } => {
            let encoding = parse_encoding(&format, quality)
                .ok_or(format!("unsupported --format: {format} (use png or jpg)"))?;

            let mut options = SamplerOptions::new()
                .with_max_frames(max_frames)
                .with_scene_threshold(threshold);
            if let Some(bar) = &progress {
                options = options.with_progress(bar.clone());
            }
            let sampler = FrameSampler::new(options);
            let mut media = MediaFile::open(&input)?;

            if dry_run {
                let times = sampler.plan(&mut media)?;
                if let Some(bar) = &progress {
                    bar.finish();
                }
                if json {
                    let payload = json!({
                        "input": input.display().to_string(),
                        "duration_seconds": media.duration(),
                        "timestamps": times,
                    });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                } else {
                    for (position, time) in times.iter().enumerate() {
                        println!("#{:02} {:>10.3}s", position + 1, time);
                    }
                }
                return Ok(());
            }

            let out = out.ok_or("--out is required unless --dry-run is given")?;
            if out.exists() && !cli.global.overwrite {
                return Err(format!(
                    "output directory already exists: {} (use --overwrite)",
                    out.display()
                )
                .into());
            }
            fs::create_dir_all(&out)?;

            let frames = sampler.sample(&mut media)?;
            if let Some(bar) = &progress {
                bar.finish();
            }

            let mut manifest = Vec::with_capacity(frames.len());
            for sampled in &frames {
                let output_path =
                    out.join(format!("frame_{:02}.{}", sampled.index, encoding.extension()));
                ensure_writable_path(&output_path, cli.global.overwrite)?;
                fs::write(&output_path, sampled.encode(encoding)?)?;

                if cli.global.verbose {
                    eprintln!(
                        "{} {} ({:.3}s)",
                        "saved".green().bold(),
                        output_path.display(),
                        sampled.time
                    );
                }
                manifest.push((sampled.index, sampled.time, output_path));
            }

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "duration_seconds": media.duration(),
                    "frames": manifest.iter().map(|(index, time, path)| json!({
                        "index": index,
                        "time": time,
                        "path": path.display().to_string(),
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (index, time, path) in &manifest {
                    println!("#{index:02} {time:>10.3}s  {}", path.display());
                }
                eprintln!(
                    "{} sampled {} frame(s) into {}",
                    "success:".green().bold(),
                    manifest.len(),
                    out.display()
                );
            }
        }
        Commands::Scenes {
            input,
            start,
            end,
            max,
            threshold,
            json,
        } => {
            let mut media = MediaFile::open(&input)?;
            let duration = media.duration();

            let window_start = match start {
                Some(value) => parse_timecode(&value)?.as_secs_f64(),
                None => 0.0,
            };
            let window_end = match end {
                Some(value) => parse_timecode(&value)?.as_secs_f64().min(duration),
                None => duration,
            };
            if window_start >= window_end {
                return Err("--start must be before --end".into());
            }

            let scene_options = SceneDetectionOptions::new().threshold(threshold);
            scene_options.validate()?;
            let mut detector = SceneChangeDetector::new(scene_options);
            if let Some(bar) = &progress {
                detector = detector.with_progress(bar.clone());
            }

            let cuts = detector.detect(&mut media, window_start, window_end, max)?;
            if let Some(bar) = &progress {
                bar.finish();
            }

            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "window": [window_start, window_end],
                    "cuts": cuts.iter().map(|cut| json!({
                        "time": cut.time,
                        "score": cut.diff_score,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else if cuts.is_empty() {
                println!("No scene cuts between {window_start:.3}s and {window_end:.3}s");
            } else {
                for cut in &cuts {
                    println!("{:>10.3}s  score {:.1}", cut.time, cut.diff_score);
                }
            }
        }
        Commands::Metadata { input, json } => {
            let media = MediaFile::open(&input)?;
            let metadata = media.metadata();
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration_seconds(),
                    "video": metadata.video.as_ref().map(|video| json!({
                        "width": video.width,
                        "height": video.height,
                        "fps": video.frames_per_second,
                        "frame_count": video.frame_count,
                        "codec": video.codec,
                    })),
                    "audio": metadata.audio.as_ref().map(|audio| json!({
                        "sample_rate": audio.sample_rate,
                        "channels": audio.channels,
                        "codec": audio.codec,
                        "bit_rate": audio.bit_rate,
                    })),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration_seconds());
                if let Some(video) = &metadata.video {
                    println!(
                        "Video: {}x{} @ {:.2} fps, ~{} frames [{}]",
                        video.width,
                        video.height,
                        video.frames_per_second,
                        video.frame_count,
                        video.codec,
                    );
                }
                match &metadata.audio {
                    Some(audio) => println!(
                        "Audio: {} Hz, {} ch [{}]",
                        audio.sample_rate, audio.channels, audio.codec,
                    ),
                    None => println!("Audio: none"),
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framesift", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
