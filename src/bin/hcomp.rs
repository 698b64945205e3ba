use clap::{Parser, Subcommand};
use homography_composite::config::PipelineConfig;
use homography_composite::data_loader::{
    MAX_SEQUENCE_FRAMES, discover_sequence, load_markers,
};
use homography_composite::features::harris;
use homography_composite::filters;
use homography_composite::io::{object_from_json, object_to_json, read_image, write_image};
use homography_composite::pipeline::{
    feature_overlay, insert_into_sequence, match_homography, track_features, write_report,
};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pipeline configuration JSON, missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the consensus fitter
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the Harris response map of an image
    Harris {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "2.0")]
        sigma: f64,
    },
    /// Gaussian blur
    Blur {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "2.0")]
        sigma: f64,
    },
    Sharpen {
        input: PathBuf,
        output: PathBuf,
    },
    /// Scale every channel by a factor
    Brighten {
        input: PathBuf,
        output: PathBuf,
        factor: f32,
    },
    /// Horizontal Sobel gradient
    SobelX {
        input: PathBuf,
        output: PathBuf,
    },
    /// Vertical Sobel gradient
    SobelY {
        input: PathBuf,
        output: PathBuf,
    },
    /// Blur and add back `contrast` times the detail the blur removed
    HighPass {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "2.0")]
        sigma: f64,
        #[arg(long)]
        contrast: f32,
    },
    /// Draw detected features
    Features {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long, default_value = "150")]
        count: usize,
        #[arg(long)]
        scale_invariant: bool,
    },
    /// Draw matches against a reference image, verified green and rejected red
    Track {
        input: PathBuf,
        reference: PathBuf,
        output: PathBuf,
        #[arg(short, long, default_value = "150")]
        count: usize,
    },
    /// Warp an image into the frame of a reference image
    MatchHomography {
        input: PathBuf,
        reference: PathBuf,
        output: PathBuf,
        /// Average the aligned image with the reference
        #[arg(long)]
        blend: bool,
        /// Write the fitted homography as JSON
        #[arg(long)]
        homography: Option<PathBuf>,
    },
    /// Insert a picture between four tracked markers in every frame of a
    /// numbered sequence
    Insert {
        /// Directory holding `<base>1.<ext>`, `<base>2.<ext>`, ...
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[arg(long)]
        base: String,
        /// Directory holding the marker images `<marker_base>1..4`
        #[arg(long)]
        marker_dir: PathBuf,
        #[arg(long, default_value = "marker")]
        marker_base: String,
        #[arg(long)]
        picture: PathBuf,
        #[arg(long, default_value = "jpg")]
        ext: String,
        /// Write a per-frame JSON report
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(object_from_json(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let now = Instant::now();

    match args.command {
        Commands::Harris {
            input,
            output,
            sigma,
        } => {
            let img = read_image(&input)?;
            write_image(&harris(&img, sigma, config.detector.k, true), &output)?;
        }
        Commands::Blur {
            input,
            output,
            sigma,
        } => {
            let img = read_image(&input)?;
            write_image(&filters::blur(&img, sigma, true), &output)?;
        }
        Commands::Sharpen { input, output } => {
            let img = read_image(&input)?;
            write_image(&filters::sharpen(&img), &output)?;
        }
        Commands::Brighten {
            input,
            output,
            factor,
        } => {
            let img = read_image(&input)?;
            write_image(&filters::brighten(&img, factor), &output)?;
        }
        Commands::SobelX { input, output } => {
            let img = read_image(&input)?;
            write_image(&filters::sobel_x(&img), &output)?;
        }
        Commands::SobelY { input, output } => {
            let img = read_image(&input)?;
            write_image(&filters::sobel_y(&img), &output)?;
        }
        Commands::HighPass {
            input,
            output,
            sigma,
            contrast,
        } => {
            let img = read_image(&input)?;
            write_image(&filters::high_pass(&img, sigma, contrast), &output)?;
        }
        Commands::Features {
            input,
            output,
            count,
            scale_invariant,
        } => {
            let img = read_image(&input)?;
            let (out, features) = feature_overlay(&img, count, scale_invariant, &config);
            info!("{} features", features.len());
            write_image(&out, &output)?;
        }
        Commands::Track {
            input,
            reference,
            output,
            count,
        } => {
            let img = read_image(&input)?;
            let reference = read_image(&reference)?;
            let (out, matches) = track_features(&img, &reference, count, &config, &mut rng)?;
            let verified = matches.iter().filter(|m| m.verified_match).count();
            info!("{} of {} matches verified (seed {})", verified, matches.len(), seed);
            write_image(&out, &output)?;
        }
        Commands::MatchHomography {
            input,
            reference,
            output,
            blend,
            homography,
        } => {
            let img = read_image(&input)?;
            let reference = read_image(&reference)?;
            let (out, h) = match_homography(&img, &reference, &config, blend, &mut rng)?;
            info!("homography {:?} (seed {})", h.normalized().h, seed);
            write_image(&out, &output)?;
            if let Some(path) = homography {
                object_to_json(&path, &h.normalized())?;
            }
        }
        Commands::Insert {
            input_dir,
            output_dir,
            base,
            marker_dir,
            marker_base,
            picture,
            ext,
            report,
        } => {
            let frames = discover_sequence(&input_dir, &base, &output_dir, &ext, MAX_SEQUENCE_FRAMES);
            let markers = load_markers(&marker_dir, &marker_base, &ext)?;
            let picture = read_image(&picture)?;
            std::fs::create_dir_all(&output_dir)?;
            let sequence = insert_into_sequence(&frames, markers, &picture, &config)?;
            info!(
                "{} frames written, {} failed",
                sequence.processed, sequence.failed
            );
            if let Some(path) = report {
                write_report(&path, &sequence)?;
            }
        }
    }
    info!("took {:.3} sec", now.elapsed().as_secs_f64());
    Ok(())
}
