use anyhow::Error;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use relief::{
    build_empties, generate_tiles, Config, EmptinessSet, GenerateError, Landmass, SrtmDirectory,
};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(about = "Generate shaded relief map tiles from SRTM elevation data")]
struct Args {
    /// Log debug messages.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// TOML file with default settings. Flags given on the command line take precedence.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: SubcommandArgs,
}

#[derive(Subcommand, Debug)]
enum SubcommandArgs {
    /// Find the tiles that contain no land.
    GenerateEmpties {
        /// GeoJSON file with the land polygons.
        landmass_file: PathBuf,
        #[arg(long)]
        min_level: Option<u8>,
        #[arg(long)]
        max_level: Option<u8>,
        #[arg(short, long, default_value = "empties.txt.gz")]
        output_file: PathBuf,
    },
    /// Render the tile pyramid.
    GenerateTiles {
        #[arg(long)]
        min_level: Option<u8>,
        #[arg(long)]
        max_level: Option<u8>,
        #[arg(short, long, default_value = "tiles")]
        output_directory: PathBuf,
        /// Directory holding the zipped SRTM cells.
        #[arg(short, long, default_value = "data")]
        source_directory: PathBuf,
        #[arg(short, long, default_value = "empties.txt.gz")]
        empties_file: PathBuf,
        #[arg(long)]
        leaf_workers: Option<usize>,
        #[arg(long)]
        merge_workers: Option<usize>,
    },
}

fn progress_bar() -> Result<ProgressBar, Error> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {pos}/{len} [{wide_bar}] {percent}% {per_sec} {eta_precise}")?
            .progress_chars("=> "),
    );
    Ok(bar)
}

fn generate_empties(
    config: &Config,
    landmass_file: &Path,
    output_file: &Path,
) -> Result<(), Error> {
    if output_file.exists() {
        return Err(GenerateError::OutputCollision(output_file.to_path_buf()).into());
    }
    config.empties.validate()?;

    let landmass = Landmass::from_file(landmass_file)?;
    log::info!("Loaded {} polygons from {}", landmass.len(), landmass_file.display());

    let start = Instant::now();
    let empties = build_empties(&config.empties, &landmass)?;
    empties.save(output_file)?;
    log::info!(
        "Wrote {} empty tiles to {} in {:.1?}",
        empties.len(),
        output_file.display(),
        start.elapsed()
    );
    Ok(())
}

fn generate(
    config: &Config,
    source_directory: &Path,
    empties_file: &Path,
    output_directory: &Path,
) -> Result<(), Error> {
    config.tiles.validate()?;
    let empties = EmptinessSet::load(empties_file)?;
    let source = SrtmDirectory::new(source_directory);

    let bar = progress_bar()?;
    let start = Instant::now();
    let progress = |message: String, done: usize, total: usize| {
        bar.set_message(message);
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };
    let summary = generate_tiles(&config.tiles, &source, &empties, output_directory, progress)?;
    bar.finish();

    log::info!(
        "Rendered {} leaf tiles and {} merged tiles ({} blocks skipped) in {:.1?}",
        summary.leaf_tiles,
        summary.merged_tiles,
        summary.skipped_blocks,
        start.elapsed()
    );
    Ok(())
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match args.subcommand {
        SubcommandArgs::GenerateEmpties { landmass_file, min_level, max_level, output_file } => {
            config.empties.min_level = min_level.unwrap_or(config.empties.min_level);
            config.empties.max_level = max_level.unwrap_or(config.empties.max_level);
            generate_empties(&config, &landmass_file, &output_file)
        }
        SubcommandArgs::GenerateTiles {
            min_level,
            max_level,
            output_directory,
            source_directory,
            empties_file,
            leaf_workers,
            merge_workers,
        } => {
            let tiles = &mut config.tiles;
            tiles.min_level = min_level.unwrap_or(tiles.min_level);
            tiles.max_level = max_level.unwrap_or(tiles.max_level);
            tiles.leaf_workers = leaf_workers.unwrap_or(tiles.leaf_workers);
            tiles.merge_workers = merge_workers.unwrap_or(tiles.merge_workers);
            generate(&config, &source_directory, &empties_file, &output_directory)
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(args) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
