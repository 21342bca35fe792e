use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use image_labeler::{
    ImageCache, LabelMe, LabelScores, LabelerBuilder, ModelInfo, ModelManager, Preprocessing,
    BASE_IMAGE_DIR_URL, DEFAULT_POOL_SIZE,
};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for downloaded images (defaults to the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Root URL of the LabelMe image catalog
    #[arg(long, global = true, default_value = BASE_IMAGE_DIR_URL)]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download images by URL and label them with the classifier
    Label {
        /// Image URLs to label
        #[arg(required = true)]
        urls: Vec<String>,
        /// Score images concurrently instead of one by one
        #[arg(short, long)]
        concurrent: bool,
        /// Path to the ONNX graph
        #[arg(long, requires = "labels")]
        model: Option<PathBuf>,
        /// Path to the label file, one label per line
        #[arg(long, requires = "model")]
        labels: Option<PathBuf>,
        /// Name of a bundle in the model store, used when no paths are given
        #[arg(long, default_value = "retrained")]
        name: String,
        /// Number of images downloaded or scored at once
        #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
        pool_size: usize,
        /// Use 224px NCHW ImageNet preprocessing instead of the Inception defaults
        #[arg(long)]
        imagenet: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog directories whose name contains a term
    Search {
        term: String,
        /// Shuffle the results with this seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Count the images in catalog directories matching a term
    Stats { term: String },
    /// Download every image of a catalog directory
    Download {
        dir: String,
        /// Local target directory (defaults to images/<DIR>)
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// Fetch a model bundle into the model store
    FetchModel {
        #[arg(long)]
        name: String,
        #[arg(long)]
        model_url: String,
        #[arg(long)]
        labels_url: String,
        #[arg(long)]
        model_sha256: Option<String>,
        #[arg(long)]
        labels_sha256: Option<String>,
        /// Force a fresh download of the model files
        #[arg(short, long)]
        fresh: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Label { urls, concurrent, model, labels, name, pool_size, imagenet, json } => {
            let cache = match args.cache_dir {
                Some(dir) => ImageCache::new(dir)?,
                None => ImageCache::new_default()?,
            };
            let preprocessing = if imagenet { Preprocessing::imagenet() } else { Preprocessing::default() };

            let start_time = Instant::now();
            let builder = LabelerBuilder::new()
                .with_preprocessing(preprocessing)
                .with_cache(cache)
                .with_pool_size(pool_size)?;
            let builder = match (model, labels) {
                (Some(model), Some(labels)) => builder.with_model_files(model, labels)?,
                _ => builder.with_managed_model(&ModelManager::new_default()?, &name)?,
            };
            let labeler = builder.build()?;
            info!("Labeler built in {:.2?}", start_time.elapsed());

            let label_start = Instant::now();
            let results = labeler.label_batch(&urls, concurrent).await?;
            info!(
                "Labeled {} images in {:.2?} (average {:.2?})",
                results.len(),
                label_start.elapsed(),
                label_start.elapsed() / results.len().max(1) as u32
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                results.iter().for_each(print_scores);
            }
        }
        Command::Search { term, seed } => {
            let labelme = LabelMe::connect(&args.base_url).await?;
            let links = match seed {
                Some(seed) => labelme.search_links_shuffled(&term, &mut StdRng::seed_from_u64(seed)),
                None => labelme.search_links(&term),
            };
            for link in links {
                println!("{}", link);
            }
        }
        Command::Stats { term } => {
            let mut labelme = LabelMe::connect(&args.base_url).await?;
            let stats = labelme.search_stats(&term).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Download { dir, target } => {
            let labelme = LabelMe::connect(&args.base_url).await?;
            let tally = labelme.download_images_from_dir(&dir, target.as_deref()).await?;
            println!("Downloaded: {}, Skipped: {}, Failed: {}", tally.success, tally.skip, tally.fail);
        }
        Command::FetchModel { name, model_url, labels_url, model_sha256, labels_sha256, fresh } => {
            let manager = ModelManager::new_default()?;
            let info = ModelInfo::new(name, model_url, labels_url).with_hashes(model_sha256, labels_sha256);

            if fresh {
                info!("Fresh download requested - removing any existing model files...");
                manager.remove_download(&info.name)?;
            }
            manager
                .ensure_model_downloaded(&info)
                .await
                .with_context(|| format!("fetching model '{}'", info.name))?;
            if !manager.verify_model(&info)? {
                bail!("model '{}' failed verification after download", info.name);
            }
            println!("Model '{}' stored in {:?}", info.name, manager.models_dir().join(&info.name));
        }
    }

    Ok(())
}

fn print_scores(result: &LabelScores) {
    println!("\n{}", result.url);
    for (label, score) in &result.scores {
        println!("  {} (score = {:.5})", label, score);
    }
}
