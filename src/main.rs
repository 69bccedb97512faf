use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use quercus_id3::{
    Classifier, ConfusionMatrix, CrossValidation, CutpointSearch, Dataset, Id3Config, Topology,
};
use quercus_io::{
    DatasetName, DatasetReader, EvaluationReport, RunManifest, RunReader, RunWriter,
};

#[derive(Parser)]
#[command(name = "quercus")]
#[command(about = "ID3 decision trees and one-vs-rest forests for tabular classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for forest training (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Which dataset to load and from where.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Dataset family: "iris" or "covtype"
    #[arg(long)]
    dataset: String,

    /// Path to the raw data file (defaults to iris/iris.data or covtype/covtype.data)
    #[arg(long)]
    data: Option<PathBuf>,
}

/// Tree induction parameters.
#[derive(Args, Debug, Clone)]
struct InductionArgs {
    /// Maximum tree depth (unlimited if not set; forests on covtype default to 3)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Number of sampled cutpoint candidates per continuous attribute
    #[arg(long, default_value_t = 10)]
    candidates: usize,

    /// Evaluate every distinct value as a cutpoint instead of sampling
    #[arg(long, default_value_t = false)]
    exhaustive: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Split a dataset, train a classifier and write a run directory
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Classifier topology: "single" or "forest"
        #[arg(long, default_value = "single")]
        topology: String,

        /// Fraction of instances used for training, in (0, 1)
        #[arg(long, default_value_t = 0.66)]
        training_fraction: f64,

        /// Run directory to create (must not exist)
        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        induction: InductionArgs,
    },

    /// Classify the validation split of a run and write its report
    Evaluate {
        /// Dataset family the run was trained on: "iris" or "covtype"
        #[arg(long)]
        dataset: String,

        /// Run directory written by `train`
        #[arg(long)]
        run_dir: PathBuf,

        /// Load classifier.bin instead of the per-tree JSON files
        #[arg(long, default_value_t = false)]
        from_snapshot: bool,
    },

    /// Score a random baseline that draws from the training class distribution
    Baseline {
        #[command(flatten)]
        data: DataArgs,

        /// Fraction of instances used for training, in (0, 1)
        #[arg(long, default_value_t = 0.66)]
        training_fraction: f64,
    },

    /// Run k-fold cross-validation on a whole dataset
    CrossValidate {
        #[command(flatten)]
        data: DataArgs,

        /// Classifier topology: "single" or "forest"
        #[arg(long, default_value = "single")]
        topology: String,

        /// Number of cross-validation folds
        #[arg(long, default_value_t = 10)]
        folds: usize,

        #[command(flatten)]
        induction: InductionArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    dataset: String,
    topology: String,
    n_training: usize,
    n_validation: usize,
    max_depth: Option<usize>,
    trees: Vec<TreeStats>,
    output_dir: PathBuf,
}

#[derive(Serialize)]
struct TreeStats {
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    n_cutpoints: usize,
}

#[derive(Serialize)]
struct EvaluateOutput {
    run_dir: PathBuf,
    source: String,
    n_instances: usize,
    n_fallbacks: usize,
    accuracy: f64,
}

fn parse_topology(s: &str) -> Result<Topology> {
    match s {
        "single" => Ok(Topology::Single),
        "forest" => Ok(Topology::Forest),
        other => bail!("unknown topology: {other} (expected single or forest)"),
    }
}

fn check_training_fraction(fraction: f64) -> Result<()> {
    if !(fraction > 0.0 && fraction < 1.0) {
        bail!("training fraction must be strictly between 0 and 1, got {fraction}");
    }
    Ok(())
}

fn load_dataset(args: &DataArgs) -> Result<(DatasetName, Dataset)> {
    let name: DatasetName = args.dataset.parse()?;
    let path = args.data.clone().unwrap_or_else(|| name.default_path());
    let data = DatasetReader::new(&path, name)
        .read()
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    Ok((name, data))
}

fn build_config(
    args: &InductionArgs,
    dataset: DatasetName,
    topology: Topology,
    seed: u64,
) -> Result<Id3Config> {
    let max_depth = args.max_depth.or(
        (topology == Topology::Forest && dataset == DatasetName::Covtype).then_some(3),
    );
    let cutpoint_search = if args.exhaustive {
        CutpointSearch::Exhaustive
    } else {
        CutpointSearch::Sampled {
            n_candidates: args.candidates,
        }
    };
    let config = Id3Config::new()
        .with_max_depth(max_depth)
        .with_cutpoint_search(cutpoint_search)
        .with_seed(seed);
    config.validate().context("invalid induction parameters")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            topology,
            training_fraction,
            output_dir,
            induction,
        } => {
            let topology = parse_topology(&topology)?;
            check_training_fraction(training_fraction)?;
            if output_dir.exists() {
                bail!("run directory {} already exists", output_dir.display());
            }

            // 1. Read and split
            let (name, dataset) = load_dataset(&data)?;
            let config = build_config(&induction, name, topology, cli.seed)?;
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let (training, validation) = dataset
                .divide_corpus(training_fraction, &mut rng)
                .context("failed to split dataset")?;
            info!(
                n_training = training.len(),
                n_validation = validation.len(),
                "dataset split"
            );
            if training.is_empty() || validation.is_empty() {
                bail!(
                    "training fraction {training_fraction} leaves {} training and {} validation \
                     instances out of {}; both sides need at least one",
                    training.len(),
                    validation.len(),
                    dataset.len()
                );
            }

            // 2. Train
            let classifier = Classifier::train(topology, &config, &training)
                .context("training failed")?;
            for (i, member) in classifier.members().iter().enumerate() {
                debug!(tree = i, "\n{}", member.tree().outline());
            }

            // 3. Persist
            let writer = RunWriter::create(&output_dir)?;
            writer
                .write_split(&training, &validation)
                .context("failed to write data split")?;
            let manifest = RunManifest::new(
                name.as_str(),
                topology,
                cli.seed,
                training_fraction,
                config.max_depth(),
                dataset.schema().clone(),
            );
            writer
                .write_classifier(&classifier, &manifest)
                .context("failed to write classifier")?;

            // 4. Summary
            let output = TrainOutput {
                dataset: name.to_string(),
                topology: topology.to_string(),
                n_training: training.len(),
                n_validation: validation.len(),
                max_depth: config.max_depth(),
                trees: classifier
                    .members()
                    .iter()
                    .map(|m| TreeStats {
                        n_nodes: m.tree().n_nodes(),
                        n_leaves: m.tree().n_leaves(),
                        depth: m.tree().depth(),
                        n_cutpoints: m.cutpoints().len(),
                    })
                    .collect(),
                output_dir,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            dataset,
            run_dir,
            from_snapshot,
        } => {
            // 1. Load run
            let name: DatasetName = dataset.parse()?;
            let reader = RunReader::open(&run_dir)
                .with_context(|| format!("failed to open run {}", run_dir.display()))?;
            reader.check_dataset(name)?;
            let (_, validation) = reader.read_split().context("failed to read data split")?;
            let (classifier, source) = if from_snapshot {
                (reader.load_snapshot()?, "snapshot")
            } else {
                (reader.load_classifier()?, "classifier")
            };
            info!(
                topology = %classifier.topology(),
                n_validation = validation.len(),
                source,
                "classifier loaded"
            );

            // 2. Classify
            let mut rng = ChaCha8Rng::seed_from_u64(reader.manifest().seed);
            let predictions = classifier
                .classify_dataset(&validation, &mut rng)
                .context("classification failed")?;
            let n_classes = reader.manifest().schema.n_classes();
            let matrix = ConfusionMatrix::from_predictions(&predictions, n_classes)
                .context("failed to build confusion matrix")?;
            let n_fallbacks = predictions.iter().filter(|p| p.fallback).count();

            // 3. Report
            let report = EvaluationReport::new(
                source,
                matrix,
                n_fallbacks,
                reader.manifest().schema.class_names().to_vec(),
            );
            RunWriter::open(&run_dir)?
                .write_evaluation(&report)
                .context("failed to write evaluation")?;

            let output = EvaluateOutput {
                run_dir,
                source: report.source.clone(),
                n_instances: report.n_instances,
                n_fallbacks: report.n_fallbacks,
                accuracy: report.accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Baseline {
            data,
            training_fraction,
        } => {
            check_training_fraction(training_fraction)?;
            let (_, dataset) = load_dataset(&data)?;
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let (training, validation) = dataset
                .divide_corpus(training_fraction, &mut rng)
                .context("failed to split dataset")?;
            if training.is_empty() || validation.is_empty() {
                bail!(
                    "training fraction {training_fraction} leaves {} training and {} validation \
                     instances out of {}; both sides need at least one",
                    training.len(),
                    validation.len(),
                    dataset.len()
                );
            }

            let distribution = training.global_distribution();
            let truth: Vec<_> = validation.labels().collect();
            let predicted = truth
                .iter()
                .map(|_| distribution.sample(&mut rng))
                .collect::<Result<Vec<_>, _>>()
                .context("baseline draw failed")?;
            let matrix = ConfusionMatrix::from_labels(&truth, &predicted, dataset.n_classes())
                .context("failed to build confusion matrix")?;
            let report = EvaluationReport::new(
                "baseline",
                matrix,
                0,
                dataset.schema().class_names().to_vec(),
            );
            info!(accuracy = report.accuracy, "baseline scored");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::CrossValidate {
            data,
            topology,
            folds,
            induction,
        } => {
            let topology = parse_topology(&topology)?;
            let (name, dataset) = load_dataset(&data)?;
            let config = build_config(&induction, name, topology, cli.seed)?;
            let result = CrossValidation::new(folds)
                .with_seed(cli.seed)
                .evaluate(topology, &config, &dataset)
                .context("cross-validation failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
