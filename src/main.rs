use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use warpknn_dtw::{BandConstraint, Dtw, TimeSeries, z_normalize_batch};
use warpknn_io::{
    ClassifyRun, Dataset, DatasetName, Delimiter, ExperimentName, ResultWriter, Split, TuneRun,
    UcrReader,
};
use warpknn_knn::{
    ConfusionMatrix, DtwKnnClassifier, GridSearch, KnnConfig, Preprocessing, holdout_split,
};

#[derive(Parser)]
#[command(name = "warpknn")]
#[command(about = "k-nearest-neighbor time series classification under dynamic time warping")]
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

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where to find a train/test dataset and how to prepare it.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Archive root containing `{dataset}/{dataset}_TRAIN.tsv` and `_TEST.tsv`
    #[arg(long)]
    archive: PathBuf,

    /// Dataset name (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    dataset: String,

    /// Field separator: "tab" (.tsv) or "comma" (.csv)
    #[arg(long, default_value = "tab")]
    delimiter: String,

    /// Z-normalize every series before DTW computation
    #[arg(long, default_value_t = false)]
    normalize: bool,
}

/// Where results go.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Also save the fitted model to `{experiment}_model.bin`
    #[arg(long, default_value_t = false)]
    save_model: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the DTW distance between two comma-separated series
    Distance {
        /// First series, e.g. 0,0,1
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        a: Vec<f64>,

        /// Second series, e.g. 1,0,0
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        b: Vec<f64>,

        /// Sakoe-Chiba window radius (unconstrained if not set)
        #[arg(long)]
        window: Option<usize>,

        /// Also print the optimal warping path
        #[arg(long, default_value_t = false)]
        path: bool,
    },

    /// Fit on the TRAIN split and score on the TEST split
    Classify {
        #[command(flatten)]
        data: DataArgs,

        /// Number of neighbors
        #[arg(long, default_value_t = 1)]
        k: usize,

        /// Sakoe-Chiba window radius (unconstrained if not set)
        #[arg(long)]
        window: Option<usize>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Grid-search k and window on a hold-out split of TRAIN, then score the best on TEST
    Tune {
        #[command(flatten)]
        data: DataArgs,

        /// Candidate k values
        #[arg(long, value_delimiter = ',', default_value = "1,3,5,7")]
        ks: Vec<usize>,

        /// Candidate window radii; "none" means unconstrained
        #[arg(long, value_delimiter = ',', default_value = "none,0,5,10")]
        windows: Vec<String>,

        /// Fraction of TRAIN held out for validation
        #[arg(long, default_value_t = 0.3)]
        holdout: f64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Predict labels for a data file with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to a labeled data file in archive format
        #[arg(long)]
        data: PathBuf,

        /// Field separator: "tab" or "comma"
        #[arg(long, default_value = "tab")]
        delimiter: String,

        /// Z-normalize every series before prediction (the model's recorded
        /// preprocessing wins if they disagree)
        #[arg(long, default_value_t = false)]
        normalize: bool,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct DistanceOutput {
    distance: f64,
    window: Option<usize>,
    len_a: usize,
    len_b: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<(usize, usize)>>,
}

#[derive(Serialize)]
struct ClassifyOutput {
    experiment: String,
    dataset: String,
    k: usize,
    window: Option<usize>,
    n_train: usize,
    n_test: usize,
    accuracy: f64,
    error_rate: f64,
    model: Option<PathBuf>,
}

#[derive(Serialize)]
struct TuneOutput {
    experiment: String,
    dataset: String,
    n_candidates: usize,
    n_skipped: usize,
    best_k: usize,
    best_window: Option<usize>,
    validation_accuracy: Option<f64>,
    test_accuracy: f64,
    model: Option<PathBuf>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_series: usize,
    model_k: Option<usize>,
    model_window: Option<usize>,
    model_n_references: usize,
    z_normalized: bool,
    accuracy: Option<f64>,
}

fn parse_delimiter(s: &str) -> Result<Delimiter> {
    match s {
        "tab" => Ok(Delimiter::Tab),
        "comma" => Ok(Delimiter::Comma),
        other => anyhow::bail!("unknown delimiter: {other} (expected tab or comma)"),
    }
}

fn parse_windows(raw: &[String]) -> Result<Vec<Option<usize>>> {
    raw.iter()
        .map(|w| match w.trim() {
            "none" => Ok(None),
            n => n
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("invalid window radius: {n}")),
        })
        .collect()
}

fn preprocess_series(series: Vec<TimeSeries>, normalize: bool) -> Result<Vec<TimeSeries>> {
    if !normalize {
        return Ok(series);
    }
    let result = z_normalize_batch(&series).context("z-normalization failed")?;
    info!(n = result.len(), "z-normalized series");
    Ok(result)
}

fn load_split(data: &DataArgs, split: Split) -> Result<Dataset> {
    let name = DatasetName::new(data.dataset.clone())?;
    let reader = UcrReader::new(&data.archive).with_delimiter(parse_delimiter(&data.delimiter)?);
    let dataset = reader
        .read(&name, split)
        .with_context(|| format!("failed to read {split} split of {name}"))?;
    let series = preprocess_series(dataset.series, data.normalize)?;
    Ok(Dataset {
        labels: dataset.labels,
        series,
    })
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
        Command::Distance { a, b, window, path } => {
            let dtw = Dtw::from_constraint(BandConstraint::from_window(window));
            let a = TimeSeries::new(a).context("invalid series --a")?;
            let b = TimeSeries::new(b).context("invalid series --b")?;

            let (distance, steps) = if path {
                let (d, p) = dtw
                    .distance_and_path(a.as_view(), b.as_view())
                    .context("DTW computation failed")?;
                (d, Some(p.steps().iter().map(|s| (s.a, s.b)).collect()))
            } else {
                let d = dtw
                    .distance(a.as_view(), b.as_view())
                    .context("DTW computation failed")?;
                (d, None)
            };

            let output = DistanceOutput {
                distance: distance.value(),
                window,
                len_a: a.len(),
                len_b: b.len(),
                path: steps,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Classify {
            data,
            k,
            window,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;

            // 1. Read both splits
            let train = load_split(&data, Split::Train)?;
            let test = load_split(&data, Split::Test)?;
            let (n_train, n_test) = (train.len(), test.len());

            // 2. Fit
            let clf = KnnConfig::new(k)?
                .with_window(window)
                .fit(train.into_examples())
                .context("fit failed")?;

            // 3. Predict and score
            let predicted = clf
                .predict_batch(&test.series)
                .context("prediction failed")?;
            let confusion = ConfusionMatrix::from_labels(&test.labels, &predicted)?;
            info!(accuracy = confusion.accuracy(), "test split scored");

            // 4. Write artifacts
            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            let run = ClassifyRun {
                dataset: &data.dataset,
                k,
                window,
                z_normalized: data.normalize,
                n_train,
                n_test,
            };
            writer.write_classify(&run, &confusion)?;
            writer.write_predictions(&predicted, Some(test.labels.as_slice()))?;
            let model = if output.save_model {
                let path = writer.model_path();
                clf.save_with_preprocessing(&path, Preprocessing::from_z_normalized(data.normalize))
                    .context("failed to save model")?;
                Some(path)
            } else {
                None
            };

            // 5. Print summary
            let summary = ClassifyOutput {
                experiment: output.experiment,
                dataset: data.dataset,
                k,
                window,
                n_train,
                n_test,
                accuracy: confusion.accuracy(),
                error_rate: 1.0 - confusion.accuracy(),
                model,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Tune {
            data,
            ks,
            windows,
            holdout,
            output,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;
            let windows = parse_windows(&windows)?;
            let grid = GridSearch::new(ks, windows)?;

            // 1. Read both splits
            let train = load_split(&data, Split::Train)?;
            let test = load_split(&data, Split::Test)?;

            // 2. Hold out part of TRAIN and search the grid
            let examples = train.into_examples();
            let (fit_set, validation) = holdout_split(examples.clone(), holdout, cli.seed)?;
            let result = grid
                .evaluate(&fit_set, &validation)
                .context("grid search failed")?;
            let best = result
                .best()
                .context("every candidate was skipped; widen the window grid or lower k")?;
            let config = result
                .best_config()
                .context("best candidate has an invalid k")?;
            info!(
                k = config.k(),
                constraint = %config.constraint(),
                "best candidate selected"
            );

            // 3. Refit the winner on all of TRAIN and score on TEST
            let clf = config.fit(examples).context("refit failed")?;
            let test_accuracy = clf
                .score(&test.series, &test.labels)
                .context("scoring failed")?;
            info!(test_accuracy, "test split scored");

            // 4. Write artifacts
            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            let run = TuneRun {
                dataset: &data.dataset,
                holdout_fraction: holdout,
                seed: cli.seed,
                n_fit: fit_set.len(),
                n_validation: validation.len(),
                test_accuracy: Some(test_accuracy),
            };
            writer.write_tune(&run, &result)?;
            let model = if output.save_model {
                let path = writer.model_path();
                clf.save_with_preprocessing(&path, Preprocessing::from_z_normalized(data.normalize))
                    .context("failed to save model")?;
                Some(path)
            } else {
                None
            };

            // 5. Print summary
            let summary = TuneOutput {
                experiment: output.experiment,
                dataset: data.dataset,
                n_candidates: result.candidates.len(),
                n_skipped: result
                    .candidates
                    .iter()
                    .filter(|c| c.accuracy().is_none())
                    .count(),
                best_k: best.candidate.k,
                best_window: best.candidate.window,
                validation_accuracy: best.accuracy(),
                test_accuracy,
                model,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Predict {
            model,
            data,
            delimiter,
            normalize,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model
            let (clf, preprocessing): (DtwKnnClassifier<String>, _) =
                DtwKnnClassifier::load_with_preprocessing(&model)
                    .context("failed to load model")?;
            let n_references = clf.references().map_or(0, |r| r.len());
            info!(
                k = ?clf.k(),
                n_references,
                constraint = %clf.dtw().constraint(),
                ?preprocessing,
                "model loaded"
            );
            let z_normalized = preprocessing.is_z_normalized();
            if normalize != z_normalized {
                warn!(
                    requested = normalize,
                    recorded = z_normalized,
                    "--normalize disagrees with the model; using the model's preprocessing"
                );
            }

            // 2. Read data
            let reader = UcrReader::new(data.parent().unwrap_or(Path::new(".")))
                .with_delimiter(parse_delimiter(&delimiter)?);
            let dataset = reader
                .read_file(&data)
                .context("failed to read data file")?;
            let series = preprocess_series(dataset.series, z_normalized)?;

            // 3. Predict
            let predicted = clf
                .predict_batch(&series)
                .context("prediction failed")?;
            let accuracy = warpknn_knn::accuracy(&predicted, &dataset.labels).ok();

            // 4. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(&predicted, Some(dataset.labels.as_slice()))?;

            // 5. Print summary
            let output = PredictOutput {
                experiment,
                n_series: predicted.len(),
                model_k: clf.k(),
                model_window: clf.dtw().constraint().window(),
                model_n_references: n_references,
                z_normalized,
                accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
