use clean_bench::benchmark::{guarded, mean_scores, BenchmarkReport};
use clean_bench::config::bench::{load_config, RuntimeConfig};
use clean_bench::image::io::save_image_png;
use clean_bench::{
    BenchmarkDriver, CleaningAlgorithm, Corpus, CorpusEntry, JsonFileCorpus, ProcessingError,
};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let program = env::args()
        .next()
        .unwrap_or_else(|| "clean_bench".to_string());
    let config_path = env::args()
        .nth(1)
        .ok_or_else(|| format!("Usage: {program} <config.json>"))?;
    let config = load_config(Path::new(&config_path))?;

    if config.corpus.is_empty() {
        return Err(format!("No corpus paths in {config_path}"));
    }
    let corpus = JsonFileCorpus::from_paths(&config.corpus)?;

    let algorithm = config
        .algorithm
        .build()
        .map_err(|e| format!("Invalid {} options: {e}", config.algorithm.name()))?;
    let mut driver =
        BenchmarkDriver::new(algorithm).with_metric_options(config.metric_options.clone());
    if let Some(metric) = &config.metric {
        driver = driver.with_metric(metric).map_err(|e| e.to_string())?;
    }
    if let Some(label) = &config.label {
        driver = driver.with_label(label.clone());
    }

    let report = if config.parallel {
        driver.run_parallel(&corpus)
    } else {
        driver.run(&corpus)
    };

    match &config.output.json_out {
        Some(path) => {
            report.write(path)?;
            println!("JSON report written to {}", path.display());
        }
        None => println!("{}", report.to_json()?),
    }
    print_text_summary(&report);

    if let Some(dir) = &config.output.debug_dir {
        save_debug_images(dir, &corpus, driver.algorithm(), &config);
        eprintln!("Debug images written to {}", dir.display());
    }

    Ok(())
}

fn print_text_summary(report: &BenchmarkReport) {
    eprintln!("Benchmark summary");
    eprintln!("  algo: {} ({})", report.algo, report.label);
    eprintln!(
        "  images: {} failures: {}",
        report.io.len(),
        report.num_failures
    );
    eprintln!("  run_duration_ms: {:.3}", report.run_duration_ms);
    let means = mean_scores(report);
    if !means.is_empty() {
        eprintln!("  mean scores:");
        for (name, value) in &means {
            eprintln!("    {name}: {value:.6}");
        }
    }
}

/// Dump raw, cleaned and reference images of every entry. Failures are logged
/// per image, as in the benchmark run.
fn save_debug_images(
    dir: &Path,
    corpus: &JsonFileCorpus,
    algorithm: &dyn CleaningAlgorithm,
    config: &RuntimeConfig,
) {
    for index in 0..corpus.len() {
        let label = corpus.label(index);
        let outcome = guarded(|| {
            let entry = corpus.load(index)?;
            save_pair(dir, &entry).map_err(ProcessingError::Other)?;
            let cleaned = algorithm.clean(&entry.raw)?;
            let path = dir.join(format!("{}_{}.png", entry.label, config.algorithm.name()));
            save_image_png(&cleaned.image, &path).map_err(ProcessingError::Other)
        });
        if let Err(error) = outcome {
            log::warn!("debug dump of {label} incomplete: {}: {}", error.kind, error.message);
        }
    }
}

fn save_pair(dir: &Path, entry: &CorpusEntry) -> Result<(), String> {
    save_image_png(&entry.raw, &dir.join(format!("{}_raw.png", entry.label)))?;
    save_image_png(
        &entry.reference,
        &dir.join(format!("{}_reference.png", entry.label)),
    )
}
