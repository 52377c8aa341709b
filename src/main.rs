//! Embed Eval CLI
//!
//! Runs one benchmark per invocation against the dataset layout under
//! `datasets/` (or `--data_dir`).

use anyhow::{bail, Context, Result};
use colored::*;
use embed_eval::{
    append_result, evaluate_clustering, evaluate_similarity, load_averaged_documents,
    load_document_vectors, read_labels, ClusterMethod, NanPolicy, Settings, TestSetKind,
    VectorSpace,
};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let opts = Options::parse(&args[2..])?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if opts.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = opts.settings()?;

    match args[1].as_str() {
        "classify" | "class" => cmd_classify(&settings, &opts),
        "cluster" => cmd_cluster(&settings, &opts),
        "sim" | "similarity" => cmd_sim(&settings, &opts),
        "version" | "--version" | "-V" => {
            println!("embed-eval {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command: {}", other)
        }
    }
}

// ============ Options ============

/// `--key value` pairs plus boolean flags
struct Options {
    values: HashMap<String, String>,
    verbose: bool,
    json: bool,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        let mut values = HashMap::new();
        let mut verbose = false;
        let mut json = false;
        let mut i = 0;

        while i < args.len() {
            match args[i].as_str() {
                "-v" | "--verbose" => verbose = true,
                "--json" => json = true,
                flag if flag.starts_with("--") => {
                    let key = flag.trim_start_matches("--").replace('-', "_");
                    let value = args
                        .get(i + 1)
                        .with_context(|| format!("missing value for {}", flag))?;
                    values.insert(key, value.clone());
                    i += 1;
                }
                other => bail!("unexpected argument: {}", other),
            }
            i += 1;
        }

        Ok(Self { values, verbose, json })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid --{} {:?}: {}", key, raw, e)),
            None => Ok(default),
        }
    }

    /// Config file first, then command-line overrides
    fn settings(&self) -> Result<Settings> {
        let mut settings = match self.get("config") {
            Some(path) => Settings::load(path).with_context(|| format!("loading config {}", path))?,
            None => Settings::default(),
        };
        if let Some(dir) = self.get("data_dir") {
            settings.data_dir = PathBuf::from(dir);
        }
        settings.workers = self.parse_or("workers", settings.workers)?;
        if self.get("seed").is_some() {
            settings.seed = Some(self.parse_or("seed", 0u64)?);
        }
        Ok(settings)
    }
}

// ============ Commands ============

fn cmd_classify(settings: &Settings, opts: &Options) -> Result<()> {
    let dataset = opts.get_or("dataset", "20news");
    let emb_file = opts.get_or("emb_file", "jose.txt");
    let train_num: i64 = opts.parse_or("train_num", -1)?;
    let k: usize = opts.parse_or("k", embed_eval::classify::DEFAULT_K)?;

    let dir = settings.dataset_dir(dataset);
    let vec_path = dir.join(emb_file);
    let docs = load_document_vectors(&vec_path)
        .with_context(|| format!("reading embeddings {}", vec_path.display()))?;
    let labels = read_labels(&dir).with_context(|| format!("reading labels in {}", dir.display()))?;

    let report = embed_eval::classify::evaluate(&docs, &labels, train_num, k, settings.workers)?;
    if opts.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{}", "### Test: Document Classification ###".bold());
        println!("Using KNN, k = {}", k);
        println!(
            "F1 macro: {}, F1 micro: {}",
            report.f1.macro_f1.to_string().green(),
            report.f1.micro_f1.to_string().green()
        );
    }

    if let Some(out) = opts.get("output") {
        append_result(out, &[report.f1.macro_f1, report.f1.micro_f1])?;
    }
    Ok(())
}

fn cmd_cluster(settings: &Settings, opts: &Options) -> Result<()> {
    let dataset = opts.get_or("dataset", "20news");
    let emb_file = opts.get_or("emb_file", "jose.txt");
    let k: usize = opts.parse_or("k", 20)?;
    let method: ClusterMethod = opts
        .get("method")
        .context("--method is required (kmeans or skmeans)")?
        .parse()?;

    let dir = settings.dataset_dir(dataset);
    let vec_path = dir.join(emb_file);

    let docs = match opts.get("corpus") {
        Some(corpus) => {
            // Word vectors averaged over each corpus line
            load_averaged_documents(&vec_path, dir.join(corpus))
                .with_context(|| format!("averaging {} over {}", vec_path.display(), corpus))?
                .vectors
        }
        None => load_document_vectors(&vec_path)
            .with_context(|| format!("reading embeddings {}", vec_path.display()))?,
    };
    let labels = read_labels(&dir).with_context(|| format!("reading labels in {}", dir.display()))?;

    let strategy = method.strategy(settings.seed);
    let scores = evaluate_clustering(&docs, &labels, k, strategy.as_ref())?;

    if opts.json {
        println!("{}", serde_json::to_string(&scores)?);
    } else {
        println!("{}", "### Test: Document Clustering ###".bold());
        println!("Clustering using {}", method);
        println!("mutual_info_score = {}", scores.mutual_info.to_string().green());
        println!(
            "normalized_mutual_info_score = {}",
            scores.normalized_mutual_info.to_string().green()
        );
        println!("adjusted_rand_score = {}", scores.adjusted_rand.to_string().green());
        println!("purity = {}", scores.purity.to_string().green());
    }

    let out = opts
        .get("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| dir.join("cluster_results.txt"));
    append_result(&out, &scores.values())?;
    Ok(())
}

fn cmd_sim(settings: &Settings, opts: &Options) -> Result<()> {
    let dataset = opts.get_or("dataset", "wiki");
    let emb_file = opts.get_or("emb_file", "jose.txt");
    let kinds: Vec<TestSetKind> = match opts.get("test") {
        Some(name) => vec![name.parse()?],
        None => TestSetKind::ALL.to_vec(),
    };

    let vec_path = settings.dataset_dir(dataset).join(emb_file);
    if !opts.json {
        println!("Reading embedding from {}", vec_path.display());
    }
    let words = VectorSpace::load(&vec_path, NanPolicy::Skip)
        .with_context(|| format!("reading embeddings {}", vec_path.display()))?;

    let reports = evaluate_similarity(&words, &settings.test_set_paths(), &kinds, settings.workers)?;
    if opts.json {
        println!("{}", serde_json::to_string(&reports)?);
    } else {
        for report in &reports {
            println!("{}", format!("### Test: {} ###", report.test).bold());
            println!("{}/{} actual test cases!", report.retained, report.total);
            println!("Spearman coefficient: {}", report.spearman.to_string().green());
            println!();
        }
    }

    if let Some(out) = opts.get("output") {
        let values: Vec<f64> = reports.iter().map(|r| r.spearman).collect();
        append_result(out, &values)?;
    }
    Ok(())
}

fn print_usage() {
    println!(
        r#"embed-eval {} - embedding benchmark evaluation

USAGE:
    embed-eval <command> [--key value ...]

COMMANDS:
    classify    k-NN document classification (macro/micro F1)
                --dataset 20news --emb_file jose.txt --train_num -1 --k 3
    cluster     Document clustering (MI, NMI, ARI, purity)
                --method kmeans|skmeans --dataset 20news --emb_file jose.txt --k 20
                [--corpus text.txt]   average word vectors over a corpus instead
    sim         Word similarity (Spearman's rho)
                --dataset wiki --emb_file jose.txt [--test wordsim353|men|simlex]

COMMON OPTIONS:
    --config FILE     JSON settings (data_dir, workers, seed, test_sets)
    --data_dir DIR    Dataset root (default: datasets)
    --workers N       Worker threads (default: 20)
    --seed N          Clustering initialization seed
    --output FILE     Append metric values as one comma-joined line
    --json            Print the report as JSON instead of text
    -v, --verbose     Debug logging"#,
        VERSION
    );
}
