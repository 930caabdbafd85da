//! synthdb - schema-driven synthetic database population
//!
//! ## Commands
//!
//! - `cluster`: Partition tables into size-bounded clusters by embedding
//! - `check`: Run the quality gate over one or more SQLite databases
//! - `augment`: Populate schema-only databases through the code oracle
//! - `rules`: List registered quality rules

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use synthdb_core::domain::write_json_artifact;
use synthdb_core::quality::{check_databases, QualityGate, RuleRegistry, RuleSpec};
use synthdb_core::{
    augment_all, load_manifest, save_results, AugmentationLoop, AugmentationResults,
    ClusterPartitioner, EmbeddingSet, PipelineConfig, ProcessSandbox, METRICS,
};
use synthdb_oracle::HttpOracle;

#[derive(Parser)]
#[command(name = "synthdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Schema-driven synthetic database population", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, env = "SYNTHDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition tables into clusters of bounded size
    Cluster {
        /// Embeddings file: {"ids": [...], "vectors": [[...], ...]}
        #[arg(long)]
        embeddings: PathBuf,

        /// Output path for the cluster map
        #[arg(short, long)]
        out: PathBuf,

        /// Upper bound on the initial k-means cluster count
        #[arg(long)]
        initial_k: Option<usize>,

        /// Maximum members per cluster
        #[arg(long)]
        max_cluster_size: Option<usize>,

        /// Centroid file; incremental mode when it already exists
        #[arg(long)]
        centroids: Option<PathBuf>,

        /// k-means seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Evaluate databases against the quality gate
    Check {
        /// SQLite databases to evaluate
        #[arg(required = true)]
        dbs: Vec<PathBuf>,

        /// Rule set as a JSON array of {"rule", "params"} objects
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Write the per-database report here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Populate every database in a manifest
    Augment {
        /// Manifest: {dbid: {"sqlite_path", "table_meta"?}}
        #[arg(long)]
        manifest: PathBuf,

        /// Working directory for copies, logs and results
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Execution budget per database
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Completion endpoint
        #[arg(long)]
        oracle_url: Option<String>,
    },

    /// List registered quality rule identifiers
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    synthdb_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Cluster {
            embeddings,
            out,
            initial_k,
            max_cluster_size,
            centroids,
            seed,
        } => cmd_cluster(
            config,
            &embeddings,
            &out,
            ClusterOverrides {
                initial_k,
                max_cluster_size,
                centroids,
                seed,
            },
        ),
        Commands::Check { dbs, rules, out } => {
            cmd_check(&config, &dbs, rules.as_deref(), out.as_deref())
        }
        Commands::Augment {
            manifest,
            workdir,
            max_iterations,
            oracle_url,
        } => cmd_augment(config, &manifest, workdir, max_iterations, oracle_url).await,
        Commands::Rules => cmd_rules(),
    };

    METRICS.flush();

    match outcome? {
        ExitStatus::Success => Ok(()),
        ExitStatus::Failure => std::process::exit(1),
    }
}

enum ExitStatus {
    Success,
    Failure,
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(PipelineConfig::from_env()),
    }
}

struct ClusterOverrides {
    initial_k: Option<usize>,
    max_cluster_size: Option<usize>,
    centroids: Option<PathBuf>,
    seed: Option<u64>,
}

fn cmd_cluster(
    mut config: PipelineConfig,
    embeddings: &Path,
    out: &Path,
    overrides: ClusterOverrides,
) -> Result<ExitStatus> {
    let partition = &mut config.cluster.partition;
    if let Some(k) = overrides.initial_k {
        partition.initial_k = k;
    }
    if let Some(max) = overrides.max_cluster_size {
        partition.max_cluster_size = max;
    }
    if let Some(seed) = overrides.seed {
        partition.seed = seed;
    }
    let centroids = overrides.centroids.or(config.cluster.centroids_path.clone());

    let set = EmbeddingSet::load(embeddings)
        .with_context(|| format!("Failed to load embeddings from {:?}", embeddings))?;
    let partitioner = ClusterPartitioner::new(config.cluster.partition.clone())?;
    let clusters = partitioner.run(&set, centroids.as_deref())?;

    let digest = write_json_artifact(out, &clusters)
        .with_context(|| format!("Failed to write cluster map {:?}", out))?;
    println!(
        "Partitioned {} tables into {} clusters -> {:?} (sha256 {})",
        set.len(),
        clusters.len(),
        out,
        digest
    );
    if let Some(path) = centroids {
        println!("Centroids: {:?}", path);
    }
    Ok(ExitStatus::Success)
}

fn cmd_check(
    config: &PipelineConfig,
    dbs: &[PathBuf],
    rules: Option<&Path>,
    out: Option<&Path>,
) -> Result<ExitStatus> {
    let registry = RuleRegistry::builtin();
    let gate = match rules {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read rule set {:?}", path))?;
            let specs: Vec<RuleSpec> = serde_json::from_slice(&bytes)
                .with_context(|| format!("Rule set {:?} is not a JSON array of rules", path))?;
            QualityGate::new(&registry, &specs)?
        }
        None => config.quality_gate(&registry)?,
    };
    info!(rules = ?gate.rule_ids(), databases = dbs.len(), "running quality gate");

    let checks = check_databases(&gate, dbs);
    let all_ok = checks.values().all(|c| c.ok);

    match out {
        Some(path) => {
            let digest = write_json_artifact(path, &checks)
                .with_context(|| format!("Failed to write report {:?}", path))?;
            for (db, check) in &checks {
                let status = if check.ok { "ok" } else { "FAILED" };
                println!(
                    "{:<6} {} ({} findings, {} failed)",
                    status,
                    db,
                    check.report.len(),
                    check.report.failures().count()
                );
            }
            println!("Report written to {:?} (sha256 {})", path, digest);
        }
        None => println!("{}", serde_json::to_string_pretty(&checks)?),
    }

    Ok(if all_ok {
        ExitStatus::Success
    } else {
        ExitStatus::Failure
    })
}

async fn cmd_augment(
    mut config: PipelineConfig,
    manifest: &Path,
    workdir: Option<PathBuf>,
    max_iterations: Option<u32>,
    oracle_url: Option<String>,
) -> Result<ExitStatus> {
    if let Some(dir) = workdir {
        config.workdir = dir;
    }
    if let Some(n) = max_iterations {
        config.augment.max_iterations = n;
    }
    if let Some(url) = oracle_url {
        config.oracle.url = url;
    }
    config.validate()?;

    let targets = load_manifest(manifest)
        .with_context(|| format!("Failed to load manifest {:?}", manifest))?;
    std::fs::create_dir_all(&config.workdir)
        .with_context(|| format!("Failed to create workdir {:?}", config.workdir))?;

    let oracle = HttpOracle::new(config.oracle.clone())?;
    let sandbox = ProcessSandbox::from_config(&config.sandbox)?;
    let gate = config.quality_gate(&RuleRegistry::builtin())?;

    let engine = AugmentationLoop::new(
        Arc::new(oracle),
        Arc::new(sandbox),
        Arc::new(gate),
        config.workdir.clone(),
    )
    .configure(&config.augment)?
    .with_timeout(config.sandbox.timeout())
    .with_attempt_log(config.augment_log_dir());

    info!(
        targets = targets.len(),
        concurrency = config.augment.concurrency,
        workdir = %config.workdir.display(),
        "starting augmentation"
    );
    let results = augment_all(Arc::new(engine), targets, config.augment.concurrency).await;

    let digest = save_results(&config.workdir, &results)?;
    print_summary(&results);
    println!(
        "Results written to {:?} (sha256 {})",
        config.workdir.join(synthdb_core::augment::RESULT_FILE),
        digest
    );
    Ok(ExitStatus::Success)
}

fn print_summary(results: &AugmentationResults) {
    let width = results.keys().map(String::len).max().unwrap_or(4).max(4);
    println!("{:<width$}  STATUS", "DBID");
    for (dbid, result) in results {
        let status = if result.success { "success" } else { "failed" };
        println!("{:<width$}  {}", dbid, status);
    }
    let succeeded = results.values().filter(|r| r.success).count();
    println!(
        "\n{} succeeded, {} failed, {} total",
        succeeded,
        results.len() - succeeded,
        results.len()
    );
}

fn cmd_rules() -> Result<ExitStatus> {
    for id in RuleRegistry::builtin().ids() {
        println!("{}", id);
    }
    Ok(ExitStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use synthdb_core::domain::read_json_artifact;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_with_global_flags() {
        let cli = Cli::try_parse_from([
            "synthdb", "--json", "check", "a.sqlite", "b.sqlite", "--out", "qc_report.json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Check { dbs, out, rules } => {
                assert_eq!(dbs.len(), 2);
                assert_eq!(out, Some(PathBuf::from("qc_report.json")));
                assert!(rules.is_none());
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_check_requires_a_database() {
        assert!(Cli::try_parse_from(["synthdb", "check"]).is_err());
    }

    #[test]
    fn test_cluster_writes_map() {
        let dir = tempfile::tempdir().unwrap();
        let embeddings = dir.path().join("emb.json");
        std::fs::write(
            &embeddings,
            r#"{"ids": ["a", "b", "c", "d"], "vectors": [[0.0], [0.1], [9.0], [9.1]]}"#,
        )
        .unwrap();
        let out = dir.path().join("out").join("clusters.json");

        cmd_cluster(
            PipelineConfig::default(),
            &embeddings,
            &out,
            ClusterOverrides {
                initial_k: Some(2),
                max_cluster_size: Some(3),
                centroids: Some(dir.path().join("centroids.json")),
                seed: None,
            },
        )
        .unwrap();

        assert!(out.with_extension("digest").exists());
        let map: std::collections::BTreeMap<String, Vec<String>> =
            read_json_artifact(&out).unwrap();
        assert_eq!(map.values().map(Vec::len).sum::<usize>(), 4);
        assert!(dir.path().join("centroids.json").exists());
    }

    #[test]
    fn test_check_reports_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("empty.sqlite");
        write_garbage(&db);
        let out = dir.path().join("qc_report.json");

        let status = cmd_check(&PipelineConfig::default(), &[db], None, Some(out.as_path())).unwrap();
        assert!(matches!(status, ExitStatus::Failure));
        assert!(dir.path().join("qc_report.digest").exists());
        let report: serde_json::Value = read_json_artifact(&out).unwrap();
        assert_eq!(report.as_object().unwrap().len(), 1);
    }

    /// A file that is not a database; the gate reports an engine error.
    fn write_garbage(path: &Path) {
        std::fs::write(path, b"not a database").unwrap();
    }
}
