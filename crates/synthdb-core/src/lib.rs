//! synthdb core library
//!
//! Partitions tables into schema-sized clusters, validates SQLite databases
//! with a pluggable rule gate, and drives an oracle-backed generate → execute
//! → validate → repair loop that populates schema-only databases inside a
//! process-group sandbox.

pub mod augment;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod quality;
pub mod sandbox;
pub mod telemetry;

pub use augment::{
    augment_all, load_manifest, save_results, AttemptOutcome, AugmentConfig, AugmentError,
    AugmentationLoop, AugmentationResult, AugmentationResults, CodeOracle, GenerationAttempt,
    LoopReport, LoopState, PromptTemplates, TargetDatabase,
};
pub use cluster::{
    CentroidSet, ClusterError, ClusterMap, ClusterPartitioner, EmbeddingSet, PartitionConfig,
};
pub use config::{OracleConfig, PipelineConfig};
pub use domain::{ArtifactDigest, ConfigError, Result, SynthError};
pub use quality::{
    check_databases, DatabaseCheck, DatabaseValidator, Finding, QualityGate, QualityReport,
    QualityRule, RuleRegistry, RuleSpec, Severity,
};
pub use sandbox::{ProcessSandbox, Sandbox, SandboxConfig, SandboxOutput};

pub use metrics::METRICS;
pub use obs::{
    db_span, emit_augment_attempt, emit_augment_finished, emit_augment_started,
    emit_partition_finished, emit_quality_evaluated, emit_sandbox_timeout, DbSpan,
};
pub use telemetry::init_tracing;

/// synthdb version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
