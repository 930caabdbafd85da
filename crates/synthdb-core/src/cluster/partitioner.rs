//! Adaptive size-bounded partitioning.
//!
//! Groups are produced by an initial k-means pass (batch) or by nearest
//! persisted centroid (incremental), then drained breadth-first: a group that
//! fits within `max_cluster_size` becomes the next numbered cluster, a larger
//! one is re-clustered into `ceil(size / max_cluster_size)` parts which go back
//! on the queue.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{ClusterError, ClusterResult};
use super::kmeans::{kmeans, nearest_centroid};
use super::store::{CentroidSet, ClusterMap, EmbeddingSet};
use crate::obs;

/// Partitioning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Upper bound on the initial k-means cluster count.
    pub initial_k: usize,
    /// Hard cap on members per output cluster.
    pub max_cluster_size: usize,
    /// Seed for every k-means fit.
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            initial_k: 50,
            max_cluster_size: 20,
            seed: 42,
        }
    }
}

impl PartitionConfig {
    /// Reject settings under which subdivision cannot terminate.
    pub fn validate(&self) -> ClusterResult<()> {
        if self.max_cluster_size < 1 {
            return Err(ClusterError::InvalidConfig(
                "max_cluster_size must be at least 1".to_string(),
            ));
        }
        if self.initial_k < 1 {
            return Err(ClusterError::InvalidConfig(
                "initial_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of one partitioning run.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub clusters: ClusterMap,
    /// Centroids fitted over the full input, for the next incremental run.
    pub centroids: CentroidSet,
}

/// Partitions embedding sets into clusters of bounded size.
#[derive(Debug, Clone)]
pub struct ClusterPartitioner {
    config: PartitionConfig,
}

impl ClusterPartitioner {
    /// Validate `config` and build a partitioner.
    pub fn new(config: PartitionConfig) -> ClusterResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Cluster from scratch with `k = min(initial_k, n)`.
    pub fn partition_batch(&self, set: &EmbeddingSet) -> ClusterResult<Partition> {
        set.validate()?;
        if set.is_empty() {
            return Ok(Partition {
                clusters: ClusterMap::new(),
                centroids: CentroidSet::default(),
            });
        }

        let points: Vec<&[f32]> = set.vectors.iter().map(|v| v.as_slice()).collect();
        let k = self.config.initial_k.min(points.len());
        let fit = kmeans(&points, k, self.config.seed)?;
        debug!(k, iterations = fit.iterations, "initial k-means fit");

        let groups = group_by_label((0..points.len()).zip(fit.assignments.iter().copied()));
        let clusters = self.bound_groups(set, groups)?;

        Ok(Partition {
            clusters,
            centroids: CentroidSet {
                centroids: fit.centroids,
            },
        })
    }

    /// Assign every vector to its nearest persisted centroid, bound the
    /// resulting groups, then refit centroids over the whole set.
    pub fn partition_incremental(
        &self,
        set: &EmbeddingSet,
        centroids: &CentroidSet,
    ) -> ClusterResult<Partition> {
        set.validate()?;
        if set.is_empty() {
            return Ok(Partition {
                clusters: ClusterMap::new(),
                centroids: centroids.clone(),
            });
        }
        if centroids.is_empty() {
            return Err(ClusterError::EmptyCentroidSet);
        }

        let dimension = set.dimension().unwrap_or_default();
        if let Some(bad) = centroids.centroids.iter().find(|c| c.len() != dimension) {
            return Err(ClusterError::DimensionMismatch {
                expected: dimension,
                found: bad.len(),
            });
        }

        let labels = set
            .vectors
            .iter()
            .map(|v| nearest_centroid(v, &centroids.centroids));
        let groups = group_by_label((0..set.len()).zip(labels));
        let clusters = self.bound_groups(set, groups)?;

        let refreshed = self.fit_centroids(set)?;
        Ok(Partition {
            clusters,
            centroids: refreshed,
        })
    }

    /// Incremental when `centroids_path` points at an existing file, batch
    /// otherwise. Fitted centroids are written back whenever a path is given.
    pub fn run(&self, set: &EmbeddingSet, centroids_path: Option<&Path>) -> ClusterResult<ClusterMap> {
        let incremental = centroids_path.is_some_and(Path::exists);
        let partition = match centroids_path {
            Some(path) if incremental => {
                let existing = CentroidSet::load(path)?;
                info!(
                    centroids = existing.len(),
                    path = %path.display(),
                    "partitioning incrementally against persisted centroids"
                );
                self.partition_incremental(set, &existing)?
            }
            _ => self.partition_batch(set)?,
        };

        if let Some(path) = centroids_path {
            if !partition.centroids.is_empty() {
                partition.centroids.save(path)?;
            }
        }

        obs::emit_partition_finished(set.len(), partition.clusters.len(), incremental);
        Ok(partition.clusters)
    }

    fn fit_centroids(&self, set: &EmbeddingSet) -> ClusterResult<CentroidSet> {
        let points: Vec<&[f32]> = set.vectors.iter().map(|v| v.as_slice()).collect();
        let k = self.config.initial_k.min(points.len());
        let fit = kmeans(&points, k, self.config.seed)?;
        Ok(CentroidSet {
            centroids: fit.centroids,
        })
    }

    /// Drain `groups` (indices into `set`) breadth-first, splitting any group
    /// above the size cap.
    fn bound_groups(&self, set: &EmbeddingSet, groups: Vec<Vec<usize>>) -> ClusterResult<ClusterMap> {
        let max = self.config.max_cluster_size;
        let mut queue: VecDeque<Vec<usize>> = groups.into_iter().collect();
        let mut clusters = ClusterMap::new();

        while let Some(group) = queue.pop_front() {
            if group.len() <= max {
                let members = group.iter().map(|&i| set.ids[i].clone()).collect();
                clusters.insert(clusters.len(), members);
                continue;
            }

            let k = group.len().div_ceil(max);
            let points: Vec<&[f32]> = group.iter().map(|&i| set.vectors[i].as_slice()).collect();
            let fit = kmeans(&points, k, self.config.seed)?;

            let mut parts: Vec<Vec<usize>> = vec![Vec::new(); k];
            for (&member, &label) in group.iter().zip(fit.assignments.iter()) {
                parts[label].push(member);
            }

            for part in parts.into_iter().filter(|p| !p.is_empty()) {
                if part.len() >= group.len() {
                    return Err(ClusterError::NonShrinkingSplit {
                        size: group.len(),
                        k,
                    });
                }
                queue.push_back(part);
            }
        }

        Ok(clusters)
    }
}

/// Group indices by label, ordering groups by first appearance of each label.
fn group_by_label(labelled: impl Iterator<Item = (usize, usize)>) -> Vec<Vec<usize>> {
    let mut slot: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, label) in labelled {
        let at = *slot.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[at].push(index);
    }
    groups
}
