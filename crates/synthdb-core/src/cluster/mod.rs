//! Cluster: partition tables into schema-sized groups by embedding.
//!
//! # Modules
//!
//! - [`kmeans`]      — seeded Euclidean k-means (`kmeans()`, `nearest_centroid()`)
//! - [`partitioner`] — `ClusterPartitioner`, batch and incremental modes
//! - [`store`]       — `EmbeddingSet`, `CentroidSet`, `ClusterMap`
//! - [`error`]       — `ClusterError` / `ClusterResult`

pub mod error;
pub mod kmeans;
pub mod partitioner;
pub mod store;

pub use error::{ClusterError, ClusterResult};
pub use kmeans::{kmeans, nearest_centroid, squared_distance, KMeansResult};
pub use partitioner::{ClusterPartitioner, Partition, PartitionConfig};
pub use store::{CentroidSet, ClusterMap, EmbeddingSet};
