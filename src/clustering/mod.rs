//! Clustering Engine: groups message embeddings into topic-bearing clusters.
//!
//! Both methods produce a label per point; post-processing is shared:
//! drop clusters smaller than `min_members`, compute centroid / keywords /
//! representatives from the original (unscaled) vectors, sort by size
//! descending with ties on the original label, then renumber densely.

pub mod hdbscan;
pub mod kmeans;
pub mod scaling;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{ClusteringConfig, ClusteringMethod};
use crate::processing::Preprocessor;
use crate::{TopicsError, TopicsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Dense 0-based id, assigned after the size sort.
    pub id: usize,
    pub size: usize,
    pub member_texts: Vec<String>,
    pub keywords: Vec<String>,
    pub representative_texts: Vec<String>,
    pub centroid: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    pub clusters: Vec<Cluster>,
    pub noise_count: usize,
    pub total_messages: usize,
}

impl ClusterSet {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Result of one clustering call. `Failed` never escapes as an error: it
/// degrades to the empty set.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringOutcome {
    Clustered(ClusterSet),
    /// No surviving cluster: empty input or everything noise.
    Empty(ClusterSet),
    Failed { reason: String },
}

impl ClusteringOutcome {
    pub fn into_cluster_set(self) -> ClusterSet {
        match self {
            Self::Clustered(set) | Self::Empty(set) => set,
            Self::Failed { .. } => ClusterSet::default(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringStats {
    pub method: String,
    pub cluster_count: usize,
    pub avg_cluster_size: f64,
    pub max_cluster_size: usize,
    pub min_cluster_size: usize,
    pub noise_count: usize,
    pub noise_percentage: f64,
    pub total_messages: usize,
}

pub struct ClusteringEngine {
    config: ClusteringConfig,
    preprocessor: Arc<Preprocessor>,
}

impl ClusteringEngine {
    pub fn new(config: ClusteringConfig, preprocessor: Arc<Preprocessor>) -> Self {
        Self {
            config,
            preprocessor,
        }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn method(&self) -> ClusteringMethod {
        self.config.method
    }

    /// Cluster `vectors` (parallel to `texts`), degrading failures to the
    /// empty set.
    pub fn cluster(&self, vectors: &[Vec<f32>], texts: &[String]) -> ClusterSet {
        self.run(vectors, texts).into_cluster_set()
    }

    pub fn run(&self, vectors: &[Vec<f32>], texts: &[String]) -> ClusteringOutcome {
        if vectors.is_empty() && texts.is_empty() {
            return ClusteringOutcome::Empty(ClusterSet::default());
        }

        match self.labels(vectors, texts) {
            Ok(labels) => {
                let set = self.post_process(&labels, vectors, texts);
                tracing::info!(
                    method = self.config.method.as_str(),
                    points = set.total_messages,
                    clusters = set.clusters.len(),
                    noise = set.noise_count,
                    "Clustering complete"
                );
                if set.is_empty() {
                    ClusteringOutcome::Empty(set)
                } else {
                    ClusteringOutcome::Clustered(set)
                }
            }
            Err(e) => {
                tracing::warn!(
                    method = self.config.method.as_str(),
                    error = %e,
                    "Clustering failed, continuing with no clusters"
                );
                ClusteringOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn labels(&self, vectors: &[Vec<f32>], texts: &[String]) -> TopicsResult<Vec<Option<usize>>> {
        if vectors.len() != texts.len() {
            return Err(TopicsError::InvalidInput(format!(
                "{} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        let data = scaling::to_matrix(vectors)?;
        let data = if self.config.standardize {
            scaling::standardize(&data)
        } else {
            data
        };
        let n = data.nrows();

        match self.config.method {
            ClusteringMethod::Density => {
                let params = hdbscan::HdbscanParams {
                    min_cluster_size: hdbscan::auto_min_cluster_size(n, self.config.min_cluster_size),
                    min_samples: self.config.min_samples,
                };
                tracing::debug!(
                    points = n,
                    min_cluster_size = params.min_cluster_size,
                    min_samples = params.min_samples,
                    "Running HDBSCAN"
                );
                Ok(hdbscan::fit(&data, params))
            }
            ClusteringMethod::Centroid => {
                let params = kmeans::KMeansParams {
                    k: kmeans::target_k(n),
                    seed: self.config.kmeans_seed,
                    restarts: self.config.kmeans_restarts,
                    max_iterations: self.config.kmeans_max_iterations,
                    tolerance: self.config.kmeans_tolerance,
                };
                tracing::debug!(points = n, k = params.k, "Running k-means");
                kmeans::fit(&data, params)
            }
        }
    }

    fn post_process(&self, labels: &[Option<usize>], vectors: &[Vec<f32>], texts: &[String]) -> ClusterSet {
        let total = labels.len();

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            if let Some(label) = label {
                groups.entry(*label).or_default().push(i);
            }
        }

        // BTreeMap order = label ascending; the stable sort keeps it for ties.
        let mut clusters: Vec<Cluster> = groups
            .into_values()
            .filter(|members| members.len() >= self.config.min_members)
            .map(|members| self.build_cluster(&members, vectors, texts))
            .collect();
        clusters.sort_by(|a, b| b.size.cmp(&a.size));
        for (id, cluster) in clusters.iter_mut().enumerate() {
            cluster.id = id;
        }

        let clustered: usize = clusters.iter().map(|c| c.size).sum();
        ClusterSet {
            clusters,
            noise_count: total - clustered,
            total_messages: total,
        }
    }

    fn build_cluster(&self, members: &[usize], vectors: &[Vec<f32>], texts: &[String]) -> Cluster {
        let dim = vectors[members[0]].len();
        let mut sums = vec![0.0f64; dim];
        for &i in members {
            for (s, v) in sums.iter_mut().zip(&vectors[i]) {
                *s += *v as f64;
            }
        }
        let count = members.len() as f64;
        let centroid: Vec<f32> = sums.iter().map(|s| (s / count) as f32).collect();

        let mut by_distance: Vec<(usize, f64)> = members
            .iter()
            .map(|&i| (i, euclidean_f32(&vectors[i], &centroid)))
            .collect();
        by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let member_texts: Vec<String> = members.iter().map(|&i| texts[i].clone()).collect();
        let representative_texts = by_distance
            .iter()
            .take(self.config.max_representatives)
            .map(|&(i, _)| texts[i].clone())
            .collect();
        let keywords = self
            .preprocessor
            .extract_keywords(&member_texts, self.config.max_keywords);

        Cluster {
            id: 0,
            size: members.len(),
            member_texts,
            keywords,
            representative_texts,
            centroid,
        }
    }

    pub fn stats(&self, set: &ClusterSet) -> ClusteringStats {
        let sizes: Vec<usize> = set.clusters.iter().map(|c| c.size).collect();
        let avg = if sizes.is_empty() {
            0.0
        } else {
            sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
        };
        let noise_percentage = if set.total_messages == 0 {
            0.0
        } else {
            set.noise_count as f64 / set.total_messages as f64 * 100.0
        };

        ClusteringStats {
            method: self.config.method.as_str().to_string(),
            cluster_count: sizes.len(),
            avg_cluster_size: avg,
            max_cluster_size: sizes.iter().copied().max().unwrap_or(0),
            min_cluster_size: sizes.iter().copied().min().unwrap_or(0),
            noise_count: set.noise_count,
            noise_percentage,
            total_messages: set.total_messages,
        }
    }
}

fn euclidean_f32(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64 - *y as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(method: ClusteringMethod) -> ClusteringEngine {
        let config = ClusteringConfig {
            method,
            ..ClusteringConfig::default()
        };
        ClusteringEngine::new(config, Arc::new(Preprocessor::default()))
    }

    /// `sizes[g]` points per group; group `g` sits on axis `g` with a small
    /// per-point offset on the last axis.
    fn groups(sizes: &[usize]) -> (Vec<Vec<f32>>, Vec<String>) {
        let dim = sizes.len() + 1;
        let topics = ["python code question", "meetup talk schedule", "hiring jobs remote", "garden flowers spring"];
        let mut vectors = Vec::new();
        let mut texts = Vec::new();
        for (g, &size) in sizes.iter().enumerate() {
            for i in 0..size {
                let mut v = vec![0.0f32; dim];
                v[g] = 10.0;
                v[dim - 1] = i as f32 * 0.01;
                vectors.push(v);
                texts.push(format!("{} item{}", topics[g % topics.len()], i));
            }
        }
        (vectors, texts)
    }

    #[test]
    fn test_empty_input() {
        let outcome = engine(ClusteringMethod::Density).run(&[], &[]);
        assert_eq!(outcome, ClusteringOutcome::Empty(ClusterSet::default()));
    }

    #[test]
    fn test_density_dense_ids_and_sorted_sizes() {
        let (vectors, texts) = groups(&[8, 20, 12]);
        let set = engine(ClusteringMethod::Density).cluster(&vectors, &texts);
        assert_eq!(set.clusters.len(), 3);
        assert_eq!(set.total_messages, 40);
        assert_eq!(set.noise_count, 0);
        for (i, c) in set.clusters.iter().enumerate() {
            assert_eq!(c.id, i);
        }
        let sizes: Vec<usize> = set.clusters.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![20, 12, 8]);
        assert_eq!(set.clusters[0].keywords[0], "meetup");
    }

    #[test]
    fn test_centroid_method_clusters() {
        let (vectors, texts) = groups(&[10, 10, 10]);
        let set = engine(ClusteringMethod::Centroid).cluster(&vectors, &texts);
        assert_eq!(set.clusters.len(), 3);
        assert!(set.clusters.windows(2).all(|w| w[0].size >= w[1].size));
        assert_eq!(set.noise_count, 0);
    }

    #[test]
    fn test_representatives_nearest_centroid() {
        let (vectors, texts) = groups(&[10, 10, 10]);
        let set = engine(ClusteringMethod::Density).cluster(&vectors, &texts);
        let cluster = &set.clusters[0];
        assert_eq!(cluster.representative_texts.len(), 5);
        assert!(cluster.keywords.len() <= 8);
        // Offsets 0.00..0.09 center on 0.045: items 4 and 5 are nearest.
        let nearest: Vec<&String> = cluster.representative_texts[..2].iter().collect();
        assert!(nearest.iter().any(|t| t.ends_with("item4")));
        assert!(nearest.iter().any(|t| t.ends_with("item5")));
        assert!(cluster
            .representative_texts
            .iter()
            .all(|t| !t.ends_with("item0") && !t.ends_with("item9")));
    }

    #[test]
    fn test_ties_keep_label_order() {
        let (vectors, texts) = groups(&[10, 10, 10]);
        let set = engine(ClusteringMethod::Density).cluster(&vectors, &texts);
        let sizes: Vec<usize> = set.clusters.iter().map(|c| c.size).collect();
        assert_eq!(sizes, vec![10, 10, 10]);
        let mut ids: Vec<usize> = set.clusters.iter().map(|c| c.id).collect();
        ids.dedup();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_too_few_points_for_kmeans_degrades_to_empty() {
        let (vectors, texts) = groups(&[2, 2]);
        let outcome = engine(ClusteringMethod::Centroid).run(&vectors, &texts);
        assert!(outcome.is_failed());
        assert_eq!(outcome.into_cluster_set(), ClusterSet::default());
    }

    #[test]
    fn test_kmeans_error_becomes_failure() {
        let vectors = vec![vec![1.0f32, 1.0]; 20];
        let texts: Vec<String> = (0..20).map(|i| format!("same point text {}", i)).collect();
        let outcome = engine(ClusteringMethod::Centroid).run(&vectors, &texts);
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_length_mismatch_is_failure() {
        let (vectors, _) = groups(&[5]);
        let outcome = engine(ClusteringMethod::Density).run(&vectors, &["only one".to_string()]);
        assert!(outcome.is_failed());
    }

    #[test]
    fn test_all_noise() {
        // Four evenly spread points never form a cluster of three.
        let vectors = vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
        ];
        let texts: Vec<String> = (0..4).map(|i| format!("text number {}", i)).collect();
        let set = engine(ClusteringMethod::Density).cluster(&vectors, &texts);
        assert!(set.clusters.is_empty());
        assert_eq!(set.noise_count, 4);
        assert_eq!(set.total_messages, 4);
    }

    #[test]
    fn test_small_clusters_dropped_into_noise() {
        let mut config = ClusteringConfig::default();
        config.min_members = 11;
        let engine = ClusteringEngine::new(config, Arc::new(Preprocessor::default()));
        let (vectors, texts) = groups(&[20, 10, 10]);
        let set = engine.cluster(&vectors, &texts);
        assert_eq!(set.clusters.len(), 1);
        assert_eq!(set.noise_count, 20);
    }

    #[test]
    fn test_stats() {
        let (vectors, texts) = groups(&[20, 10, 10]);
        let engine = engine(ClusteringMethod::Density);
        let set = engine.cluster(&vectors, &texts);
        let stats = engine.stats(&set);
        assert_eq!(stats.method, "density");
        assert_eq!(stats.cluster_count, 3);
        assert_eq!(stats.max_cluster_size, 20);
        assert_eq!(stats.min_cluster_size, 10);
        assert_eq!(stats.noise_percentage, 0.0);

        let empty = engine.stats(&ClusterSet::default());
        assert_eq!(empty.noise_percentage, 0.0);
        assert_eq!(empty.avg_cluster_size, 0.0);
    }
}
