//! HDBSCAN: density clustering with noise.
//!
//! Pipeline: core distances → mutual reachability → Prim MST → single-linkage
//! merges → condensed tree → excess-of-mass selection. The root cluster is
//! never selected, so a dataset without any dense split comes back all noise.
//! O(n²) memory in the distance matrix; inputs are bounded by the period cap.

use ndarray::Array2;

use super::scaling;

#[derive(Debug, Clone, Copy)]
pub struct HdbscanParams {
    pub min_cluster_size: usize,
    pub min_samples: usize,
}

/// `min(floor, max(3, n / 20))`, never below 2.
pub fn auto_min_cluster_size(n: usize, floor: usize) -> usize {
    floor.min((n / 20).max(3)).max(2)
}

/// Cluster label per point, `None` for noise. Labels are arbitrary but
/// ordered by discovery (parents before children).
pub fn fit(data: &Array2<f64>, params: HdbscanParams) -> Vec<Option<usize>> {
    let n = data.nrows();
    if n < 2 {
        return vec![None; n];
    }

    let dist = scaling::pairwise_distances(data);
    let core = core_distances(&dist, params.min_samples);
    let edges = minimum_spanning_tree(&dist, &core);
    let merges = single_linkage(n, edges);
    let tree = CondensedTree::build(n, &merges, params.min_cluster_size.max(2));
    let selected = tree.select_clusters();

    tracing::debug!(
        points = n,
        condensed_clusters = tree.parent.len(),
        selected = selected.iter().filter(|s| **s).count(),
        "HDBSCAN hierarchy condensed"
    );
    tree.label_points(&selected)
}

/// Distance to the `min_samples`-th nearest point, the point itself included.
fn core_distances(dist: &Array2<f64>, min_samples: usize) -> Vec<f64> {
    let n = dist.nrows();
    let k = min_samples.clamp(1, n);
    (0..n)
        .map(|i| {
            let mut row = dist.row(i).to_vec();
            row.sort_by(f64::total_cmp);
            row[k - 1]
        })
        .collect()
}

/// Prim over the implicit complete graph of mutual-reachability distances.
fn minimum_spanning_tree(dist: &Array2<f64>, core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = core.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        let mut next = None;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let reach = dist[[current, j]].max(core[current]).max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                from[j] = current;
            }
            match next {
                Some(k) if best[k] <= best[j] => {}
                _ => next = Some(j),
            }
        }
        let Some(next) = next else { break };
        in_tree[next] = true;
        edges.push((from[next], next, best[next]));
        current = next;
    }
    edges
}

struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// Union-find over MST edges sorted by weight. Merge `i` creates node `n + i`.
fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<Merge> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));

    let total = 2 * n - 1;
    let mut parent: Vec<usize> = (0..total).collect();
    let mut size = vec![1usize; total];
    let mut merges = Vec::with_capacity(edges.len());

    for (i, (a, b, distance)) in edges.into_iter().enumerate() {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        let node = n + i;
        size[node] = size[ra] + size[rb];
        parent[ra] = node;
        parent[rb] = node;
        merges.push(Merge {
            left: ra,
            right: rb,
            distance,
            size: size[node],
        });
    }
    merges
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    while parent[x] != root {
        let next = parent[x];
        parent[x] = root;
        x = next;
    }
    root
}

/// Clusters of the condensed tree, indexed by label. Label 0 is the root.
struct CondensedTree {
    parent: Vec<Option<usize>>,
    birth: Vec<f64>,
    children: Vec<Vec<usize>>,
    stability: Vec<f64>,
    /// Label of the cluster each point fell out of.
    point_cluster: Vec<usize>,
}

impl CondensedTree {
    fn build(n: usize, merges: &[Merge], min_cluster_size: usize) -> Self {
        let mut tree = Self {
            parent: vec![None],
            birth: vec![0.0],
            children: vec![vec![]],
            stability: vec![0.0],
            point_cluster: vec![0; n],
        };
        let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };

        let root = 2 * n - 2;
        let mut stack = vec![(root, 0usize)];
        while let Some((node, label)) = stack.pop() {
            if node < n {
                let lambda = tree.birth[label];
                tree.drop_points(node, label, lambda, n, merges);
                continue;
            }

            let merge = &merges[node - n];
            let lambda = 1.0 / merge.distance.max(f64::EPSILON);
            let left_big = node_size(merge.left) >= min_cluster_size;
            let right_big = node_size(merge.right) >= min_cluster_size;

            match (left_big, right_big) {
                (true, true) => {
                    for child in [merge.left, merge.right] {
                        let child_label = tree.new_cluster(label, lambda);
                        tree.stability[label] +=
                            (lambda - tree.birth[label]) * node_size(child) as f64;
                        stack.push((child, child_label));
                    }
                }
                (true, false) => {
                    tree.drop_points(merge.right, label, lambda, n, merges);
                    stack.push((merge.left, label));
                }
                (false, true) => {
                    tree.drop_points(merge.left, label, lambda, n, merges);
                    stack.push((merge.right, label));
                }
                (false, false) => {
                    tree.drop_points(merge.left, label, lambda, n, merges);
                    tree.drop_points(merge.right, label, lambda, n, merges);
                }
            }
        }
        tree
    }

    fn new_cluster(&mut self, parent: usize, birth: f64) -> usize {
        let label = self.parent.len();
        self.parent.push(Some(parent));
        self.birth.push(birth);
        self.children.push(vec![]);
        self.stability.push(0.0);
        self.children[parent].push(label);
        label
    }

    /// Every point under `node` leaves cluster `label` at `lambda`.
    fn drop_points(&mut self, node: usize, label: usize, lambda: f64, n: usize, merges: &[Merge]) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current < n {
                self.point_cluster[current] = label;
                self.stability[label] += lambda - self.birth[label];
            } else {
                let merge = &merges[current - n];
                stack.push(merge.left);
                stack.push(merge.right);
            }
        }
    }

    /// Excess of mass, leaves first. Ties keep the parent.
    fn select_clusters(&self) -> Vec<bool> {
        let count = self.parent.len();
        let mut selected = vec![false; count];
        let mut value = self.stability.clone();

        for label in (1..count).rev() {
            let children = &self.children[label];
            let child_total: f64 = children.iter().map(|&c| value[c]).sum();
            if !children.is_empty() && child_total > self.stability[label] {
                value[label] = child_total;
            } else {
                selected[label] = true;
                let mut stack = children.clone();
                while let Some(descendant) = stack.pop() {
                    selected[descendant] = false;
                    stack.extend(self.children[descendant].iter().copied());
                }
            }
        }
        selected
    }

    /// A point belongs to its nearest selected ancestor-or-self cluster.
    fn label_points(&self, selected: &[bool]) -> Vec<Option<usize>> {
        self.point_cluster
            .iter()
            .map(|&start| {
                let mut current = Some(start);
                while let Some(label) = current {
                    if selected[label] {
                        return Some(label);
                    }
                    current = self.parent[label];
                }
                None
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `per_blob` points on a 0.1-spaced grid around each center, flattened.
    fn blob_rows(centers: &[(f64, f64)], per_blob: usize) -> Vec<f64> {
        let mut rows = Vec::new();
        for &(cx, cy) in centers {
            for i in 0..per_blob {
                rows.push(cx + (i % 3) as f64 * 0.1);
                rows.push(cy + (i / 3) as f64 * 0.1);
            }
        }
        rows
    }

    fn blobs(centers: &[(f64, f64)], per_blob: usize) -> Array2<f64> {
        let rows = blob_rows(centers, per_blob);
        Array2::from_shape_vec((rows.len() / 2, 2), rows).unwrap()
    }

    fn params(min_cluster_size: usize) -> HdbscanParams {
        HdbscanParams {
            min_cluster_size,
            min_samples: 2,
        }
    }

    #[test]
    fn test_auto_min_cluster_size() {
        assert_eq!(auto_min_cluster_size(40, 8), 3);
        assert_eq!(auto_min_cluster_size(100, 8), 5);
        assert_eq!(auto_min_cluster_size(400, 8), 8);
        assert_eq!(auto_min_cluster_size(10, 1), 2);
    }

    #[test]
    fn test_three_separated_blobs() {
        let data = blobs(&[(0.0, 0.0), (20.0, 0.0), (0.0, 20.0)], 9);
        let labels = fit(&data, params(3));
        assert!(labels.iter().all(|l| l.is_some()));
        for blob in 0..3 {
            let first = labels[blob * 9];
            assert!(labels[blob * 9..(blob + 1) * 9].iter().all(|l| *l == first));
        }
        assert_ne!(labels[0], labels[9]);
        assert_ne!(labels[9], labels[18]);
        assert_ne!(labels[0], labels[18]);
    }

    #[test]
    fn test_outliers_are_noise() {
        let mut data = blob_rows(&[(0.0, 0.0), (20.0, 0.0)], 9);
        data.extend_from_slice(&[100.0, 100.0, -100.0, 60.0]);
        let data = Array2::from_shape_vec((20, 2), data).unwrap();
        let labels = fit(&data, params(3));
        assert_eq!(labels[18], None);
        assert_eq!(labels[19], None);
        assert!(labels[..18].iter().all(|l| l.is_some()));
    }

    #[test]
    fn test_single_blob_is_noise() {
        // The root is never selected; one undivided blob has no dense split.
        let data = blobs(&[(0.0, 0.0)], 4);
        let labels = fit(&data, params(5));
        assert!(labels.iter().all(|l| l.is_none()));
    }

    #[test]
    fn test_tiny_inputs() {
        assert!(fit(&Array2::zeros((0, 2)), params(3)).is_empty());
        assert_eq!(fit(&Array2::zeros((1, 2)), params(3)), vec![None]);
    }

    #[test]
    fn test_single_linkage_sizes() {
        let merges = single_linkage(3, vec![(0, 1, 2.0), (1, 2, 1.0)]);
        assert_eq!(merges.len(), 2);
        assert_eq!(merges[0].distance, 1.0);
        assert_eq!(merges[0].size, 2);
        assert_eq!(merges[1].size, 3);
    }
}
