//! Hierarchical clustering of shipment locations for map display
//!
//! Nearby locations are merged bottom-up with Ward's minimum-variance linkage
//! over the haversine distance matrix. Cutting the resulting merge tree at a
//! height (in kilometers) yields the cluster ids, and the location aggregates
//! are then re-rolled per (cluster, country) into map-ready rows.

use ndarray::Array2;
use serde::Serialize;
use std::collections::HashMap;

use crate::geo;
use crate::grouping::LocationAggregate;

/// Default cut height in kilometers.
pub const DEFAULT_CUT_HEIGHT_KM: f64 = 100.0;

/// One agglomerative merge step.
///
/// `left` and `right` are the representative point indices of the two merged
/// clusters; `height` is the Ward linkage distance at which they merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

/// Agglomerative merge tree over a set of points, stored as an explicit
/// arena of merge steps in merge order.
#[derive(Debug, Clone)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_points: usize,
}

impl Dendrogram {
    /// Build the merge tree from a pairwise distance matrix using Ward's
    /// linkage (Lance-Williams update in distance form).
    ///
    /// Only the upper triangle of the input is read, so a non-symmetric
    /// matrix is silently symmetrized from its upper half. The minimum-pair
    /// scan breaks ties on the lowest index pair and uses no randomness, so
    /// identical inputs always produce identical trees.
    pub fn build(matrix: &Array2<f64>) -> crate::Result<Self> {
        let n = matrix.nrows();
        if n == 0 || matrix.ncols() != n {
            anyhow::bail!(
                "clustering: distance matrix must be square and non-empty, got {}x{}",
                n,
                matrix.ncols()
            );
        }

        // Working copy, symmetrized from the upper triangle
        let mut work = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = matrix[[i, j]];
                work[[i, j]] = d;
                work[[j, i]] = d;
            }
        }

        let mut active = vec![true; n];
        let mut sizes = vec![1usize; n];
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for _ in 0..n.saturating_sub(1) {
            // Find the closest active pair, lowest indices winning ties
            let mut min_dist = f64::INFINITY;
            let mut min_i = 0;
            let mut min_j = 0;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if active[j] && work[[i, j]] < min_dist {
                        min_dist = work[[i, j]];
                        min_i = i;
                        min_j = j;
                    }
                }
            }

            // Ward update: distance from the merged cluster to every other
            // active cluster, sized by the pre-merge member counts
            let (ni, nj) = (sizes[min_i] as f64, sizes[min_j] as f64);
            for k in 0..n {
                if !active[k] || k == min_i || k == min_j {
                    continue;
                }
                let nk = sizes[k] as f64;
                let d_ik = work[[min_i, k]];
                let d_jk = work[[min_j, k]];
                // Rounding can push the squared distance slightly negative
                let d = (((ni + nk) * d_ik * d_ik + (nj + nk) * d_jk * d_jk
                    - nk * min_dist * min_dist)
                    / (ni + nj + nk))
                    .max(0.0)
                    .sqrt();
                work[[min_i, k]] = d;
                work[[k, min_i]] = d;
            }

            active[min_j] = false;
            sizes[min_i] += sizes[min_j];
            merges.push(Merge {
                left: min_i,
                right: min_j,
                height: min_dist,
                size: sizes[min_i],
            });
        }

        Ok(Self { merges, n_points: n })
    }

    /// Merge steps in merge order.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flatten the tree into per-point cluster ids by applying every merge
    /// whose height is at or below the threshold.
    ///
    /// Ids are renumbered contiguously from 0 in point order. A height of 0
    /// leaves every distinct point in its own cluster; a very large height
    /// merges everything into one.
    pub fn cut(&self, height: f64) -> Vec<usize> {
        let mut labels: Vec<usize> = (0..self.n_points).collect();

        for merge in &self.merges {
            if merge.height > height {
                continue;
            }
            let keep = labels[merge.left];
            let absorbed = labels[merge.right];
            for label in labels.iter_mut() {
                if *label == absorbed {
                    *label = keep;
                }
            }
        }

        // Renumber to contiguous ids in first-seen point order
        let mut remap: HashMap<usize, usize> = HashMap::new();
        for label in labels.iter_mut() {
            let next = remap.len();
            *label = *remap.entry(*label).or_insert(next);
        }

        labels
    }
}

/// One map-ready cluster row: all locations of one cluster within one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAggregate {
    pub cluster: usize,
    pub country: String,
    /// Centroid longitude, the mean over member locations
    pub lng: f64,
    /// Centroid latitude, the mean over member locations
    pub lat: f64,
    /// Member city names, comma-separated in grouping order
    pub city: String,
    pub card_value: f64,
    pub card_count: u64,
    pub shipping: f64,
    pub order_count: u64,
    /// Number of member locations folded into this row
    pub locations: u64,
}

/// Cluster nearby locations and re-roll their aggregates per (cluster, country).
///
/// The country is part of the grouping key, so a spatial cluster straddling a
/// border produces one row per country. Rows are stable-sorted descending by
/// member count, which downstream map rendering relies on for marker sizing.
pub fn cluster_locations(
    locations: &[LocationAggregate],
    height: f64,
) -> crate::Result<Vec<ClusterAggregate>> {
    let points: Vec<(f64, f64)> = locations.iter().map(|l| (l.lat, l.lng)).collect();
    let matrix = geo::distance_matrix(&points)?;
    let labels = Dendrogram::build(&matrix)?.cut(height);

    // Group members per (cluster, country) in first-seen order
    let mut index: HashMap<(usize, &str), usize> = HashMap::new();
    let mut groups: Vec<(usize, Vec<&LocationAggregate>)> = Vec::new();
    for (location, &cluster) in locations.iter().zip(&labels) {
        match index.get(&(cluster, location.country.as_str())) {
            Some(&at) => groups[at].1.push(location),
            None => {
                index.insert((cluster, location.country.as_str()), groups.len());
                groups.push((cluster, vec![location]));
            }
        }
    }

    let mut rows: Vec<ClusterAggregate> = groups
        .iter()
        .map(|(cluster, members)| {
            let count = members.len() as f64;
            let mut row = ClusterAggregate {
                cluster: *cluster,
                country: members[0].country.clone(),
                lng: members.iter().map(|m| m.lng).sum::<f64>() / count,
                lat: members.iter().map(|m| m.lat).sum::<f64>() / count,
                city: members.iter().map(|m| m.city.as_str()).collect::<Vec<_>>().join(", "),
                card_value: 0.0,
                card_count: 0,
                shipping: 0.0,
                order_count: 0,
                locations: members.len() as u64,
            };
            for member in members {
                row.card_value += member.card_value;
                row.card_count += member.card_count;
                row.shipping += member.shipping;
                row.order_count += member.order_count;
            }
            row
        })
        .collect();

    // Stable sort keeps the grouping order among equally sized clusters
    rows.sort_by(|a, b| b.locations.cmp(&a.locations));

    Ok(rows)
}
