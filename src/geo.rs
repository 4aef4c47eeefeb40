//! Great-circle distance computation between shipment locations

use ndarray::Array2;

/// Mean Earth radius in kilometers, spherical approximation
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two (lat, lng) points in degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lng1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lng2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    // Clamp guards against sqrt(h) nudging past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Pairwise distance matrix over (lat, lng) degree points.
///
/// Each pair is computed once and mirrored, so the result is symmetric by
/// construction with an exactly-zero diagonal. A single point yields a 1x1
/// zero matrix; an empty slice is an error, since there is nothing to cluster.
pub fn distance_matrix(points: &[(f64, f64)]) -> crate::Result<Array2<f64>> {
    if points.is_empty() {
        anyhow::bail!("clustering: no geocoded locations to build a distance matrix from");
    }

    let n = points.len();
    let mut matrix = Array2::zeros((n, n));

    for i in 0..n {
        for j in (i + 1)..n {
            let d = haversine_km(points[i], points[j]);
            matrix[[i, j]] = d;
            matrix[[j, i]] = d;
        }
    }

    Ok(matrix)
}
