//! N×N travel-time matrix in minutes: persistent cache probe, blocked
//! provider calls for the misses, haversine estimate for whatever is
//! left. Every returned cell is finite; the diagonal is zero.

use std::time::Instant;

use chrono::{Duration, Utc};
use log::warn;
use model::{cache::MatrixCacheEntry, Coordinate};
use utility::geo::haversine_minutes;

use crate::{
    billing,
    provider::MatrixProvider,
    store::{BillingRepo, MatrixCacheRepo},
};

/// Per-axis cache tolerance in degrees, ≈55 m at this latitude.
pub const MATRIX_TOLERANCE_DEG: f64 = 0.0005;

#[allow(clippy::too_many_arguments)]
pub async fn matrix_nxn<S>(
    store: &S,
    provider: Option<&dyn MatrixProvider>,
    points: &[Coordinate],
    block_size: usize,
    speed_kmh: f64,
    cache_ttl_secs: i64,
    run_id: &str,
) -> Vec<Vec<f64>>
where
    S: MatrixCacheRepo + BillingRepo + Sync + ?Sized,
{
    let n = points.len();
    let mut matrix: Vec<Vec<Option<f64>>> = vec![vec![None; n]; n];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] = Some(0.0);
    }

    let now = Utc::now();
    let block_size = block_size.max(1);

    for block_i in (0..n).step_by(block_size) {
        let origins_idx: Vec<usize> =
            (block_i..(block_i + block_size).min(n)).collect();
        for block_j in (0..n).step_by(block_size) {
            let dests_idx: Vec<usize> =
                (block_j..(block_j + block_size).min(n)).collect();

            // Cache probe for every off-diagonal pair of the block.
            let mut misses = false;
            for &gi in &origins_idx {
                for &gj in &dests_idx {
                    if gi == gj || matrix[gi][gj].is_some() {
                        continue;
                    }
                    match store
                        .matrix_cache_lookup(
                            points[gi],
                            points[gj],
                            MATRIX_TOLERANCE_DEG,
                            now,
                        )
                        .await
                    {
                        Ok(Some(duration_sec)) => {
                            matrix[gi][gj] = Some(duration_sec / 60.0);
                        }
                        Ok(None) => misses = true,
                        Err(why) => {
                            warn!("matrix cache lookup failed: {why}");
                            misses = true;
                        }
                    }
                }
            }

            if !misses {
                continue;
            }
            let Some(provider) = provider else { continue };

            let origins: Vec<Coordinate> =
                origins_idx.iter().map(|&i| points[i]).collect();
            let dests: Vec<Coordinate> =
                dests_idx.iter().map(|&j| points[j]).collect();

            let started = Instant::now();
            let outcome = provider.matrix_block(&origins, &dests).await;
            let latency_ms = started.elapsed().as_millis() as i32;
            let units = (origins.len() * dests.len()) as i32;

            match outcome {
                Ok(durations) => {
                    billing::record(
                        store,
                        run_id,
                        "matrix",
                        provider.name(),
                        "matrix",
                        units,
                        Some(200),
                        latency_ms,
                    )
                    .await;
                    for (oi, row) in durations.iter().enumerate() {
                        for (di, cell) in row.iter().enumerate() {
                            let (Some(&gi), Some(&gj)) =
                                (origins_idx.get(oi), dests_idx.get(di))
                            else {
                                continue;
                            };
                            if gi == gj {
                                continue;
                            }
                            if let Some(duration_sec) = cell {
                                if matrix[gi][gj].is_none() {
                                    matrix[gi][gj] = Some(duration_sec / 60.0);
                                    save_cache(
                                        store,
                                        points[gi],
                                        points[gj],
                                        *duration_sec,
                                        cache_ttl_secs,
                                        provider.name(),
                                    )
                                    .await;
                                }
                            }
                        }
                    }
                }
                Err(why) => {
                    warn!("matrix provider {} error: {why}", provider.name());
                    billing::record(
                        store,
                        run_id,
                        "matrix",
                        provider.name(),
                        "matrix",
                        units,
                        why.status.map(i32::from),
                        latency_ms,
                    )
                    .await;
                }
            }
        }
    }

    // Whatever is still missing gets the straight-line estimate. No
    // sentinel values ever leave this function.
    matrix
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            row.into_iter()
                .enumerate()
                .map(|(j, cell)| {
                    cell.unwrap_or_else(|| {
                        haversine_minutes(
                            points[i].lat,
                            points[i].lng,
                            points[j].lat,
                            points[j].lng,
                            speed_kmh,
                        )
                    })
                })
                .collect()
        })
        .collect()
}

/// 1×N row, for the return-to-depot style checks.
#[allow(clippy::too_many_arguments)]
pub async fn matrix_1xn<S>(
    store: &S,
    provider: Option<&dyn MatrixProvider>,
    origin: Coordinate,
    destinations: &[Coordinate],
    block_size: usize,
    speed_kmh: f64,
    cache_ttl_secs: i64,
    run_id: &str,
) -> Vec<f64>
where
    S: MatrixCacheRepo + BillingRepo + Sync + ?Sized,
{
    let mut points = Vec::with_capacity(destinations.len() + 1);
    points.push(origin);
    points.extend_from_slice(destinations);
    let full = matrix_nxn(
        store,
        provider,
        &points,
        block_size,
        speed_kmh,
        cache_ttl_secs,
        run_id,
    )
    .await;
    full[0][1..].to_vec()
}

async fn save_cache<S>(
    store: &S,
    origin: Coordinate,
    dest: Coordinate,
    duration_sec: f64,
    cache_ttl_secs: i64,
    provider: &str,
) where
    S: MatrixCacheRepo + Sync + ?Sized,
{
    let entry = MatrixCacheEntry {
        id: 0,
        origin_lat: origin.lat,
        origin_lng: origin.lng,
        dest_lat: dest.lat,
        dest_lng: dest.lng,
        duration_sec,
        distance_m: None,
        provider: provider.to_owned(),
        created_at: None,
        expires_at: Utc::now() + Duration::seconds(cache_ttl_secs),
    };
    if let Err(why) = store.matrix_cache_store(&entry).await {
        warn!("matrix cache write failed: {why}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use model::billing::BillingTrace;

    use super::*;
    use crate::provider::ProviderError;
    use crate::store::Result as StoreResult;

    #[derive(Default)]
    struct MemStore {
        cells: Mutex<Vec<MatrixCacheEntry>>,
        traces: Mutex<Vec<BillingTrace>>,
    }

    #[async_trait]
    impl MatrixCacheRepo for MemStore {
        async fn matrix_cache_lookup(
            &self,
            origin: Coordinate,
            dest: Coordinate,
            tolerance_deg: f64,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<f64>> {
            Ok(self
                .cells
                .lock()
                .unwrap()
                .iter()
                .find(|entry| {
                    (entry.origin_lat - origin.lat).abs() <= tolerance_deg
                        && (entry.origin_lng - origin.lng).abs() <= tolerance_deg
                        && (entry.dest_lat - dest.lat).abs() <= tolerance_deg
                        && (entry.dest_lng - dest.lng).abs() <= tolerance_deg
                        && entry.expires_at > now
                })
                .map(|entry| entry.duration_sec))
        }

        async fn matrix_cache_store(
            &self,
            entry: &MatrixCacheEntry,
        ) -> StoreResult<()> {
            self.cells.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl BillingRepo for MemStore {
        async fn append_billing(&self, trace: &BillingTrace) -> StoreResult<()> {
            self.traces.lock().unwrap().push(trace.clone());
            Ok(())
        }

        async fn list_billing(
            &self,
            _run_id: Option<&str>,
            _limit: i64,
        ) -> StoreResult<Vec<BillingTrace>> {
            Ok(vec![])
        }
    }

    struct FlatProvider {
        fail: bool,
    }

    #[async_trait]
    impl MatrixProvider for FlatProvider {
        fn name(&self) -> &'static str {
            "ors"
        }

        async fn matrix_block(
            &self,
            origins: &[Coordinate],
            destinations: &[Coordinate],
        ) -> Result<Vec<Vec<Option<f64>>>, ProviderError> {
            if self.fail {
                return Err(ProviderError::status(502, "bad gateway"));
            }
            Ok(origins
                .iter()
                .map(|_| destinations.iter().map(|_| Some(600.0)).collect())
                .collect())
        }
    }

    fn points() -> Vec<Coordinate> {
        vec![
            Coordinate::new(-32.90, -68.80),
            Coordinate::new(-32.95, -68.85),
            Coordinate::new(-33.00, -68.90),
        ]
    }

    #[tokio::test]
    async fn provider_durations_become_minutes() {
        let store = MemStore::default();
        let provider = FlatProvider { fail: false };
        let matrix =
            matrix_nxn(&store, Some(&provider), &points(), 10, 40.0, 21_600, "run")
                .await;

        for (i, row) in matrix.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                if i == j {
                    assert_eq!(*cell, 0.0);
                } else {
                    assert_eq!(*cell, 10.0);
                }
            }
        }
        // Six off-diagonal cells cached.
        assert_eq!(store.cells.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_haversine() {
        let store = MemStore::default();
        let provider = FlatProvider { fail: true };
        let matrix =
            matrix_nxn(&store, Some(&provider), &points(), 10, 40.0, 21_600, "run")
                .await;

        for (i, row) in matrix.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                assert!(cell.is_finite());
                if i == j {
                    assert_eq!(*cell, 0.0);
                } else {
                    assert!(*cell > 0.0);
                }
            }
        }
        // The failed call is still traced, with its status code.
        let traces = store.traces.lock().unwrap();
        assert!(!traces.is_empty());
        assert!(traces.iter().all(|t| t.response_code == Some(502)));
    }

    #[tokio::test]
    async fn cached_cells_skip_the_provider() {
        let store = MemStore::default();
        let provider = FlatProvider { fail: false };
        let pts = points();

        let first =
            matrix_nxn(&store, Some(&provider), &pts, 10, 40.0, 21_600, "run").await;
        let calls_after_first = store.traces.lock().unwrap().len();
        let second =
            matrix_nxn(&store, Some(&provider), &pts, 10, 40.0, 21_600, "run").await;

        assert_eq!(first, second);
        assert_eq!(store.traces.lock().unwrap().len(), calls_after_first);
    }

    #[tokio::test]
    async fn no_provider_still_yields_finite_matrix() {
        let store = MemStore::default();
        let matrix =
            matrix_nxn(&store, None, &points(), 10, 40.0, 21_600, "run").await;
        assert!(matrix
            .iter()
            .flatten()
            .all(|cell| cell.is_finite() && *cell >= 0.0));
    }

    #[tokio::test]
    async fn one_to_n_row_matches_full_matrix() {
        let store = MemStore::default();
        let provider = FlatProvider { fail: false };
        let pts = points();
        let row = matrix_1xn(
            &store,
            Some(&provider),
            pts[0],
            &pts[1..],
            10,
            40.0,
            21_600,
            "run",
        )
        .await;
        assert_eq!(row, vec![10.0, 10.0]);
    }
}
