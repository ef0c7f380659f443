//! Route ordering: bucket partition by urgency/priority/window, polar
//! sweep inside each bucket, 2-opt refinement for the urgent head, and
//! the iterative jump filter afterwards.

use std::cmp::Ordering;

use model::remito::VentanaTipo;

pub const JUMP_FILTER_MAX_ROUNDS: usize = 10;

/// A routable candidate. `idx` is the point's row/column in the travel
/// matrix handed to [`optimize`].
#[derive(Debug, Clone)]
pub struct RoutePoint {
    pub idx: usize,
    pub lat: f64,
    pub lng: f64,
    pub remito_id: i32,
    pub numero: String,
    pub cliente: String,
    pub direccion: String,
    pub observaciones: String,
    pub urgente: bool,
    pub prioridad: bool,
    pub ventana_tipo: VentanaTipo,
    pub ventana_desde_min: Option<i32>,
    pub ventana_hasta_min: Option<i32>,
    pub llamar_antes: bool,
}

#[derive(Debug, Clone)]
pub struct OptimizedRoute {
    pub ordered: Vec<RoutePoint>,
    /// Matrix indices dropped by the jump filter.
    pub excluded_idxs: Vec<usize>,
}

/// Sweep: positions of `points` sorted by polar angle from the depot,
/// θ = atan2(lat − depot_lat, lng − depot_lng), ascending.
pub fn sweep(depot_lat: f64, depot_lng: f64, points: &[RoutePoint]) -> Vec<usize> {
    let mut indexed: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p.lat - depot_lat).atan2(p.lng - depot_lng)))
        .collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    indexed.into_iter().map(|(i, _)| i).collect()
}

/// 2-opt local search over `order` (positions into `matrix`), repeated
/// until no segment reversal improves the tour by more than 1e-6.
pub fn two_opt(mut order: Vec<usize>, matrix: &[Vec<f64>]) -> Vec<usize> {
    let n = order.len();
    if n < 4 {
        return order;
    }

    let mut improved = true;
    while improved {
        improved = false;
        for i in 0..n - 1 {
            for k in (i + 2)..n {
                if i == 0 && k == n - 1 {
                    continue;
                }
                let a = order[i];
                let b = order[i + 1];
                let c = order[k - 1];
                let d = order[k % n];
                let delta =
                    (matrix[a][c] + matrix[b][d]) - (matrix[a][b] + matrix[c][d]);
                if delta < -1e-6 {
                    order[i + 1..k].reverse();
                    improved = true;
                }
            }
        }
    }
    order
}

/// Drops, round by round, the worst matrix edge above `threshold_min`
/// whose destination is neither urgent nor priority. Converges when no
/// such edge remains or after [`JUMP_FILTER_MAX_ROUNDS`] rounds.
/// Returns the surviving order and the dropped matrix indices.
pub fn fixpoint_filter_jumps(
    points: &[RoutePoint],
    order: Vec<usize>,
    matrix: &[Vec<f64>],
    threshold_min: f64,
) -> (Vec<usize>, Vec<usize>) {
    let mut excluded = Vec::new();
    let mut current = order;

    for _ in 0..JUMP_FILTER_MAX_ROUNDS {
        let mut max_jump = 0.0_f64;
        let mut max_jump_idx: Option<usize> = None;

        for pos in 1..current.len() {
            let prev = current[pos - 1];
            let curr = current[pos];
            let duration = matrix[prev][curr];
            if duration > threshold_min && duration > max_jump {
                let point = &points[curr];
                if !point.urgente && !point.prioridad {
                    max_jump = duration;
                    max_jump_idx = Some(curr);
                }
            }
        }

        let Some(dropped) = max_jump_idx else { break };
        excluded.push(dropped);
        current.retain(|&i| i != dropped);
    }

    (current, excluded)
}

fn sort_bucket(
    depot_lat: f64,
    depot_lng: f64,
    bucket: Vec<RoutePoint>,
) -> Vec<RoutePoint> {
    if bucket.is_empty() {
        return bucket;
    }
    sweep(depot_lat, depot_lng, &bucket)
        .into_iter()
        .map(|i| bucket[i].clone())
        .collect()
}

/// Full ordering pass. `matrix` is indexed by `RoutePoint::idx`.
///
/// Bucket concatenation order: urgent, priority-AM, priority-untagged,
/// normal-AM, normal-untagged, priority-PM, normal-PM. Urgent gets the
/// 2-opt refinement when it has at least four points.
pub fn optimize(
    points: &[RoutePoint],
    matrix: &[Vec<f64>],
    depot_lat: f64,
    depot_lng: f64,
    evitar_saltos_min: f64,
) -> OptimizedRoute {
    if points.is_empty() {
        return OptimizedRoute {
            ordered: vec![],
            excluded_idxs: vec![],
        };
    }

    let bucket = |urgente: bool, prioridad: bool, tipo: VentanaTipo| {
        points
            .iter()
            .filter(|p| {
                p.urgente == urgente
                    && (urgente || p.prioridad == prioridad)
                    && (urgente || p.ventana_tipo == tipo)
            })
            .cloned()
            .collect::<Vec<_>>()
    };

    let urgentes = bucket(true, false, VentanaTipo::SinHorario);
    let pri_am = bucket(false, true, VentanaTipo::Am);
    let pri_sin = bucket(false, true, VentanaTipo::SinHorario);
    let pri_pm = bucket(false, true, VentanaTipo::Pm);
    let norm_am = bucket(false, false, VentanaTipo::Am);
    let norm_sin = bucket(false, false, VentanaTipo::SinHorario);
    let norm_pm = bucket(false, false, VentanaTipo::Pm);

    let mut urg_sorted = sort_bucket(depot_lat, depot_lng, urgentes);
    if urg_sorted.len() >= 4 {
        let local_idxs: Vec<usize> = urg_sorted.iter().map(|p| p.idx).collect();
        let local_matrix = sub_matrix(matrix, &local_idxs);
        let local_order = two_opt((0..urg_sorted.len()).collect(), &local_matrix);
        urg_sorted = local_order.into_iter().map(|i| urg_sorted[i].clone()).collect();
    }

    let mut ordered = urg_sorted;
    for bucket in [pri_am, pri_sin, norm_am, norm_sin, pri_pm, norm_pm] {
        ordered.extend(sort_bucket(depot_lat, depot_lng, bucket));
    }

    let order_idxs: Vec<usize> = ordered.iter().map(|p| p.idx).collect();
    let (kept, excluded_idxs) =
        fixpoint_filter_jumps(points, order_idxs, matrix, evitar_saltos_min);

    let ordered = kept
        .into_iter()
        .map(|i| points[i].clone())
        .collect::<Vec<_>>();

    OptimizedRoute {
        ordered,
        excluded_idxs,
    }
}

fn sub_matrix(full: &[Vec<f64>], idxs: &[usize]) -> Vec<Vec<f64>> {
    idxs.iter()
        .map(|&gi| idxs.iter().map(|&gj| full[gi][gj]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(idx: usize, lat: f64, lng: f64) -> RoutePoint {
        RoutePoint {
            idx,
            lat,
            lng,
            remito_id: idx as i32 + 1,
            numero: format!("R-{idx}"),
            cliente: String::new(),
            direccion: String::new(),
            observaciones: String::new(),
            urgente: false,
            prioridad: false,
            ventana_tipo: VentanaTipo::SinHorario,
            ventana_desde_min: None,
            ventana_hasta_min: None,
            llamar_antes: false,
        }
    }

    fn tour_cost(order: &[usize], matrix: &[Vec<f64>]) -> f64 {
        order.windows(2).map(|w| matrix[w[0]][w[1]]).sum()
    }

    #[test]
    fn sweep_orders_by_polar_angle() {
        // Four points around the depot, one per quadrant.
        let points = vec![
            point(0, 0.0, 1.0),  // east, θ = 0
            point(1, 1.0, 0.0),  // north, θ = π/2
            point(2, 0.0, -1.0), // west, θ = π
            point(3, -1.0, 0.0), // south, θ = -π/2
        ];
        assert_eq!(sweep(0.0, 0.0, &points), vec![3, 0, 1, 2]);
    }

    #[test]
    fn two_opt_untangles_a_crossing() {
        // Five collinear points, visited out of order: reversing the
        // middle segment recovers the sequential tour.
        let n = 5;
        let matrix: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| (i as f64 - j as f64).abs()).collect())
            .collect();
        let before = vec![0, 1, 3, 2, 4];
        let after = two_opt(before.clone(), &matrix);
        assert_eq!(after, vec![0, 1, 2, 3, 4]);
        assert!(tour_cost(&after, &matrix) < tour_cost(&before, &matrix));
    }

    #[test]
    fn two_opt_needs_four_points() {
        let matrix = vec![
            vec![0.0, 5.0, 1.0],
            vec![5.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ];
        assert_eq!(two_opt(vec![0, 1, 2], &matrix), vec![0, 1, 2]);
    }

    #[test]
    fn jump_filter_drops_only_above_threshold() {
        let points = vec![
            point(0, 0.0, 0.0),
            point(1, 0.0, 0.1),
            point(2, 0.0, 0.2),
        ];
        // Edge 0→1 at 24.9 must survive, edge 1→2 at 25.1 must go.
        let matrix = vec![
            vec![0.0, 24.9, 24.9],
            vec![24.9, 0.0, 25.1],
            vec![24.9, 25.1, 0.0],
        ];
        let (kept, excluded) =
            fixpoint_filter_jumps(&points, vec![0, 1, 2], &matrix, 25.0);
        assert_eq!(kept, vec![0, 1]);
        assert_eq!(excluded, vec![2]);
    }

    #[test]
    fn jump_filter_spares_urgent_and_priority() {
        let mut points = vec![
            point(0, 0.0, 0.0),
            point(1, 0.0, 0.1),
            point(2, 0.0, 0.2),
        ];
        points[1].urgente = true;
        points[2].prioridad = true;
        let matrix = vec![
            vec![0.0, 99.0, 99.0],
            vec![99.0, 0.0, 99.0],
            vec![99.0, 99.0, 0.0],
        ];
        let (kept, excluded) =
            fixpoint_filter_jumps(&points, vec![0, 1, 2], &matrix, 25.0);
        assert_eq!(kept, vec![0, 1, 2]);
        assert!(excluded.is_empty());
    }

    #[test]
    fn buckets_concatenate_in_dispatch_order() {
        let mut points = vec![
            point(0, -0.1, 0.1), // normal PM
            point(1, -0.1, 0.2), // urgent
            point(2, -0.1, 0.3), // priority AM
            point(3, -0.1, 0.4), // normal untagged
        ];
        points[0].ventana_tipo = VentanaTipo::Pm;
        points[1].urgente = true;
        points[1].ventana_tipo = VentanaTipo::Pm; // urgency ignores the tag
        points[2].prioridad = true;
        points[2].ventana_tipo = VentanaTipo::Am;

        let n = points.len();
        let matrix = vec![vec![1.0; n]; n];
        let result = optimize(&points, &matrix, 0.0, 0.0, 1000.0);
        let order: Vec<usize> = result.ordered.iter().map(|p| p.idx).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
        assert!(result.excluded_idxs.is_empty());
    }

    #[test]
    fn urgent_bucket_runs_two_opt_at_four_points() {
        // Four urgent points on a square; the sweep order around a depot
        // at the center is already crossing-free, so feed a matrix where
        // 2-opt has something to fix via a degenerate sweep (collinear
        // angles), then check monotonicity of the refined tour.
        let mut points: Vec<RoutePoint> = (0..4)
            .map(|i| {
                let mut p = point(i, 0.0, i as f64 * 0.001 + 0.001);
                p.urgente = true;
                p
            })
            .collect();
        points[1].lat = 0.0005;
        points[3].lat = -0.0005;

        let matrix = vec![
            vec![0.0, 10.0, 2.0, 10.0],
            vec![10.0, 0.0, 10.0, 2.0],
            vec![2.0, 10.0, 0.0, 10.0],
            vec![10.0, 2.0, 10.0, 0.0],
        ];
        let result = optimize(&points, &matrix, 0.0, 0.0, 1000.0);
        let order: Vec<usize> = result.ordered.iter().map(|p| p.idx).collect();
        let sweep_order: Vec<usize> = sweep(0.0, 0.0, &points);
        assert!(tour_cost(&order, &matrix) <= tour_cost(&sweep_order, &matrix));
    }

    #[test]
    fn empty_input_yields_empty_route() {
        let result = optimize(&[], &[], 0.0, 0.0, 25.0);
        assert!(result.ordered.is_empty());
        assert!(result.excluded_idxs.is_empty());
    }
}
