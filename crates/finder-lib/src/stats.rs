//! Shared numeric routines
//!
//! Percentile computation over raw samples and ordinary least squares for
//! the relative-importance model. Both detectors funnel through the same
//! percentile definition: linear interpolation between the two nearest
//! order statistics (rank = p/100 * (n-1)).

/// Compute the `p`-th percentile of `values` with linear interpolation.
///
/// Returns `None` for an empty slice. `p` is expected to lie in (0, 100);
/// callers validate their configuration before reaching this point.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let fraction = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * fraction)
}

/// Ordinary least squares fit of `y ~ 1 + x[0] + ... + x[p-1]`.
///
/// `rows` holds one predictor row per observation. Returns the coefficient
/// vector with the intercept first, or `None` when the normal equations are
/// singular (collinear or zero-variance predictors).
pub fn ols_coefficients(rows: &[Vec<f64>], y: &[f64]) -> Option<Vec<f64>> {
    let n = rows.len();
    if n == 0 || n != y.len() {
        return None;
    }
    let p = rows[0].len();
    let dims = p + 1;

    // Normal equations: (X'X) beta = X'y, with a leading intercept column.
    let mut xtx = vec![vec![0.0; dims]; dims];
    let mut xty = vec![0.0; dims];
    for (row, &yi) in rows.iter().zip(y.iter()) {
        for a in 0..dims {
            let xa = if a == 0 { 1.0 } else { row[a - 1] };
            xty[a] += xa * yi;
            for b in a..dims {
                let xb = if b == 0 { 1.0 } else { row[b - 1] };
                xtx[a][b] += xa * xb;
            }
        }
    }
    // Mirror the upper triangle.
    for a in 1..dims {
        for b in 0..a {
            xtx[a][b] = xtx[b][a];
        }
    }

    solve(xtx, xty)
}

/// Gaussian elimination with partial pivoting. Returns `None` on a
/// (numerically) singular system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for col in (0..n).rev() {
        let mut sum = b[col];
        for k in (col + 1)..n {
            sum -= a[col][k] * x[k];
        }
        x[col] = sum / a[col][col];
    }
    Some(x)
}

/// R^2 of an OLS fit of `y` on `rows`.
///
/// Returns 0.0 for degenerate inputs (singular design, zero variance in
/// `y`), so subset enumeration never fails on collinear columns. An empty
/// predictor set scores 0.0: the intercept-only model explains nothing.
pub fn fit_r_squared(rows: &[Vec<f64>], y: &[f64]) -> f64 {
    if rows.is_empty() || rows[0].is_empty() {
        return 0.0;
    }
    let Some(coeffs) = ols_coefficients(rows, y) else {
        return 0.0;
    };

    let n = y.len() as f64;
    let mean_y: f64 = y.iter().sum::<f64>() / n;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (row, &yi) in rows.iter().zip(y.iter()) {
        let mut predicted = coeffs[0];
        for (j, &xj) in row.iter().enumerate() {
            predicted += coeffs[j + 1] * xj;
        }
        ss_res += (yi - predicted).powi(2);
        ss_tot += (yi - mean_y).powi(2);
    }

    if ss_tot.abs() < f64::EPSILON {
        return 0.0;
    }
    (1.0 - ss_res / ss_tot).max(0.0)
}
