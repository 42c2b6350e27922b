//! Pure pivot-selection rules. Everything here reads a tableau snapshot and
//! returns indices; deterministic lowest-index tie-breaking keeps the step
//! log reproducible.

use crate::bigm::BigMTableau;
use crate::simplex::EPSILON;
use crate::tableau::Tableau;

/// Standard method: the column with the most negative objective-row
/// coefficient, ties broken by lowest column index. `None` means the
/// tableau is optimal.
pub(crate) fn pivot_column(tableau: &Tableau) -> Option<usize> {
    let mut best = None;
    let mut best_value = -EPSILON;
    for col in 1..tableau.width() - 1 {
        let value = tableau.value(0, col);
        if value < best_value {
            best_value = value;
            best = Some(col);
        }
    }
    best
}

/// Big-M method, two-level rule: among columns with a negative penalty
/// coefficient the most negative penalty wins; only when none exist do
/// zero-penalty columns compete on their numeric coefficient. Columns with
/// a positive penalty coefficient are never candidates.
pub(crate) fn pivot_column_big_m(tableau: &BigMTableau) -> Option<usize> {
    let width = tableau.numeric.width();

    let mut best = None;
    let mut best_m = -EPSILON;
    for col in 1..width - 1 {
        let m = tableau.penalty.value(0, col);
        if m < best_m {
            best_m = m;
            best = Some(col);
        }
    }
    if best.is_some() {
        return best;
    }

    let mut best_value = -EPSILON;
    for col in 1..width - 1 {
        let cell = tableau.cell(0, col);
        if cell.is_negative(EPSILON) && cell.constant < best_value {
            best_value = cell.constant;
            best = Some(col);
        }
    }
    best
}

/// Minimum-ratio test over the numeric matrix. Returns one ratio per
/// constraint row (infinite where the pivot-column entry is not positive)
/// and the chosen row, ties broken by lowest row index. `None` means every
/// ratio is infinite: the problem is unbounded in the pivot direction.
pub(crate) fn pivot_row(tableau: &Tableau, col: usize) -> (Vec<f64>, Option<usize>) {
    let mut ratios = Vec::with_capacity(tableau.height() - 1);
    for row in 1..tableau.height() {
        let entry = tableau.value(row, col);
        if entry > EPSILON {
            ratios.push(tableau.solution(row) / entry);
        } else {
            ratios.push(f64::INFINITY);
        }
    }

    let mut best = None;
    let mut best_ratio = f64::INFINITY;
    for (i, &ratio) in ratios.iter().enumerate() {
        if ratio < best_ratio {
            best_ratio = ratio;
            best = Some(i + 1);
        }
    }
    (ratios, best)
}
