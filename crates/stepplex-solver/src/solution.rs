use crate::bigm::BigMTableau;
use crate::problem::Sense;
use crate::simplex::EPSILON;
use crate::tableau::{ColumnLayout, Tableau};

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The objective can grow without bound
    Unbounded,
    /// No solution satisfies all constraints
    Infeasible,
    /// The 20-pivot safety valve fired before convergence
    IterationLimitReached,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableValue {
    pub name: String,
    pub value: f64,
}

/// The terminal result of a run. Objective and variable values are present
/// only when the status is optimal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveResult {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub variables: Option<Vec<VariableValue>>,
}

impl SolveResult {
    pub(crate) fn optimal(objective: f64, variables: Vec<VariableValue>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective: Some(objective),
            variables: Some(variables),
        }
    }

    pub(crate) fn unbounded() -> Self {
        Self {
            status: SolveStatus::Unbounded,
            objective: None,
            variables: None,
        }
    }

    pub(crate) fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            objective: None,
            variables: None,
        }
    }

    pub(crate) fn iteration_limit() -> Self {
        Self {
            status: SolveStatus::IterationLimitReached,
            objective: None,
            variables: None,
        }
    }
}

/// A column is basic when it holds exactly one entry equal to 1 and zeros
/// everywhere else, across all rows including the objective row. For Big-M
/// the penalty part must be zero throughout. Returns the row owning the 1.
pub(crate) fn basic_row(numeric: &Tableau, penalty: Option<&Tableau>, col: usize) -> Option<usize> {
    let mut unit_row = None;
    for row in 0..numeric.height() {
        if let Some(penalty) = penalty {
            if penalty.value(row, col).abs() > EPSILON {
                return None;
            }
        }
        let value = numeric.value(row, col);
        if (value - 1.0).abs() <= EPSILON {
            if unit_row.is_some() {
                return None;
            }
            unit_row = Some(row);
        } else if value.abs() > EPSILON {
            return None;
        }
    }
    unit_row
}

fn read_variables(
    numeric: &Tableau,
    penalty: Option<&Tableau>,
    layout: &ColumnLayout,
) -> Vec<VariableValue> {
    (0..layout.n_vars)
        .map(|j| {
            let value = match basic_row(numeric, penalty, layout.var_col(j)) {
                Some(row) => numeric.solution(row),
                None => 0.0,
            };
            VariableValue {
                name: format!("x{}", j + 1),
                value,
            }
        })
        .collect()
}

/// The objective row's solution entry holds the maximized value; a
/// minimization problem was sign-flipped on entry, so flip back here.
fn objective_value(numeric: &Tableau, sense: Sense) -> f64 {
    match sense {
        Sense::Maximize => numeric.solution(0),
        Sense::Minimize => -numeric.solution(0),
    }
}

pub(crate) fn extract_standard(
    tableau: &Tableau,
    layout: &ColumnLayout,
    sense: Sense,
) -> SolveResult {
    SolveResult::optimal(
        objective_value(tableau, sense),
        read_variables(tableau, None, layout),
    )
}

pub(crate) fn extract_big_m(
    tableau: &BigMTableau,
    layout: &ColumnLayout,
    sense: Sense,
) -> SolveResult {
    SolveResult::optimal(
        objective_value(&tableau.numeric, sense),
        read_variables(&tableau.numeric, Some(&tableau.penalty), layout),
    )
}
