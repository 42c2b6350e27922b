use std::fmt;

use crate::bigm::BigMTableau;
use crate::pivot;
use crate::problem::{LpProblem, ValidationError};
use crate::solution::{self, SolveResult};
use crate::step::{StepAction, StepLog, TableauSnapshot};
use crate::tableau::{self, BigMBuild, ColumnLayout, Labels};

/// Tolerance for every floating-point comparison in the engine. Declared,
/// not tunable: the step log must be reproducible across runs.
pub const EPSILON: f64 = 1e-10;

/// Pivot cap. A liveness guard against cycling on degenerate pivots, not a
/// correctness guarantee; exceeding it is reported, never passed off as
/// optimal.
pub const MAX_ITERATIONS: usize = 20;

/// Which variant the engine selected for a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Standard simplex: every constraint is a `<=` row
    #[cfg_attr(feature = "serde", serde(rename = "simplex"))]
    Simplex,
    /// Big-M: at least one `>=` or `=` row requires artificial variables
    #[cfg_attr(feature = "serde", serde(rename = "gran_m"))]
    BigM,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Simplex => "simplex",
            Method::BigM => "gran_m",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one solve produces: the method tag, the label side table for
/// rendering, the ordered step log, and the terminal result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexRun {
    pub method: Method,
    pub labels: Labels,
    pub steps: StepLog,
    pub result: SolveResult,
}

/// Solves a problem, selecting the variant from the constraint operators:
/// Big-M whenever any row is `>=` or `=`, the standard method otherwise.
/// Validation failures abort before any step is produced.
pub fn solve(problem: &LpProblem) -> Result<SimplexRun, ValidationError> {
    problem.validate()?;
    if problem.needs_big_m() {
        Ok(solve_big_m(problem))
    } else {
        Ok(solve_standard(problem))
    }
}

enum LoopEnd {
    Converged,
    Unbounded,
    IterationLimit,
}

fn solve_standard(problem: &LpProblem) -> SimplexRun {
    let (mut tableau, layout, labels) = tableau::build_standard(problem);
    let mut steps = StepLog::default();
    steps.push(
        0,
        StepAction::InitialTableau {
            tableau: TableauSnapshot::of(&tableau),
        },
    );

    let mut iteration = 1;
    let end = loop {
        let Some(col) = pivot::pivot_column(&tableau) else {
            break LoopEnd::Converged;
        };
        let (ratios, row) = pivot::pivot_row(&tableau, col);
        let Some(row) = row else {
            break LoopEnd::Unbounded;
        };
        let pivot_value = tableau.value(row, col);
        steps.push(
            iteration,
            StepAction::PivotSelection {
                column: col,
                row,
                pivot: pivot_value,
                ratios,
            },
        );

        tableau.divide_row(row, pivot_value);
        steps.push(
            iteration,
            StepAction::RowNormalization {
                operation: format!(
                    "{} = {} / {:.4}",
                    labels.row(row),
                    labels.row(row),
                    pivot_value
                ),
                tableau: TableauSnapshot::of(&tableau),
            },
        );

        for target in 0..tableau.height() {
            if target == row {
                continue;
            }
            let factor = tableau.value(target, col);
            tableau.subtract_scaled(target, row, factor);
            if factor.abs() > EPSILON {
                steps.push(
                    iteration,
                    StepAction::RowElimination {
                        operation: format!(
                            "{} = {} - {:.4} * {}",
                            labels.row(target),
                            labels.row(target),
                            factor,
                            labels.row(row)
                        ),
                        tableau: TableauSnapshot::of(&tableau),
                    },
                );
            }
        }

        if iteration == MAX_ITERATIONS {
            break LoopEnd::IterationLimit;
        }
        iteration += 1;
    };

    let result = match end {
        LoopEnd::Converged => {
            solution::extract_standard(&tableau, &layout, problem.objective.sense)
        }
        LoopEnd::Unbounded => SolveResult::unbounded(),
        LoopEnd::IterationLimit => SolveResult::iteration_limit(),
    };

    SimplexRun {
        method: Method::Simplex,
        labels,
        steps,
        result,
    }
}

fn solve_big_m(problem: &LpProblem) -> SimplexRun {
    let normalized = problem.with_nonnegative_rhs();
    let BigMBuild {
        mut tableau,
        layout,
        labels,
        artificial_by_row,
    } = tableau::build_big_m(&normalized);

    let mut steps = StepLog::default();
    steps.push(
        0,
        StepAction::InitialTableau {
            tableau: TableauSnapshot::of_big_m(&tableau),
        },
    );

    // Artificial variables start in the basis, so the objective row is not
    // yet consistent with them: clear each one's penalty entry by
    // subtracting its constraint row, scaled by the penalty coefficient.
    // A penalty unit times a numeric row lands entirely in the penalty
    // matrix.
    for (i, artificial_col) in artificial_by_row.iter().enumerate() {
        let Some(col) = *artificial_col else {
            continue;
        };
        let row = i + 1;
        let m = tableau.penalty.value(0, col);
        if m.abs() <= EPSILON {
            continue;
        }
        for j in 0..tableau.numeric.width() {
            let value = tableau.penalty.value(0, j) - m * tableau.numeric.value(row, j);
            tableau.penalty.set(0, j, value);
        }
        steps.push(
            0,
            StepAction::ObjectiveAdjustment {
                operation: format!(
                    "{} = {} - {:.0}M * {}",
                    labels.row(0),
                    labels.row(0),
                    m,
                    labels.row(row)
                ),
                tableau: TableauSnapshot::of_big_m(&tableau),
            },
        );
    }

    let mut iteration = 1;
    let end = loop {
        let Some(col) = pivot::pivot_column_big_m(&tableau) else {
            break LoopEnd::Converged;
        };
        let (ratios, row) = pivot::pivot_row(&tableau.numeric, col);
        let Some(row) = row else {
            break LoopEnd::Unbounded;
        };
        let pivot_value = tableau.numeric.value(row, col);
        steps.push(
            iteration,
            StepAction::PivotSelection {
                column: col,
                row,
                pivot: pivot_value,
                ratios,
            },
        );

        tableau.divide_row(row, pivot_value);
        steps.push(
            iteration,
            StepAction::RowNormalization {
                operation: format!(
                    "{} = {} / {:.4}",
                    labels.row(row),
                    labels.row(row),
                    pivot_value
                ),
                tableau: TableauSnapshot::of_big_m(&tableau),
            },
        );

        for target in 0..tableau.numeric.height() {
            if target == row {
                continue;
            }
            let num_factor = tableau.numeric.value(target, col);
            let pen_factor = tableau.penalty.value(target, col);
            tableau.eliminate(target, row, num_factor, pen_factor);
            if num_factor.abs() > EPSILON || pen_factor.abs() > EPSILON {
                steps.push(
                    iteration,
                    StepAction::RowElimination {
                        operation: elimination_operation(
                            &labels, target, row, num_factor, pen_factor,
                        ),
                        tableau: TableauSnapshot::of_big_m(&tableau),
                    },
                );
            }
        }

        if iteration == MAX_ITERATIONS {
            break LoopEnd::IterationLimit;
        }
        iteration += 1;
    };

    let result = match end {
        LoopEnd::Converged => {
            if has_basic_artificial(&tableau, &layout) {
                SolveResult::infeasible()
            } else {
                solution::extract_big_m(&tableau, &layout, problem.objective.sense)
            }
        }
        LoopEnd::Unbounded => SolveResult::unbounded(),
        LoopEnd::IterationLimit => SolveResult::iteration_limit(),
    };

    SimplexRun {
        method: Method::BigM,
        labels,
        steps,
        result,
    }
}

fn elimination_operation(
    labels: &Labels,
    target: usize,
    pivot_row: usize,
    num_factor: f64,
    pen_factor: f64,
) -> String {
    let mut operation = format!("{} = {}", labels.row(target), labels.row(target));
    if num_factor.abs() > EPSILON {
        operation.push_str(&format!(" - {:.4} * {}", num_factor, labels.row(pivot_row)));
    }
    if pen_factor.abs() > EPSILON {
        operation.push_str(&format!(" - {:.4}M * {}", pen_factor, labels.row(pivot_row)));
    }
    operation
}

/// An apparent optimum that still carries a nonzero artificial variable in
/// the basis has no feasible counterpart in the original problem.
fn has_basic_artificial(tableau: &BigMTableau, layout: &ColumnLayout) -> bool {
    for col in layout.artificial_cols() {
        if let Some(row) = solution::basic_row(&tableau.numeric, Some(&tableau.penalty), col) {
            if row > 0 && tableau.numeric.solution(row).abs() > EPSILON {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ConstraintOp;
    use crate::solution::SolveStatus;
    use crate::tableau::Tableau;

    fn assert_close(actual: f64, expected: f64, what: &str) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "{} = {} (expected {})",
            what,
            actual,
            expected
        );
    }

    #[test]
    fn test_standard_maximization() {
        // Maximize: 3x1 + 2x2
        // Subject to:
        //   x1 + x2 <= 4
        //   x1 + 3x2 <= 6
        // Optimal: x1=4, x2=0, obj=12
        let mut problem = LpProblem::maximize(vec![3.0, 2.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint(vec![1.0, 3.0], ConstraintOp::Le, 6.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.method, Method::Simplex);
        assert_eq!(run.result.status, SolveStatus::Optimal);
        assert_close(run.result.objective.unwrap(), 12.0, "objective");

        let variables = run.result.variables.unwrap();
        assert_close(variables[0].value, 4.0, "x1");
        assert_close(variables[1].value, 0.0, "x2");
    }

    #[test]
    fn test_standard_with_binding_bounds() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::maximize(vec![3.0, 2.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint(vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::Optimal);
        assert_close(run.result.objective.unwrap(), 11.0, "objective");

        let variables = run.result.variables.unwrap();
        assert_close(variables[0].value, 3.0, "x");
        assert_close(variables[1].value, 1.0, "y");
    }

    #[test]
    fn test_big_m_minimization() {
        // Minimize: 2x1 + 3x2
        // Subject to:
        //   x1 + x2 >= 4
        // Optimal objective 8; the vertex may be degenerate, so only the
        // objective is asserted.
        let mut problem = LpProblem::minimize(vec![2.0, 3.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.method, Method::BigM);
        assert_eq!(run.result.status, SolveStatus::Optimal);
        assert_close(run.result.objective.unwrap(), 8.0, "objective");
    }

    #[test]
    fn test_big_m_minimization_with_upper_bounds() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::minimize(vec![2.0, 3.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint(vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::Optimal);
        assert_close(run.result.objective.unwrap(), 9.0, "objective");

        let variables = run.result.variables.unwrap();
        assert_close(variables[0].value, 3.0, "x");
        assert_close(variables[1].value, 1.0, "y");
    }

    #[test]
    fn test_unbounded() {
        // Maximize x1 with only a lower bound: no finite optimum
        let mut problem = LpProblem::maximize(vec![1.0]);
        problem.add_constraint(vec![1.0], ConstraintOp::Ge, 0.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.method, Method::BigM);
        assert_eq!(run.result.status, SolveStatus::Unbounded);
        assert_eq!(run.result.objective, None);
        assert_eq!(run.result.variables, None);
        // the partial step log survives
        assert!(!run.steps.is_empty());
    }

    #[test]
    fn test_infeasible_contradictory_equalities() {
        // x1 + x2 = 4 and x1 + x2 = 6 cannot both hold
        let mut problem = LpProblem::maximize(vec![1.0, 1.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Eq, 4.0);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Eq, 6.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::Infeasible);
        assert_eq!(run.result.objective, None);
        assert!(!run.steps.is_empty());
    }

    #[test]
    fn test_infeasible_conflicting_bounds() {
        // x >= 5 and x <= 3
        let mut problem = LpProblem::minimize(vec![1.0]);
        problem.add_constraint(vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint(vec![1.0], ConstraintOp::Le, 3.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_standard_and_big_m_agree() {
        // the same feasible region written two ways: plain <= rows for the
        // standard method, negated >= rows (flipped back by RHS
        // normalization) to force the Big-M path
        let mut standard = LpProblem::maximize(vec![3.0, 2.0]);
        standard.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        standard.add_constraint(vec![1.0, 3.0], ConstraintOp::Le, 6.0);

        let mut forced = LpProblem::maximize(vec![3.0, 2.0]);
        forced.add_constraint(vec![-1.0, -1.0], ConstraintOp::Ge, -4.0);
        forced.add_constraint(vec![-1.0, -3.0], ConstraintOp::Ge, -6.0);

        let standard_run = solve(&standard).unwrap();
        let forced_run = solve(&forced).unwrap();
        assert_eq!(standard_run.method, Method::Simplex);
        assert_eq!(forced_run.method, Method::BigM);
        assert_eq!(standard_run.result.status, SolveStatus::Optimal);
        assert_eq!(forced_run.result.status, SolveStatus::Optimal);
        assert_close(
            forced_run.result.objective.unwrap(),
            standard_run.result.objective.unwrap(),
            "objective",
        );
    }

    #[test]
    fn test_iteration_limit_on_klee_minty() {
        // the 5-dimensional Klee-Minty cube: the most-negative-coefficient
        // rule visits all 2^5 vertices, needing 31 pivots, well past the cap
        let mut problem = LpProblem::maximize(vec![16.0, 8.0, 4.0, 2.0, 1.0]);
        for i in 1..=5usize {
            let mut row = vec![0.0; 5];
            for j in 1..i {
                row[j - 1] = f64::powi(2.0, (i - j + 1) as i32);
            }
            row[i - 1] = 1.0;
            problem.add_constraint(row, ConstraintOp::Le, f64::powi(5.0, i as i32));
        }

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::IterationLimitReached);
        assert_eq!(run.result.objective, None);
        assert_eq!(run.result.variables, None);
        assert!(!run.steps.is_empty());
    }

    #[test]
    fn test_validation_aborts_before_any_step() {
        let problem = LpProblem::maximize(vec![1.0]);
        assert_eq!(solve(&problem), Err(ValidationError::NoConstraints));
    }

    #[test]
    fn test_step_log_structure() {
        let mut problem = LpProblem::minimize(vec![2.0, 3.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);

        let run = solve(&problem).unwrap();
        let steps = run.steps.steps();

        // the log opens with the initial tableau at iteration 0
        assert_eq!(steps[0].iteration, 0);
        assert!(matches!(steps[0].action, StepAction::InitialTableau { .. }));

        // every pre-loop adjustment precedes the first pivot selection
        let first_pivot = steps
            .iter()
            .position(|s| matches!(s.action, StepAction::PivotSelection { .. }))
            .expect("at least one pivot");
        assert!(steps[..first_pivot]
            .iter()
            .skip(1)
            .all(|s| matches!(s.action, StepAction::ObjectiveAdjustment { .. })));

        // pivot selections carry metadata, not snapshots; the ratio vector
        // covers every constraint row
        for step in steps {
            if let StepAction::PivotSelection { ratios, .. } = &step.action {
                assert!(step.action.tableau().is_none());
                assert_eq!(ratios.len(), problem.num_constraints());
            }
        }

        // Big-M snapshots carry the paired penalty matrix
        assert!(steps[0]
            .action
            .tableau()
            .and_then(|t| t.penalty.as_ref())
            .is_some());
    }

    #[test]
    fn test_ratio_invariant_no_negative_solution_column() {
        // after every logged mutation the constraint rows keep non-negative
        // solution entries
        let mut a = LpProblem::maximize(vec![3.0, 2.0]);
        a.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        a.add_constraint(vec![1.0, 3.0], ConstraintOp::Le, 6.0);

        let mut b = LpProblem::minimize(vec![2.0, 3.0]);
        b.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        b.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        b.add_constraint(vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        for problem in [a, b] {
            let run = solve(&problem).unwrap();
            for step in run.steps.steps() {
                if let Some(snapshot) = step.action.tableau() {
                    for row in snapshot.numeric.iter().skip(1) {
                        let solution = *row.last().unwrap();
                        assert!(
                            solution >= -EPSILON,
                            "negative solution entry {} in step {}",
                            solution,
                            step.iteration
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_optimality_invariant_on_final_snapshot() {
        // replay the last snapshot: no column may satisfy the pivot rule
        let mut problem = LpProblem::maximize(vec![3.0, 2.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint(vec![1.0, 3.0], ConstraintOp::Le, 6.0);

        let run = solve(&problem).unwrap();
        assert_eq!(run.result.status, SolveStatus::Optimal);
        let last = run
            .steps
            .steps()
            .iter()
            .rev()
            .find_map(|s| s.action.tableau())
            .expect("snapshot-bearing step");
        let terminal = Tableau::from_matrix(last.numeric.clone());
        assert_eq!(pivot::pivot_column(&terminal), None);
    }

    #[test]
    fn test_identical_input_identical_log() {
        let mut problem = LpProblem::minimize(vec![2.0, 3.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);

        let first = solve(&problem).unwrap();
        let second = solve(&problem).unwrap();
        assert_eq!(first, second);
    }
}
