use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while validating a problem before any tableau is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("objective has no coefficients")]
    EmptyObjective,
    #[error("problem has no constraints")]
    NoConstraints,
    #[error("constraint {index} has {found} coefficients, expected {expected}")]
    CoefficientMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("unrecognized constraint operator: {0}")]
    UnknownOperator(String),
}

/// Represents a linear programming problem
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LpProblem {
    /// Objective function
    pub objective: Objective,
    /// Constraints
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    /// Coefficients for each decision variable
    pub coefficients: Vec<f64>,
    /// Whether to maximize or minimize
    pub sense: Sense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Coefficients for each decision variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub op: ConstraintOp,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Eq,
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
        };
        f.write_str(symbol)
    }
}

impl FromStr for ConstraintOp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<=" => Ok(ConstraintOp::Le),
            ">=" => Ok(ConstraintOp::Ge),
            "=" => Ok(ConstraintOp::Eq),
            other => Err(ValidationError::UnknownOperator(other.to_string())),
        }
    }
}

impl LpProblem {
    pub fn new(coefficients: Vec<f64>, sense: Sense) -> Self {
        Self {
            objective: Objective {
                coefficients,
                sense,
            },
            constraints: Vec::new(),
        }
    }

    pub fn maximize(coefficients: Vec<f64>) -> Self {
        Self::new(coefficients, Sense::Maximize)
    }

    pub fn minimize(coefficients: Vec<f64>) -> Self {
        Self::new(coefficients, Sense::Minimize)
    }

    pub fn add_constraint(&mut self, coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) {
        self.constraints.push(Constraint {
            coefficients,
            op,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.objective.coefficients.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Checks dimensions before any tableau is built. A failure here aborts
    /// the solve with no step log.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(ValidationError::EmptyObjective);
        }
        if self.constraints.is_empty() {
            return Err(ValidationError::NoConstraints);
        }
        for (index, constraint) in self.constraints.iter().enumerate() {
            if constraint.coefficients.len() != n {
                return Err(ValidationError::CoefficientMismatch {
                    index,
                    expected: n,
                    found: constraint.coefficients.len(),
                });
            }
        }
        Ok(())
    }

    /// The Big-M method is required whenever a constraint cannot be handled
    /// with a plain slack variable.
    pub fn needs_big_m(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| c.op != ConstraintOp::Le)
    }

    /// Returns a copy in which every negative right-hand side has been
    /// cleared by negating the row and flipping its inequality. The ratio
    /// test assumes non-negative right-hand sides.
    pub fn with_nonnegative_rhs(&self) -> LpProblem {
        let mut problem = self.clone();
        for constraint in &mut problem.constraints {
            if constraint.rhs < 0.0 {
                constraint.rhs = -constraint.rhs;
                for coefficient in &mut constraint.coefficients {
                    *coefficient = -*coefficient;
                }
                constraint.op = match constraint.op {
                    ConstraintOp::Le => ConstraintOp::Ge,
                    ConstraintOp::Ge => ConstraintOp::Le,
                    ConstraintOp::Eq => ConstraintOp::Eq,
                };
            }
        }
        problem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_problem() {
        let mut problem = LpProblem::maximize(vec![3.0, 2.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        assert_eq!(problem.validate(), Ok(()));
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn test_validate_rejects_empty_objective() {
        let mut problem = LpProblem::maximize(vec![]);
        problem.add_constraint(vec![], ConstraintOp::Le, 4.0);
        assert_eq!(problem.validate(), Err(ValidationError::EmptyObjective));
    }

    #[test]
    fn test_validate_rejects_missing_constraints() {
        let problem = LpProblem::minimize(vec![1.0]);
        assert_eq!(problem.validate(), Err(ValidationError::NoConstraints));
    }

    #[test]
    fn test_validate_rejects_ragged_constraint_row() {
        let mut problem = LpProblem::maximize(vec![1.0, 2.0]);
        problem.add_constraint(vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint(vec![1.0], ConstraintOp::Ge, 2.0);
        assert_eq!(
            problem.validate(),
            Err(ValidationError::CoefficientMismatch {
                index: 1,
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn test_operator_round_trip() {
        for op in [ConstraintOp::Le, ConstraintOp::Ge, ConstraintOp::Eq] {
            assert_eq!(op.to_string().parse::<ConstraintOp>(), Ok(op));
        }
        assert_eq!(
            "<".parse::<ConstraintOp>(),
            Err(ValidationError::UnknownOperator("<".to_string()))
        );
    }

    #[test]
    fn test_needs_big_m() {
        let mut le_only = LpProblem::maximize(vec![1.0]);
        le_only.add_constraint(vec![1.0], ConstraintOp::Le, 4.0);
        assert!(!le_only.needs_big_m());

        let mut with_eq = LpProblem::maximize(vec![1.0]);
        with_eq.add_constraint(vec![1.0], ConstraintOp::Eq, 4.0);
        assert!(with_eq.needs_big_m());
    }

    #[test]
    fn test_negative_rhs_is_flipped() {
        let mut problem = LpProblem::minimize(vec![2.0, 3.0]);
        problem.add_constraint(vec![-1.0, -1.0], ConstraintOp::Le, -4.0);
        problem.add_constraint(vec![1.0, 0.0], ConstraintOp::Le, 3.0);

        let normalized = problem.with_nonnegative_rhs();
        assert_eq!(normalized.constraints[0].coefficients, vec![1.0, 1.0]);
        assert_eq!(normalized.constraints[0].op, ConstraintOp::Ge);
        assert_eq!(normalized.constraints[0].rhs, 4.0);
        // untouched row stays as written
        assert_eq!(normalized.constraints[1], problem.constraints[1]);
    }
}
