mod bigm;
mod pivot;
mod problem;
mod simplex;
mod solution;
mod step;
mod tableau;

pub use bigm::MValue;
pub use problem::{Constraint, ConstraintOp, LpProblem, Objective, Sense, ValidationError};
pub use simplex::{EPSILON, MAX_ITERATIONS, Method, SimplexRun, solve};
pub use solution::{SolveResult, SolveStatus, VariableValue};
pub use step::{Step, StepAction, StepLog, TableauSnapshot};
pub use tableau::Labels;
