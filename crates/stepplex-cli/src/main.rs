use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stepplex_solver::{
    Labels, LpProblem, MValue, SimplexRun, SolveStatus, StepAction, TableauSnapshot,
};

#[derive(Parser)]
#[command(name = "stepplex")]
#[command(about = "Step-by-step simplex solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file and print the result
    Solve {
        /// JSON file containing the problem
        file: PathBuf,
        /// Print the full iteration-by-iteration trace
        #[arg(short, long)]
        trace: bool,
        /// Output format (pretty, json)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check a problem file for errors
    Check {
        /// JSON file containing the problem
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            trace,
            format,
        } => {
            let problem = load_problem(&file);
            let run = match stepplex_solver::solve(&problem) {
                Ok(run) => run,
                Err(e) => {
                    eprintln!("Invalid problem: {}", e);
                    std::process::exit(1);
                }
            };

            if format == "json" {
                match serde_json::to_string_pretty(&run) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing run: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            println!("Method: {}", run.method);
            if trace {
                println!();
                print_trace(&run);
            }
            println!();
            print_result(&run);
        }
        Commands::Check { file } => {
            let problem = load_problem(&file);
            match problem.validate() {
                Ok(()) => {
                    let method = if problem.needs_big_m() {
                        "gran_m"
                    } else {
                        "simplex"
                    };
                    println!("✓ {} is valid", file.display());
                    println!("  {} variables", problem.num_variables());
                    println!("  {} constraints", problem.num_constraints());
                    println!("  method: {}", method);
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_problem(file: &PathBuf) -> LpProblem {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&source) {
        Ok(problem) => problem,
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_trace(run: &SimplexRun) {
    for step in &run.steps {
        println!("Step {}: {}", step.iteration, step.action.description());
        if let Some(operation) = step.action.operation() {
            println!("  {}", operation);
        }
        match &step.action {
            StepAction::PivotSelection {
                column,
                row,
                pivot,
                ratios,
            } => {
                println!(
                    "  column {}, row {}, pivot value {:.4}",
                    run.labels.column(*column),
                    run.labels.row(*row),
                    pivot
                );
                let rendered: Vec<String> = ratios
                    .iter()
                    .map(|r| {
                        if r.is_finite() {
                            format_number(*r)
                        } else {
                            "inf".to_string()
                        }
                    })
                    .collect();
                println!("  ratios: [{}]", rendered.join(", "));
            }
            _ => {
                if let Some(snapshot) = step.action.tableau() {
                    print!("{}", render_tableau(snapshot, &run.labels));
                }
            }
        }
        println!();
    }
}

fn print_result(run: &SimplexRun) {
    match run.result.status {
        SolveStatus::Optimal => {
            println!("Status: OPTIMAL");
            if let Some(objective) = run.result.objective {
                println!("Objective value: {:.4}", objective);
            }
            if let Some(variables) = &run.result.variables {
                println!("Variables:");
                for variable in variables {
                    println!("  {:8} {:12.4}", variable.name, variable.value);
                }
            }
        }
        SolveStatus::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
            std::process::exit(1);
        }
        SolveStatus::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
            std::process::exit(1);
        }
        SolveStatus::IterationLimitReached => {
            println!("Status: ITERATION LIMIT REACHED");
            println!(
                "No optimum after {} pivots; the tableau may be cycling.",
                stepplex_solver::MAX_ITERATIONS
            );
            std::process::exit(1);
        }
    }
}

fn render_tableau(snapshot: &TableauSnapshot, labels: &Labels) -> String {
    let mut out = String::new();
    out.push_str(&format!("  {:>6}", ""));
    for name in &labels.columns {
        out.push_str(&format!("{:>12}", name));
    }
    out.push('\n');

    for (i, row) in snapshot.numeric.iter().enumerate() {
        out.push_str(&format!("  {:>6}", labels.row(i)));
        for (j, &value) in row.iter().enumerate() {
            let cell = match &snapshot.penalty {
                Some(penalty) if penalty[i][j].abs() > 1e-10 => {
                    MValue::new(round4(penalty[i][j]), round4(value)).to_string()
                }
                _ => format_number(value),
            };
            out.push_str(&format!("{:>12}", cell));
        }
        out.push('\n');
    }
    out
}

fn round4(value: f64) -> f64 {
    (value * 10000.0).round() / 10000.0
}

fn format_number(value: f64) -> String {
    let rendered = format!("{:.4}", value);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
