use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use structopt::StructOpt;

use altair_planning::classical::plan;
use altair_planning::parsing::{parse_domain, parse_problem};

/// Grounds a PDDL domain/problem pair and searches for a plan.
#[derive(Debug, StructOpt)]
#[structopt(name = "planner", rename_all = "kebab-case")]
struct Opt {
    domain: PathBuf,
    problem: PathBuf,

    /// Search with the constant-zero heuristic instead of the relaxed-plan heuristic.
    #[structopt(short = "d")]
    default_heuristic: bool,

    /// If a plan is found, it will be written to the indicated file.
    #[structopt(short = "p", long = "plan")]
    plan_file: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt: Opt = Opt::from_args();
    let start_time = std::time::Instant::now();

    ensure!(
        opt.domain.exists(),
        "Domain file {} does not exist",
        opt.domain.display()
    );
    ensure!(
        opt.problem.exists(),
        "Problem file {} does not exist",
        opt.problem.display()
    );

    let domain = parse_domain(&opt.domain)?;
    let problem = parse_problem(&opt.problem)?;

    let outcome = plan(&domain, &problem, !opt.default_heuristic)?;

    println!(
        "visited nodes: {} expanded nodes: {}",
        outcome.visited, outcome.expanded
    );
    match (&outcome.path, outcome.cost) {
        (Some(path), Some(cost)) => {
            println!("Plan found with cost {cost}");
            for edge in path {
                println!("{}", edge.name);
            }
            if let Some(plan_file) = &opt.plan_file {
                let mut output = File::create(plan_file)
                    .with_context(|| format!("Option -p failed to create file {plan_file}"))?;
                for edge in path {
                    writeln!(output, "{}", edge.name).context("Error while writing plan.")?;
                }
            }
        }
        _ => println!("No plan found"),
    }
    println!("needed {:.2} seconds", start_time.elapsed().as_secs_f64());
    Ok(())
}
