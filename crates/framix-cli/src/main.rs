use std::process::ExitCode;

use framix_model::Frame;
use framix_solver::{AnalysisConfig, AnalysisResults, SolveMethod, StaticAnalysis};

fn usage() {
    eprintln!("usage: framix solve <model.frame> [options]");
    eprintln!("       framix demo [options]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --method <jacobi|parallel-jacobi|gauss-seidel|sor|distributed>");
    eprintln!("  --iterations <count>      relaxation iterations (default 500)");
    eprintln!("  --omega <factor>          relaxation factor for sor (default 1.2)");
    eprintln!("  --procs <count>           process count for distributed (default 2)");
    eprintln!("  --reorder                 group equation rows by node color");
    eprintln!("  --json                    print results as JSON");
}

struct CliOptions {
    config: AnalysisConfig,
    json: bool,
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut method_name = "jacobi".to_string();
    let mut iterations = 500usize;
    let mut omega = 1.2f64;
    let mut procs = 2usize;
    let mut reorder = false;
    let mut json = false;

    let take_value = |index: usize| -> Result<String, String> {
        args.get(index + 1)
            .cloned()
            .ok_or_else(|| format!("{} needs a value", args[index]))
    };

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--method" => {
                method_name = take_value(index)?;
                index += 2;
            }
            "--iterations" => {
                iterations = take_value(index)?
                    .parse()
                    .map_err(|_| "invalid --iterations value".to_string())?;
                index += 2;
            }
            "--omega" => {
                omega = take_value(index)?
                    .parse()
                    .map_err(|_| "invalid --omega value".to_string())?;
                index += 2;
            }
            "--procs" => {
                procs = take_value(index)?
                    .parse()
                    .map_err(|_| "invalid --procs value".to_string())?;
                index += 2;
            }
            "--reorder" => {
                reorder = true;
                index += 1;
            }
            "--json" => {
                json = true;
                index += 1;
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }

    let method = match method_name.as_str() {
        "jacobi" => SolveMethod::Jacobi,
        "parallel-jacobi" => SolveMethod::ParallelJacobi,
        "gauss-seidel" => SolveMethod::GaussSeidel,
        "sor" => SolveMethod::Sor { omega },
        "distributed" => SolveMethod::Distributed { procs },
        other => return Err(format!("unknown method: {other}")),
    };

    Ok(CliOptions {
        config: AnalysisConfig {
            method,
            iterations,
            reorder_by_color: reorder,
            record_residuals: true,
        },
        json,
    })
}

fn print_results(frame: &Frame, results: &AnalysisResults) {
    println!("solver: {}", results.solver);
    println!("iterations: {}", results.iterations);
    println!("dofs: {}", results.num_dofs);
    println!("colors: {}", results.num_colors);
    println!("diagonally_dominant: {}", results.diagonally_dominant);
    if let Some(residual) = results.residuals.last() {
        println!("final_residual: {residual:e}");
    }
    if !results.warnings.is_empty() {
        println!("warnings: {}", results.warnings.len());
        for warning in &results.warnings {
            println!("  {warning}");
        }
    }

    println!("node displacements:");
    for (index, node) in frame.nodes.iter().enumerate() {
        let [ux, uy, uz] = node.displacement;
        let [rx, ry, rz] = node.rotation;
        println!("  {index}: u=({ux:+.6e}, {uy:+.6e}, {uz:+.6e}) r=({rx:+.6e}, {ry:+.6e}, {rz:+.6e})");
    }
}

fn run(mut frame: Frame, options: &CliOptions) -> ExitCode {
    let results = match StaticAnalysis::new(options.config.clone()).run(&mut frame) {
        Ok(results) => results,
        Err(err) => {
            eprintln!("solve error: {err}");
            return ExitCode::from(1);
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&results) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("serialization error: {err}");
                return ExitCode::from(1);
            }
        }
    } else {
        print_results(&frame, &results);
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        return ExitCode::from(2);
    }

    match args[1].as_str() {
        "solve" => {
            let Some(path) = args.get(2) else {
                usage();
                return ExitCode::from(2);
            };
            let options = match parse_options(&args[3..]) {
                Ok(options) => options,
                Err(message) => {
                    eprintln!("{message}");
                    usage();
                    return ExitCode::from(2);
                }
            };
            let frame = match framix_io::import_frame(path) {
                Ok(frame) => frame,
                Err(err) => {
                    eprintln!("import error: {err}");
                    return ExitCode::from(1);
                }
            };
            run(frame, &options)
        }
        "demo" => {
            let options = match parse_options(&args[2..]) {
                Ok(options) => options,
                Err(message) => {
                    eprintln!("{message}");
                    usage();
                    return ExitCode::from(2);
                }
            };
            run(Frame::sample(), &options)
        }
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}
