use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Concord workspace automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lock benchmarks and write a comparison report
    Bench {
        /// Run quickly (lower sample size/time)
        #[arg(long, default_value_t = false)]
        quick: bool,

        /// Generate report only (skip running benchmarks)
        #[arg(long, default_value_t = false)]
        report_only: bool,
    },
}

const BENCHES: &[&str] = &["sync_benchmark", "sorted_list_benchmark"];

/// Per group, the function every other function is compared against.
const BASELINES: &[(&str, &str)] = &[
    ("lock_uncontended", "parking_lot_mutex"),
    ("lock_contended", "parking_lot_mutex"),
    ("rwlock_read_heavy", "parking_lot_rwlock"),
    ("sorted_list_insert", "global_lock"),
];

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Bench { quick, report_only } => {
            if !report_only {
                run_benchmarks(quick)?;
            }
            generate_report()?;
        }
    }

    Ok(())
}

fn run_benchmarks(quick: bool) -> Result<()> {
    for bench in BENCHES {
        println!("\n>>> Running {bench}");
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.arg("bench").arg("--bench").arg(bench);

        // Args for the test runner (Criterion) go after --
        cmd.arg("--");
        if quick {
            cmd.arg("--measurement-time").arg("0.1");
            cmd.arg("--noplot");
            cmd.arg("--sample-size").arg("10");
        }

        let status = cmd.status().with_context(|| format!("failed to run bench {bench}"))?;
        if status.success() {
            println!("Finished {bench} in {:.2?}", start.elapsed());
        } else {
            eprintln!("Warning: benchmark {bench} failed");
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct BenchmarkId {
    group_id: String,
    function_id: Option<String>,
    value_str: Option<String>,
    throughput: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Estimates {
    mean: Estimate,
}

#[derive(Deserialize)]
struct Estimate {
    point_estimate: f64,
}

/// group -> input -> function -> ops/s
type Results = BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>;

fn generate_report() -> Result<()> {
    println!("\n>>> Generating Report...");
    let criterion_dir = Path::new("target/criterion");
    if !criterion_dir.exists() {
        eprintln!("No criterion output found at {}", criterion_dir.display());
        return Ok(());
    }

    let mut results = Results::new();
    collect_results(criterion_dir, &mut results);

    let report_path = Path::new("benchmark_results/report.md");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(report_path)?;

    writeln!(file, "# Lock Benchmark Report")?;
    for (group, inputs) in &results {
        let baseline = BASELINES.iter().find(|(g, _)| g == group).map(|(_, f)| *f);
        writeln!(file, "\n## {group}\n")?;
        writeln!(file, "| Function | Input | Ops/s | vs {} |", baseline.unwrap_or("-"))?;
        writeln!(file, "|---|---|---|---|")?;

        for (input, functions) in inputs {
            let base_ops = baseline.and_then(|b| functions.get(b)).copied();
            for (function, ops) in functions {
                let rel = match base_ops {
                    Some(base) if base > 0.0 => format!("**{:.2}x**", ops / base),
                    _ => "-".to_string(),
                };
                writeln!(file, "| {function} | {input} | {} | {rel} |", format_ops(*ops))?;
            }
        }
    }

    println!("Report written to {}", report_path.display());
    Ok(())
}

fn format_ops(ops: f64) -> String {
    if ops > 1_000_000.0 {
        format!("{:.2}M", ops / 1_000_000.0)
    } else if ops > 1_000.0 {
        format!("{:.2}K", ops / 1_000.0)
    } else {
        format!("{ops:.0}")
    }
}

fn collect_results(dir: &Path, results: &mut Results) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        // Criterion keeps the latest run of each benchmark in `<id>/new/`.
        if path.file_name().and_then(|s| s.to_str()) == Some("new") {
            if let Some((group, input, function, ops)) = read_sample(&path) {
                results.entry(group).or_default().entry(input).or_default().insert(function, ops);
            }
        } else {
            collect_results(&path, results);
        }
    }
}

fn read_sample(dir: &Path) -> Option<(String, String, String, f64)> {
    let id: BenchmarkId = serde_json::from_str(&fs::read_to_string(dir.join("benchmark.json")).ok()?).ok()?;
    let estimates: Estimates = serde_json::from_str(&fs::read_to_string(dir.join("estimates.json")).ok()?).ok()?;

    let time_ns = estimates.mean.point_estimate;
    if time_ns <= 0.0 {
        return None;
    }
    let elements = id
        .throughput
        .as_ref()
        .and_then(|t| t.get("Elements"))
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(1.0);
    let ops = elements * 1e9 / time_ns;
    Some((
        id.group_id,
        id.value_str.unwrap_or_else(|| "-".to_string()),
        id.function_id.unwrap_or_else(|| "-".to_string()),
        ops,
    ))
}
