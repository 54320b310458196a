use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

mod core;
mod parser;

use crate::core::{AnalyzerConfig, CompilationAnalyzer};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "marrow",
    version = "0.1.0",
    author = "marrow developers",
    about = "Structural and call-graph extraction for C# codebases"
)]
struct Cli {
    /// Input directory to analyze
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Output file for the JSON analysis report
    #[arg(short, long, value_name = "FILE", default_value = "marrow.json")]
    output: PathBuf,

    /// Directory to write declaration skeletons into (one file per source
    /// file, mirroring the input layout)
    #[arg(short, long, value_name = "DIR")]
    skeleton_dir: Option<PathBuf>,

    /// Comma-separated namespace prefixes to keep; setting this disables
    /// deny-list filtering
    #[arg(long, value_name = "PREFIXES", value_delimiter = ',')]
    allow_namespaces: Vec<String>,

    /// Comma-separated namespace prefixes to drop, in addition to the
    /// built-in System and Microsoft defaults
    #[arg(long, value_name = "PREFIXES", value_delimiter = ',')]
    deny_namespaces: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    println!("MARROW - C# Structure and Call-Graph Extraction");
    println!("Input: {}", cli.input.display());
    println!("Output: {}", cli.output.display());

    let config = AnalyzerConfig {
        allow_namespaces: normalize(cli.allow_namespaces),
        deny_namespaces: normalize(cli.deny_namespaces),
        skeletonize: cli.skeleton_dir.is_some(),
    };

    let analysis_start = Instant::now();
    let analyzer = CompilationAnalyzer::new(config);
    let report = analyzer.analyze(&cli.input)?;
    println!(
        "Analysis completed in {:.2}s",
        analysis_start.elapsed().as_secs_f64()
    );
    println!(
        "Extracted {} classes, {} call edges from {} files ({} skipped)",
        report.structure.classes.len(),
        report.structure.call_graph.call_count(),
        report.files_analyzed,
        report.failed_files.len()
    );

    let json = serde_json::to_string_pretty(&report.structure)?;
    fs::write(&cli.output, json)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    println!("Report written to {}", cli.output.display());

    if let Some(skeleton_dir) = &cli.skeleton_dir {
        for skeleton in &report.skeletons {
            let target = skeleton_dir.join(&skeleton.relative_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&target, &skeleton.content)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
        println!(
            "{} skeletons written under {}",
            report.skeletons.len(),
            skeleton_dir.display()
        );
    }

    println!(
        "Total execution time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn normalize(prefixes: Vec<String>) -> Vec<String> {
    prefixes
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
