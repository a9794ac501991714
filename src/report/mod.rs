pub mod flow;
pub mod json;
pub mod junit;

use crate::runner::state::BatchReport;
use anyhow::Result;
use std::path::Path;

/// Generate report from a saved batch report
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let report: BatchReport = json::read_json(results_path)?;

    match format {
        "json" => json::generate(&report, output),
        "junit" => {
            let xml = junit::generate_junit_xml(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(path, xml)?;
                    println!("JUnit report saved to: {}", path.display());
                }
                None => println!("{}", xml),
            }
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    }
}
