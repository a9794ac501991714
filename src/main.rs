use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lumi_explorer::discovery::DiscoveredFeature;
use lumi_explorer::report;
use lumi_explorer::synth::{TestCase, TestCaseSynthesizer};
use lumi_explorer::utils::config::ExplorerConfig;

#[derive(Parser)]
#[command(name = "lumi-explorer")]
#[command(author = "NL Team")]
#[command(version = "0.1.3")]
#[command(about = "Discover web page features and synthesize UI tests", long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a page and write the discovered features
    Discover {
        /// Page to open
        #[arg(short, long)]
        url: String,

        /// Hover likely triggers to reveal hidden features
        #[arg(long, default_value = "false")]
        dynamic: bool,

        /// Also rank well-known essential elements
        #[arg(long, default_value = "false")]
        essentials: bool,

        /// Output directory (defaults to the configured output dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Synthesize test cases from a features file
    Generate {
        /// Path to features JSON written by `discover`
        #[arg(short, long)]
        features: PathBuf,

        /// Output path for the test cases JSON
        #[arg(short, long, default_value = "./output/test-cases.json")]
        output: PathBuf,

        /// Also export one YAML flow per case into this directory
        #[arg(long)]
        flows: Option<PathBuf>,

        /// Url written into exported flow headers
        #[arg(long)]
        url: Option<String>,
    },

    /// Execute test cases against a page
    Run {
        /// Page to open
        #[arg(short, long)]
        url: String,

        /// Path to test cases JSON written by `generate`
        #[arg(long)]
        cases: PathBuf,

        /// Output directory for results and screenshots
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate report from saved results
    Report {
        /// Path to results JSON written by `run`
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = ExplorerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Discover {
            url,
            dynamic,
            essentials,
            output,
        } => {
            if let Some(dir) = output {
                config.execution.output_dir = dir;
            }
            println!("{} Discovering features on: {}", "🔍".to_string().blue(), url.cyan());
            web::discover(&config, &url, dynamic, essentials).await?;
        }

        Commands::Generate {
            features,
            output,
            flows,
            url,
        } => {
            println!(
                "{} Generating test cases from: {}",
                "🧪".to_string().blue(),
                features.display()
            );
            let features: Vec<DiscoveredFeature> = report::json::read_json(&features)?;
            let cases = TestCaseSynthesizer::new().synthesize_all(&features);
            report::json::write_json(&cases, &output)?;
            println!(
                "{} {} test cases written to {}",
                "✅".green(),
                cases.len(),
                output.display()
            );

            if let Some(dir) = flows {
                let written = report::flow::write_flows(&cases, url.as_deref(), &dir)?;
                println!("{} {} flows written to {}", "📝".green(), written.len(), dir.display());
            }
        }

        Commands::Run { url, cases, output } => {
            if let Some(dir) = output {
                config.execution.output_dir = dir;
            }
            let cases: Vec<TestCase> = report::json::read_json(&cases)?;
            println!(
                "{} Running {} test cases against: {}",
                "▶".green().bold(),
                cases.len(),
                url.cyan()
            );
            web::run(&config, &url, &cases).await?;
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(feature = "web")]
mod web {
    use colored::Colorize;
    use lumi_explorer::discovery::DiscoveryAggregator;
    use lumi_explorer::driver::web::WebPage;
    use lumi_explorer::report;
    use lumi_explorer::runner::run_cases;
    use lumi_explorer::synth::TestCase;
    use lumi_explorer::utils::config::ExplorerConfig;

    pub async fn discover(
        config: &ExplorerConfig,
        url: &str,
        dynamic: bool,
        essentials: bool,
    ) -> anyhow::Result<()> {
        let page = WebPage::launch(&config.browser).await?;
        page.goto(url).await?;

        let aggregator = DiscoveryAggregator::new(&page, &config.discovery);
        let mut features = aggregator.discover_all().await?;
        println!("{} {} features discovered", "✅".green(), features.len());

        if dynamic {
            let revealed = aggregator.discover_dynamic(&mut features).await?;
            println!("{} {} features revealed by hover", "✨".green(), revealed.len());
            features.extend(revealed);
        }

        let dir = &config.execution.output_dir;
        let path = dir.join("features.json");
        report::json::write_json(&features, &path)?;
        println!("  Features: {}", path.display().to_string().cyan());

        if essentials {
            let ranked = aggregator.discover_essentials().await?;
            let path = dir.join("essentials.json");
            report::json::write_json(&ranked, &path)?;
            println!("  Essentials ({}): {}", ranked.len(), path.display().to_string().cyan());
        }
        Ok(())
    }

    pub async fn run(config: &ExplorerConfig, url: &str, cases: &[TestCase]) -> anyhow::Result<()> {
        let page = WebPage::launch(&config.browser).await?;
        page.goto(url).await?;

        let batch = run_cases(&page, cases, config.execution.clone()).await;

        let dir = &config.execution.output_dir;
        let results = dir.join("results.json");
        report::json::write_json(&batch, &results)?;
        let junit = report::junit::write_report(&batch, dir)?;
        println!("  Results: {}", results.display().to_string().cyan());
        println!("  JUnit: {}", junit.display().to_string().cyan());

        if batch.summary.failed > 0 {
            anyhow::bail!("{} of {} test cases failed", batch.summary.failed, batch.summary.total);
        }
        Ok(())
    }
}

#[cfg(not(feature = "web"))]
mod web {
    use lumi_explorer::synth::TestCase;
    use lumi_explorer::utils::config::ExplorerConfig;

    const MISSING: &str = "browser support is not compiled in, rebuild with `--features web`";

    pub async fn discover(
        _config: &ExplorerConfig,
        _url: &str,
        _dynamic: bool,
        _essentials: bool,
    ) -> anyhow::Result<()> {
        anyhow::bail!(MISSING)
    }

    pub async fn run(_config: &ExplorerConfig, _url: &str, _cases: &[TestCase]) -> anyhow::Result<()> {
        anyhow::bail!(MISSING)
    }
}
