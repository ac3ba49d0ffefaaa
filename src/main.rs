use anyhow::Context;
use clap::Parser;
use taxonomy_reconcile::{cli, config, job, loader};
use cli::{Cli, Commands};
use config::{Config, Overrides};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> anyhow::Result<Config> {
    Config::load().context("failed to load configuration")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Reconcile {
            input,
            taxonomy,
            output,
            format,
            sheet,
            taxonomy_sheet,
            alias,
            cluster_threshold,
            fallback_threshold,
            repair_threshold,
            scorer,
            countries,
            regions,
            use_cases,
            dashboard,
            report,
            dry_run,
        } => {
            println!("🏷  taxonomy-reconcile - ラベル正規化\n");

            let mut config = load_config()?;
            config
                .apply_overrides(&Overrides {
                    cluster_threshold,
                    fallback_threshold,
                    repair_threshold,
                    scorer,
                    taxonomy_sheet,
                    alias_file: alias,
                })
                .context("invalid command-line options")?;

            let job = job::ReconcileJob {
                input,
                taxonomy,
                output,
                format,
                sheet,
                countries,
                regions,
                use_cases,
                dashboard,
                report,
                dry_run,
            };
            let outcome = job::run_job(&job, &config)
                .with_context(|| format!("failed to reconcile {}", job.input.display()))?;

            println!("\n集計:");
            for line in outcome.report.summary_lines() {
                println!("{}", line);
            }
            for value in &outcome.report.unresolved {
                println!("  - [{}] {}", value.column, value.value);
            }

            println!("\n✅ 完了");
        }

        Commands::Taxonomy { file, sheet } => {
            let config = load_config()?;
            let sheet = sheet.unwrap_or_else(|| config.taxonomy_sheet.clone());
            let index = loader::load_taxonomy(&file, &sheet)
                .with_context(|| format!("failed to load taxonomy {}", file.display()))?;

            println!("タクソノミ: {}", file.display());
            println!("  Product types: {}", index.product_types().count());
            println!("  Product Subtype: {}", index.product_subtypes().count());
            println!("  Use Cases: {}", index.use_cases().count());
            println!("  ラベル: {}", index.len());
            println!("  正規語彙: {}", index.vocabulary().len());
            println!();
            for (product_type, subtypes, use_cases) in index.summary_by_type() {
                println!("  {} (Subtype {} / Use Case {})", product_type, subtypes, use_cases);
            }
        }

        Commands::Config { show, init } => {
            let config = if init {
                let config = Config::init().context("failed to write configuration")?;
                println!("✔ デフォルト設定を書き出しました: {}", Config::config_path()?.display());
                config
            } else {
                load_config()?
            };

            if show || !init {
                println!("設定: {}", Config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
