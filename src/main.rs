use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notion_siyuan::config::Config;
use notion_siyuan::http::Pacer;
use notion_siyuan::migrate::{views, Analyzer, DataImporter, PageMigrator, ViewBuilder};
use notion_siyuan::models::MigrationPlan;
use notion_siyuan::notion::NotionClient;
use notion_siyuan::siyuan::SiYuanClient;
use notion_siyuan::{diagnose, migrate, postprocess};

#[derive(Parser)]
#[command(name = "n2s")]
#[command(about = "Migrate Notion pages and databases into SiYuan")]
struct Cli {
    /// JSON config file (default: <config dir>/notion-siyuan/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for plans, mappings and reports
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Analyze and preview without writing to SiYuan
    #[arg(long, global = true)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check what the Notion integration sees and which SiYuan endpoints answer
    Check,
    /// List top-level Notion pages grouped by workspace
    Workspaces,
    /// Extract database schemas and write the migration plan and guide
    Analyze {
        /// Only keep databases whose URL contains this workspace
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Try to create SiYuan Attribute Views from the plan
    Views {
        /// Plan file (default: the plan in the output directory)
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Target notebook id (default: a new notebook)
        #[arg(long)]
        notebook: Option<String>,
    },
    /// Import database entries as SiYuan documents with attributes
    Import {
        /// Max entries per database (0 = all)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Target notebook id
        #[arg(long)]
        notebook: Option<String>,

        /// Plan file (default: the plan in the output directory)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Migrate standalone Notion pages
    Pages {
        /// Target notebook id (default: the first notebook)
        #[arg(long)]
        notebook: Option<String>,
    },
    /// Write database instructions and convert Notion links in .sy files
    PostProcess {
        /// SiYuan data directory
        #[arg(long, default_value = postprocess::DEFAULT_WORKSPACE_DIR)]
        workspace_dir: PathBuf,

        /// Modify files without asking
        #[arg(short, long)]
        yes: bool,
    },
}

/// Initialize tracing on stderr so stdout only carries reports.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "notion_siyuan=debug,n2s=debug"
    } else {
        "notion_siyuan=info,n2s=info"
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn notion_client(config: &Config) -> Result<NotionClient> {
    Ok(NotionClient::new(
        &config.notion_url,
        config.notion_token()?,
        Pacer::new(config.delay),
    ))
}

fn siyuan_client(config: &Config) -> Result<SiYuanClient> {
    Ok(SiYuanClient::new(
        &config.siyuan_url,
        config.siyuan_token()?,
        Pacer::new(config.delay),
    ))
}

fn load_plan(config: &Config, plan: Option<PathBuf>) -> Result<MigrationPlan> {
    let path = plan.unwrap_or_else(|| {
        MigrationPlan::path_in(&config.output_dir, config.filter_workspace.as_deref())
    });
    if !path.exists() {
        anyhow::bail!(
            "Plan {} not found; run `n2s analyze` first",
            path.display()
        );
    }
    MigrationPlan::load(&path)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} (y/N): ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_banner(title: &str, config: &Config) {
    let rule = "=".repeat(80);
    println!("\n{}\n{}\n{}\n", rule, title, rule);
    println!(
        "Mode: {}",
        if config.dry_run { "dry run" } else { "live" }
    );
    println!("SiYuan: {}\n", config.siyuan_url);
}

async fn check(config: &Config) -> Result<()> {
    if config.notion_token.is_none() && config.siyuan_token.is_none() {
        anyhow::bail!("Neither NOTION_TOKEN nor SIYUAN_TOKEN is set, nothing to check");
    }

    if config.notion_token.is_some() {
        println!("NOTION INTEGRATION\n");
        let diagnosis = diagnose::diagnose_notion(&notion_client(config)?).await;
        println!("{}", diagnose::notion_report(&diagnosis));
    }

    if config.siyuan_token.is_some() {
        let siyuan = siyuan_client(config)?;
        println!("SIYUAN API ({})\n", config.siyuan_url);
        match siyuan.version().await {
            Ok(version) => println!("Kernel version: {}\n", version),
            Err(e) => println!("Kernel unreachable: {}\n", e),
        }
        let results = diagnose::probe_siyuan(&siyuan).await;
        println!("{}", diagnose::siyuan_report(&results));
    }
    Ok(())
}

fn post_process(output_dir: &Path, workspace_dir: &Path, yes: bool) -> Result<()> {
    let mut outcome = postprocess::PostProcessOutcome::default();
    postprocess::write_database_instructions(output_dir, &mut outcome)?;

    println!("The link converter modifies .sy files in {}", workspace_dir.display());
    if yes || confirm("Continue?")? {
        postprocess::convert_links(output_dir, workspace_dir, &mut outcome)?;
    } else {
        println!("Link conversion cancelled");
    }

    println!("\n{}", outcome.summary());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.dry_run {
        config.dry_run = true;
    }

    match cli.command {
        Commands::Check => check(&config).await?,
        Commands::Workspaces => {
            let analyzer = Analyzer::new(notion_client(&config)?, &config.output_dir, None);
            let workspaces = analyzer.list_workspaces().await?;
            if workspaces.is_empty() {
                println!("No top-level page visible to the integration");
            }
            for ws in workspaces {
                println!("{} ({} pages)", ws.name, ws.pages.len());
                for (id, title) in ws.pages {
                    println!("  - {} [{}]", title, id);
                }
            }
        }
        Commands::Analyze { workspace } => {
            if workspace.is_some() {
                config.filter_workspace = workspace;
            }
            let analyzer = Analyzer::new(
                notion_client(&config)?,
                &config.output_dir,
                config.filter_workspace.clone(),
            );
            let outcome = analyzer.run().await?;
            println!("{}", outcome.summary());
        }
        Commands::Views { plan, notebook } => {
            if notebook.is_some() {
                config.target_notebook_id = notebook;
            }
            let plan = load_plan(&config, plan)?;
            print_banner("ATTRIBUTE VIEW CREATION", &config);

            if config.dry_run {
                println!("{}", views::plan_summary(&plan));
                println!("Dry run: no view created");
            } else {
                let builder = ViewBuilder::new(
                    siyuan_client(&config)?,
                    config.target_notebook_id.clone(),
                    config.create_snapshots,
                    &config.output_dir,
                );
                let mapping = builder.run(&plan).await?;
                println!(
                    "{} views created, {} failed",
                    mapping.database_mapping.len(),
                    mapping.errors.len()
                );
                for error in mapping.errors.iter().take(10) {
                    println!("   - {}", error);
                }
            }
        }
        Commands::Import {
            limit,
            notebook,
            plan,
        } => {
            if let Some(limit) = limit {
                config.test_limit = limit;
            }
            if notebook.is_some() {
                config.target_notebook_id = notebook;
            }
            let notion = notion_client(&config)?;
            let siyuan = siyuan_client(&config)?;
            let notebook_id = config.target_notebook()?.to_string();
            let plan = load_plan(&config, plan)?;

            print_banner("NOTION → SIYUAN DATA IMPORT", &config);
            let outcome = DataImporter::new(notion, siyuan, notebook_id, &config.output_dir)
                .dry_run(config.dry_run)
                .test_limit(config.test_limit)
                .run(&plan)
                .await?;
            println!("{}", outcome.report());
        }
        Commands::Pages { notebook } => {
            if notebook.is_some() {
                config.target_notebook_id = notebook;
            }
            print_banner("NOTION → SIYUAN PAGE MIGRATION", &config);
            let migrator = PageMigrator::new(
                notion_client(&config)?,
                siyuan_client(&config)?,
                config.target_notebook_id.clone(),
                &config.output_dir,
            )
            .dry_run(config.dry_run)
            .create_snapshots(config.create_snapshots && !config.dry_run);
            let report = migrator.run().await?;
            println!("{}", migrate::pages::report_summary(&report));
        }
        Commands::PostProcess { workspace_dir, yes } => {
            post_process(&config.output_dir, &workspace_dir, yes)?;
        }
    }

    Ok(())
}
