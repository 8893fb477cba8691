// Command-line entry point for the roadmap ingestion pipeline

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use venture_roadmap_lib::ai::HttpLanguageModel;
use venture_roadmap_lib::config::{
    init_config_file, load_merged_config, PartialAiConfig, PartialConfig, PlannerConfig,
};
use venture_roadmap_lib::database::{projects, Database};
use venture_roadmap_lib::ingest::{resolve_roadmap, PlanRequest, RoadmapIngestor};
use venture_roadmap_lib::scheduler::DateScheduler;

/// Venture Roadmap - turn AI business roadmaps into scheduled milestones and tasks
#[derive(Parser, Debug)]
#[command(name = "venture-roadmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true, env = "VENTURE_ROADMAP_DB")]
    db: Option<PathBuf>,

    /// Override the model name from config
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a roadmap response and print the resolved graph as JSON
    Parse {
        #[arg(long)]
        input: PathBuf,
        /// Anchor date for scheduling (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Parse a roadmap response and commit it
    Ingest {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        project_id: String,
        /// Title used when the response has none
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Ask the model for a roadmap, then parse and commit it
    Generate {
        /// Business idea to plan for
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Commit a single milestone response under an existing plan
    Milestone {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        plan_id: String,
        #[arg(long)]
        project_id: String,
        /// Name used when the response has no milestone heading
        #[arg(long, default_value = "New Milestone")]
        name: String,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Resolve a JSON suggestion response against stored progress
    Suggestions {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        project_id: String,
        #[arg(long, value_enum, default_value_t = SuggestionKind::Milestones)]
        kind: SuggestionKind,
    },
    /// Create a project to ingest roadmaps into
    NewProject {
        #[arg(long)]
        name: String,
    },
    /// Write the effective configuration to the config file
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SuggestionKind {
    Milestones,
    Tasks,
    Actions,
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn open_database(config: &PlannerConfig) -> Result<Database> {
    let path = config
        .database
        .resolved_path()
        .ok_or_else(|| anyhow!("Could not determine database path; pass --db"))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    log::debug!("Opening database at {}", path.display());
    let db = Database::new(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    db.init().context("Failed to initialize database schema")?;
    Ok(db)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn request(user_id: String, project_id: String, title: Option<String>) -> PlanRequest {
    let request = PlanRequest::new(user_id, project_id);
    match title {
        Some(title) => request.with_title(title),
        None => request,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let overrides = PartialConfig {
        ai: cli.model.clone().map(|model| PartialAiConfig {
            model: Some(model),
            ..Default::default()
        }),
        database: cli.db.clone().map(|path| venture_roadmap_lib::config::PartialDatabaseConfig {
            path: Some(path),
        }),
        ..Default::default()
    };
    let config = load_merged_config(cli.config.as_deref(), Some(overrides))?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Parse { input, today: anchor } => {
            let text = read_input(&input)?;
            let scheduler = DateScheduler::with_rules(anchor.unwrap_or(today), &config.scheduling);
            let outcome = resolve_roadmap(&text, &PlanRequest::new("local", "local"), &scheduler);
            print_json(&outcome)?;
        }
        Command::Ingest {
            input,
            user_id,
            project_id,
            title,
            today: anchor,
        } => {
            let text = read_input(&input)?;
            let mut ingestor = RoadmapIngestor::new(open_database(&config)?, config.scheduling.clone());
            let outcome = ingestor.ingest(
                &text,
                &request(user_id, project_id, title),
                anchor.unwrap_or(today),
            )?;
            println!("{}", outcome.summary);
            println!("Plan id: {}", outcome.plan.id);
        }
        Command::Generate {
            prompt,
            user_id,
            project_id,
            title,
        } => {
            let model = HttpLanguageModel::from_config(&config.ai)?;
            let mut ingestor = RoadmapIngestor::new(open_database(&config)?, config.scheduling.clone());
            let outcome = ingestor
                .generate(&model, &prompt, &request(user_id, project_id, title), today)
                .await?;
            println!("{}", outcome.summary);
            println!("Plan id: {}", outcome.plan.id);
        }
        Command::Milestone {
            input,
            plan_id,
            project_id,
            name,
            today: anchor,
        } => {
            let text = read_input(&input)?;
            let mut ingestor = RoadmapIngestor::new(open_database(&config)?, config.scheduling.clone());
            let milestone = ingestor.ingest_milestone(
                &text,
                &plan_id,
                &project_id,
                &name,
                anchor.unwrap_or(today),
            )?;
            println!(
                "Added milestone '{}' with {} tasks ({} to {})",
                milestone.name,
                milestone.tasks.len(),
                milestone.start_date,
                milestone.due_date
            );
        }
        Command::Suggestions {
            input,
            project_id,
            kind,
        } => {
            let text = read_input(&input)?;
            let ingestor = RoadmapIngestor::new(open_database(&config)?, config.scheduling.clone());
            match kind {
                SuggestionKind::Milestones => {
                    print_json(&ingestor.milestone_suggestions(&text, &project_id)?)?
                }
                SuggestionKind::Tasks => print_json(&ingestor.task_suggestions(&text, &project_id)?)?,
                SuggestionKind::Actions => print_json(&ingestor.action_recommendations(&text)?)?,
            }
        }
        Command::NewProject { name } => {
            let db = open_database(&config)?;
            let project = projects::create_project(db.get_connection(), &name)?;
            println!("{}", project.id);
        }
        Command::InitConfig { force } => {
            let path = init_config_file(cli.config.as_deref(), &config, force)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
