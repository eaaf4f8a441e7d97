mod choose_cmd;
mod config;
mod plan_cmd;
mod recipes_cmd;
mod shopping_cmd;
mod store;

use clap::{Parser, Subcommand};

use config::MealplanConfig;
use plan_cmd::PlanArgs;

#[derive(Parser)]
#[command(name = "mealplan", about = "Weekly dinner planner and shopping-list builder")]
struct Cli {
    /// Data directory (overrides MEALPLAN_DATA_DIR env var)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// User the command acts as (overrides MEALPLAN_USER env var)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a mealplan config file and seed the data directory
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Browse the recipe corpus
    Recipes {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Generate ranked plan candidates for the coming days
    Plan {
        /// Number of dinners to plan
        #[arg(long, default_value_t = 7)]
        days: u8,
        /// Servings per dinner
        #[arg(long, default_value_t = 2)]
        servings: u32,
        /// Number of alternative plans to generate
        #[arg(long, default_value_t = 3)]
        options: u8,
        /// Skip recipes carrying this tag (repeatable)
        #[arg(long = "exclude-tag")]
        exclude_tags: Vec<String>,
        /// Skip recipes containing this ingredient (repeatable)
        #[arg(long = "exclude-ingredient")]
        exclude_ingredients: Vec<String>,
        /// Nudge plans toward this tag (repeatable)
        #[arg(long = "favor-tag")]
        favor_tags: Vec<String>,
        /// Nudge plans away from this tag (repeatable)
        #[arg(long = "disfavor-tag")]
        disfavor_tags: Vec<String>,
        /// Free-text request echoed into each plan's rationale
        #[arg(long)]
        note: Option<String>,
    },
    /// Select one candidate from the last generated batch
    Choose {
        /// Option number from the `plan` output, or a candidate UUID
        candidate: String,
    },
    /// Build the consolidated shopping list for the latest selection
    Shopping {
        /// Servings to scale the list to
        #[arg(long, default_value_t = 2)]
        servings: u32,
        /// Build for explicit recipe IDs instead of the latest selection
        /// (repeatable)
        #[arg(long = "recipe")]
        recipes: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// List recipes, optionally filtered
    List {
        /// Require this tag (repeatable; all must match)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Substring to match against title and summary
        #[arg(long)]
        text: Option<String>,
    },
    /// Show one recipe in full
    Show {
        /// Recipe ID to show
        recipe_id: String,
    },
}

/// Execute the `mealplan init` command: write config and seed the data dir.
fn cmd_init(resolved: &MealplanConfig, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        storage: config::StorageSection {
            data_dir: resolved.data_dir.display().to_string(),
        },
        user: config::UserSection {
            name: resolved.user.clone(),
        },
    };
    config::save_config(&cfg)?;

    let seeded = store::ensure_recipe_file(&resolved.recipes_path())?;

    println!("Config written to {}", path.display());
    println!("  storage.data_dir = {}", resolved.data_dir.display());
    println!("  user.name = {}", resolved.user);
    if seeded {
        println!("Empty recipe file created at {}", resolved.recipes_path().display());
    }
    println!();
    println!("Next: add recipes to recipes.json, then run `mealplan plan`.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let resolved = MealplanConfig::resolve(cli.data_dir.as_deref(), cli.user.as_deref())?;

    match cli.command {
        Commands::Init { force } => {
            cmd_init(&resolved, force)?;
        }
        Commands::Recipes { command } => {
            let corpus = store::JsonCorpus::load(&resolved.recipes_path())?;
            match command {
                RecipeCommands::List { tags, text } => {
                    recipes_cmd::run_list(&corpus, tags, text).await?;
                }
                RecipeCommands::Show { recipe_id } => {
                    recipes_cmd::run_show(&corpus, &recipe_id).await?;
                }
            }
        }
        Commands::Plan {
            days,
            servings,
            options,
            exclude_tags,
            exclude_ingredients,
            favor_tags,
            disfavor_tags,
            note,
        } => {
            plan_cmd::run_plan(
                &resolved,
                PlanArgs {
                    days,
                    servings,
                    options,
                    exclude_tags,
                    exclude_ingredients,
                    favor_tags,
                    disfavor_tags,
                    note,
                },
            )
            .await?;
        }
        Commands::Choose { candidate } => {
            choose_cmd::run_choose(&resolved, &candidate).await?;
        }
        Commands::Shopping { servings, recipes } => {
            shopping_cmd::run_shopping(&resolved, recipes, servings).await?;
        }
    }

    Ok(())
}
