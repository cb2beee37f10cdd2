mod aggregate;
mod anomaly;
mod config;
mod filter;
mod gitlog;
mod locator;
mod parser;
mod period;
mod record;
mod report;

use aggregate::{ChartData, ChartKind};
use clap::{Parser, Subcommand, ValueEnum};
use config::Settings;
use filter::FilterOptions;
use record::RecordCollection;
use report::Report;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A Rust CLI tool that extracts productivity metrics from git repositories:
/// scan directories for repositories, mine their history into a persisted
/// report, then filter and aggregate it into chart-ready data.
#[derive(Parser, Debug)]
#[command(name = "prodstats", version, about)]
struct Cli {
    /// Settings file path (default: ~/.config/prodstats/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only errors, no progress output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Scan repositories and persist the productivity report
    Report {
        /// Root directories to search for repositories (default: from settings)
        #[arg(short, long)]
        dir: Vec<PathBuf>,
        /// Pathspec patterns to exclude from line stats
        #[arg(short, long)]
        exclude: Vec<String>,
        /// Output path for the report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Filter a persisted report and aggregate it into chart data
    Plot {
        /// Which aggregation to produce
        #[arg(value_enum)]
        chart: ChartArg,
        /// Author tokens, each a case-insensitive regex (up to 3)
        #[arg(short, long)]
        author: Vec<String>,
        /// Window start (YYYY-MM-DD[ HH:MM], YYYY-MM or YYYY)
        #[arg(long)]
        start_date: Option<String>,
        /// Window end, exclusive
        #[arg(long)]
        end_date: Option<String>,
        /// Symbolic period (today, 24h, this_week, 7d, this_month, 30d,
        /// this_year, 1y); conflicts with explicit dates
        #[arg(short, long)]
        period: Option<String>,
        /// Report file to read (default: the report output path)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Output template for the chart data
        #[arg(short, long)]
        output: Option<String>,
    },
    /// List changes large enough to be considered anomalies
    Anomaly {
        /// Added-line count above which a change is flagged
        #[arg(short, long, default_value_t = anomaly::DEFAULT_THRESHOLD)]
        quantity: i64,
        /// Author tokens, each a case-insensitive regex
        #[arg(short, long)]
        author: Vec<String>,
        /// Window start (YYYY-MM-DD[ HH:MM], YYYY-MM or YYYY)
        #[arg(long)]
        start_date: Option<String>,
        /// Window end, exclusive
        #[arg(long)]
        end_date: Option<String>,
        /// Report file to read (default: the report output path)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// List discovered repositories or known authors
    List {
        #[command(subcommand)]
        what: ListCommand,
    },
    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ListCommand {
    /// Print every repository found under the root directories
    Repos {
        #[arg(short, long)]
        dir: Vec<PathBuf>,
    },
    /// Print every distinct author across the found repositories
    Authors {
        #[arg(short, long)]
        dir: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the resolved settings
    Show,
    /// Overwrite the settings file with defaults
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChartArg {
    Monthly,
    Weekday,
    TimeOfDay,
    TopLanguages,
    TopAuthors,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_settings_path);
    let settings = Settings::load(&settings_path)?;

    match cli.command {
        CliCommand::Report { dir, exclude, output } => {
            let dirs = or_default(dir, settings.report.dirs);
            let exclude = or_default(exclude, settings.report.exclude);
            let output = output.unwrap_or(settings.report.output);

            let report = Report::new(dirs, exclude, output.clone());
            let records = report.generate().await?;
            println!("Report with {} records written to {}", records.len(), output.display());
        }

        CliCommand::Plot {
            chart,
            author,
            start_date,
            end_date,
            period,
            input,
            output,
        } => {
            let authors = or_default(author, settings.plot.authors);
            let start = start_date.as_deref().map(period::parse_date).transpose()?;
            let end = end_date.as_deref().map(period::parse_date).transpose()?;
            let now = chrono::Local::now().naive_local();

            let opts = FilterOptions::build(start, end, period.as_deref(), authors, now)?;

            let input = input.unwrap_or(settings.report.output);
            let collection = RecordCollection::load(&input)?;
            let filtered = filter::apply(&collection, &opts.predicates())?;

            let data = build_chart(chart, &filtered);
            let template = output.unwrap_or(settings.plot.output);
            let path = resolve_plot_output(&template, data.kind, &opts, now);

            std::fs::write(&path, serde_json::to_vec_pretty(&data)?)?;
            println!("{} data written to {}", data.title, path.display());
        }

        CliCommand::Anomaly {
            quantity,
            author,
            start_date,
            end_date,
            input,
        } => {
            let authors = or_default(author, settings.plot.authors);
            let start = start_date.as_deref().map(period::parse_date).transpose()?;
            let end = end_date.as_deref().map(period::parse_date).transpose()?;
            let opts = anomaly::AnomalyOptions::build(start, end, quantity, authors)?;

            let input = input.unwrap_or(settings.report.output);
            let collection = RecordCollection::load(&input)?;
            let found = anomaly::scan(&collection, &opts)?;

            if found.is_empty() {
                println!("No anomalies found");
            } else {
                println!("{:<6} - {:<15} - Path", "Plus", "Author");
                for r in &found {
                    let author: String = r.author().chars().take(15).collect();
                    println!("{:<6} - {author:<15} - {}", r.plus(), r.path());
                }
            }
        }

        CliCommand::List { what } => match what {
            ListCommand::Repos { dir } => {
                let dirs = or_default(dir, settings.report.dirs);
                locator::find_repositories(&dirs, |repo| println!("{}", repo.display()))?;
            }
            ListCommand::Authors { dir } => {
                let dirs = or_default(dir, settings.report.dirs);
                gitlog::ensure_git().await?;

                let mut repos = Vec::new();
                locator::find_repositories(&dirs, |repo| repos.push(repo.to_path_buf()))?;

                let mut authors = BTreeSet::new();
                for repo in repos {
                    authors.extend(gitlog::list_authors(&repo).await?);
                }
                for author in authors {
                    println!("{author}");
                }
            }
        },

        CliCommand::Config { action } => match action {
            ConfigCommand::Show => {
                println!("# {}", settings_path.display());
                print!("{}", toml::to_string_pretty(&settings)?);
            }
            ConfigCommand::Reset => {
                Settings::default().save(&settings_path)?;
                println!("Settings reset at {}", settings_path.display());
            }
        },
    }

    Ok(())
}

fn or_default<T>(given: Vec<T>, fallback: Vec<T>) -> Vec<T> {
    if given.is_empty() {
        fallback
    } else {
        given
    }
}

fn build_chart(chart: ChartArg, collection: &RecordCollection) -> ChartData {
    match chart {
        ChartArg::Monthly => aggregate::monthly(collection),
        ChartArg::Weekday => aggregate::weekday(collection),
        ChartArg::TimeOfDay => aggregate::time_of_day(collection),
        ChartArg::TopLanguages => aggregate::top_languages(collection),
        ChartArg::TopAuthors => aggregate::top_authors(collection),
    }
}

/// Fill the output template's placeholders; a template without an extension
/// gets `.json` appended.
fn resolve_plot_output(
    template: &str,
    kind: ChartKind,
    opts: &FilterOptions,
    now: chrono::NaiveDateTime,
) -> PathBuf {
    const STAMP: &str = "%Y%m%d%H%M";

    let start = opts.start.format(STAMP).to_string();
    let end = opts.end.format(STAMP).to_string();
    let mut output = template
        .replace("<chart>", kind.name())
        .replace("<authors>", &opts.authors.join("_"))
        .replace("<date>", &format!("{start}_{end}"))
        .replace("<start_date>", &start)
        .replace("<end_date>", &end)
        .replace("<timestamp>", &now.format("%Y%m%d%H%M%S").to_string());

    // The extension is decided by the template; resolved tokens may carry
    // dots of their own (an author regex like `alice\.smith`).
    if std::path::Path::new(template).extension().is_none() {
        output.push_str(".json");
    }
    PathBuf::from(output)
}
