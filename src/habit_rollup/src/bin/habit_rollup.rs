use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use habit_rollup::{
    HabitId, RollupService,
    fixture::load_fixture_path,
    settings::{Settings, load_settings_path},
    tz::parse_ts_to_utc,
};
use tracing_subscriber::EnvFilter;

const SETTINGS_ENV: &str = "HABIT_ROLLUP_SETTINGS";

#[derive(Parser)]
#[command(version, about = "Habit rollup CLI")]
struct Cli {
    /// Settings TOML (falls back to $HABIT_ROLLUP_SETTINGS, then built-in defaults).
    #[arg(long, value_name = "FILE", global = true)]
    settings: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the buckets of one habit as JSON.
    Rollup(RollupCmd),
    /// Validate every habit in a fixture.
    Check {
        #[arg(long, value_name = "FILE")]
        fixture: String,
        /// Only check this user's habits.
        #[arg(long)]
        user: Option<i64>,
    },
}

#[derive(Args)]
struct RollupCmd {
    #[arg(long, value_name = "FILE")]
    fixture: String,
    #[arg(long)]
    habit: i64,
    /// RFC-3339 range start.
    #[arg(long)]
    start: String,
    /// RFC-3339 range end (inclusive).
    #[arg(long)]
    end: String,
}

fn load_settings(flag: Option<&str>) -> Result<Settings> {
    let path = flag
        .map(str::to_string)
        .or_else(|| shared_utils::env::get_env_var_opt(SETTINGS_ENV));
    match path {
        Some(p) => load_settings_path(p),
        None => Ok(Settings::default()),
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_deref().unwrap_or("info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref())?;
    init_tracing(&settings);

    match cli.cmd {
        Cmd::Rollup(RollupCmd {
            fixture,
            habit,
            start,
            end,
        }) => {
            let store = load_fixture_path(&fixture)?;
            let svc = RollupService::new(store, settings);
            let start = parse_ts_to_utc(&start)?;
            let end = parse_ts_to_utc(&end)?;
            let buckets = svc.rollup(HabitId(habit), start, end)?;
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
        Cmd::Check { fixture, user } => {
            let store = load_fixture_path(&fixture)?;
            let svc = RollupService::new(&store, settings);
            let habits: Vec<_> = match user {
                Some(id) => store.habits_by_user(id, false).collect(),
                None => store.habits(false).collect(),
            };
            let mut failed = 0usize;
            for habit in habits {
                match svc.effective_config(habit.id) {
                    Ok(cfg) => println!(
                        "ok    habit {} ({}): {} {} in {}",
                        habit.id,
                        habit.name,
                        cfg.period_kind,
                        cfg.aggregation_kind,
                        cfg.timezone.as_deref().unwrap_or_default()
                    ),
                    Err(err) => {
                        failed += 1;
                        println!("error habit {} ({}): {err}", habit.id, habit.name);
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} habit(s) failed validation");
            }
        }
    }

    Ok(())
}
