//! stereoprobe CLI
//!
//! Usage:
//!   stereoprobe                                   # Print a session plan
//!   stereoprobe --plan --json                     # Plan as JSON
//!   stereoprobe --run                             # Practice + main task in the terminal
//!   stereoprobe --run --render                    # ...then print the export table
//!   stereoprobe --run --submit-url URL            # ...then POST the export as form fields
//!   stereoprobe --config study.json --seed 7      # Custom config, reproducible plan

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use stereoprobe::core::{
    default_catalog, deliver_or_keep, generate_session_id, load_catalog, FormPostTransport,
    Keyboard, RenderTransport, Session, SessionPlan, SessionReport, StatementPool, TerminalScreen,
    Transport,
};
use stereoprobe::types::{StudyConfig, StudyError};
use stereoprobe::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "stereoprobe",
    version = VERSION,
    about = "Party-statement True/False judgment task",
    long_about = "stereoprobe builds a balanced, run-length constrained set of party\n\
                  statements, gates it behind a known-answer practice round, records\n\
                  True/False judgments with reaction times and exports the session.\n\n\
                  Modes:\n  \
                  --plan         Print the ordered trial plan (default)\n  \
                  --run          Run practice + main task on this terminal\n  \
                  --render       Print the export table after a run\n  \
                  --submit-url   POST the export as form fields after a run\n\n\
                  Keys are read line by line: type the key and press Enter."
)]
struct Args {
    /// Study configuration (JSON); defaults apply to missing fields
    #[arg(short, long)]
    config: Option<String>,

    /// Statement catalog (JSON array); built-in catalog if omitted
    #[arg(long)]
    catalog: Option<String>,

    /// Seed for sampling and ordering
    #[arg(long)]
    seed: Option<u64>,

    /// Session id; generated if omitted
    #[arg(long)]
    session_id: Option<String>,

    /// Print the trial plan
    #[arg(short, long)]
    plan: bool,

    /// Run the session interactively
    #[arg(short, long)]
    run: bool,

    /// Print the export table after the run
    #[arg(long, requires = "run")]
    render: bool,

    /// Form endpoint for the export; the payload is printed as JSON if
    /// the POST fails
    #[arg(long, requires = "run")]
    submit_url: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<(), StudyError> {
    let config = match &args.config {
        Some(path) => StudyConfig::load(path)?,
        None => StudyConfig::default(),
    };
    let entries = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => default_catalog(),
    };
    let pool = StatementPool::new(&entries, config.nouns.clone())?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let session_id = args
        .session_id
        .clone()
        .unwrap_or_else(|| generate_session_id(&mut rng));

    let plan = SessionPlan::build(session_id, &pool, &config, &mut rng)?;

    if !args.run {
        print_plan(&plan, args.json);
        return Ok(());
    }
    if args.plan {
        print_plan(&plan, args.json);
    }

    let keyboard = spawn_stdin_keyboard(&config);
    let session = Session::new(&config, &plan);
    let (_, report) = session
        .run(TerminalScreen::new(config.keys), keyboard, &mut rng)
        .await;

    if args.json {
        print_json(&report);
    }
    if args.render || (args.submit_url.is_none() && !args.json) {
        RenderTransport::new().deliver(&report.payload).await?;
    }
    if let Some(url) = &args.submit_url {
        let transport = FormPostTransport::new(url.clone(), config.export.max_field_len);
        let mut stdout = std::io::stdout();
        if let Err(e) = deliver_or_keep(&transport, &report.payload, &mut stdout).await {
            warn!(url = transport.url(), "submission failed, payload printed to stdout");
            return Err(e.into());
        }
        println!("{} {}", "submitted to".green(), transport.url());
    }
    Ok(())
}

/// Feed stdin characters into the key channel until EOF
fn spawn_stdin_keyboard(config: &StudyConfig) -> Keyboard {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for key in line.chars().filter(|c| !c.is_whitespace()) {
                if tx.send(key).is_err() {
                    return;
                }
            }
        }
    });
    Keyboard::new(rx, config.keys)
}

fn print_plan(plan: &SessionPlan, json: bool) {
    if json {
        match serde_json::to_string_pretty(plan) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
        return;
    }

    println!(
        "{}",
        format!("stereoprobe v{}  session {}", VERSION, plan.session_id).bold()
    );
    for reason in plan.reasons() {
        let line = reason.to_string();
        if reason.is_warning() {
            println!("  {}", line.yellow());
        } else {
            println!("  {}", line.dimmed());
        }
    }
    if let Some(violation) = &plan.violation {
        println!("  {}", violation.to_string().yellow());
    }
    for dropped in &plan.sampling.dropped_counterparts {
        println!("  {} {}", "dropped counterpart:".yellow(), dropped);
    }
    println!();

    for (position, trial) in plan.trials.iter().enumerate() {
        let statement = &trial.statement;
        let marker = if statement.exploratory() { "*" } else { " " };
        println!(
            "{:>3} {} [{:>3}] {:<12} {}  {}",
            position + 1,
            marker,
            trial.index,
            statement.category().as_str(),
            statement.party(),
            statement.text()
        );
    }
}

fn print_json(report: &SessionReport) {
    match serde_json::to_string_pretty(report) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_flags_need_run() {
        assert!(Args::try_parse_from(["stereoprobe", "--render"]).is_err());
        assert!(Args::try_parse_from(["stereoprobe", "--submit-url", "http://localhost/x"]).is_err());

        let args = Args::try_parse_from(["stereoprobe", "--run", "--render"]).unwrap();
        assert!(args.run && args.render);
        let args =
            Args::try_parse_from(["stereoprobe", "-r", "--submit-url", "http://localhost/x"]).unwrap();
        assert_eq!(args.submit_url.as_deref(), Some("http://localhost/x"));
    }

    #[test]
    fn test_plan_only_flags_parse() {
        let args = Args::try_parse_from(["stereoprobe", "--plan", "--json", "--seed", "7"]).unwrap();
        assert!(!args.run);
        assert_eq!(args.seed, Some(7));
    }
}
