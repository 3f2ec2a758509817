use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::io::AsyncWrite;
use tracing_subscriber::EnvFilter;

use nemos::config::{Priority, ServiceConfig, SolveConfig};
use nemos::credentials::{
    Account, CredentialProvider, EnvCredentials, StaticCredentials, ENV_PASSWORD,
};
use nemos::engine::SolveEngine;
use nemos::error::SolveError;
use nemos::model::ModelPayload;
use nemos::service::XmlRpcNeos;
use nemos::shutdown::install_shutdown_handler;
use nemos::submit;

#[derive(Parser, Debug)]
#[command(name = "nemos")]
#[command(version)]
#[command(about = "Mosel interface to NEOS solvers")]
#[command(propagate_version = true)]
struct Args {
    /// Service endpoint (URL or bare hostname); overrides NEOS_HOST
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Submit a model and wait for its result
    Solve(SolveArgs),

    /// List the solvers reachable through this client
    Solvers {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Check that the service answers
    Ping,
}

#[derive(Parser, Debug)]
struct SolveArgs {
    /// Model file in MPS format
    model: PathBuf,

    /// Problem category (default: milp)
    #[arg(long, default_value = "")]
    category: String,

    /// Solver name (default: FICO-Xpress)
    #[arg(long, default_value = "")]
    solver: String,

    /// Space-separated key=value solver options
    #[arg(long, default_value = "")]
    options: String,

    /// Submission email; falls back to NEOS_EMAIL
    #[arg(long)]
    email: Option<String>,

    /// Account username; the secret comes from NEOS_PASSWORD
    #[arg(long)]
    user: Option<String>,

    /// Queueing envelope for the job
    #[arg(long, value_enum, default_value_t = PriorityArg::Long)]
    priority: PriorityArg,

    /// Do not stream partial output to stdout
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PriorityArg {
    Short,
    Long,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Short => Priority::Short,
            PriorityArg::Long => Priority::Long,
        }
    }
}

#[derive(Serialize)]
struct SolverRow {
    category: String,
    solver: String,
    input_method: String,
}

fn service_config(endpoint: Option<&str>) -> ServiceConfig {
    let config = ServiceConfig::from_env();
    match endpoint {
        Some(endpoint) => config.with_endpoint(endpoint),
        None => config,
    }
}

/// Flags win over the environment; anything the flags leave open falls
/// back to the NEOS_* variables.
fn resolve_credentials(email: Option<String>, user: Option<String>) -> StaticCredentials {
    let env = EnvCredentials;
    let account = match user {
        Some(username) => match std::env::var(ENV_PASSWORD) {
            Ok(secret) if !secret.is_empty() => Some(Account::new(username, secret)),
            _ => {
                eprintln!("--user given but {} is not set; submitting anonymously", ENV_PASSWORD);
                None
            }
        },
        None => env.account(),
    };
    StaticCredentials {
        email: email.or_else(|| env.email()),
        account,
    }
}

async fn handle_solve(args: SolveArgs, endpoint: Option<&str>) -> Result<(), ()> {
    let service = XmlRpcNeos::new(&service_config(endpoint)).map_err(|e| {
        eprintln!("could not set up the service client: {}", e);
    })?;

    let model = ModelPayload::from_file(&args.model).await.map_err(|e| {
        eprintln!("could not read {}: {}", args.model.display(), e);
    })?;

    let config = SolveConfig::new(args.category, args.solver)
        .with_options(args.options)
        .with_priority(args.priority.into());

    let credentials = resolve_credentials(args.email, args.user);
    let engine = SolveEngine::new(service, credentials);
    let cancel = install_shutdown_handler();

    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = if args.quiet {
        Box::new(tokio::io::sink())
    } else {
        Box::new(tokio::io::stdout())
    };

    match engine
        .solve(&model, &args.model, &config, &mut sink, &cancel)
        .await
    {
        Ok(outcome) => {
            println!(
                "job {} finished: {} ({} bytes, completion code {})",
                outcome.handle.number,
                outcome.artifact.path.display(),
                outcome.artifact.len,
                outcome.artifact.code,
            );
            Ok(())
        }
        Err(SolveError::Service(failure)) => {
            eprintln!("job failed: {} (completion code {})", failure.kind, failure.code);
            if let Some(path) = &failure.artifact {
                eprintln!("diagnostic output written to {}", path.display());
            }
            Err(())
        }
        Err(SolveError::Cancelled) => {
            eprintln!("solve cancelled; kill requested for the remote job");
            Err(())
        }
        Err(e) => {
            eprintln!("solve failed: {}", e);
            Err(())
        }
    }
}

async fn handle_solvers(format: OutputFormat, endpoint: Option<&str>) -> Result<(), ()> {
    let service = XmlRpcNeos::new(&service_config(endpoint)).map_err(|e| {
        eprintln!("could not set up the service client: {}", e);
    })?;

    let entries = submit::list_solvers(&service).await.map_err(|e| {
        eprintln!("could not list solvers: {}", e);
    })?;

    match format {
        OutputFormat::Json => {
            let rows: Vec<SolverRow> = entries
                .into_iter()
                .map(|e| SolverRow {
                    category: e.category,
                    solver: e.solver,
                    input_method: e.input_method,
                })
                .collect();
            match serde_json::to_string_pretty(&rows) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("could not render the catalog: {}", e);
                    return Err(());
                }
            }
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No solvers found.");
            } else {
                println!("{:<16} SOLVER", "CATEGORY");
                println!("{}", "-".repeat(40));
                for entry in &entries {
                    println!("{:<16} {}", entry.category, entry.solver);
                }
                println!();
                println!("{} solvers accept MPS input", entries.len());
            }
        }
    }
    Ok(())
}

async fn handle_ping(endpoint: Option<&str>) -> Result<(), ()> {
    use nemos::service::NeosService;

    let service = XmlRpcNeos::new(&service_config(endpoint)).map_err(|e| {
        eprintln!("could not set up the service client: {}", e);
    })?;

    let answer = service.ping().await.map_err(|e| {
        eprintln!("service unreachable: {}", e);
    })?;
    println!("{}", answer.trim());
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let endpoint = args.endpoint.as_deref();

    let outcome = match args.command {
        Commands::Solve(solve_args) => handle_solve(solve_args, endpoint).await,
        Commands::Solvers { format } => handle_solvers(format, endpoint).await,
        Commands::Ping => handle_ping(endpoint).await,
    };

    if outcome.is_err() {
        process::exit(1);
    }
}
