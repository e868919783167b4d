use clap::{Parser, Subcommand, ValueEnum};
use lpsens_api::{
    NeosConfig, NeosQueue, PollingConfig, PollingSolver, RemoteSolver, SensitivityRequest,
    SensitivityResponse, neos, respond,
};
use lpsens_solver::{Model, Solver, Strategy, mps};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lpsens")]
#[command(about = "Linear programs with sensitivity analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a JSON request and print the sensitivity response
    Solve {
        /// The request file, or - for stdin
        file: PathBuf,
        /// How sensitivity figures are derived
        #[arg(short, long, value_enum, default_value = "analytic")]
        strategy: StrategyArg,
        /// Relative perturbation for the perturbation strategy
        #[arg(long, default_value_t = lpsens_solver::DEFAULT_PCT)]
        pct: f64,
        /// Stop the perturbation sweep after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Pivot budget per simplex phase
        #[arg(long, default_value_t = 10_000)]
        max_iterations: usize,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Validate a request without solving it
    Check {
        /// The request file, or - for stdin
        file: PathBuf,
    },
    /// Print the request's model in MPS format
    Mps {
        /// The request file, or - for stdin
        file: PathBuf,
        /// Model name written on the NAME card
        #[arg(long, default_value = "SENSIBILIDAD")]
        name: String,
    },
    /// Send the request's model to a remote NEOS solver and print its raw output
    Remote {
        /// The request file, or - for stdin
        file: PathBuf,
        #[arg(long, default_value = neos::DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, default_value = "lp")]
        category: String,
        #[arg(long, default_value = "Clp")]
        solver: String,
        /// Contact address required by NEOS
        #[arg(long)]
        email: String,
        /// Seconds before the first status poll
        #[arg(long, default_value_t = 5)]
        poll_secs: u64,
        /// Give up on the job after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
        /// Solve locally if the remote job does not complete
        #[arg(long)]
        fallback: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Analytic,
    Perturbation,
}

fn read_request(file: &Path) -> SensitivityRequest {
    let body = if file.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body).map(|_| body)
    } else {
        std::fs::read_to_string(file)
    };
    let body = match body {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading request: {}", e);
            std::process::exit(1);
        }
    };

    match SensitivityRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Invalid request: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_model(request: &SensitivityRequest) -> Model {
    match request.to_model() {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Invalid model: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_response(response: &SensitivityResponse, format: &str) {
    let text = if format == "json" {
        serde_json::to_string(response)
    } else {
        serde_json::to_string_pretty(response)
    };
    match text {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error encoding response: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            strategy,
            pct,
            timeout_ms,
            max_iterations,
            format,
        } => {
            let request = read_request(&file);
            let strategy = match strategy {
                StrategyArg::Analytic => Strategy::Analytic,
                StrategyArg::Perturbation => Strategy::Perturbation {
                    pct,
                    timeout: timeout_ms.map(Duration::from_millis),
                },
            };
            let solver = Solver::new().with_max_iterations(max_iterations);

            let response = respond(&request, &solver, strategy);
            print_response(&response, &format);
            if !response.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let request = read_request(&file);
            let model = build_model(&request);

            println!("✓ {} is valid", file.display());
            println!("  {:?} over {} variables", model.sense(), model.num_variables());
            println!("  {} constraints", model.num_constraints());
        }
        Commands::Mps { file, name } => {
            let model = build_model(&read_request(&file));
            print!("{}", mps::to_mps(&model, &name));
        }
        Commands::Remote {
            file,
            endpoint,
            category,
            solver,
            email,
            poll_secs,
            timeout_secs,
            fallback,
        } => {
            let request = read_request(&file);
            let model = build_model(&request);
            let text = mps::to_mps(&model, "SENSIBILIDAD");

            let queue = NeosQueue::new(NeosConfig {
                endpoint,
                category,
                solver,
                email,
            });
            let remote = PollingSolver::new(
                queue,
                PollingConfig {
                    initial_interval: Duration::from_secs(poll_secs),
                    timeout: Duration::from_secs(timeout_secs),
                    ..PollingConfig::default()
                },
            );

            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error starting runtime: {}", e);
                    std::process::exit(1);
                }
            };

            match runtime.block_on(remote.submit(&text)) {
                Ok(output) => print!("{}", output),
                Err(e) if fallback => {
                    eprintln!("Remote solver unavailable: {}; solving locally", e);
                    let response = respond(&request, &Solver::new(), Strategy::Analytic);
                    print_response(&response, "pretty");
                    if !response.is_optimal() {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Remote solve failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
