//! Gabion CLI.
//!
//! Compiles API contracts into gateway policy documents and audits observed
//! response statuses against a contract.

use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gabion_compiler::{
    compile_contract, CompileOutput, DirSink, DocumentSink, OperationSelector, RoutingInfo,
    StdoutSink,
};
use gabion_contract::{Contract, ContractSource, EnvSource, FileSource};

/// Environment variable holding a serialized contract.
const CONTRACT_ENV_VAR: &str = "GABION_CONTRACT";

#[derive(Parser, Debug)]
#[command(name = "gabion", about = "Contract-to-policy compiler", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a contract operation into policy documents.
    Compile {
        /// Contract file (YAML or JSON).
        #[arg(short, long, conflicts_with = "contract_env")]
        contract: Option<String>,

        /// Read the contract from the GABION_CONTRACT environment variable.
        #[arg(long)]
        contract_env: bool,

        /// Path template of the operation to compile (defaults to the first
        /// declared operation).
        #[arg(long, requires = "method")]
        path: Option<String>,

        /// HTTP method of the operation to compile.
        #[arg(long, requires = "path")]
        method: Option<String>,

        /// Base path the proxy listens on.
        #[arg(long, default_value = "/v2")]
        base_path: String,

        /// Backend target URL.
        #[arg(long, default_value = "https://petstore.swagger.io")]
        target_url: String,

        /// Virtual host name.
        #[arg(long, default_value = "default")]
        virtual_host: String,

        /// Directory to write policies.xml / proxies.xml / targets.xml into
        /// (stdout when omitted).
        #[arg(short, long)]
        out_dir: Option<String>,
    },

    /// Parse a contract and report structural errors without compiling.
    Validate {
        /// Contract file (YAML or JSON).
        #[arg(short, long)]
        contract: String,
    },

    /// Check whether an observed response status is declared.
    ///
    /// Exit code 0 when declared, 1 when not declared, 2 on error.
    Check {
        /// Contract file (YAML or JSON).
        #[arg(short, long)]
        contract: String,

        /// Request path suffix as observed at the proxy.
        #[arg(long)]
        subpath: String,

        /// HTTP method of the request.
        #[arg(long)]
        method: String,

        /// Observed response status code.
        #[arg(long)]
        status: u16,
    },
}

fn load_contract(contract: Option<&str>, contract_env: bool) -> Result<Contract, String> {
    if contract_env {
        EnvSource::new(CONTRACT_ENV_VAR)
            .load()
            .map_err(|e| e.to_string())
    } else if let Some(path) = contract {
        FileSource::new(path).load().map_err(|e| e.to_string())
    } else {
        Err(format!(
            "no contract given: pass --contract <file> or --contract-env (${})",
            CONTRACT_ENV_VAR
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_compile(
    contract: Option<&str>,
    contract_env: bool,
    path: Option<&str>,
    method: Option<&str>,
    base_path: &str,
    target_url: &str,
    virtual_host: &str,
    out_dir: Option<&str>,
) -> ExitCode {
    let contract = match load_contract(contract, contract_env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    let selector = match (path, method) {
        (Some(template), Some(method)) => OperationSelector::Operation {
            template: template.to_string(),
            method: method.to_string(),
        },
        _ => OperationSelector::First,
    };

    let mut routing = RoutingInfo::new(base_path, target_url);
    routing.virtual_host = virtual_host.to_string();

    let CompileOutput { documents, summary } =
        match compile_contract(&contract, &selector, &routing) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("error: compilation failed: {}", e);
                return ExitCode::from(1);
            }
        };

    let written = match out_dir {
        Some(dir) => DirSink::new(dir).write_documents(&documents),
        None => StdoutSink.write_documents(&documents),
    };
    if let Err(e) = written {
        eprintln!("error: {}", e);
        return ExitCode::from(1);
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(contract: &str) -> ExitCode {
    let path = Path::new(contract);
    if !path.exists() {
        eprintln!("error: contract file not found: {}", contract);
        return ExitCode::from(1);
    }

    match FileSource::new(path).load() {
        Ok(parsed) => {
            let operations: usize = parsed.paths.iter().map(|p| p.operations.len()).sum();
            eprintln!(
                "{}: {} path(s), {} operation(s), {} security scheme(s)",
                contract,
                parsed.paths.len(),
                operations,
                parsed.security_schemes.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: invalid contract: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run_check(contract: &str, subpath: &str, method: &str, status: u16) -> ExitCode {
    let text = match std::fs::read_to_string(contract) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", contract, e);
            return ExitCode::from(2);
        }
    };

    match gabion_runtime::audit_response(&text, subpath, method, status) {
        Ok(true) => {
            eprintln!("{} {} -> {}: declared", method, subpath, status);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("{} {} -> {}: not declared", method, subpath, status);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            contract,
            contract_env,
            path,
            method,
            base_path,
            target_url,
            virtual_host,
            out_dir,
        } => run_compile(
            contract.as_deref(),
            contract_env,
            path.as_deref(),
            method.as_deref(),
            &base_path,
            &target_url,
            &virtual_host,
            out_dir.as_deref(),
        ),
        Commands::Validate { contract } => run_validate(&contract),
        Commands::Check {
            contract,
            subpath,
            method,
            status,
        } => run_check(&contract, &subpath, &method, status),
    }
}
