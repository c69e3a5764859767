use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use jobdock::arguments::parse_job_arguments;
use jobdock::client::{ClientConfig, JobDockClient};
use jobdock::config::{SandboxConfig, ServerConfig, StoreConfig, TlsConfig};
use jobdock::error::JobDockError;
use jobdock::node::Node;
use jobdock::registry::{Metadata, RegisterStrategy};
use jobdock::shutdown::install_shutdown_handler;
use jobdock::tls::TlsIdentity;

#[derive(Parser, Debug)]
#[command(name = "jobdock")]
#[command(version)]
#[command(about = "Register container jobs and execute them by name")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a jobdock server
    Server(ServerArgs),

    /// Register a job's metadata
    Register {
        #[command(flatten)]
        client: ClientArgs,

        /// Unique job name
        name: String,

        /// Read metadata from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["author", "image", "description"])]
        file: Option<PathBuf>,

        #[arg(long, default_value = "")]
        author: String,

        /// Container image to run for this job
        #[arg(long, required_unless_present = "file")]
        image: Option<String>,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Show a registered job's metadata
    Get {
        #[command(flatten)]
        client: ClientArgs,

        job_name: String,
    },

    /// List registered job names
    List {
        #[command(flatten)]
        client: ClientArgs,
    },

    /// Execute a registered job, e.g. `jobdock execute resize width=100 height=50`
    Execute {
        #[command(flatten)]
        client: ClientArgs,

        job_name: String,

        /// Job arguments as key=value pairs
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        arguments: Vec<String>,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Debug, Clone, ValueEnum)]
enum StoreKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone, ValueEnum)]
enum StrategyArg {
    /// Atomic create-if-absent
    Conditional,
    /// Read, then write if absent (racy under concurrent registration)
    CheckThenWrite,
}

impl From<StrategyArg> for RegisterStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Conditional => RegisterStrategy::ConditionalWrite,
            StrategyArg::CheckThenWrite => RegisterStrategy::CheckThenWrite,
        }
    }
}

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on for gRPC
    #[arg(long, default_value = "50051")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Backend holding job metadata
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreKind,

    /// Redis connection URL (with --store redis)
    #[arg(long, default_value = "redis://127.0.0.1:6379/0")]
    redis_url: String,

    /// How registrations guard against duplicate names
    #[arg(long, value_enum, default_value = "conditional")]
    register_strategy: StrategyArg,

    /// Per-request deadline in seconds
    #[arg(long, default_value = "900")]
    request_timeout_secs: u64,

    // === Executor Options ===
    /// Docker CLI used to run job images
    #[arg(long, default_value = "docker")]
    docker_binary: PathBuf,

    /// Give job containers network access
    #[arg(long)]
    allow_network: bool,

    /// Container memory limit (e.g. "256m"); empty for none
    #[arg(long, default_value = "256m")]
    memory_limit: String,

    /// Container CPU limit (e.g. "0.5"); empty for none
    #[arg(long, default_value = "0.5")]
    cpu_limit: String,

    /// Maximum run time of a single job in seconds; 0 for no limit
    #[arg(long, default_value = "600")]
    job_timeout_secs: u64,

    // === TLS Options ===
    /// Enable mTLS for the gRPC endpoint
    #[arg(long)]
    tls: bool,

    /// Path to CA certificate (PEM format)
    #[arg(long, requires = "tls")]
    ca_cert: Option<PathBuf>,

    /// Path to server certificate (PEM format)
    #[arg(long, requires = "tls")]
    cert: Option<PathBuf>,

    /// Path to server private key (PEM format)
    #[arg(long, requires = "tls")]
    key: Option<PathBuf>,

    /// Run without TLS when --tls is given but certificates are missing.
    /// NOT recommended for production.
    #[arg(long)]
    allow_insecure: bool,
}

// =============================================================================
// Client Arguments (shared by all job commands)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Server address (use https:// for TLS)
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:50051")]
    addr: String,

    /// Path to CA certificate (PEM format) for TLS
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Path to client certificate (PEM format) for mTLS
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Path to client private key (PEM format) for mTLS
    #[arg(long)]
    key: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

impl ClientArgs {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            addr: self.addr.clone(),
            ca_cert: self.ca_cert.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct JobListOutput {
    jobs: Vec<String>,
    total_count: usize,
}

#[derive(Serialize)]
struct ExecuteOutput {
    job_name: String,
    status: String,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn print_metadata(metadata: &Metadata, output_format: &OutputFormat) -> Result<(), JobDockError> {
    match output_format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(metadata)
                .map_err(|e| JobDockError::Internal(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("Name:        {}", metadata.name);
            println!("Author:      {}", metadata.author);
            println!("Image:       {}", metadata.image_reference);
            println!("Description: {}", metadata.description);
        }
    }
    Ok(())
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let tls_config = TlsConfig {
        enabled: args.tls,
        ca_cert_path: args.ca_cert,
        cert_path: args.cert,
        key_path: args.key,
        allow_insecure: args.allow_insecure,
    };

    // Validate and load TLS identity if configured
    let tls_identity = if tls_config.is_complete() {
        match TlsIdentity::load(&tls_config).await {
            Ok(identity) => {
                tracing::info!("TLS enabled with mTLS authentication");
                Some(identity)
            }
            Err(e) if tls_config.allow_insecure => {
                tracing::warn!(error = %e, "TLS certificate loading failed, running in insecure mode");
                None
            }
            Err(e) => return Err(format!("TLS certificate loading failed: {}", e).into()),
        }
    } else if tls_config.enabled {
        if tls_config.allow_insecure {
            tracing::warn!("TLS enabled but certificate paths incomplete, running in insecure mode");
            None
        } else {
            return Err("TLS enabled but missing required paths (--ca-cert, --cert, --key)".into());
        }
    } else {
        None
    };

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let store = match args.store {
        StoreKind::Memory => StoreConfig::Memory,
        StoreKind::Redis => StoreConfig::Redis {
            url: args.redis_url,
        },
    };

    let sandbox = SandboxConfig {
        docker_binary: args.docker_binary,
        network_disabled: !args.allow_network,
        memory_limit: non_empty(args.memory_limit),
        cpu_limit: non_empty(args.cpu_limit),
        timeout: (args.job_timeout_secs > 0).then(|| Duration::from_secs(args.job_timeout_secs)),
    };

    let config = ServerConfig {
        listen_addr,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        register_strategy: args.register_strategy.into(),
        store,
        sandbox,
    };

    let shutdown = install_shutdown_handler();
    let node = Node::new(config, tls_identity).await?;
    node.run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_register(
    client: &ClientArgs,
    name: String,
    file: Option<PathBuf>,
    author: String,
    image: Option<String>,
    description: String,
) -> Result<(), JobDockError> {
    let metadata = match file {
        Some(path) => Metadata::from_json_file(&path)?,
        None => Metadata::new(
            name.clone(),
            author,
            image.unwrap_or_default(),
            description,
        ),
    };

    let mut grpc_client = JobDockClient::connect(&client.config()).await?;
    let stored = grpc_client.save_metadata(&name, metadata).await?;

    match client.output {
        OutputFormat::Json => print_metadata(&stored, &client.output)?,
        OutputFormat::Table => println!("Job {} registered.", stored.name),
    }
    Ok(())
}

async fn handle_get(client: &ClientArgs, job_name: String) -> Result<(), JobDockError> {
    let mut grpc_client = JobDockClient::connect(&client.config()).await?;
    let metadata = grpc_client.get_metadata(&job_name).await?;
    print_metadata(&metadata, &client.output)
}

async fn handle_list(client: &ClientArgs) -> Result<(), JobDockError> {
    let mut grpc_client = JobDockClient::connect(&client.config()).await?;
    let jobs = grpc_client.get_available_jobs().await?;

    match client.output {
        OutputFormat::Json => {
            let output = JobListOutput {
                total_count: jobs.len(),
                jobs,
            };
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| JobDockError::Internal(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("No jobs registered.");
            } else {
                for job in &jobs {
                    println!("{}", job);
                }
            }
        }
    }
    Ok(())
}

async fn handle_execute(
    client: &ClientArgs,
    job_name: String,
    arguments: Vec<String>,
) -> Result<(), JobDockError> {
    // Validate locally before contacting the server
    let arguments = parse_job_arguments(&arguments)?;

    let mut grpc_client = JobDockClient::connect(&client.config()).await?;
    let status = grpc_client.execute_job(&job_name, arguments).await?;

    match client.output {
        OutputFormat::Json => {
            let output = ExecuteOutput { job_name, status };
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| JobDockError::Internal(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Table => println!("{}", status),
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (result, action) = match args.command {
        Commands::Server(server_args) => return run_server(server_args).await,
        Commands::Register {
            client,
            name,
            file,
            author,
            image,
            description,
        } => (
            handle_register(&client, name, file, author, image, description).await,
            "registering job",
        ),
        Commands::Get { client, job_name } => {
            (handle_get(&client, job_name).await, "fetching job")
        }
        Commands::List { client } => (handle_list(&client).await, "listing jobs"),
        Commands::Execute {
            client,
            job_name,
            arguments,
        } => (
            handle_execute(&client, job_name, arguments).await,
            "executing job",
        ),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, kind = ?e.kind(), "Error in {}", action);
        std::process::exit(1);
    }

    Ok(())
}
