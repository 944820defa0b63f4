mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "trellis", about = "Coordinate concurrent agents editing a shared workspace", version)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a .trellis workspace in the current directory
    Init {
        /// Seconds a proposed operation stays in flight for conflict checks
        #[arg(long)]
        conflict_window: Option<u64>,
    },

    /// Enable agent coordination for this workspace
    Enable,

    /// Manage agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },

    /// Propose, check and resolve operations
    Op {
        #[command(subcommand)]
        action: OpAction,
    },

    /// Show session-wide statistics
    Stats,

    /// Generate keys, sign and verify messages
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show recorded operation outcomes
    Outcomes {
        /// Only show outcomes for this agent
        #[arg(long)]
        agent: Option<String>,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// Register an agent (or update its role)
    Register {
        id: String,

        /// Role (coder, reviewer, tester, architect, coordinator)
        #[arg(long)]
        role: String,
    },
    /// List registered agents
    List,
    /// Show operation count and reputation for an agent
    Stats { id: String },
    /// Mark an agent inactive
    Deactivate { id: String },
}

#[derive(Subcommand)]
enum OpAction {
    /// Register an operation and report conflicts
    Propose {
        /// Agent proposing the operation
        #[arg(long)]
        agent: String,

        /// Operation identifier
        #[arg(long)]
        id: String,

        /// Files touched (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Action type (read, edit, create, delete, or custom)
        #[arg(long, default_value = "edit")]
        action: String,

        /// Parent operations (repeatable); defaults to the current frontier
        #[arg(long = "parent")]
        parents: Vec<String>,
    },
    /// Check a prospective operation for conflicts without recording it
    Check {
        #[arg(long)]
        id: String,

        #[arg(long, default_value = "edit")]
        action: String,

        #[arg(long = "file")]
        files: Vec<String>,
    },
    /// Mark an operation committed
    Commit { id: String },
    /// Mark an operation aborted
    Abort { id: String },
    /// Mark an operation conflicted
    Conflicted { id: String },
    /// Show an operation
    Show { id: String },
    /// List operations in the order they were proposed
    List {
        /// Only list operations of this agent
        #[arg(long)]
        agent: Option<String>,
    },
    /// List the ancestors of an operation
    Ancestors { id: String },
    /// Sign an operation's payload and attach the signature
    Sign {
        id: String,

        /// Secret key (hex)
        #[arg(long)]
        secret_key: String,
    },
    /// Check an operation's attached signature
    Verify {
        id: String,

        /// Public key (hex)
        #[arg(long)]
        public_key: String,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Generate a signing keypair (printed, never stored)
    Generate,
    /// Sign a message
    Sign {
        /// Secret key (hex)
        #[arg(long)]
        secret_key: String,

        #[command(flatten)]
        message: commands::key::MessageArgs,
    },
    /// Verify a signature
    Verify {
        /// Public key (hex)
        #[arg(long)]
        public_key: String,

        /// Signature (hex)
        #[arg(long)]
        signature: String,

        #[command(flatten)]
        message: commands::key::MessageArgs,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TRELLIS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    let result = match cli.command {
        Commands::Init { conflict_window } => commands::init::run(conflict_window),
        Commands::Enable => commands::init::enable(),
        Commands::Agent { action } => match action {
            AgentAction::Register { id, role } => commands::agent::register(id, role, json),
            AgentAction::List => commands::agent::list(json),
            AgentAction::Stats { id } => commands::agent::stats(id, json),
            AgentAction::Deactivate { id } => commands::agent::deactivate(id, json),
        },
        Commands::Op { action } => match action {
            OpAction::Propose {
                agent,
                id,
                files,
                action,
                parents,
            } => commands::op::propose(agent, id, files, action, parents, json),
            OpAction::Check { id, action, files } => commands::op::check(id, action, files, json),
            OpAction::Commit { id } => commands::op::resolve(id, "committed", json),
            OpAction::Abort { id } => commands::op::resolve(id, "aborted", json),
            OpAction::Conflicted { id } => commands::op::resolve(id, "conflicted", json),
            OpAction::Show { id } => commands::op::show(id, json),
            OpAction::List { agent } => commands::op::list(agent, json),
            OpAction::Ancestors { id } => commands::op::ancestors(id, json),
            OpAction::Sign { id, secret_key } => commands::op::sign(id, secret_key, json),
            OpAction::Verify { id, public_key } => commands::op::verify(id, public_key, json),
        },
        Commands::Stats => commands::stats::run(json),
        Commands::Key { action } => match action {
            KeyAction::Generate => commands::key::generate(json),
            KeyAction::Sign {
                secret_key,
                message,
            } => commands::key::sign(secret_key, message, json),
            KeyAction::Verify {
                public_key,
                signature,
                message,
            } => commands::key::verify(public_key, signature, message, json),
        },
        Commands::Outcomes { agent } => commands::outcomes::run(agent, json),
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
