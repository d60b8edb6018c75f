use clap::{Parser, Subcommand};

mod commands;
mod file_discovery;

#[derive(Parser)]
#[command(name = "fishlint", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to .fishlint.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// fish executable used for syntax checking
    #[arg(long, global = true)]
    checker: Option<String>,

    /// Formatter executable (fish_indent)
    #[arg(long, global = true)]
    formatter: Option<String>,

    /// Timeout per tool run in milliseconds (0 disables)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check fish files for syntax errors
    Check {
        /// Files or directories to check (directories are searched for *.fish)
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Only print the summary line
        #[arg(short, long)]
        quiet: bool,
    },

    /// Format fish files with fish_indent
    Fmt {
        /// Files or directories to format
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Report files that would change without writing them
        #[arg(long)]
        check: bool,

        /// Format standard input and write the result to standard output
        #[arg(long, conflicts_with = "check")]
        stdin: bool,
    },

    /// Start the Language Server Protocol server
    Server {
        /// TCP port to listen on (for debugging)
        #[arg(long)]
        port: Option<u16>,

        /// Use stdio for communication (default)
        #[arg(long)]
        stdio: bool,
    },

    /// Show version information, including the detected fish version
    Version,
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only changes the default.
    // Logs always go to stderr so they never mix with LSP traffic on stdout.
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    match &cli.command {
        Commands::Check { paths, quiet } => commands::check::handle_check(&cli, paths, *quiet),
        Commands::Fmt { paths, check, stdin } => commands::fmt::handle_fmt(&cli, paths, *check, *stdin),
        Commands::Server { port, stdio } => {
            commands::server::handle_server(*port, *stdio, cli.config.clone())
        }
        Commands::Version => commands::version::handle_version(&cli),
    }
}
