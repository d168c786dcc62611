use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "convo", version, about = "Chat from the terminal with per-thread history", propagate_version = true)]
pub struct Cli {
    /// One-shot prompt input
    pub prompt: Vec<String>,

    #[command(flatten)]
    pub io: IoArgs,

    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Default)]
pub struct IoArgs {
    /// Input file path
    #[arg(short = 'f', long = "file", global = true)]
    pub input_file: Option<String>,

    /// Output file path
    #[arg(short = 'o', long = "output", global = true)]
    pub output_file: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Thread to read from and append to
    #[arg(short = 't', long = "thread", global = true)]
    pub thread: Option<String>,

    /// Override model for this run
    #[arg(long = "model", global = true)]
    pub model: Option<String>,

    /// Stream output as it arrives
    #[arg(long = "stream", global = true)]
    pub stream: bool,

    /// Do not replay or record history for this run
    #[arg(long = "no-history", global = true)]
    pub no_history: bool,

    /// Explicit config file path
    #[arg(long = "config", global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat loop
    Interactive,

    /// Send a prompt on the current thread
    Chat {
        prompt: Vec<String>,
    },

    /// Print the transcript of a thread
    History {
        /// Defaults to the configured thread
        #[arg(value_name = "THREAD")]
        name: Option<String>,
    },

    /// Thread management
    Thread {
        #[command(subcommand)]
        action: ThreadAction,
    },

    /// Config management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize default config file (~/.convo/config.toml)
    Init {
        /// Overwrite if exists
        #[arg(long)]
        force: bool,
        /// Scope to create config: user or project (default: user)
        #[arg(long, value_parser = ["user", "project"])]
        scope: Option<String>,
    },
    Set { key: String, value: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum ThreadAction {
    List,
    Delete { name: String },
}
