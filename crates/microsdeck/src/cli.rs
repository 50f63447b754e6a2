//! Clap derive structures for the `microsdeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// microsdeck -- inspect and manage MicroSDeck cards from the command line
#[derive(Debug, Parser)]
#[command(
    name = "microsdeck",
    version,
    about = "Inspect and manage MicroSDeck cards from the command line",
    long_about = "Talks to a running MicroSDeck backend (default http://localhost:12412)\n\
        to list removable cards and the games stored on them, rename, reorder\n\
        and delete cards, and follow changes live.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend URL (overrides the config file)
    #[arg(long, short = 'u', env = "MICROSDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MICROSDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "MICROSDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show backend health, version and the inserted card
    #[command(alias = "st")]
    Status,

    /// Manage cards
    #[command(alias = "c")]
    Cards(CardsArgs),

    /// Query and register games
    #[command(alias = "g")]
    Games(GamesArgs),

    /// Read and write backend settings
    Settings(SettingsArgs),

    /// Follow backend changes until interrupted
    #[command(alias = "w")]
    Watch,

    /// Manage the CLI configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Cards ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CardsArgs {
    #[command(subcommand)]
    pub command: CardsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CardsCommand {
    /// List all known cards in display order
    #[command(alias = "ls")]
    List,

    /// List the games stored on a card
    Games {
        /// Card uid
        uid: String,
    },

    /// Rename a card
    Rename {
        /// Card uid
        uid: String,
        /// New display name
        name: String,
    },

    /// Forget a card and its game links
    #[command(alias = "rm")]
    Delete {
        /// Card uid
        uid: String,
    },

    /// Move cards to the front of the display order, in the order given
    Reorder {
        /// Card uids, first one ends up first
        #[arg(required = true, num_args = 1..)]
        uids: Vec<String>,
    },

    /// Link games to a card
    Link {
        /// Card uid
        card: String,
        /// Game uids
        #[arg(required = true, num_args = 1..)]
        games: Vec<String>,
    },

    /// Unlink games from a card
    Unlink {
        /// Card uid
        card: String,
        /// Game uids
        #[arg(required = true, num_args = 1..)]
        games: Vec<String>,
    },
}

// ── Games ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GamesArgs {
    #[command(subcommand)]
    pub command: GamesCommand,
}

#[derive(Debug, Subcommand)]
pub enum GamesCommand {
    /// List the cards that hold a game
    Cards {
        /// Game uid
        game_id: String,
    },

    /// Register a game with the backend
    Create {
        /// Game uid (Steam app id for Steam titles)
        uid: String,
        /// Display name
        name: String,
        /// Install size in bytes
        #[arg(long, default_value = "0")]
        size: u64,
        /// Mark the game as not coming from Steam
        #[arg(long)]
        non_steam: bool,
    },
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Read a setting (e.g. "backend:port", "frontend", "*")
    Get {
        /// Setting name
        name: String,
    },

    /// Write a setting
    Set {
        /// Setting name
        name: String,
        /// Value as JSON (e.g. 12412, true, "\"info\"")
        value: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
