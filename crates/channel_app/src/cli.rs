use std::path::PathBuf;

use channel_core::WriteMode;
use channel_logging::LogDestination;
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "channel-merge",
    version,
    about = "Merge a tagged M3U playlist and a delimited channel list into one playlist"
)]
pub struct Cli {
    /// RON configuration file; built-in defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output playlist path.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Drop existing entries that fail the current rules before merging.
    #[arg(long)]
    pub prune: bool,

    /// Accept invalid TLS certificates from the sources.
    #[arg(long)]
    pub insecure: bool,

    /// Only keep channels mentioning this keyword.
    #[arg(long, conflicts_with = "no_keyword")]
    pub keyword: Option<String>,

    /// Keep every channel of the selected groups.
    #[arg(long)]
    pub no_keyword: bool,

    #[arg(long, value_enum, default_value_t = LogArg::Terminal)]
    pub log: LogArg,

    #[arg(long, value_name = "FILE", default_value = "channel-merge.log")]
    pub log_file: PathBuf,

    #[arg(short, long)]
    pub verbose: bool,

    /// Print the effective configuration as RON and exit.
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeArg {
    Rewrite,
    Append,
}

impl From<ModeArg> for WriteMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rewrite => WriteMode::Rewrite,
            ModeArg::Append => WriteMode::Append,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogArg {
    Terminal,
    File,
    Both,
}

impl From<LogArg> for LogDestination {
    fn from(log: LogArg) -> Self {
        match log {
            LogArg::Terminal => LogDestination::Terminal,
            LogArg::File => LogDestination::File,
            LogArg::Both => LogDestination::Both,
        }
    }
}
