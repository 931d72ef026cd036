use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rezip")]
#[command(version)]
#[command(about = "A Rust zip archive manager", long_about = None)]
#[command(after_help = "Examples:\n  \
  rezip backup.zip create ./project     archive the project directory\n  \
  rezip backup.zip list -v              list entries with sizes\n  \
  rezip backup.zip remove notes.txt     drop an entry\n  \
  rezip backup.zip add /tmp/c.txt       append a file as c.txt")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Store new entries without compression
    #[arg(long, global = true)]
    pub store: bool,

    /// Quiet mode
    #[arg(short = 'q', global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the archive from a file or directory
    Create {
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
    },

    /// List entries
    List {
        /// List verbosely
        #[arg(short = 'v')]
        verbose: bool,
    },

    /// Extract all entries into a directory
    Extract {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Remove entries by exact name
    Remove {
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// Add files as entries named by their base names
    Add {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
