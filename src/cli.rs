use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "aura-install")]
#[command(version, about = "Install the Aura client and schedule it with the host service manager")]
pub struct Args {
    /// Path to an installer config file (TOML)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Sub-commands (install is the default)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Stage the agent and register the recurring job
    Install {
        /// Directory holding the binary and unit files (defaults to the
        /// directory of this executable)
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Hard-link artifacts instead of copying them (systemd only)
        #[arg(long)]
        link: bool,

        /// Exit with status 2 if any step failed
        #[arg(long)]
        strict: bool,
    },
    /// Print the resolved identity and install layout without changing anything
    Info,
}

impl Cmd {
    pub fn default_install() -> Self {
        Self::Install {
            source_dir: None,
            link: false,
            strict: false,
        }
    }
}
