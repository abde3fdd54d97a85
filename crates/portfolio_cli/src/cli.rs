//! Command-line arguments.

use clap::{Parser, Subcommand};
use portfolio_core::ContentKind;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Portfolio content tools", long_about = None, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check that the core library is linked
    Ping,

    /// Print the content the home page would render
    Home {
        /// Emit JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Record one page visit
    Visit {
        /// Signed-in visitor email; omit for an anonymous visit
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Show what a request path would render
    Open {
        /// Request path, e.g. /admin
        path: String,
        /// Signed-in visitor email; omit for an anonymous request
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Check an email against the admin allow-list
    CheckAdmin { email: String },

    /// Add compiled-in sample items to one collection
    Seed {
        /// skills | education | bento | projects
        kind: ContentKind,
    },

    /// Manage the resume pointer
    #[command(subcommand)]
    Resume(ResumeCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ResumeCommand {
    /// Point the resume at a URL
    Set {
        url: String,
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Mark the resume as absent
    Clear,
}
