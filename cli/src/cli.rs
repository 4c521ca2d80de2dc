//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "faq", version, about = "Search and maintain the FAQ knowledge base")]
pub struct Cli {
    /// Config file (TOML). Defaults to `<data dir>/faq/config.toml` when present.
    #[arg(long, global = true, env = "FAQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Semantic search across entries
    Search(SearchArgs),

    /// Single best answer, formatted as a chat reply
    Ask(AskArgs),

    /// List entries newest first
    Browse(BrowseArgs),

    /// Show one entry and the text it was embedded from
    Show {
        id: String,
    },

    /// Add or replace an entry
    Add(AddArgs),

    /// Delete an entry and its image files
    Delete {
        id: String,
    },

    /// Manage the tag catalog
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },

    /// Review searches that found nothing
    Failed {
        #[command(subcommand)]
        command: FailedCommand,
    },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    /// Restrict to one tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Return at most N results instead of paging
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Short list (top 10 of 20 candidates)
    #[arg(long, conflicts_with = "top")]
    pub compact: bool,

    /// Page to show, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: i64,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Chat message; `@faq` and numeric mentions are stripped
    pub message: String,

    /// Name used in the greeting
    #[arg(long, default_value = "there")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct BrowseArgs {
    #[arg(long)]
    pub tag: Option<String>,

    /// Page to show, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: i64,

    /// Entries per page; defaults to the configured page size
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub tag: String,

    #[arg(long)]
    pub title: String,

    /// Answer text; may contain `[GAMBAR n]` placeholders
    #[arg(long)]
    pub answer: String,

    /// Alternative user phrasings
    #[arg(long, default_value = "")]
    pub keywords: String,

    /// Image paths joined with `;`
    #[arg(long, default_value = "none")]
    pub images: String,

    #[arg(long)]
    pub source: Option<String>,

    /// Explicit id to create or replace; `auto` assigns the next number
    #[arg(long, default_value = "auto")]
    pub id: String,
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// List tags with colour and description
    List,

    /// Add or update a tag
    Set {
        name: String,

        /// Hex colour or palette name (red, green, blue, ...)
        #[arg(long, default_value = "gray")]
        color: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Remove a tag; entries keep it
    Remove {
        name: String,
    },

    /// Show the badge colour palette
    Palette,
}

#[derive(Debug, Subcommand)]
pub enum FailedCommand {
    /// Print every logged failed search
    List,

    /// Empty the log
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from(["faq", "search", "reset password", "--tag", "ED", "--top", "3"])
            .unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query, "reset password");
                assert_eq!(args.tag.as_deref(), Some("ED"));
                assert_eq!(args.top, Some(3));
                assert_eq!(args.page, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::try_parse_from([
            "faq", "add", "--tag", "OPD", "--title", "T", "--answer", "A",
        ])
        .unwrap();
        match cli.command {
            Command::Add(args) => {
                assert_eq!(args.id, "auto");
                assert_eq!(args.images, "none");
                assert_eq!(args.source, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_compact_conflicts_with_top() {
        assert!(Cli::try_parse_from(["faq", "search", "q", "--top", "2", "--compact"]).is_err());
    }
}
