//! Command-line front end for the FAQ knowledge base.
//!
//! A thin adapter: argument parsing, config loading and plain-text output
//! over [`faq_store`] and [`faq_retrieval`].

pub mod app;
pub mod cli;
pub mod config;

pub use app::{App, resolve_color};
pub use cli::{Cli, Command};
pub use config::{CONFIG_FILE, FaqConfig, default_data_dir};
