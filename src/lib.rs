//! # tagwatch
//!
//! Headless real-time tag monitor for Factory I/O style control systems.
//!
//! The binary polls a selection of tags, keeps a bounded history, evaluates
//! threshold rules and reports when the simulation stops producing data.
//! The heavy lifting lives in the workspace crates:
//!
//! ```text
//! ┌──────────────┐   fetch_values   ┌───────────────────┐
//! │   tagwatch   │ ───────────────▶ │ tagwatch-adapters │ ◀── Factory I/O | file | memory
//! │ (CLI, config)│                  └───────────────────┘
//! │              │   snapshots      ┌───────────────────┐
//! │              │ ◀─────────────── │  tagwatch-engine  │ history, alerts, staleness, groups
//! └──────────────┘                  └───────────────────┘
//! ```
//!
//! - **[`config`]**: layered [`Settings`] (defaults, TOML file, `TAGWATCH_*` environment)
//! - **[`app`]**: the [`App`] runner used by the binary (list, export, watch)
//! - **[`data`]**: duration parsing shared by the CLI and configuration
//!
//! ## Usage
//!
//! ```bash
//! # Print the tag catalog
//! tagwatch --list
//!
//! # Watch two tags and log status changes
//! tagwatch --tags 1,2 --interval 500ms
//!
//! # One poll, written to CSV
//! tagwatch --tags 1,2 --export tags.csv
//! ```

pub mod app;
pub mod config;
pub mod data;

pub use app::App;
pub use config::Settings;
