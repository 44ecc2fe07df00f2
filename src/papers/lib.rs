//! # Papers Architecture
//!
//! Papers is a plain-file bibliography manager. Every paper lives in the
//! repository directory as up to three files sharing its citekey:
//!
//! ```text
//! <repo>/
//!   config.json
//!   bib/<citekey>.bib     bibliographic record (BibTeX)
//!   meta/<citekey>.yaml   tags, document reference, date added
//!   doc/<citekey>.<ext>   managed document copy (optional)
//! ```
//!
//! Like any tool built on plain files, the core is a library with a thin CLI
//! on top:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  CLI (main.rs + args.rs)                                 │
//! │  - parses arguments, prints results, sets the exit code  │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  API (api.rs)                                            │
//! │  - resolves references (index, fragment) to citekeys     │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Commands (commands/*.rs)                                │
//! │  - one `run` per command, returns `CmdResult`            │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Repository (repo.rs)                                    │
//! │  - citekey uniqueness, write ordering, consistency check │
//! │  - codec/, citekey.rs, docs.rs, store/                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! From `api.rs` inward nothing writes to stdout/stderr or exits the
//! process. Diagnostics go through `tracing`; the binary decides whether and
//! where they are shown (see [`logging`]).
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, entry point for all operations
//! - [`commands`]: per-command glue
//! - [`repo`]: the paper repository
//! - [`store`]: storage backends (`FsBackend`, `MemBackend`)
//! - [`codec`]: BibTeX and YAML encoding
//! - [`citekey`]: citekey validation and derivation
//! - [`index`]: display indexes and reference resolution
//! - [`filter`]: listing queries and sort orders
//! - [`docs`]: the document manager
//! - [`tags`]: tag validation and `+tag-tag` operations
//! - [`model`]: `Paper`, `BibRecord`, `Metadata`
//! - [`config`], [`init`], [`logging`], [`error`]

pub mod api;
pub mod citekey;
pub mod codec;
pub mod commands;
pub mod config;
pub mod docs;
pub mod error;
pub mod filter;
pub mod index;
pub mod init;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod tags;
