use clap::{Args, Parser, Subcommand};
use papers::codec::Format;
use papers::docs::ImportMode;
use papers::filter::SortKey;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "papers")]
#[command(about = "Plain-file bibliography manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Repository directory (defaults to $PAPERS_DIR, then ~/.papers)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// How a document enters the repository. Without a flag the configured
/// `import_mode` applies.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Copy the document into the repository
    #[arg(long)]
    pub copy: bool,

    /// Move the document into the repository
    #[arg(long = "move")]
    pub move_doc: bool,

    /// Record the document's path without copying it
    #[arg(long)]
    pub link: bool,
}

impl ModeArgs {
    pub fn mode(&self) -> Option<ImportMode> {
        if self.copy {
            Some(ImportMode::Copy)
        } else if self.move_doc {
            Some(ImportMode::Move)
        } else if self.link {
            Some(ImportMode::Link)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the repository
    Init,

    /// Add a paper from a BibTeX or YAML file (`-` reads stdin)
    #[command(alias = "a")]
    Add {
        /// Bibliography file with exactly one entry
        file: PathBuf,

        /// Citekey to use instead of a derived one
        #[arg(short = 'k', long)]
        citekey: Option<String>,

        /// Document to attach
        #[arg(short = 'd', long)]
        doc: Option<PathBuf>,

        #[command(flatten)]
        mode: ModeArgs,

        /// Tags, comma separated or repeated
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Input format, guessed from the file extension when omitted
        #[arg(short, long)]
        format: Option<Format>,
    },

    /// List papers
    #[command(alias = "ls")]
    List {
        /// Query terms, e.g. `author:knuth tag:tex 1984`
        query: Vec<String>,

        /// Sort by added, citekey, year or title
        #[arg(short, long, default_value = "added")]
        sort: SortKey,

        /// Ignore case in every term
        #[arg(short, long, conflicts_with = "force_case")]
        ignore_case: bool,

        /// Match case in every term
        #[arg(long)]
        force_case: bool,
    },

    /// Remove papers and their documents
    #[command(alias = "rm")]
    Remove {
        /// Citekeys, indexes (e.g. 1 3-5) or key fragments
        #[arg(required = true, num_args = 1..)]
        papers: Vec<String>,
    },

    /// Attach a document to a paper
    Attach {
        paper: String,
        document: PathBuf,

        #[command(flatten)]
        mode: ModeArgs,

        /// Replace an existing document
        #[arg(long)]
        replace: bool,
    },

    /// Show, find or change tags
    ///
    /// `papers tag` lists all tags, `papers tag Page99` shows a paper's tags,
    /// `papers tag web+search` lists papers tagged web and search, and
    /// `papers tag Page99 web-draft` adds web and removes draft.
    Tag {
        #[arg(num_args = 0..=2)]
        args: Vec<String>,
    },

    /// Replace a paper's record from a file (`-` reads stdin)
    Update {
        paper: String,
        file: PathBuf,

        #[arg(short, long)]
        format: Option<Format>,
    },

    /// Change a paper's citekey
    Rename { paper: String, new_key: String },

    /// Print records (all papers when none given)
    Export {
        papers: Vec<String>,

        #[arg(short, long, default_value = "bibtex")]
        format: Format,
    },

    /// Add every entry from bibliography files or directories
    Import {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Check that every paper has its record, metadata and document
    Doctor {
        /// Create missing metadata and delete orphaned metadata
        #[arg(long)]
        repair: bool,
    },

    /// Print the document path of one or more papers
    Path {
        #[arg(required = true, num_args = 1..)]
        papers: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("papers").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_flags() {
        let cli = parse(&["add", "p.bib", "-k", "Page99", "-d", "p.pdf", "--move", "-t", "a,b"]);
        match cli.command {
            Some(Commands::Add {
                citekey,
                doc,
                mode,
                tags,
                ..
            }) => {
                assert_eq!(citekey.as_deref(), Some("Page99"));
                assert_eq!(doc, Some(PathBuf::from("p.pdf")));
                assert_eq!(mode.mode(), Some(ImportMode::Move));
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mode_flags_conflict() {
        let res = Cli::try_parse_from(["papers", "add", "p.bib", "--copy", "--link"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_global_dir() {
        let cli = parse(&["list", "--dir", "/tmp/x", "author:knuth"]);
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_tag_takes_two_args_at_most() {
        assert!(Cli::try_parse_from(["papers", "tag", "a", "b", "c"]).is_err());
    }
}
