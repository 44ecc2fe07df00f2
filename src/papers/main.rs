use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use papers::api::PapersApi;
use papers::codec::Format;
use papers::commands::add::AddOptions;
use papers::commands::{CmdMessage, CmdResult, MessageLevel};
use papers::config::PapersConfig;
use papers::error::{PapersError, Result};
use papers::filter::CaseMode;
use papers::index::ListedPaper;
use papers::init::{initialize, PapersContext};
use papers::logging::init_logging;
use papers::repo::AttachOptions;
use papers::store::fs_backend::FsBackend;
use std::io::Read;
use std::path::{Path, PathBuf};

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let ctx = initialize(cli.dir)?;

    let result = match cli.command {
        Some(Commands::Init) => PapersApi::<FsBackend>::init(&ctx.dir, PapersConfig::default())?,
        Some(Commands::Add {
            file,
            citekey,
            doc,
            mode,
            tags,
            format,
        }) => {
            let (text, origin) = read_input(&file)?;
            let options = AddOptions {
                citekey,
                document: doc,
                mode: mode.mode(),
                tags,
            };
            ctx.open()?
                .add(&text, input_format(format, &file), &origin, options)?
        }
        Some(Commands::List {
            query,
            sort,
            ignore_case,
            force_case,
        }) => {
            let case = if ignore_case {
                CaseMode::Ignore
            } else if force_case {
                CaseMode::Sensitive
            } else {
                CaseMode::Smart
            };
            ctx.open()?.list(query.as_slice(), case, sort)?
        }
        Some(Commands::Remove { papers }) => ctx.open()?.remove(papers.as_slice())?,
        Some(Commands::Attach {
            paper,
            document,
            mode,
            replace,
        }) => {
            let options = AttachOptions {
                mode: mode.mode(),
                overwrite: replace,
            };
            ctx.open()?.attach(&paper, &document, options)?
        }
        Some(Commands::Tag { args }) => ctx.open()?.tag(args.as_slice())?,
        Some(Commands::Update {
            paper,
            file,
            format,
        }) => {
            let (text, origin) = read_input(&file)?;
            ctx.open()?
                .update(&paper, &text, input_format(format, &file), &origin)?
        }
        Some(Commands::Rename { paper, new_key }) => ctx.open()?.rename(&paper, &new_key)?,
        Some(Commands::Export { papers, format }) => ctx.open()?.export(papers.as_slice(), format)?,
        Some(Commands::Import { paths }) => ctx.open()?.import(&paths)?,
        Some(Commands::Doctor { repair }) => ctx.open()?.doctor(repair)?,
        Some(Commands::Path { papers }) => ctx.open()?.paths(papers.as_slice())?,
        None => list_all(&ctx)?,
    };

    print_result(&result);
    Ok(())
}

fn list_all(ctx: &PapersContext) -> Result<CmdResult> {
    ctx.open()?
        .list::<&str>(&[], CaseMode::Smart, Default::default())
}

/// Reads a file, or stdin for `-`. Returns the text and a name for errors.
fn read_input(file: &Path) -> Result<(String, String)> {
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok((text, "<stdin>".to_string()));
    }
    let text = std::fs::read_to_string(file).map_err(|e| PapersError::io_at(file, e))?;
    Ok((text, file.display().to_string()))
}

fn input_format(explicit: Option<Format>, file: &Path) -> Format {
    explicit
        .or_else(|| Format::from_path(file))
        .unwrap_or(Format::Bibtex)
}

fn print_result(result: &CmdResult) {
    print_listed(&result.listed);
    if result.listed.is_empty() {
        for tag in &result.tags {
            println!("{}", tag);
        }
    }
    print_paths(&result.paths);
    if let Some(output) = &result.output {
        print!("{}", output);
    }
    print_messages(&result.messages);
}

fn print_listed(papers: &[ListedPaper]) {
    for lp in papers {
        let tags = &lp.paper.metadata.tags;
        let tags = if tags.is_empty() {
            String::new()
        } else {
            let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
            format!("  {}", joined.join(", ").dimmed())
        };
        println!(
            "{} {}{}  {}",
            format!("{:>3}.", lp.index).yellow(),
            lp.paper.summary(),
            tags,
            format_time_ago(lp.paper.metadata.added).dimmed()
        );
    }
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let elapsed = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(elapsed.to_std().unwrap_or_default())
}

fn print_paths(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}
