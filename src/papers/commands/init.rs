use crate::commands::{CmdMessage, CmdResult};
use crate::config::PapersConfig;
use crate::error::Result;
use crate::repo::Repository;
use std::path::Path;

pub fn run(dir: &Path, config: PapersConfig) -> Result<CmdResult> {
    Repository::initialize(dir, config)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Initialized paper repository in {}",
        dir.display()
    )));
    Ok(result)
}
