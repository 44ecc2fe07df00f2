use crate::api::PapersApi;
use crate::error::{PapersError, Result};
use crate::store::fs_backend::FsBackend;
use directories::BaseDirs;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming the repository directory.
pub const DIR_ENV: &str = "PAPERS_DIR";

/// Default repository directory name under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".papers";

pub struct PapersContext {
    pub dir: PathBuf,
}

impl PapersContext {
    /// Opens the repository. Fails with `NotInitialized` until `papers init` ran.
    pub fn open(&self) -> Result<PapersApi<FsBackend>> {
        PapersApi::<FsBackend>::open(&self.dir)
    }
}

/// Picks the repository directory: the `--dir` flag, then `PAPERS_DIR`, then
/// `~/.papers`.
pub fn initialize(dir_flag: Option<PathBuf>) -> Result<PapersContext> {
    let home = BaseDirs::new().map(|bd| bd.home_dir().to_path_buf());
    let dir = resolve_repo_dir(dir_flag, std::env::var_os(DIR_ENV), home.as_deref())?;
    tracing::debug!(dir = %dir.display(), "repository directory");
    Ok(PapersContext { dir })
}

pub fn resolve_repo_dir(
    dir_flag: Option<PathBuf>,
    env_dir: Option<OsString>,
    home: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = dir_flag {
        return Ok(dir);
    }
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    home.map(|h| h.join(DEFAULT_DIR_NAME)).ok_or_else(|| {
        PapersError::Api(format!(
            "Cannot determine the home directory; pass --dir or set {}",
            DIR_ENV
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins() {
        let dir = resolve_repo_dir(
            Some(PathBuf::from("/flag")),
            Some(OsString::from("/env")),
            Some(Path::new("/home/u")),
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/flag"));
    }

    #[test]
    fn test_env_before_home() {
        let dir = resolve_repo_dir(None, Some(OsString::from("/env")), Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/env"));
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let dir =
            resolve_repo_dir(None, Some(OsString::new()), Some(Path::new("/home/u"))).unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.papers"));
    }

    #[test]
    fn test_no_home() {
        assert!(matches!(
            resolve_repo_dir(None, None, None),
            Err(PapersError::Api(_))
        ));
    }
}
