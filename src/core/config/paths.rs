use std::env;
use std::fs;
use std::path::PathBuf;

pub const ROOT_ENV: &str = "RAG_ASSISTANT_ROOT";
pub const DATA_DIR_ENV: &str = "RAG_ASSISTANT_DATA_DIR";

/// Where the server looks for `config.yml` and writes its logs.
///
/// `root` holds the checked-in config; `data_dir` holds the operator's
/// override config and the `logs/` directory. Both default to the working
/// directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Resolves `RAG_ASSISTANT_ROOT` and `RAG_ASSISTANT_DATA_DIR`, falling back
    /// to the working directory.
    pub fn from_env() -> Self {
        let root = env::var_os(ROOT_ENV)
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| root.clone());

        Self::from_dirs(root, data_dir)
    }

    pub fn from_dirs(root: PathBuf, data_dir: PathBuf) -> Self {
        let log_dir = data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!("Cannot create log directory {}: {}", log_dir.display(), err);
        }

        Self {
            root,
            data_dir,
            log_dir,
        }
    }

    /// Config files in lookup order: the data dir overrides the root.
    pub fn config_candidates(&self) -> [PathBuf; 2] {
        [
            self.data_dir.join("config.yml"),
            self.root.join("config.yml"),
        ]
    }
}
