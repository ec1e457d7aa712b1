//! Static context loader for the policy domain
//!
//! Policy answers are generated over a fixed context assembled once at
//! construction from a directory of small text documents. The context can
//! be reloaded without restarting the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

const DEFAULT_CONTEXT: &str = "=== DEFAULT POLICY CONTEXT ===\n\
Policy documents not yet loaded. Please run the data ingestion script.\n";

/// Holds the concatenated policy documents used as static context.
pub struct StaticContextStore {
    dir: PathBuf,
    context: RwLock<String>,
}

impl StaticContextStore {
    /// Load all `.txt`/`.md` documents from `dir`, concatenated with a
    /// `=== <name> ===` header per document in sorted filename order.
    /// Falls back to a placeholder context when nothing can be loaded.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let context = read_documents(&dir);
        Self {
            dir,
            context: RwLock::new(context),
        }
    }

    /// Current context text.
    pub fn context(&self) -> String {
        self.context
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Re-read the document directory in place.
    pub fn reload(&self) {
        let fresh = read_documents(&self.dir);
        let mut context = self
            .context
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *context = fresh;
        info!(dir = %self.dir.display(), "reloaded static context documents");
    }
}

fn read_documents(dir: &Path) -> String {
    if !dir.exists() {
        warn!(dir = %dir.display(), "static context directory does not exist");
        return DEFAULT_CONTEXT.to_string();
    }

    let mut names: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("txt") | Some("md")
                )
            })
            .collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not read static context directory");
            return DEFAULT_CONTEXT.to_string();
        }
    };
    // Sorted order keeps the assembled context deterministic across reloads
    names.sort();

    let mut parts = Vec::new();
    for path in names {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        match fs::read_to_string(&path) {
            Ok(content) => parts.push(format!("=== {name} ===\n{content}")),
            Err(e) => warn!(file = %path.display(), error = %e, "could not load document"),
        }
    }

    if parts.is_empty() {
        warn!(dir = %dir.display(), "no static context documents loaded");
        DEFAULT_CONTEXT.to_string()
    } else {
        parts.join("\n\n")
    }
}
