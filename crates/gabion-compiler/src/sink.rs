//! Document sinks.
//!
//! Where serialized documents go: a directory of `.xml` files, or stdout.
//! The compiler core only sees the trait.

use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use crate::documents::PolicyDocuments;
use crate::error::CompileError;

/// File name for the policy bundle.
pub const POLICIES_FILE: &str = "policies.xml";
/// File name for the proxy endpoint document.
pub const PROXIES_FILE: &str = "proxies.xml";
/// File name for the target endpoint document.
pub const TARGETS_FILE: &str = "targets.xml";

/// Receives the serialized documents of one compile.
pub trait DocumentSink {
    fn write_documents(&self, documents: &PolicyDocuments) -> Result<(), CompileError>;
}

/// Writes the three documents as files under a directory, creating it if
/// needed.
#[derive(Debug, Clone)]
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSink for DirSink {
    fn write_documents(&self, documents: &PolicyDocuments) -> Result<(), CompileError> {
        std::fs::create_dir_all(&self.dir)?;
        for (file, contents) in [
            (POLICIES_FILE, &documents.policies),
            (PROXIES_FILE, &documents.proxy_endpoints),
            (TARGETS_FILE, &documents.target_endpoints),
        ] {
            let path = self.dir.join(file);
            std::fs::write(&path, contents)?;
            info!(path = %path.display(), bytes = contents.len(), "wrote document");
        }
        Ok(())
    }
}

/// Prints the documents to stdout, separated by their file names.
#[derive(Debug, Clone, Default)]
pub struct StdoutSink;

impl DocumentSink for StdoutSink {
    fn write_documents(&self, documents: &PolicyDocuments) -> Result<(), CompileError> {
        let mut stdout = std::io::stdout().lock();
        for (file, contents) in [
            (POLICIES_FILE, &documents.policies),
            (PROXIES_FILE, &documents.proxy_endpoints),
            (TARGETS_FILE, &documents.target_endpoints),
        ] {
            writeln!(stdout, "# {}", file)?;
            stdout.write_all(contents.as_bytes())?;
            writeln!(stdout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_documents() -> PolicyDocuments {
        PolicyDocuments {
            policies: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Policies/>\n".to_string(),
            proxy_endpoints: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ProxyEndpoint/>\n"
                .to_string(),
            target_endpoints: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<TargetEndpoint/>\n"
                .to_string(),
        }
    }

    #[test]
    fn dir_sink_writes_three_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("generated");

        DirSink::new(&out).write_documents(&sample_documents()).unwrap();

        for file in [POLICIES_FILE, PROXIES_FILE, TARGETS_FILE] {
            let path = out.join(file);
            assert!(path.exists(), "missing {file}");
        }
        let policies = std::fs::read_to_string(out.join(POLICIES_FILE)).unwrap();
        assert!(policies.contains("<Policies/>"));
    }

    #[test]
    fn dir_sink_overwrites_on_repeat() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = DirSink::new(dir.path());

        sink.write_documents(&sample_documents()).unwrap();
        sink.write_documents(&sample_documents()).unwrap();

        let policies = std::fs::read_to_string(dir.path().join(POLICIES_FILE)).unwrap();
        assert_eq!(
            policies,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Policies/>\n"
        );
    }
}
