//! File enumeration: git-tracked files, or a plain directory walk

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Failure to obtain the tracked-file list from git
#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    /// git could not be started (not installed, bad working directory, ...)
    #[error("failed to run git in {dir}: {source}")]
    Spawn {
        dir: String,
        #[source]
        source: io::Error,
    },
    /// git ran but exited unsuccessfully
    #[error("git ls-files exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// List the files tracked by git in `root`, in the order git reports them.
///
/// Paths are relative to `root`. Entries are whitespace-trimmed and empty
/// entries dropped.
pub fn list_tracked_files(root: &Path) -> Result<Vec<String>, EnumerateError> {
    // NUL-separated so non-ASCII paths come back unquoted
    let output = Command::new("git")
        .args(["ls-files", "-z"])
        .current_dir(root)
        .output()
        .map_err(|source| EnumerateError::Spawn {
            dir: root.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(EnumerateError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let files = parse_ls_files(&output.stdout);
    tracing::debug!(root = %root.display(), count = files.len(), "git ls-files");
    Ok(files)
}

/// Like [`list_tracked_files`], but a git failure yields an empty list
pub fn list_tracked_files_or_empty(root: &Path) -> Vec<String> {
    list_tracked_files(root).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "git enumeration failed, continuing with no files");
        Vec::new()
    })
}

fn parse_ls_files(stdout: &[u8]) -> Vec<String> {
    stdout
        .split(|&b| b == 0)
        .filter_map(|chunk| {
            let s = String::from_utf8_lossy(chunk);
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// List every regular file below `root`, skipping `.git`.
///
/// Symlinks are followed, so a link to a regular file is listed under the
/// link's path. Broken links and link cycles are skipped. Entries are
/// sorted by file name within each directory and use `/` as the separator.
#[cfg(feature = "walkdir")]
pub fn list_directory_files(root: &Path) -> anyhow::Result<Vec<String>> {
    use anyhow::Context;

    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_unresolvable_link(&err) => {
                tracing::warn!(error = %err, "skipping unresolvable link");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to walk: {}", root.display()));
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| anyhow::anyhow!("Failed to get relative path"))?;
        files.push(relative.to_string_lossy().replace('\\', "/"));
    }

    Ok(files)
}

#[cfg(feature = "walkdir")]
fn is_unresolvable_link(err: &walkdir::Error) -> bool {
    err.loop_ancestor().is_some()
        || err.io_error().map_or(false, |e| e.kind() == io::ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    #[test]
    fn test_parse_ls_files() {
        let out = b"a.txt\0 dir/b.rs \0\0\n  \0c d.md\0";
        assert_eq!(parse_ls_files(out), vec!["a.txt", "dir/b.rs", "c d.md"]);
    }

    #[test]
    fn test_parse_ls_files_keeps_order_and_duplicates() {
        assert_eq!(parse_ls_files(b"z\0a\0z\0"), vec!["z", "a", "z"]);
        assert!(parse_ls_files(b"").is_empty());
    }

    #[test]
    fn test_list_tracked_files() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-q"]);
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/ä.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("untracked.txt"), "u").unwrap();
        git(dir.path(), &["add", "b.txt", "src"]);

        let files = list_tracked_files(dir.path()).unwrap();
        assert_eq!(files, vec!["b.txt", "src/ä.rs"]);
    }

    #[test]
    fn test_list_tracked_files_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = list_tracked_files(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, EnumerateError::Spawn { .. }));
        assert!(err.to_string().contains("missing"));
        assert!(list_tracked_files_or_empty(&dir.path().join("missing")).is_empty());
    }

    #[cfg(feature = "walkdir")]
    #[test]
    fn test_list_directory_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();

        let files = list_directory_files(dir.path()).unwrap();
        assert_eq!(files, vec!["a.txt", "b.txt", "src/lib.rs"]);
    }

    #[cfg(all(unix, feature = "walkdir"))]
    #[test]
    fn test_list_directory_files_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("shared.txt"), "shared").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        symlink(outside.path().join("shared.txt"), dir.path().join("linked.txt")).unwrap();
        symlink(dir.path().join("missing.txt"), dir.path().join("broken.txt")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let files = list_directory_files(dir.path()).unwrap();
        assert_eq!(files, vec!["a.txt", "linked.txt"]);
    }
}
