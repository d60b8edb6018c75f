//! Finding the fish files a CLI command should work on.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Expand CLI paths into fish files.
///
/// Explicit file paths are always kept, whatever their extension.
/// Directories are walked for `*.fish` files, honoring `.gitignore` and
/// `.ignore` files. The result is sorted and free of duplicates.
pub fn find_fish_files(paths: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();

    for raw in paths {
        let path = Path::new(raw);
        if path.is_file() {
            files.push(clean_path(path));
            continue;
        }
        if !path.is_dir() {
            return Err(format!("No such file or directory: {raw}"));
        }

        let mut walk_builder = WalkBuilder::new(path);
        walk_builder.hidden(false); // Include hidden files like .config
        walk_builder.require_git(false); // Process git ignores even if no repo detected

        for result in walk_builder.build() {
            match result {
                Ok(entry) => {
                    let entry_path = entry.path();
                    if entry_path.is_file() && has_fish_extension(entry_path) {
                        files.push(clean_path(entry_path));
                    }
                }
                Err(err) => log::warn!("Error walking directory: {err}"),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn has_fish_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("fish"))
}

fn clean_path(path: &Path) -> PathBuf {
    path.strip_prefix("./").unwrap_or(path).to_path_buf()
}
