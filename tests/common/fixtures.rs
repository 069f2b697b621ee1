//! Fixture workspace creation for end-to-end tests

use std::fs;
use std::io;
use std::path::Path;

/// Populates a fresh workspace root with a small known file tree.
pub fn populate_workspace(root: &Path) -> io::Result<()> {
    fs::write(root.join("README.md"), "# fixture project\n\nneedle one\n")?;
    fs::write(root.join("notes.txt"), "plain text, no match here\n")?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src").join("lib.txt"), "alpha\nneedle two\nbeta\n")?;
    Ok(())
}
