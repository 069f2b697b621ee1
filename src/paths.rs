//! Workspace path confinement.
//!
//! Tool arguments that denote filesystem paths are validated here before
//! any handler runs: traversal segments and absolute paths are rejected
//! outright rather than resolved.

use std::path::{Component, Path, PathBuf};

use crate::error::HubError;

/// Resolve a client-supplied relative path against the workspace root.
///
/// Rejects absolute paths, `..` segments and Windows-style prefixes. The
/// returned path is always inside `workspace_root`.
pub fn resolve(workspace_root: &Path, input: &str) -> Result<PathBuf, HubError> {
    let candidate = Path::new(input);

    if candidate.is_absolute() {
        return Err(HubError::BadRequest(format!(
            "absolute paths are not allowed: {input}"
        )));
    }

    let mut resolved = workspace_root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(HubError::BadRequest(format!(
                    "path traversal is not allowed: {input}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(HubError::BadRequest(format!(
                    "absolute paths are not allowed: {input}"
                )));
            }
        }
    }

    Ok(resolved)
}

/// Validate every declared path argument of a tool invocation in place.
/// Arguments must be strings; anything else is a client error.
pub fn sanitize_args(
    workspace_root: &Path,
    path_args: &[String],
    args: &serde_json::Value,
) -> Result<(), HubError> {
    for arg_name in path_args {
        if let Some(value) = args.get(arg_name) {
            let text = value.as_str().ok_or_else(|| {
                HubError::BadRequest(format!("argument '{arg_name}' must be a string path"))
            })?;
            resolve(workspace_root, text)?;
        }
    }
    Ok(())
}
