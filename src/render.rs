//! Graph rendering through the external Graphviz layout engine.

use std::path::Path;
use std::process::Command;

use crate::{ImageFormat, WaldorfError, WaldorfResult};

pub const DOT_BINARY: &str = "dot";

/// Whether the layout engine is installed. A missing binary disables
/// call-graph output; it is not an error.
pub fn dot_available() -> bool {
    probe(DOT_BINARY)
}

fn probe(binary: &str) -> bool {
    match Command::new(binary).arg("-V").output() {
        Ok(out) => out.status.success(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("graphviz `{binary}` not found, call-graph rendering disabled");
            false
        }
        Err(err) => {
            tracing::debug!("failed to probe graphviz `{binary}`: {err}");
            false
        }
    }
}

/// Lay out and rasterize one DOT file.
pub fn render_dot(dot_path: &Path, image_path: &Path, image_format: ImageFormat) -> WaldorfResult<()> {
    let output = Command::new(DOT_BINARY)
        .arg(image_format.dot_flag())
        .arg("-o")
        .arg(image_path)
        .arg(dot_path)
        .output()?;
    if !output.status.success() {
        return Err(WaldorfError::Render(format!(
            "dot exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
