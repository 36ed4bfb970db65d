//! Relative path normalization.
//!
//! Every path that flows through the pipeline is a forward-slash separated,
//! relative string with no empty or `.` segments, whatever the host uses.

use std::path::Path;

/// Normalize a relative path string: `\` becomes `/`, empty and `.` segments
/// are dropped. `./docs//api/` becomes `docs/api`; `.` and `/` become `""`.
pub fn normalize(raw: &str) -> String {
    segments(raw).collect::<Vec<_>>().join("/")
}

/// Iterate the normalized segments of a relative path string.
pub fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim()
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
}

/// Render a path relative to `root` as a normalized candidate string.
/// Returns `None` when `path` is not under `root` or is not valid UTF-8.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(normalize(&parts.join("/")))
}

/// Final segment of a normalized path (the remote file name).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Replace the extension of the final segment.
/// `docs/a.md` with `docx` becomes `docs/a.docx`; `docs/README` gets one appended.
pub fn with_extension(path: &str, extension: &str) -> String {
    let name = file_name(path);
    let stem_len = match name.rfind('.') {
        Some(0) | None => name.len(),
        Some(idx) => idx,
    };
    let prefix_len = path.len() - name.len();
    format!("{}.{}", &path[..prefix_len + stem_len], extension)
}
