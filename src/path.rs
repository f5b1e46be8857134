//! Path helpers used by the model builder and every emitter.
//!
//! Everything here except [`resolve_absolute`] is a pure string/path
//! computation. No function touches the process working directory; callers
//! pass the base directory explicitly.

use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::error::PathResolutionError;

/// Characters that may not appear in a generated file path.
const INVALID_PATH_CHARS: &[char] = &['"', '<', '>', '|', '\0'];

// ═══════════════════════════════════════════════════════════════════════════════
//  Separators
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert every `/` and `\` in `path` to `sep`. `None` yields an empty string.
pub fn normalize<'a>(path: impl Into<Option<&'a str>>, sep: char) -> String {
    match path.into() {
        Some(p) => p.chars().map(|c| if c == '/' || c == '\\' { sep } else { c }).collect(),
        None => String::new(),
    }
}

/// Forward-slash form of a filesystem path.
pub fn to_forward(path: &Path) -> String {
    normalize(path.to_string_lossy().as_ref(), '/')
}

/// Backslash form of a filesystem path, as Visual Studio writes it.
pub fn to_backslash(path: &str) -> String {
    normalize(path, '\\')
}

/// Ensure a non-empty `path` ends with `sep`.
pub fn end_path(path: &str, sep: char) -> String {
    if path.is_empty() || path.ends_with(sep) {
        path.to_string()
    } else {
        format!("{path}{sep}")
    }
}

/// Prefix a relative path with `./` unless it already starts with a dot.
pub fn prepend_dot(path: &str) -> String {
    if path.is_empty() {
        "./".to_string()
    } else if path.starts_with('.') || path.starts_with('/') {
        path.to_string()
    } else {
        format!("./{path}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Resolution
// ═══════════════════════════════════════════════════════════════════════════════

/// Lexically collapse `.` and `..` components without touching the disk.
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `path` against `base` into an absolute, cleaned path.
///
/// An empty `path` means `base` itself. Fails when nothing exists at the
/// resulting location.
pub fn resolve_absolute(base: &Path, path: &str) -> Result<PathBuf, PathResolutionError> {
    let mut native = normalize(path, MAIN_SEPARATOR);
    if native.trim().is_empty() {
        native = ".".to_string();
    }

    let joined = base.join(native.trim());
    let full = if joined.is_absolute() {
        clean(&joined)
    } else {
        let cwd = std::env::current_dir().map_err(|_| PathResolutionError { path: joined.clone() })?;
        clean(&cwd.join(&joined))
    };

    if full.exists() {
        Ok(full)
    } else {
        Err(PathResolutionError { path: full })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Relativization
// ═══════════════════════════════════════════════════════════════════════════════

fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') { "/" } else { trimmed }
}

/// Express `target` relative to the directory `base`, in forward-slash form.
///
/// `base` is walked up one segment at a time until it is a segment prefix of
/// `target`; each trimmed segment contributes one `../`. Identical inputs give
/// `./`. When the two share no prefix at all the `../` run is prepended to the
/// whole of `target`.
pub fn relativize(base: &str, target: &str) -> String {
    let base_norm = normalize(base.trim(), '/');
    let target_norm = normalize(target.trim(), '/');
    let base = trim_trailing_slash(&base_norm);
    let target = trim_trailing_slash(&target_norm);

    if base == target {
        return "./".to_string();
    }

    let absolute = base.starts_with('/');
    let mut prefix = base;
    let mut ups = 0usize;

    loop {
        if prefix == target {
            return "../".repeat(ups);
        }

        let candidate = if prefix.ends_with('/') {
            prefix.to_string()
        } else if prefix.is_empty() {
            if absolute { "/".to_string() } else { break }
        } else {
            format!("{prefix}/")
        };

        if let Some(rest) = target.strip_prefix(candidate.as_str()) {
            let mut out = format!("{}{}", "../".repeat(ups), rest);
            if out.starts_with('/') {
                out.insert(0, '.');
            }
            if out.is_empty() {
                out.push_str("./");
            }
            return out;
        }

        if prefix.is_empty() || prefix == "/" {
            break;
        }
        prefix = match prefix.rfind('/') {
            Some(0) => "/",
            Some(pos) => &prefix[..pos],
            None => "",
        };
        ups += 1;
    }

    format!("{}{}", "../".repeat(ups), target)
}

/// [`relativize`] over filesystem paths.
pub fn relativize_paths(base: &Path, target: &Path) -> String {
    relativize(&to_forward(base), &to_forward(target))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  File names
// ═══════════════════════════════════════════════════════════════════════════════

/// Build `dir/name.ext`. The extension is not doubled when `name` already
/// carries it, and characters that are invalid in paths become `_`.
pub fn join_with_extension(dir: &Path, name: &str, ext: &str) -> PathBuf {
    let mut joined = end_path(&normalize(dir.to_string_lossy().as_ref(), MAIN_SEPARATOR), MAIN_SEPARATOR);
    joined.push_str(name);

    let suffix = format!(".{ext}");
    if !name.ends_with(&suffix) {
        joined.push_str(&suffix);
    }

    let cleaned: String = joined
        .chars()
        .map(|c| if INVALID_PATH_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    PathBuf::from(cleaned)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
