//! Lexical path handling. Nothing here talks to the remote service.

use crate::ssm_parameters::{ParameterPath, DELIMITER};

/// Splits an optional `region:` prefix off user input.
///
/// Only a single `:` ahead of the first delimiter counts as a region marker,
/// so `/app:v1/key` stays a plain path.
pub fn split_region(input: &str) -> (Option<&str>, &str) {
    let head_end = input.find(DELIMITER).unwrap_or_else(|| input.len());
    let head = &input[..head_end];
    if head.matches(':').count() != 1 {
        return (None, input);
    }
    match input.find(':') {
        Some(idx) if idx > 0 => (Some(&input[..idx]), &input[idx + 1..]),
        Some(idx) => (None, &input[idx + 1..]),
        None => (None, input),
    }
}

/// Lexically normalizes an absolute path: collapses repeated delimiters and
/// `.` segments and resolves `..`. Climbing above the root stays at the root.
pub fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(DELIMITER) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("{}{}", DELIMITER, segments.join(DELIMITER))
}

/// Fully qualifies `path`, prefixing relative input with `cwd`.
pub fn fqp(path: &str, cwd: &str) -> String {
    if path.starts_with(DELIMITER) {
        clean(path)
    } else {
        clean(&format!("{}{}{}", cwd, DELIMITER, path))
    }
}

/// Resolves user input into a region and a canonical absolute name.
pub fn resolve(input: &str, cwd: &str, default_region: &str) -> ParameterPath {
    let (region, path) = split_region(input);
    ParameterPath {
        name: fqp(path, cwd),
        region: region.unwrap_or(default_region).to_string(),
    }
}

/// Last segment of a path; empty for the root.
pub fn basename(path: &str) -> &str {
    path.rsplit(DELIMITER).next().unwrap_or("")
}
