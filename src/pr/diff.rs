use super::types::{DiffFile, Hunk};
use super::PrError;

/// Parse a unified diff string into a vector of DiffFile structs.
///
/// The input is the raw text from Bitbucket's diff endpoint.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// New files have: `--- /dev/null`
/// Deleted files have: `+++ /dev/null`
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
pub fn parse_diff(raw_diff: &str) -> Result<Vec<DiffFile>, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut current_file: Option<DiffFile> = None;
    let mut current_hunk: Option<Hunk> = None;

    let finish_hunk = |file: &mut Option<DiffFile>, hunk: &mut Option<Hunk>| {
        if let (Some(file), Some(hunk)) = (file.as_mut(), hunk.take()) {
            file.hunks.push(hunk);
        }
    };

    let finish_file =
        |files: &mut Vec<DiffFile>, file: &mut Option<DiffFile>, hunk: &mut Option<Hunk>| {
            finish_hunk(file, hunk);
            if let Some(file) = file.take() {
                files.push(file);
            }
        };

    for line in raw_diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_file(&mut files, &mut current_file, &mut current_hunk);
            let mut parts = rest.split_whitespace();
            let a_path = parts
                .next()
                .ok_or_else(|| PrError::DiffParse("Missing a/ path in diff header".to_string()))?;
            let b_path = parts
                .next()
                .ok_or_else(|| PrError::DiffParse("Missing b/ path in diff header".to_string()))?;
            let path = b_path
                .strip_prefix("b/")
                .or_else(|| a_path.strip_prefix("a/"))
                .unwrap_or(b_path)
                .to_string();
            current_file = Some(DiffFile {
                path,
                is_new: false,
                is_deleted: false,
                hunks: Vec::new(),
            });
            continue;
        }

        if line.starts_with("@@") {
            finish_hunk(&mut current_file, &mut current_hunk);
            validate_hunk_header(line)?;
            current_hunk = Some(Hunk { lines: Vec::new() });
            continue;
        }

        // File headers only appear before the first hunk of a file; inside a
        // hunk "--- x" is a removed line whose content starts with "--".
        if current_hunk.is_none() {
            if let Some(file) = current_file.as_mut() {
                if let Some(path) = line.strip_prefix("--- ") {
                    file.is_new |= path.trim() == "/dev/null";
                } else if let Some(path) = line.strip_prefix("+++ ") {
                    file.is_deleted |= path.trim() == "/dev/null";
                }
            }
            continue;
        }

        if let Some(hunk) = current_hunk.as_mut() {
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                hunk.lines.push(line.to_string());
            }
        }
    }

    finish_file(&mut files, &mut current_file, &mut current_hunk);
    Ok(files)
}

/// Render the hunk-level inspection listing for parsed diff files:
///
/// File: src/lib.rs
/// Hunk with 2 lines added and 1 lines removed:
/// Added: ...
/// Removed: ...
pub fn inspect(files: &[DiffFile]) -> String {
    let mut out = String::new();
    for file in files {
        let status = match (file.is_new, file.is_deleted) {
            (true, _) => " (new file)",
            (_, true) => " (deleted)",
            _ => "",
        };
        out.push_str(&format!("\nFile: {}{}\n", file.path, status));
        for hunk in &file.hunks {
            out.push_str(&format!(
                "Hunk with {} lines added and {} lines removed:\n",
                hunk.added().count(),
                hunk.removed().count()
            ));
            for line in &hunk.lines {
                if let Some(added) = line.strip_prefix('+') {
                    out.push_str(&format!("Added: {}\n", added.trim()));
                } else if let Some(removed) = line.strip_prefix('-') {
                    out.push_str(&format!("Removed: {}\n", removed.trim()));
                }
            }
        }
    }
    out
}

fn validate_hunk_header(line: &str) -> Result<(), PrError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| PrError::DiffParse("Invalid hunk header".to_string()))?;
    // Anything after the closing @@ is section context (e.g. a function name).
    let header = header.split("@@").next().unwrap_or_default().trim();
    let mut parts = header.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing old range".to_string()))?;
    let new_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing new range".to_string()))?;

    check_range(old_part, '-')?;
    check_range(new_part, '+')
}

/// `part` must look like `-start[,len]` (or `+start[,len]`).
fn check_range(part: &str, prefix: char) -> Result<(), PrError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| PrError::DiffParse("Invalid range prefix".to_string()))?;
    let start = range.split_once(',').map_or(range, |(start, _)| start);
    start
        .parse::<usize>()
        .map(|_| ())
        .map_err(|_| PrError::DiffParse(format!("Invalid range start in {}", part)))
}
