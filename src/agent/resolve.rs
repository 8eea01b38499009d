//! Maps user-supplied path hints onto the scanned inventory. Hints may be
//! partial, relative, or refer to a transpiled source; resolution grows the
//! matched suffix one segment at a time until a single candidate remains.

use crate::agent::error::Error;
use crate::agent::inventory::{FileEntry, Inventory};

/// Resolve `input` to the unique inventory entry it refers to.
pub fn resolve<'a>(inventory: &'a Inventory, input: &str) -> Result<&'a FileEntry, Error> {
    let segments = normalize(input);
    let Some(basename) = segments.last() else {
        return Err(Error::PathNotFound(input.to_string()));
    };

    let ext = basename.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
    if !inventory.extensions().iter().any(|allowed| allowed == ext) {
        return Err(Error::UnsupportedExtension(input.to_string()));
    }

    let mut candidates: Vec<&FileEntry> = inventory.entries().iter().collect();
    for k in 1..=segments.len() {
        candidates.retain(|entry| entry.matches_suffix(&segments, k));
        match candidates.len() {
            0 => return Err(Error::PathNotFound(input.to_string())),
            1 => return Ok(candidates[0]),
            _ => {}
        }
    }

    Err(Error::PathAmbiguous(input.to_string(), candidates.len()))
}

/// Validate a snapshot position against the resolved entry.
pub fn check_line(entry: &FileEntry, line: i32) -> Result<(), Error> {
    if line < 1 || line as u32 > entry.lines {
        return Err(Error::InvalidLine {
            basename: entry.basename().to_string(),
            line,
            lines: entry.lines,
        });
    }
    Ok(())
}

/// Split a hint into segments, collapsing `.` and `..` components and
/// stripping any absolute-root prefix.
fn normalize(input: &str) -> Vec<String> {
    let mut segments: Vec<String> = vec![];
    for part in input.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(part.to_string()),
        }
    }
    segments
}
