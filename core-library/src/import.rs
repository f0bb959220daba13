//! Two-column text import
//!
//! Parses pasted or uploaded text into tracks. Two formats are accepted:
//!
//! 1. **Delimited**: one `sentence,translation` pair per line, with optional
//!    double-quote wrapping and `""` escaping. A leading `english,korean`
//!    header row is detected and skipped.
//! 2. **Line-paired**: alternating lines, sentence first, translation second.
//!
//! Format detection is heuristic: the delimited parser is chosen when a
//! header is present or at least half of the lines look like two-field rows.
//! Malformed rows are dropped, never fatal; callers get a count of what was
//! discarded so hosts can mention it.

use tracing::debug;

use crate::models::Track;

/// Result of an import pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Successfully parsed tracks, in input order.
    pub tracks: Vec<Track>,
    /// Rows or line pairs that could not be parsed.
    pub dropped: usize,
}

impl ImportOutcome {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Parse free-form playlist text into tracks.
pub fn parse_tracks(input: &str) -> ImportOutcome {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return ImportOutcome {
            tracks: Vec::new(),
            dropped: 0,
        };
    }

    let has_header = is_header_row(lines[0]);
    let delimited_lines = lines.iter().filter(|line| looks_delimited(line)).count();
    let is_delimited = has_header || (delimited_lines > 0 && delimited_lines * 2 >= lines.len());

    let outcome = if is_delimited {
        parse_delimited(&lines, has_header)
    } else {
        parse_line_pairs(&lines)
    };

    debug!(
        accepted = outcome.tracks.len(),
        dropped = outcome.dropped,
        delimited = is_delimited,
        "parsed playlist text"
    );
    outcome
}

/// Render tracks back into the delimited format, header included. The
/// inverse of [`parse_tracks`] for the delimited case.
pub fn export_tracks(tracks: &[Track]) -> String {
    let mut out = String::from("english,korean\n");
    for track in tracks {
        out.push_str(&format!(
            "\"{}\",\"{}\"\n",
            escape_field(&track.text),
            escape_field(&track.translation)
        ));
    }
    out
}

fn escape_field(field: &str) -> String {
    field.replace('"', "\"\"")
}

fn is_header_row(line: &str) -> bool {
    let lowered = line.to_lowercase();
    lowered == "english,korean" || lowered == "\"english\",\"korean\""
}

/// Whether a line plausibly holds a two-field delimited row: quoted, or a
/// bare `a,b` with exactly one comma.
fn looks_delimited(line: &str) -> bool {
    if !line.contains(',') {
        return false;
    }
    line.starts_with('"') || line.matches(',').count() == 1
}

fn parse_delimited(lines: &[&str], has_header: bool) -> ImportOutcome {
    let mut tracks = Vec::new();
    let mut dropped = 0;

    let body = if has_header { &lines[1..] } else { lines };
    for line in body {
        match split_delimited_row(line) {
            Some((text, translation)) => tracks.push(Track::new(text, translation)),
            None => dropped += 1,
        }
    }

    ImportOutcome { tracks, dropped }
}

fn parse_line_pairs(lines: &[&str]) -> ImportOutcome {
    let mut tracks = Vec::new();
    let mut dropped = 0;

    let mut chunks = lines.chunks_exact(2);
    for pair in &mut chunks {
        tracks.push(Track::new(pair[0], pair[1]));
    }
    // A trailing sentence with no translation is dropped.
    dropped += chunks.remainder().len();

    ImportOutcome { tracks, dropped }
}

/// Split one delimited row into its first two fields, honoring double-quote
/// wrapping and `""` escapes. Returns `None` for rows without two non-empty
/// fields.
fn split_delimited_row(line: &str) -> Option<(String, String)> {
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.is_empty() => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        // Unterminated quote: malformed row.
        return None;
    }
    fields.push(current.trim().to_string());

    // Columns beyond the second are ignored.
    let mut iter = fields.into_iter();
    let text = iter.next()?;
    let translation = iter.next()?;
    if text.is_empty() || translation.is_empty() {
        return None;
    }
    Some((text, translation))
}
