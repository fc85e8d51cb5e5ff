//! Decoding of free-form database comments.
//!
//! Legacy schemas use the comment column as a two part micro-format,
//! `Business name (technical note)`. The grammar is
//!
//! ```text
//! comment   := prefix delimited WS*
//! delimited := OPEN note CLOSE        ; OPEN is `(` or `（`, CLOSE is `)` or `）`
//!            | TAB note
//! ```
//!
//! `prefix` is the shortest run of characters that lets the rest match and
//! `note` is the longest. At each prefix length the alternatives are tried
//! in the order of [`NOTE_DELIMITERS`]. Neither part may span a line break.

use serde_json::{Map, Value};

/// Marker that introduces foreign key references in a decoded comment.
pub const FK_MARKER: &str = "FK:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteDelimiter {
    Bracketed,
    Tab,
}

const NOTE_DELIMITERS: [NoteDelimiter; 2] = [NoteDelimiter::Bracketed, NoteDelimiter::Tab];

const OPEN_BRACKETS: [char; 2] = ['(', '（'];
const CLOSE_BRACKETS: [char; 2] = [')', '）'];

impl NoteDelimiter {
    /// Try to read a note starting at `rest`, the text right after the prefix.
    fn note<'a>(&self, rest: &'a str) -> Option<&'a str> {
        let mut chars = rest.chars();
        let first = chars.next()?;
        let body = chars.as_str();
        match self {
            NoteDelimiter::Bracketed if OPEN_BRACKETS.contains(&first) => {
                let body = body.trim_end();
                let last = body.chars().next_back()?;
                if !CLOSE_BRACKETS.contains(&last) {
                    return None;
                }
                let note = &body[..body.len() - last.len_utf8()];
                (!note.contains('\n')).then_some(note)
            }
            NoteDelimiter::Tab if first == '\t' => {
                let note = body.trim_end();
                (!note.contains('\n')).then_some(note)
            }
            _ => None,
        }
    }
}

/// Split `comment` into `(prefix, note)` when it follows the micro-format.
fn split_note(comment: &str) -> Option<(&str, &str)> {
    for (at, c) in comment.char_indices() {
        for delimiter in NOTE_DELIMITERS {
            if let Some(note) = delimiter.note(&comment[at..]) {
                return Some((&comment[..at], note));
            }
        }
        if c == '\n' {
            break;
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedComment {
    pub fullname: String,
    pub comment: String,
}

/// Decode a raw comment into a display name and a note.
///
/// `name` is the entity's own name, used when there is no comment at all.
/// A comment made only of whitespace counts as no comment, so it also
/// falls back to `name`.
/// `options` are extra flags (collation, `auto_increment`, foreign key
/// references) that get appended to the note.
pub fn decode(raw: Option<&str>, name: &str, options: &[String]) -> DecodedComment {
    let extra = options.join(", ");
    let raw = raw.filter(|c| !c.trim().is_empty());

    match raw {
        Some(raw) => match split_note(raw) {
            Some((prefix, note)) => {
                let mut comment = note.trim().to_string();
                if !extra.is_empty() {
                    comment = format!("{} ({})", comment, extra);
                }
                DecodedComment {
                    fullname: prefix.trim().to_string(),
                    comment,
                }
            }
            None => DecodedComment {
                fullname: raw.trim().to_string(),
                comment: extra.trim().to_string(),
            },
        },
        None => DecodedComment {
            fullname: name.to_string(),
            comment: extra.trim().to_string(),
        },
    }
}

/// Parse comment text as a JSON object. Any other text, including other
/// JSON values, is a plain description.
pub fn json_fields(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The `FK: ...` annotation of a decoded note, with any leading collation or
/// `auto_increment` flags removed.
pub fn foreign_key_annotation(comment: &str) -> Option<String> {
    let (_, references) = comment.split_once(FK_MARKER)?;
    let mut references = references.trim();
    // `{note} ({options})` leaves the closing bracket of the options behind
    if references.ends_with(')') && !references.contains('(') {
        references = references[..references.len() - 1].trim_end();
    }
    Some(format!("{} {}", FK_MARKER, references))
}
