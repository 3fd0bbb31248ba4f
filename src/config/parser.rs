//! Reader and writer for Borg's config file format.
//!
//! Borg writes its repository and cache configs with Python's
//! `configparser`, which produces:
//!
//! ```text
//! [repository]
//! version = 1
//! key = hqlhbGdvcml0aG2m...
//! 	c2hhMjU2pGRhdGHa...
//!
//! ```
//!
//! Multi-line values continue on lines indented with a tab, and every
//! section is followed by a blank line. Only this subset is understood.

use super::model::{ConfigFile, Section};
use crate::error::{BorpError, Result};

/// Parse config text into a [`ConfigFile`].
///
/// Rules:
/// - blank lines end a multi-line value and are otherwise ignored
/// - lines starting with `#` or `;` are comments
/// - `[name]` opens a section; duplicate sections are an error
/// - indented lines continue the previous value
/// - `key = value` or `key: value`; keys are lower-cased, duplicates are an error
pub fn parse(text: &str) -> Result<ConfigFile> {
    let mut config = ConfigFile::new();
    let mut current: Option<Section> = None;
    // Whether the last entry of `current` may take continuation lines.
    let mut value_open = false;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if line.trim().is_empty() {
            value_open = false;
            continue;
        }

        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        // Continuation of a multi-line value
        if line.starts_with(' ') || line.starts_with('\t') {
            let entry = current
                .as_mut()
                .filter(|_| value_open)
                .and_then(|section| section.entries.last_mut())
                .ok_or_else(|| parse_error(line_no, "continuation line without a value"))?;
            if !entry.1.is_empty() {
                entry.1.push('\n');
            }
            entry.1.push_str(line.trim());
            continue;
        }

        // Section header
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .trim_end()
                .strip_suffix(']')
                .ok_or_else(|| parse_error(line_no, "unterminated section header"))?;
            if name.is_empty() {
                return Err(parse_error(line_no, "empty section name"));
            }
            if let Some(done) = current.take() {
                config.push_section(done);
            }
            if config.has_section(name) {
                return Err(parse_error(line_no, format!("duplicate section '{}'", name)));
            }
            current = Some(Section::new(name));
            value_open = false;
            continue;
        }

        // Entry
        let (key, value) = split_entry(line)
            .ok_or_else(|| parse_error(line_no, format!("expected 'key = value', got '{}'", line)))?;
        let section = current
            .as_mut()
            .ok_or_else(|| parse_error(line_no, "entry before any section header"))?;
        if section.get(&key).is_some() {
            return Err(parse_error(
                line_no,
                format!("duplicate key '{}' in section '{}'", key, section.name),
            ));
        }
        section.entries.push((key, value.to_string()));
        value_open = true;
    }

    if let Some(done) = current {
        config.push_section(done);
    }
    Ok(config)
}

/// Split `key = value` / `key: value` at the first delimiter.
fn split_entry(line: &str) -> Option<(String, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_lowercase(), line[pos + 1..].trim()))
}

fn parse_error(line: usize, message: impl Into<String>) -> BorpError {
    BorpError::ConfigParse {
        line,
        message: message.into(),
    }
}

/// Render a [`ConfigFile`] the way `configparser` writes it.
pub fn to_borg_string(config: &ConfigFile) -> String {
    let mut out = String::new();
    for section in config.sections() {
        out.push('[');
        out.push_str(&section.name);
        out.push_str("]\n");
        for (key, value) in &section.entries {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(&value.replace('\n', "\n\t"));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
