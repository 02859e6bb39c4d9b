//! Key-value property files.
//!
//! Supports the usual `.properties` syntax: `key=value`, `key: value` or
//! `key value`, `#`/`!` comments, backslash line continuation, and the escape
//! sequences `\t`, `\n`, `\r`, `\f`, `\uXXXX`.

use crate::error::{DeskError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A parsed property file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    source: Option<PathBuf>,
    entries: HashMap<String, String>,
}

impl Properties {
    /// Reads and parses a property file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DeskError::config(format!("Cannot load properties: {}: {e}", path.display()))
        })?;
        let mut props = Self::parse(&content)
            .map_err(|e| DeskError::config(format!("{}: {e}", path.display())))?;
        props.source = Some(path.to_path_buf());
        Ok(props)
    }

    /// Parses property text. Later duplicates override earlier keys.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let mut entries = HashMap::new();
        let mut lines = content.lines().enumerate();

        while let Some((number, line)) = lines.next() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let mut logical = String::from(trimmed);
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some((_, next)) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            let key = unescape(key).map_err(|e| format!("line {}: {e}", number + 1))?;
            let value = unescape(value).map_err(|e| format!("line {}: {e}", number + 1))?;
            entries.insert(key, value);
        }

        Ok(Self {
            source: None,
            entries,
        })
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key` or a configuration error naming the file.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            DeskError::config(format!(
                "Missing key '{key}' in {}",
                self.source_name()
            ))
        })
    }

    /// File name the properties were loaded from, for messages.
    pub fn source_name(&self) -> String {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<inline>".to_string())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were parsed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A line continues when it ends in an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Splits a logical line at the first unescaped `=`, `:` or whitespace.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                return (&line[..i], line[i + 1..].trim_start());
            }
            c if c.is_whitespace() => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let rest = line[key_end..].trim_start();
    let rest = rest
        .strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .map(str::trim_start)
        .unwrap_or(rest);
    (&line[..key_end], rest)
}

fn unescape(s: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .ok_or_else(|| format!("malformed \\u escape '\\u{hex}'"))?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}
