// src/config/ini.rs

//! Minimal reader for supervisord-style INI files.
//!
//! Supported syntax:
//! - `[section]` headers
//! - `key = value` and `key: value`
//! - full-line comments starting with `;` or `#`
//! - inline comments introduced by whitespace followed by `;` or `#`
//! - indented continuation lines (joined with `\n`)
//!
//! Keys are case-insensitive and stored lower-cased. Section names are kept
//! verbatim (`program:foo`).

use crate::errors::{Result, StartupError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The part after `kind:` in a header like `program:foo`.
    pub fn qualifier(&self, kind: &str) -> Option<&str> {
        self.name
            .split_once(':')
            .filter(|(k, _)| *k == kind)
            .map(|(_, rest)| rest.trim())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    fn append_continuation(&mut self, line: &str) -> bool {
        match self.entries.last_mut() {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    /// Parse INI text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let mut doc = IniDocument::default();
        let mut current: Option<usize> = None;
        // Continuation is only valid directly after a key line.
        let mut in_value = false;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim_end_matches('\r');
            let trimmed = line.trim();

            if trimmed.is_empty() {
                in_value = false;
                continue;
            }
            if trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }

            let indented = line.starts_with(' ') || line.starts_with('\t');
            if indented && in_value {
                if let Some(section) = current.map(|i| &mut doc.sections[i]) {
                    section.append_continuation(strip_inline_comment(trimmed));
                }
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    StartupError::config(format!(
                        "{origin}:{line_no}: unterminated section header '{trimmed}'"
                    ))
                })?;
                current = Some(doc.section_index_or_insert(name.trim()));
                in_value = false;
                continue;
            }

            let Some(section_idx) = current else {
                return Err(StartupError::config(format!(
                    "{origin}:{line_no}: option line outside of any section: '{trimmed}'"
                )));
            };

            let (key, value) = split_key_value(trimmed).ok_or_else(|| {
                StartupError::config(format!(
                    "{origin}:{line_no}: expected 'key = value', got '{trimmed}'"
                ))
            })?;

            doc.sections[section_idx].set(key, strip_inline_comment(value));
            in_value = true;
        }

        Ok(doc)
    }

    /// Merge another document into this one; values from `other` win.
    pub fn merge(&mut self, other: IniDocument) {
        for section in other.sections {
            let idx = self.section_index_or_insert(&section.name);
            for (key, value) in section.entries {
                self.sections[idx].set(&key, value);
            }
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(IniSection::new(name));
                self.sections.len() - 1
            }
        }
    }
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim()))
}

/// Drop a trailing ` ; comment` / ` # comment`.
fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if (*b == b';' || *b == b'#') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return value[..i].trim_end();
        }
    }
    value
}
