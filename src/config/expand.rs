// src/config/expand.rs

//! `%(name)s`-style expansion as used in supervisord config values.
//!
//! Supported forms: `%(name)s`, `%(name)d`, `%(name)0Nd` / `%(name)Nd`
//! (padded integers) and `%%` for a literal percent sign.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{Result, StartupError};

/// Variables available for expansion, keyed by name.
pub type Expansions = BTreeMap<String, String>;

static EXPANSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%%|%\((?P<name>[A-Za-z0-9_]+)\)(?P<width>\d*)(?P<conv>[sd])")
        .expect("expansion regex is valid")
});

/// Expand every reference in `template`; unknown variables are an error.
pub fn expand(template: &str, vars: &Expansions) -> Result<String> {
    expand_with(template, vars, true)
}

/// Expand known references and leave unknown ones untouched.
///
/// Used by the loader so that `%(process_num)d` survives until the group
/// expander binds it.
pub fn expand_lenient(template: &str, vars: &Expansions) -> String {
    match expand_with(template, vars, false) {
        Ok(s) => s,
        // Only integer conversion can fail in lenient mode; keep the input.
        Err(_) => template.to_string(),
    }
}

/// `ENV_<NAME>` for every environment variable of this process.
pub fn environment_expansions() -> Expansions {
    std::env::vars()
        .map(|(k, v)| (format!("ENV_{k}"), v))
        .collect()
}

fn expand_with(template: &str, vars: &Expansions, strict: bool) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in EXPANSION_RE.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        if whole.as_str() == "%%" {
            // Keep `%%` verbatim in lenient mode so a later strict pass still
            // sees it as an escape.
            out.push_str(if strict { "%" } else { "%%" });
            continue;
        }

        match render(&caps, vars)? {
            Some(value) => out.push_str(&value),
            None if strict => {
                return Err(StartupError::config(format!(
                    "unknown expansion '%({})' in '{}'",
                    &caps["name"], template
                )));
            }
            None => out.push_str(whole.as_str()),
        }
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn render(caps: &Captures<'_>, vars: &Expansions) -> Result<Option<String>> {
    let name = &caps["name"];
    let Some(value) = vars.get(name) else {
        return Ok(None);
    };

    if &caps["conv"] == "s" {
        return Ok(Some(value.clone()));
    }

    let number: i64 = value.trim().parse().map_err(|_| {
        StartupError::config(format!(
            "expansion '%({name})d' requires an integer, got '{value}'"
        ))
    })?;

    let width_spec = &caps["width"];
    let width: usize = width_spec.parse().unwrap_or(0);
    let rendered = if width_spec.starts_with('0') {
        format!("{number:0width$}")
    } else {
        format!("{number:width$}")
    };
    Ok(Some(rendered))
}
