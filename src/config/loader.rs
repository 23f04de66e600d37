// src/config/loader.rs

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use globset::Glob;
use tracing::{debug, info, warn};

use crate::config::expand::{self, Expansions};
use crate::config::ini::{IniDocument, IniSection};
use crate::config::model::{RawStartupConfig, ServiceDeclaration, StartupConfig, WaitForToken};
use crate::config::validate::apply_error_action;
use crate::errors::{Result, StartupError};
use crate::types::ErrorAction;

pub const WAIT_FOR_OPTION: &str = "dependent_startup_wait_for";
pub const INHERIT_PRIORITY_OPTION: &str = "dependent_startup_inherit_priority";
pub const DEPENDENT_STARTUP_OPTION: &str = "dependent_startup";

/// Read a supervisord config (and everything it includes) and return the
/// raw program declarations.
///
/// This only reads and expands; it does **not** validate the dependency
/// graph. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawStartupConfig> {
    let path = path.as_ref();
    info!(config = ?path, "reading supervisor config");

    let (doc, files) = read_all_configs(path)?;

    let mut common = expand::environment_expansions();
    common.insert("here".to_string(), config_dir(path).display().to_string());
    common.insert("host_node_name".to_string(), host_node_name());

    let groups = program_groups(&doc);

    let declarations = doc
        .sections()
        .filter_map(|section| section.qualifier("program").map(|name| (name, section)))
        .map(|(name, section)| parse_program(name, section, &groups, &common))
        .collect();

    Ok(RawStartupConfig {
        files,
        declarations,
    })
}

/// Load the config from `path`, apply the error-action policy, and build the
/// dependency graph.
///
/// This is the entry point the rest of the application uses:
///
/// - reads the INI files (following `[include]`),
/// - expands `%(ENV_X)s`, `%(here)s`, `%(program_name)s`, ...,
/// - checks for unknown parents, bad state tokens, self-dependencies,
///   dependency cycles and `autostart` conflicts.
pub fn load_and_validate(path: impl AsRef<Path>, action: ErrorAction) -> Result<StartupConfig> {
    let mut raw = load_from_path(&path)?;
    apply_error_action(&mut raw, action)?;
    StartupConfig::try_from(raw)
}

/// Places searched for the config file when `--config` is not given.
///
/// Mirrors supervisord's own lookup: next to the binary, the working
/// directory, then the system locations.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(prefix) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
    {
        paths.push(prefix.clone());
        paths.push(prefix.join("etc"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.clone());
        paths.push(cwd.join("etc"));
    }
    paths.push(PathBuf::from("/etc"));
    paths.push(PathBuf::from("/etc/supervisor"));
    paths
}

/// First `<dir>/<filename>` that exists.
pub fn search_for_config_file(paths: &[PathBuf], filename: &str) -> Option<PathBuf> {
    paths
        .iter()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.exists())
}

/// Resolve the config path from an explicit `--config` or by searching.
pub fn resolve_config_path(explicit: Option<&Path>, filename: &str) -> Result<PathBuf> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let paths = default_search_paths();
            debug!(?paths, filename, "searching for config file");
            search_for_config_file(&paths, filename).ok_or(StartupError::ConfigNotFound)?
        }
    };

    if !path.exists() {
        return Err(StartupError::ConfigMissing(path));
    }
    Ok(path)
}

/// Parse a supervisord boolean (`true/false/yes/no/on/off/1/0`).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn config_dir(path: &Path) -> PathBuf {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    abs.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn host_node_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// Read `root` and, recursively, every file pulled in by `[include] files`.
fn read_all_configs(root: &Path) -> Result<(IniDocument, Vec<PathBuf>)> {
    let mut doc = IniDocument::default();
    let mut files = Vec::new();
    let mut seen = HashSet::new();
    read_config_recursive(root, &mut doc, &mut files, &mut seen)?;
    Ok((doc, files))
}

fn read_config_recursive(
    path: &Path,
    doc: &mut IniDocument,
    files: &mut Vec<PathBuf>,
    seen: &mut HashSet<PathBuf>,
) -> Result<()> {
    let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(key) {
        warn!(config = ?path, "config file included more than once; skipping");
        return Ok(());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed = IniDocument::parse(&contents, &path.display().to_string())?;
    let includes = parsed
        .section("include")
        .and_then(|s| s.get("files"))
        .map(|files| include_paths(files, &config_dir(path)))
        .transpose()?
        .unwrap_or_default();

    doc.merge(parsed);
    files.push(path.to_path_buf());

    for include in includes {
        debug!(from = ?path, include = ?include, "following include");
        read_config_recursive(&include, doc, files, seen)?;
    }
    Ok(())
}

/// Expand the whitespace-separated patterns of `[include] files`.
///
/// Relative patterns are resolved against the including file's directory.
/// Only the file-name component may contain glob characters.
fn include_paths(patterns: &str, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();

    for pattern in patterns.split_whitespace() {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            base_dir.join(pattern)
        };

        let dir = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base_dir.to_path_buf());
        let Some(file_pattern) = full.file_name().and_then(|f| f.to_str()) else {
            continue;
        };

        let matcher = Glob::new(file_pattern)
            .map_err(|e| {
                StartupError::config(format!("invalid include pattern '{pattern}': {e}"))
            })?
            .compile_matcher();

        let Ok(entries) = fs::read_dir(&dir) else {
            debug!(dir = ?dir, pattern, "include directory not readable; no matches");
            continue;
        };

        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .map(|name| matcher.is_match(Path::new(name)))
                    .unwrap_or(false)
            })
            .collect();
        matched.sort();
        out.extend(matched);
    }

    Ok(out)
}

/// Map program name -> group name from `[group:g] programs = a,b`.
fn program_groups(doc: &IniDocument) -> BTreeMap<String, String> {
    let mut groups = BTreeMap::new();
    for section in doc.sections() {
        let Some(group) = section.qualifier("group") else {
            continue;
        };
        let Some(programs) = section.get("programs") else {
            warn!(group, "group section has no 'programs' option");
            continue;
        };
        for program in programs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            groups.insert(program.to_string(), group.to_string());
        }
    }
    groups
}

fn parse_program(
    name: &str,
    section: &IniSection,
    groups: &BTreeMap<String, String>,
    common: &Expansions,
) -> ServiceDeclaration {
    let mut decl = ServiceDeclaration::new(name);
    if let Some(group) = groups.get(name) {
        decl.group = group.clone();
    }

    let mut vars = common.clone();
    vars.insert("program_name".to_string(), decl.name.clone());
    vars.insert("group_name".to_string(), decl.group.clone());

    let opts = SectionOptions {
        section,
        vars: &vars,
    };

    decl.priority = opts.parsed("priority", |v| i64::from_str(v).ok());
    decl.autostart = opts.parsed("autostart", parse_bool);
    decl.dependent_startup = opts
        .parsed(DEPENDENT_STARTUP_OPTION, parse_bool)
        .unwrap_or(false);
    decl.inherit_priority = opts
        .parsed(INHERIT_PRIORITY_OPTION, parse_bool)
        .unwrap_or(false);
    decl.numprocs = opts.parsed("numprocs", |v| u32::from_str(v).ok()).unwrap_or(1);
    decl.numprocs_start = opts
        .parsed("numprocs_start", |v| u32::from_str(v).ok())
        .unwrap_or(0);
    decl.process_name = opts.raw("process_name");
    decl.wait_for = opts
        .raw(WAIT_FOR_OPTION)
        .map(|v| WaitForToken::split_all(&v))
        .unwrap_or_default();

    debug!(
        service = %decl.name,
        group = %decl.group,
        dependent_startup = decl.dependent_startup,
        wait_for = ?decl.wait_for,
        "parsed program section"
    );
    decl
}

/// Option access for one section with lenient expansion.
struct SectionOptions<'a> {
    section: &'a IniSection,
    vars: &'a Expansions,
}

impl SectionOptions<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        self.section
            .get(key)
            .map(|v| expand::expand_lenient(v, self.vars))
    }

    /// Parse an option; an unparseable value logs a warning and counts as unset.
    fn parsed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let value = self.raw(key)?;
        match parse(&value) {
            Some(v) => Some(v),
            None => {
                warn!(
                    section = %self.section.name(),
                    option = key,
                    value = %value,
                    "error when parsing option; using default"
                );
                None
            }
        }
    }
}
