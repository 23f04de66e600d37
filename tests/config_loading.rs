// tests/config_loading.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use dependent_startup::config::expand::{Expansions, expand, expand_lenient};
use dependent_startup::config::ini::IniDocument;
use dependent_startup::config::loader::{parse_bool, search_for_config_file};
use dependent_startup::config::{load_and_validate, load_from_path, resolve_config_path};
use dependent_startup::errors::StartupError;
use dependent_startup::group::StartTarget;
use dependent_startup::types::{ErrorAction, ProcessState};

const SLURM_CONF: &str = r#"
[supervisord]
nodaemon = true

[program:consul]
command = consul agent
autostart = false
dependent_startup = true
priority = 5

[program:slurmd]
command = /usr/sbin/slurmd -D
autostart = false
dependent_startup = true
dependent_startup_wait_for = consul:running munge:running,starting ; inline comment
dependent_startup_inherit_priority = true

[program:munge]
command = munged
autostart = true
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_programs_dependencies_and_priorities() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "supervisord.conf", SLURM_CONF);

    let cfg = load_and_validate(&path, ErrorAction::Exit).unwrap();
    let graph = cfg.graph();

    let names: Vec<&str> = graph.services().map(|s| s.name()).collect();
    assert_eq!(names, vec!["consul", "slurmd", "munge"]);

    let munge = graph.service_by_name("munge").unwrap();
    assert!(!munge.is_managed());

    let slurmd = graph.service_by_name("slurmd").unwrap();
    assert!(slurmd.is_managed());
    assert_eq!(slurmd.edges().len(), 2);
    assert_eq!(
        slurmd.edges()[1].allowed,
        BTreeSet::from([ProcessState::Starting, ProcessState::Running])
    );
    // min(consul = 5, munge = 999)
    assert_eq!(slurmd.effective_priority(), 5);
    assert_eq!(cfg.files(), &[path]);
}

#[test]
fn autostart_must_be_false_for_dependent_startup() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        "[program:a]\ncommand = a\ndependent_startup = true\n",
    );

    match load_and_validate(&path, ErrorAction::Exit) {
        Err(StartupError::Config(msg)) => assert!(msg.contains("autostart")),
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    // Lenient: the program is simply not managed.
    let cfg = load_and_validate(&path, ErrorAction::Skip).unwrap();
    assert!(!cfg.graph().service_by_name("a").unwrap().is_managed());
}

#[test]
fn lenient_error_action_drops_bad_dependencies() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        r#"
[program:a]
command = a
autostart = false
dependent_startup = true

[program:b]
command = b
autostart = false
dependent_startup = true
dependent_startup_wait_for = ghost:running a:bogus,exited
"#,
    );

    let err = load_and_validate(&path, ErrorAction::Exit).unwrap_err();
    assert!(err.is_config_error());

    let cfg = load_and_validate(&path, ErrorAction::Ignore).unwrap();
    let b = cfg.graph().service_by_name("b").unwrap();
    assert_eq!(b.edges().len(), 1);
    assert_eq!(b.edges()[0].parent, "a");
    assert_eq!(b.edges()[0].allowed, BTreeSet::from([ProcessState::Exited]));
}

#[test]
fn cycle_in_file_is_a_dependency_cycle_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        r#"
[program:a]
autostart = false
dependent_startup = true
dependent_startup_wait_for = b

[program:b]
autostart = false
dependent_startup = true
dependent_startup_wait_for = a
"#,
    );

    let err = load_and_validate(&path, ErrorAction::Skip).unwrap_err();
    assert!(matches!(err, StartupError::DependencyCycle(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn includes_are_followed_relative_to_the_including_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        "[include]\nfiles = conf.d/*.conf\n\n[program:base]\ncommand = base\n",
    );
    write(
        dir.path(),
        "conf.d/10-app.conf",
        "[program:app]\ncommand = app\nautostart = false\ndependent_startup = true\ndependent_startup_wait_for = base\n",
    );
    write(dir.path(), "conf.d/ignored.ini", "[program:nope]\ncommand = nope\n");

    let raw = load_from_path(&path).unwrap();
    let names: Vec<&str> = raw.declarations.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["base", "app"]);
    assert_eq!(raw.files.len(), 2);
}

#[test]
fn include_loops_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        "[include]\nfiles = other.conf\n\n[program:a]\ncommand = a\n",
    );
    write(
        dir.path(),
        "other.conf",
        "[include]\nfiles = supervisord.conf\n\n[program:b]\ncommand = b\n",
    );

    let raw = load_from_path(&path).unwrap();
    assert_eq!(raw.declarations.len(), 2);
}

#[test]
fn group_sections_assign_groups_and_start_targets() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        r#"
[group:backend]
programs = api, cache

[program:api]
command = api
autostart = false
dependent_startup = true
dependent_startup_wait_for = cache

[program:cache]
command = cache
"#,
    );

    let cfg = load_and_validate(&path, ErrorAction::Exit).unwrap();
    let api = cfg.graph().service_by_name("api").unwrap();
    assert_eq!(api.group(), "backend");
    assert_eq!(
        api.start_target(),
        &StartTarget::Process("backend:api".to_string())
    );
}

#[test]
fn process_name_is_expanded_per_instance() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        r#"
[program:worker]
command = worker --id %(process_num)d
process_name = %(program_name)s_%(process_num)02d
numprocs = 2
numprocs_start = 1
autostart = false
dependent_startup = true
"#,
    );

    let cfg = load_and_validate(&path, ErrorAction::Exit).unwrap();
    let worker = cfg.graph().service_by_name("worker").unwrap();
    let members: Vec<String> = worker.members().iter().map(|m| m.to_string()).collect();
    assert_eq!(members, vec!["worker:worker_01", "worker:worker_02"]);
    assert_eq!(
        worker.start_target(),
        &StartTarget::Group("worker".to_string())
    );
}

#[test]
fn unparseable_values_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "supervisord.conf",
        "[program:a]\npriority = high\nautostart = maybe\ndependent_startup = false\n",
    );

    let raw = load_from_path(&path).unwrap();
    let a = &raw.declarations[0];
    assert_eq!(a.priority, None);
    assert_eq!(a.autostart, None);
    assert!(!a.dependent_startup);
}

#[test]
fn config_path_resolution_errors() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.conf");

    let err = resolve_config_path(Some(&missing), "supervisord.conf").unwrap_err();
    assert!(matches!(err, StartupError::ConfigMissing(_)));
    assert_eq!(err.exit_code(), 2);

    assert_eq!(StartupError::ConfigNotFound.exit_code(), 4);
}

#[test]
fn search_returns_first_existing_candidate() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let found = write(second.path(), "custom.conf", "[supervisord]\n");

    let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
    assert_eq!(search_for_config_file(&paths, "custom.conf"), Some(found));
    assert_eq!(search_for_config_file(&paths, "absent.conf"), None);
}

#[test]
fn parse_bool_accepts_supervisord_spellings() {
    for v in ["true", "Yes", "on", "1"] {
        assert_eq!(parse_bool(v), Some(true), "{v}");
    }
    for v in ["false", "NO", "off", "0"] {
        assert_eq!(parse_bool(v), Some(false), "{v}");
    }
    assert_eq!(parse_bool("maybe"), None);
}

#[test]
fn ini_handles_comments_continuations_and_colons() {
    let doc = IniDocument::parse(
        "; leading comment\n[program:a]\ncommand: run --flag\nwait = b:running\n  c:exited\n# hash comment\nKey = Value ; trailing\n",
        "test.conf",
    )
    .unwrap();

    let section = doc.section("program:a").unwrap();
    assert_eq!(section.qualifier("program"), Some("a"));
    assert_eq!(section.get("command"), Some("run --flag"));
    assert_eq!(section.get("wait"), Some("b:running\nc:exited"));
    assert_eq!(section.get("key"), Some("Value"));
}

#[test]
fn ini_rejects_option_outside_section() {
    let err = IniDocument::parse("command = x\n", "bad.conf").unwrap_err();
    assert!(err.to_string().contains("bad.conf:1"));
}

#[test]
fn expansion_formats_strings_and_padded_numbers() {
    let mut vars = Expansions::new();
    vars.insert("program_name".to_string(), "web".to_string());
    vars.insert("process_num".to_string(), "7".to_string());

    assert_eq!(
        expand("%(program_name)s-%(process_num)03d 100%%", &vars).unwrap(),
        "web-007 100%"
    );
    assert!(expand("%(missing)s", &vars).is_err());
    assert_eq!(
        expand_lenient("%(program_name)s_%(unbound)d", &vars),
        "web_%(unbound)d"
    );
}
