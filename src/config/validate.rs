// src/config/validate.rs

use std::collections::HashSet;

use tracing::warn;

use crate::config::model::{RawStartupConfig, ServiceDeclaration, StartupConfig, WaitForToken};
use crate::errors::{Result, StartupError};
use crate::registry::ServiceGraph;
use crate::types::{ErrorAction, ProcessState};

impl TryFrom<RawStartupConfig> for StartupConfig {
    type Error = crate::errors::StartupError;

    fn try_from(raw: RawStartupConfig) -> std::result::Result<Self, Self::Error> {
        let graph = ServiceGraph::build(&raw.declarations)?;
        Ok(StartupConfig::new_unchecked(
            raw.files,
            raw.declarations,
            graph,
        ))
    }
}

/// Apply the `--error-action` policy to the raw declarations.
///
/// With [`ErrorAction::Exit`] only the `autostart` conflict is checked here;
/// unknown parents and bad state tokens are left for the registry, which
/// rejects them. With `Skip`/`Ignore` each offending setting is dropped with
/// a warning so the rest of the graph can still start.
pub fn apply_error_action(raw: &mut RawStartupConfig, action: ErrorAction) -> Result<()> {
    check_autostart(&mut raw.declarations, action)?;

    if action.is_lenient() {
        let known: HashSet<String> = raw.declarations.iter().map(|d| d.name.clone()).collect();
        for decl in raw.declarations.iter_mut().filter(|d| d.dependent_startup) {
            decl.wait_for = lenient_wait_for(decl, &known);
        }
    }
    Ok(())
}

/// A program started by this listener must not also be autostarted by
/// supervisord, so `autostart = false` has to be set explicitly.
fn check_autostart(decls: &mut [ServiceDeclaration], action: ErrorAction) -> Result<()> {
    for decl in decls.iter_mut().filter(|d| d.dependent_startup) {
        if decl.autostart == Some(false) {
            continue;
        }

        let msg = format!(
            "program '{}' has dependent_startup = true but autostart is not set to false",
            decl.name
        );
        if !action.is_lenient() {
            return Err(StartupError::Config(msg));
        }
        warn!(service = %decl.name, "{msg}; disabling dependent startup for this program");
        decl.dependent_startup = false;
    }
    Ok(())
}

fn lenient_wait_for(decl: &ServiceDeclaration, known: &HashSet<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(decl.wait_for.len());

    for raw in &decl.wait_for {
        let mut token = WaitForToken::parse(raw);

        if !known.contains(&token.parent) {
            warn!(
                service = %decl.name,
                parent = %token.parent,
                "dependency on unknown program; ignoring it"
            );
            continue;
        }

        if let Some(states) = token.states.as_mut() {
            states.retain(|s| {
                let valid = s
                    .parse::<ProcessState>()
                    .map(ProcessState::is_valid_wait_state)
                    .unwrap_or(false);
                if !valid {
                    warn!(
                        service = %decl.name,
                        parent = %token.parent,
                        state = %s,
                        "invalid wait state; ignoring it"
                    );
                }
                valid
            });
        }

        kept.push(token.to_string());
    }

    kept
}
