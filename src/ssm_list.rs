use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::ssm_errors::SSMResult;
use crate::ssm_parameters::{ListResult, ParameterPath, SessionState, DELIMITER};
use crate::ssm_store::{qualify, ParameterStore};

/// Interrupt flag shared with the signal handler. Listings check it before
/// every page request.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Clears any earlier interrupt and marks a listing as in flight
    pub fn arm(&self) {
        self.reset();
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Delivers an interrupt. Returns false when no listing is in flight.
    pub fn interrupt(&self) -> bool {
        if self.armed.load(Ordering::SeqCst) {
            self.cancel();
            true
        } else {
            false
        }
    }
}

/// Reduces full descendant names to the first level below `relative`.
///
/// Containers get a trailing delimiter. Output keeps first-seen order and
/// holds no duplicates.
pub fn cull(paths: &[String], relative: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut culled = Vec::new();
    for p in paths {
        let rest = if relative == DELIMITER {
            // top-level names come back from the service without the delimiter
            p.strip_prefix(DELIMITER).unwrap_or(p.as_str())
        } else {
            match p
                .strip_prefix(relative)
                .and_then(|r| r.strip_prefix(DELIMITER))
            {
                Some(rest) => rest,
                None => continue,
            }
        };
        if rest.is_empty() {
            continue;
        }
        let entry = match rest.find(DELIMITER) {
            Some(idx) => format!("{}{}", &rest[..idx], DELIMITER),
            None => rest.to_string(),
        };
        if seen.insert(entry.clone()) {
            culled.push(entry);
        }
    }
    culled
}

impl ParameterStore {
    /// Lists what lives under `path`, one level deep unless `recurse`.
    ///
    /// A path that is itself a parameter shows up under its full name next
    /// to its children. An interrupted listing yields `ListResult::Cancelled`
    /// rather than an error. No ordering is promised.
    pub fn list(
        &mut self,
        session: &SessionState,
        path: &ParameterPath,
        recurse: bool,
        cancel: &CancelToken,
    ) -> SSMResult<ListResult> {
        let path = qualify(session, path);
        let parameters =
            match self.collect_by_path(session, &path, session.decrypt, Some(cancel))? {
                Some(parameters) => parameters,
                None => return Ok(ListResult::Cancelled),
            };
        let names: Vec<String> = parameters.into_iter().map(|p| p.name).collect();
        let mut results = if recurse {
            names
        } else {
            cull(&names, &path.name)
        };

        if self.is_parameter(session, &path) {
            debug!("{} is also a parameter", path.name);
            results.push(path.name.clone());
        }
        Ok(ListResult::Complete(results))
    }
}
