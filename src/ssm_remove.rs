use std::collections::HashSet;
use tracing::{debug, info};

use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_parameters::{ParameterPath, SessionState, MAX_BATCH_SIZE};
use crate::ssm_store::{group_by_region, qualify, ParameterStore};

impl ParameterStore {
    /// Removes parameters, expanding prefixes when `recurse` is set.
    ///
    /// Every target is classified before anything is deleted; a prefix
    /// without `recurse` or a missing target aborts the whole call. The
    /// delete itself is best effort: names the service accepts stay deleted
    /// even when others in the same call are rejected.
    pub fn remove(
        &mut self,
        session: &SessionState,
        paths: &[ParameterPath],
        recurse: bool,
    ) -> SSMResult<()> {
        let mut queued: Vec<ParameterPath> = Vec::new();
        for path in paths {
            let path = qualify(session, path);
            if self.is_parameter(session, &path) {
                queued.push(path);
            } else if self.is_path(session, &path) {
                if !recurse {
                    return Err(SSMError::AmbiguousRecursion(path.name));
                }
                let descendants = self
                    .collect_by_path(session, &path, false, None)?
                    .unwrap_or_default();
                debug!("{} expands to {} parameters", path.name, descendants.len());
                queued.extend(
                    descendants
                        .into_iter()
                        .map(|p| ParameterPath::new(&p.name, &path.region)),
                );
            } else {
                return Err(SSMError::NotFound(path.name));
            }
        }
        // overlapping targets must not send a name twice
        let mut seen = HashSet::new();
        queued.retain(|p| seen.insert(p.clone()));
        self.delete_by_region(session, &queued)
    }

    /// Deletes absolute names region by region in service-sized batches.
    ///
    /// Rejected names from every batch are gathered into one `BatchFailure`.
    pub fn delete_by_region(
        &mut self,
        session: &SessionState,
        paths: &[ParameterPath],
    ) -> SSMResult<()> {
        let mut invalid: Vec<String> = Vec::new();
        for (region, names) in group_by_region(paths) {
            let client = self.client(session, &region)?;
            for batch in names.chunks(MAX_BATCH_SIZE) {
                debug!("Deleting batch of {} in {}", batch.len(), region);
                let output = client.delete_parameters(batch)?;
                info!("Deleted {:?} in {}", output.deleted_parameters, region);
                invalid.extend(output.invalid_parameters);
            }
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(SSMError::BatchFailure(invalid))
        }
    }
}
