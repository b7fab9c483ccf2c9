use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_parameters::{ParameterPath, SSMPutParameterRequest, SessionState, DELIMITER};
use crate::ssm_path::{basename, clean};
use crate::ssm_store::{qualify, ParameterStore};

/// Maps every source name under `src` to its destination under `dst`.
///
/// With `new_path` the part below `src` lands directly under `dst`
/// (`/House/Stark/X` -> `/House/Targaryen/X`); otherwise the base name of
/// `src` is kept (`/House/Stark/X` -> `/House/Targaryen/Stark/X`).
pub fn parameter_map(
    names: &[String],
    new_path: bool,
    src: &ParameterPath,
    dst: &ParameterPath,
) -> BTreeMap<ParameterPath, ParameterPath> {
    let src_base = basename(&src.name);
    let mut source_to_dst = BTreeMap::new();
    for name in names {
        let suffix = if src.name == DELIMITER {
            name.trim_start_matches(DELIMITER)
        } else {
            match name
                .strip_prefix(src.name.as_str())
                .and_then(|r| r.strip_prefix(DELIMITER))
            {
                Some(suffix) => suffix,
                None => continue,
            }
        };
        let joined = if new_path {
            format!("{}{}{}", dst.name, DELIMITER, suffix)
        } else {
            format!("{}{}{}{}{}", dst.name, DELIMITER, src_base, DELIMITER, suffix)
        };
        source_to_dst.insert(
            ParameterPath::new(name, &src.region),
            ParameterPath::new(&clean(&joined), &dst.region),
        );
    }
    source_to_dst
}

/// What a copy resolves to once both ends are classified.
#[derive(Debug, PartialEq)]
enum CopyPlan {
    /// Single parameter written to the final name in `dst`
    Parameter { src: ParameterPath, dst: ParameterPath },
    /// Every parameter under `src` mapped below `dst`
    Tree {
        new_path: bool,
        src: ParameterPath,
        dst: ParameterPath,
    },
}

impl CopyPlan {
    fn source(&self) -> &ParameterPath {
        match self {
            CopyPlan::Parameter { src, .. } | CopyPlan::Tree { src, .. } => src,
        }
    }

    /// Name or prefix the copy writes to.
    fn target(&self) -> ParameterPath {
        match self {
            CopyPlan::Parameter { src, dst } if dst.name == DELIMITER => {
                ParameterPath::new(&src.name, &dst.region)
            }
            CopyPlan::Parameter { dst, .. } => dst.clone(),
            CopyPlan::Tree { new_path: true, dst, .. } => dst.clone(),
            CopyPlan::Tree { src, dst, .. } => ParameterPath::new(
                &clean(&format!("{}{}{}", dst.name, DELIMITER, basename(&src.name))),
                &dst.region,
            ),
        }
    }

    /// True when the target is the source or lies below it.
    fn overlaps(&self) -> bool {
        let src = self.source();
        let target = self.target();
        if src.region != target.region {
            return false;
        }
        src.name == DELIMITER
            || target.name == src.name
            || target
                .name
                .strip_prefix(src.name.as_str())
                .map_or(false, |rest| rest.starts_with(DELIMITER))
    }
}

impl ParameterStore {
    /// Copies a parameter or, with `recurse`, a whole prefix.
    ///
    /// Values are always read decrypted so SecureStrings survive the trip.
    /// A tree copy that fails partway leaves the copies already made.
    pub fn copy(
        &mut self,
        session: &SessionState,
        src: &ParameterPath,
        dst: &ParameterPath,
        recurse: bool,
    ) -> SSMResult<()> {
        let plan = self.plan_copy(session, src, dst, recurse)?;
        self.run_copy(session, plan)
    }

    fn plan_copy(
        &mut self,
        session: &SessionState,
        src: &ParameterPath,
        dst: &ParameterPath,
        recurse: bool,
    ) -> SSMResult<CopyPlan> {
        let src = qualify(session, src);
        let dst = qualify(session, dst);

        let src_is_parameter = self.is_parameter(session, &src);
        let src_is_path = !src_is_parameter && self.is_path(session, &src);
        let dst_is_parameter = self.is_parameter(session, &dst);
        let dst_is_path = !dst_is_parameter && self.is_path(session, &dst);
        debug!(
            "copy {} (parameter: {}, path: {}) -> {} (parameter: {}, path: {})",
            src, src_is_parameter, src_is_path, dst, dst_is_parameter, dst_is_path
        );

        if src_is_parameter {
            if dst_is_path {
                let nested = clean(&format!("{}{}{}", dst.name, DELIMITER, basename(&src.name)));
                let dst = ParameterPath::new(&nested, &dst.region);
                return Ok(CopyPlan::Parameter { src, dst });
            }
            return Ok(CopyPlan::Parameter { src, dst });
        }
        if src_is_path {
            if dst_is_parameter {
                return Err(SSMError::InvalidClassification {
                    src: src.name,
                    dst: dst.name,
                });
            }
            if !recurse {
                return Err(SSMError::AmbiguousRecursion(src.name));
            }
            return Ok(CopyPlan::Tree {
                new_path: !dst_is_path,
                src,
                dst,
            });
        }
        Err(SSMError::NotFound(src.name))
    }

    fn run_copy(&mut self, session: &SessionState, plan: CopyPlan) -> SSMResult<()> {
        match plan {
            CopyPlan::Parameter { src, dst } => self.copy_parameter(session, &src, &dst),
            CopyPlan::Tree { new_path, src, dst } => {
                self.copy_path_to_path(session, new_path, &src, &dst)
            }
        }
    }

    /// Writes the latest version of `src` to `dst`, overwriting.
    ///
    /// Copying onto the root keeps the source name, which is how a
    /// parameter is copied between regions unchanged.
    pub fn copy_parameter(
        &mut self,
        session: &SessionState,
        src: &ParameterPath,
        dst: &ParameterPath,
    ) -> SSMResult<()> {
        let history = self.get_history(session, src, true)?;
        let latest = history
            .last()
            .ok_or_else(|| SSMError::ParameterNotFound(src.name.clone()))?;
        let name = if dst.name == DELIMITER {
            src.name.clone()
        } else {
            dst.name.clone()
        };
        let input = SSMPutParameterRequest {
            name,
            p_type: latest.p_type,
            value: latest.value.clone(),
            key_id: latest.key_id.clone(),
            description: latest.description.clone(),
            allowed_pattern: latest.allowed_pattern.clone(),
            overwrite: true,
            tier: latest.tier.clone(),
            policies: latest.policies_document(),
        };
        self.put(session, input, &dst.region)?;
        Ok(())
    }

    fn copy_path_to_path(
        &mut self,
        session: &SessionState,
        new_path: bool,
        src: &ParameterPath,
        dst: &ParameterPath,
    ) -> SSMResult<()> {
        let names: Vec<String> = self
            .collect_by_path(session, src, false, None)?
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.name)
            .collect();
        let mapping = parameter_map(&names, new_path, src, dst);
        info!("Copying {} parameters from {} to {}", mapping.len(), src, dst);
        for (from, to) in &mapping {
            self.copy_parameter(session, from, to)?;
        }
        Ok(())
    }

    /// Copy followed by a recursive remove of the source. Not atomic: if the
    /// remove fails both copies remain.
    ///
    /// A target equal to the source or inside it is refused before anything
    /// is written, since the remove would take the copies with it.
    pub fn move_path(
        &mut self,
        session: &SessionState,
        src: &ParameterPath,
        dst: &ParameterPath,
    ) -> SSMResult<()> {
        let plan = self.plan_copy(session, src, dst, true)?;
        if plan.overlaps() {
            let target = plan.target();
            return Err(SSMError::InvalidInput(format!(
                "Cannot move {} into itself ({})",
                plan.source(),
                target
            )));
        }
        let source = plan.source().clone();
        self.run_copy(session, plan)?;
        self.remove(session, &[source], true)
    }
}
