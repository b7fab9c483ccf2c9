use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_list::CancelToken;
use crate::ssm_ops::ParameterService;
use crate::ssm_parameters::{
    ParameterPath, SSMHistoryRequest, SSMParameter, SSMParameterRequest, SSMParameterVersion,
    SSMParametersByPathRequest, SSMParametersRequest, SSMParametersResult,
    SSMPutParameterRequest, SessionState, DELIMITER, MAX_BATCH_SIZE,
};
use crate::ssm_path::fqp;
use crate::ssm_registry::ClientRegistry;

/// Filesystem-like view over the flat parameter namespace.
///
/// Holds no session state of its own; every operation receives the session
/// explicitly.
pub struct ParameterStore {
    clients: ClientRegistry,
}

/// Fully qualifies `path` against the session's working directory
pub fn qualify(session: &SessionState, path: &ParameterPath) -> ParameterPath {
    ParameterPath {
        name: fqp(&path.name, &session.cwd),
        region: path.region.clone(),
    }
}

/// Groups names by region, keeping first-seen order inside each region
pub fn group_by_region(paths: &[ParameterPath]) -> BTreeMap<String, Vec<String>> {
    let mut by_region: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for p in paths {
        by_region
            .entry(p.region.clone())
            .or_insert_with(Vec::new)
            .push(p.name.clone());
    }
    by_region
}

impl ParameterStore {
    pub fn new(clients: ClientRegistry) -> Self {
        ParameterStore { clients }
    }

    pub fn client(
        &mut self,
        session: &SessionState,
        region: &str,
    ) -> SSMResult<Rc<dyn ParameterService>> {
        self.clients.get_or_create(region, &session.profile)
    }

    /// True only when the single-key lookup succeeds.
    ///
    /// Lookup failures of any kind (missing, auth, network) read as false.
    pub fn is_parameter(&mut self, session: &SessionState, path: &ParameterPath) -> bool {
        let client = match self.client(session, &path.region) {
            Ok(client) => client,
            Err(err) => {
                debug!("No client for {}: {}", path, err);
                return false;
            }
        };
        let req = SSMParameterRequest {
            name: path.name.clone(),
            with_decryption: Some(false),
        };
        match client.get_parameter(&req) {
            Ok(_) => true,
            Err(SSMError::ParameterNotFound(_)) => false,
            Err(err) => {
                debug!("Treating {} as absent after lookup error: {}", path, err);
                false
            }
        }
    }

    /// True when at least one parameter lives under `path`. Only the first
    /// page is consulted.
    pub fn is_path(&mut self, session: &SessionState, path: &ParameterPath) -> bool {
        let client = match self.client(session, &path.region) {
            Ok(client) => client,
            Err(err) => {
                debug!("No client for {}: {}", path, err);
                return false;
            }
        };
        let req = SSMParametersByPathRequest {
            path: path.name.clone(),
            recursive: Some(true),
            with_decryption: Some(false),
            next_token: None,
        };
        match client.get_parameters_by_path(&req) {
            Ok(page) => !page.parameters.is_empty(),
            Err(err) => {
                debug!("Treating {} as not a path after lookup error: {}", path, err);
                false
            }
        }
    }

    /// Every parameter below `path`, following pagination to the end.
    ///
    /// Returns `None` when `cancel` trips before the last page arrives; the
    /// partial result is dropped.
    pub fn collect_by_path(
        &mut self,
        session: &SessionState,
        path: &ParameterPath,
        with_decryption: bool,
        cancel: Option<&CancelToken>,
    ) -> SSMResult<Option<Vec<SSMParameter>>> {
        let client = self.client(session, &path.region)?;
        let mut req = SSMParametersByPathRequest {
            path: path.name.clone(),
            recursive: Some(true),
            with_decryption: Some(with_decryption),
            next_token: None,
        };
        let mut parameters = Vec::new();
        loop {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                info!("Listing of {} interrupted", path);
                return Ok(None);
            }
            let page = client.get_parameters_by_path(&req)?;
            parameters.extend(page.parameters);
            match page.next_token {
                Some(token) => req.next_token = Some(token),
                None => break,
            }
        }
        debug!("{} parameters under {}", parameters.len(), path);
        Ok(Some(parameters))
    }

    pub fn set_cwd(&mut self, session: &mut SessionState, path: &ParameterPath) -> SSMResult<()> {
        let target = qualify(session, path);
        if target.name == DELIMITER {
            session.cwd = DELIMITER.to_string();
            return Ok(());
        }
        if self.is_path(session, &target) {
            debug!("cwd {} -> {}", session.cwd, target.name);
            session.cwd = target.name;
            Ok(())
        } else {
            Err(SSMError::NotFound(target.name))
        }
    }

    /// Fetches parameters by name, batching per region within the service limit.
    pub fn get(
        &mut self,
        session: &SessionState,
        paths: &[ParameterPath],
    ) -> SSMResult<SSMParametersResult> {
        let qualified: Vec<ParameterPath> = paths.iter().map(|p| qualify(session, p)).collect();
        let mut result = SSMParametersResult::default();
        for (region, names) in group_by_region(&qualified) {
            let client = self.client(session, &region)?;
            for chunk in names.chunks(MAX_BATCH_SIZE) {
                let req = SSMParametersRequest {
                    names: chunk.to_vec(),
                    with_decryption: Some(session.decrypt),
                };
                let output = client.get_parameters(&req)?;
                if !output.invalid_parameters.is_empty() {
                    warn!("Invalid parameters in {}: {:?}", region, output.invalid_parameters);
                }
                result.parameters.extend(output.parameters);
                result.invalid_parameters.extend(output.invalid_parameters);
            }
        }
        Ok(result)
    }

    /// Creates or updates a parameter; relative names resolve against cwd.
    pub fn put(
        &mut self,
        session: &SessionState,
        mut input: SSMPutParameterRequest,
        region: &str,
    ) -> SSMResult<i64> {
        input.name = fqp(&input.name, &session.cwd);
        let client = self.client(session, region)?;
        let version = client.put_parameter(&input)?;
        info!("Put {} version {} in {}", input.name, version, region);
        Ok(version)
    }

    /// Full history of a parameter, oldest first.
    pub fn get_history(
        &mut self,
        session: &SessionState,
        path: &ParameterPath,
        with_decryption: bool,
    ) -> SSMResult<Vec<SSMParameterVersion>> {
        let path = qualify(session, path);
        let client = self.client(session, &path.region)?;
        let mut req = SSMHistoryRequest {
            name: path.name.clone(),
            with_decryption: Some(with_decryption),
            next_token: None,
        };
        let mut versions = Vec::new();
        loop {
            let page = client.get_parameter_history(&req)?;
            versions.extend(page.versions);
            match page.next_token {
                Some(token) => req.next_token = Some(token),
                None => break,
            }
        }
        Ok(versions)
    }
}
