//! In-memory stand-in for the remote parameter service.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_list::CancelToken;
use crate::ssm_ops::ParameterService;
use crate::ssm_parameters::{
    ParameterType, SSMDeleteResult, SSMHistoryPage, SSMHistoryRequest, SSMParameter,
    SSMParameterRequest, SSMParameterVersion, SSMParametersByPathRequest, SSMParametersPage,
    SSMParametersRequest, SSMParametersResult, SSMPutParameterRequest, MAX_BATCH_SIZE,
};
use crate::ssm_registry::ClientRegistry;
use crate::ssm_store::ParameterStore;

pub const REGION: &str = "us-east-1";

pub struct MockSSM {
    params: RefCell<BTreeMap<String, Vec<SSMParameterVersion>>>,
    page_size: Cell<usize>,
    by_path_calls: Cell<usize>,
    delete_batches: RefCell<Vec<Vec<String>>>,
    cancel_on_call: RefCell<Option<(usize, CancelToken)>>,
    broken: Cell<bool>,
}

impl MockSSM {
    pub fn new() -> Self {
        MockSSM {
            params: RefCell::new(BTreeMap::new()),
            page_size: Cell::new(10),
            by_path_calls: Cell::new(0),
            delete_batches: RefCell::new(Vec::new()),
            cancel_on_call: RefCell::new(None),
            broken: Cell::new(false),
        }
    }

    /// String parameters whose value is their own name
    pub fn with_names(names: &[&str]) -> Self {
        let mock = MockSSM::new();
        for name in names {
            mock.insert(name, ParameterType::String, name, None);
        }
        mock
    }

    pub fn set_page_size(&self, size: usize) {
        self.page_size.set(size);
    }

    /// Trip `token` while serving the `call`-th GetParametersByPath (1-based)
    pub fn cancel_on_call(&self, call: usize, token: CancelToken) {
        *self.cancel_on_call.borrow_mut() = Some((call, token));
    }

    /// Every call fails as if the service were unreachable
    pub fn break_service(&self) {
        self.broken.set(true);
    }

    pub fn insert(&self, name: &str, p_type: ParameterType, value: &str, description: Option<&str>) {
        let mut params = self.params.borrow_mut();
        let history = params.entry(name.to_string()).or_insert_with(Vec::new);
        history.push(SSMParameterVersion {
            name: name.to_string(),
            p_type,
            value: value.to_string(),
            version: history.len() as i64 + 1,
            description: description.map(str::to_string),
            key_id: None,
            allowed_pattern: None,
            tier: None,
            policies: vec![],
            labels: vec![],
            last_modified: None,
            last_modified_user: None,
        });
    }

    pub fn insert_version(&self, version: SSMParameterVersion) {
        self.params
            .borrow_mut()
            .entry(version.name.clone())
            .or_insert_with(Vec::new)
            .push(version);
    }

    pub fn latest(&self, name: &str) -> Option<SSMParameterVersion> {
        self.params.borrow().get(name).and_then(|h| h.last().cloned())
    }

    pub fn names(&self) -> Vec<String> {
        self.params.borrow().keys().cloned().collect()
    }

    pub fn by_path_calls(&self) -> usize {
        self.by_path_calls.get()
    }

    pub fn delete_batches(&self) -> Vec<Vec<String>> {
        self.delete_batches.borrow().clone()
    }

    fn check(&self, operation: &'static str) -> SSMResult<()> {
        if self.broken.get() {
            Err(SSMError::upstream(operation, "UnrecognizedClientException: invalid token"))
        } else {
            Ok(())
        }
    }

    fn shown(version: &SSMParameterVersion, with_decryption: Option<bool>) -> String {
        if version.p_type == ParameterType::SecureString && with_decryption != Some(true) {
            format!("kms:{}", version.value)
        } else {
            version.value.clone()
        }
    }

    fn to_parameter(version: &SSMParameterVersion, with_decryption: Option<bool>) -> SSMParameter {
        SSMParameter {
            name: version.name.clone(),
            p_type: version.p_type,
            value: MockSSM::shown(version, with_decryption),
            version: version.version,
            last_modified: version.last_modified,
        }
    }

    fn page_bounds(&self, token: &Option<String>, total: usize) -> (usize, usize, Option<String>) {
        let start = token.as_ref().map(|t| t.parse::<usize>().unwrap()).unwrap_or(0);
        let end = (start + self.page_size.get()).min(total);
        let next = if end < total { Some(end.to_string()) } else { None };
        (start, end, next)
    }
}

/// Top-level names come back without the leading delimiter, as the service does
fn under_path(name: &str, path: &str, recursive: bool) -> bool {
    let rest = if path == "/" {
        name.trim_start_matches('/')
    } else {
        match name.strip_prefix(path) {
            Some(rest) if rest.starts_with('/') => &rest[1..],
            _ => return false,
        }
    };
    !rest.is_empty() && (recursive || !rest.contains('/'))
}

impl ParameterService for MockSSM {
    fn get_parameter(&self, req: &SSMParameterRequest) -> SSMResult<SSMParameter> {
        self.check("GetParameter")?;
        self.latest(&req.name)
            .map(|v| MockSSM::to_parameter(&v, req.with_decryption))
            .ok_or_else(|| SSMError::ParameterNotFound(req.name.clone()))
    }

    fn get_parameters(&self, req: &SSMParametersRequest) -> SSMResult<SSMParametersResult> {
        self.check("GetParameters")?;
        assert!(req.names.len() <= MAX_BATCH_SIZE);
        let mut result = SSMParametersResult::default();
        for name in &req.names {
            match self.latest(name) {
                Some(v) => result.parameters.push(MockSSM::to_parameter(&v, req.with_decryption)),
                None => result.invalid_parameters.push(name.clone()),
            }
        }
        Ok(result)
    }

    fn get_parameters_by_path(
        &self,
        req: &SSMParametersByPathRequest,
    ) -> SSMResult<SSMParametersPage> {
        self.check("GetParametersByPath")?;
        let call = self.by_path_calls.get() + 1;
        self.by_path_calls.set(call);
        if let Some((at, token)) = self.cancel_on_call.borrow().as_ref() {
            if *at == call {
                token.cancel();
            }
        }
        let matching: Vec<SSMParameter> = self
            .params
            .borrow()
            .iter()
            .filter(|(name, _)| under_path(name, &req.path, req.recursive == Some(true)))
            .filter_map(|(_, history)| history.last())
            .map(|v| MockSSM::to_parameter(v, req.with_decryption))
            .collect();
        let (start, end, next_token) = self.page_bounds(&req.next_token, matching.len());
        Ok(SSMParametersPage {
            parameters: matching[start..end].to_vec(),
            next_token,
        })
    }

    fn get_parameter_history(&self, req: &SSMHistoryRequest) -> SSMResult<SSMHistoryPage> {
        self.check("GetParameterHistory")?;
        let history = self
            .params
            .borrow()
            .get(&req.name)
            .cloned()
            .ok_or_else(|| SSMError::ParameterNotFound(req.name.clone()))?;
        let (start, end, next_token) = self.page_bounds(&req.next_token, history.len());
        Ok(SSMHistoryPage {
            versions: history[start..end]
                .iter()
                .map(|v| SSMParameterVersion {
                    value: MockSSM::shown(v, req.with_decryption),
                    ..v.clone()
                })
                .collect(),
            next_token,
        })
    }

    fn put_parameter(&self, req: &SSMPutParameterRequest) -> SSMResult<i64> {
        self.check("PutParameter")?;
        let mut params = self.params.borrow_mut();
        let history = params.entry(req.name.clone()).or_insert_with(Vec::new);
        if !history.is_empty() && !req.overwrite {
            return Err(SSMError::upstream(
                "PutParameter",
                "ParameterAlreadyExists: The parameter already exists.",
            ));
        }
        let version = history.len() as i64 + 1;
        history.push(SSMParameterVersion {
            name: req.name.clone(),
            p_type: req.p_type,
            value: req.value.clone(),
            version,
            description: req.description.clone(),
            key_id: req.key_id.clone(),
            allowed_pattern: req.allowed_pattern.clone(),
            tier: req.tier.clone(),
            policies: req
                .policies
                .iter()
                .map(|p| p.trim_start_matches('[').trim_end_matches(']').to_string())
                .collect(),
            labels: vec![],
            last_modified: None,
            last_modified_user: None,
        });
        Ok(version)
    }

    fn delete_parameters(&self, names: &[String]) -> SSMResult<SSMDeleteResult> {
        self.check("DeleteParameters")?;
        assert!(names.len() <= MAX_BATCH_SIZE);
        self.delete_batches.borrow_mut().push(names.to_vec());
        let mut result = SSMDeleteResult::default();
        let mut params = self.params.borrow_mut();
        for name in names {
            if params.remove(name).is_some() {
                result.deleted_parameters.push(name.clone());
            } else {
                result.invalid_parameters.push(name.clone());
            }
        }
        Ok(result)
    }
}

/// Store whose clients resolve to the given per-region mocks
pub fn store_with_regions(mocks: Vec<(&str, Rc<MockSSM>)>) -> ParameterStore {
    let by_region: HashMap<String, Rc<MockSSM>> = mocks
        .into_iter()
        .map(|(region, mock)| (region.to_string(), mock))
        .collect();
    ParameterStore::new(ClientRegistry::new(Box::new(
        move |region: &str, _: &str| -> SSMResult<Rc<dyn ParameterService>> {
            match by_region.get(region) {
                Some(mock) => Ok(Rc::clone(mock) as Rc<dyn ParameterService>),
                None => Err(SSMError::InvalidInput(format!("Unknown region {}", region))),
            }
        },
    )))
}

pub fn store_with(mock: &Rc<MockSSM>) -> ParameterStore {
    store_with_regions(vec![(REGION, Rc::clone(mock))])
}
