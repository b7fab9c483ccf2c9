use rusoto_core::credential::{ChainProvider, ProfileProvider};
use rusoto_core::{HttpClient, Region, RusotoError};
use rusoto_ssm::{
    DeleteParametersRequest, GetParameterError, GetParameterHistoryRequest, GetParameterRequest,
    GetParametersByPathRequest, GetParametersRequest, Parameter, ParameterHistory,
    PutParameterRequest, Ssm, SsmClient,
};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_parameters::{
    ParameterType, SSMDeleteResult, SSMHistoryPage, SSMHistoryRequest, SSMParameter,
    SSMParameterRequest, SSMParameterVersion, SSMParametersByPathRequest, SSMParametersPage,
    SSMParametersRequest, SSMParametersResult, SSMPutParameterRequest,
};

/// The remote parameter service, one call per method.
///
/// Pagination is the caller's business: paged methods return a single page
/// plus the token for the next one.
pub trait ParameterService {
    fn get_parameter(&self, req: &SSMParameterRequest) -> SSMResult<SSMParameter>;

    fn get_parameters(&self, req: &SSMParametersRequest) -> SSMResult<SSMParametersResult>;

    fn get_parameters_by_path(
        &self,
        req: &SSMParametersByPathRequest,
    ) -> SSMResult<SSMParametersPage>;

    fn get_parameter_history(&self, req: &SSMHistoryRequest) -> SSMResult<SSMHistoryPage>;

    /// Returns the version the service assigned
    fn put_parameter(&self, req: &SSMPutParameterRequest) -> SSMResult<i64>;

    /// At most `MAX_BATCH_SIZE` names per call
    fn delete_parameters(&self, names: &[String]) -> SSMResult<SSMDeleteResult>;
}

pub struct SSMOps {
    region: String,
    profile: String,
    ssm_client: SsmClient,
}

impl fmt::Debug for SSMOps {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{ region: {}, profile: {} }}", self.region, self.profile)
    }
}

impl SSMOps {
    pub fn new(region: &str, profile: &str) -> SSMResult<Self> {
        let parsed = region
            .parse::<Region>()
            .map_err(|_| SSMError::InvalidInput(format!("Unknown region {}", region)))?;
        let mut profile_provider =
            ProfileProvider::new().map_err(|e| SSMError::upstream("ProfileProvider", e))?;
        profile_provider.set_profile(profile);
        let dispatcher = HttpClient::new().map_err(|e| SSMError::upstream("HttpClient", e))?;
        debug!("Creating SSM client for region {} with profile {}", region, profile);
        Ok(SSMOps {
            region: region.to_string(),
            profile: profile.to_string(),
            ssm_client: SsmClient::new_with(
                dispatcher,
                ChainProvider::with_profile_provider(profile_provider),
                parsed,
            ),
        })
    }

    /// Client factory handed to the registry
    pub fn connect(region: &str, profile: &str) -> SSMResult<Rc<dyn ParameterService>> {
        Ok(Rc::new(SSMOps::new(region, profile)?))
    }
}

fn parameter_type(raw: Option<String>) -> SSMResult<ParameterType> {
    raw.unwrap_or_default().parse()
}

fn to_parameter(p: Parameter) -> SSMResult<SSMParameter> {
    Ok(SSMParameter {
        name: p.name.unwrap_or_default(),
        p_type: parameter_type(p.type_)?,
        value: p.value.unwrap_or_default(),
        version: p.version.unwrap_or_default(),
        last_modified: p.last_modified_date,
    })
}

fn to_version(h: ParameterHistory) -> SSMResult<SSMParameterVersion> {
    Ok(SSMParameterVersion {
        name: h.name.unwrap_or_default(),
        p_type: parameter_type(h.type_)?,
        value: h.value.unwrap_or_default(),
        version: h.version.unwrap_or_default(),
        description: h.description,
        key_id: h.key_id,
        allowed_pattern: h.allowed_pattern,
        tier: h.tier,
        policies: h
            .policies
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.policy_text)
            .collect(),
        labels: h.labels.unwrap_or_default(),
        last_modified: h.last_modified_date,
        last_modified_user: h.last_modified_user,
    })
}

impl ParameterService for SSMOps {
    fn get_parameter(&self, req: &SSMParameterRequest) -> SSMResult<SSMParameter> {
        trace!("GetParameter {}", req.name);
        let input = GetParameterRequest {
            name: req.name.clone(),
            with_decryption: req.with_decryption,
        };
        match self.ssm_client.get_parameter(input).sync() {
            Ok(output) => match output.parameter {
                Some(p) => to_parameter(p),
                None => Err(SSMError::ParameterNotFound(req.name.clone())),
            },
            Err(RusotoError::Service(GetParameterError::ParameterNotFound(_))) => {
                Err(SSMError::ParameterNotFound(req.name.clone()))
            }
            Err(err) => Err(SSMError::upstream("GetParameter", err)),
        }
    }

    fn get_parameters(&self, req: &SSMParametersRequest) -> SSMResult<SSMParametersResult> {
        trace!("GetParameters {:?}", req.names);
        let input = GetParametersRequest {
            names: req.names.clone(),
            with_decryption: req.with_decryption,
        };
        let output = self
            .ssm_client
            .get_parameters(input)
            .sync()
            .map_err(|err| SSMError::upstream("GetParameters", err))?;
        let parameters = output
            .parameters
            .unwrap_or_default()
            .into_iter()
            .map(to_parameter)
            .collect::<SSMResult<Vec<_>>>()?;
        Ok(SSMParametersResult {
            parameters,
            invalid_parameters: output.invalid_parameters.unwrap_or_default(),
        })
    }

    fn get_parameters_by_path(
        &self,
        req: &SSMParametersByPathRequest,
    ) -> SSMResult<SSMParametersPage> {
        trace!("GetParametersByPath {} token {:?}", req.path, req.next_token);
        let input = GetParametersByPathRequest {
            path: req.path.clone(),
            recursive: req.recursive,
            with_decryption: req.with_decryption,
            next_token: req.next_token.clone(),
            ..Default::default()
        };
        let output = self
            .ssm_client
            .get_parameters_by_path(input)
            .sync()
            .map_err(|err| SSMError::upstream("GetParametersByPath", err))?;
        Ok(SSMParametersPage {
            parameters: output
                .parameters
                .unwrap_or_default()
                .into_iter()
                .map(to_parameter)
                .collect::<SSMResult<Vec<_>>>()?,
            next_token: output.next_token.filter(|t| !t.is_empty()),
        })
    }

    fn get_parameter_history(&self, req: &SSMHistoryRequest) -> SSMResult<SSMHistoryPage> {
        trace!("GetParameterHistory {} token {:?}", req.name, req.next_token);
        let input = GetParameterHistoryRequest {
            name: req.name.clone(),
            with_decryption: req.with_decryption,
            next_token: req.next_token.clone(),
            ..Default::default()
        };
        let output = self
            .ssm_client
            .get_parameter_history(input)
            .sync()
            .map_err(|err| SSMError::upstream("GetParameterHistory", err))?;
        Ok(SSMHistoryPage {
            versions: output
                .parameters
                .unwrap_or_default()
                .into_iter()
                .map(to_version)
                .collect::<SSMResult<Vec<_>>>()?,
            next_token: output.next_token.filter(|t| !t.is_empty()),
        })
    }

    fn put_parameter(&self, req: &SSMPutParameterRequest) -> SSMResult<i64> {
        trace!("PutParameter {}", req.name);
        let input = PutParameterRequest {
            name: req.name.clone(),
            type_: req.p_type.as_str().to_string(),
            value: req.value.clone(),
            key_id: req.key_id.clone(),
            description: req.description.clone(),
            allowed_pattern: req.allowed_pattern.clone(),
            overwrite: Some(req.overwrite),
            tier: req.tier.clone(),
            policies: req.policies.clone(),
            ..Default::default()
        };
        let output = self
            .ssm_client
            .put_parameter(input)
            .sync()
            .map_err(|err| SSMError::upstream("PutParameter", err))?;
        Ok(output.version.unwrap_or_default())
    }

    fn delete_parameters(&self, names: &[String]) -> SSMResult<SSMDeleteResult> {
        trace!("DeleteParameters {:?}", names);
        let input = DeleteParametersRequest {
            names: names.to_vec(),
        };
        let output = self
            .ssm_client
            .delete_parameters(input)
            .sync()
            .map_err(|err| SSMError::upstream("DeleteParameters", err))?;
        Ok(SSMDeleteResult {
            deleted_parameters: output.deleted_parameters.unwrap_or_default(),
            invalid_parameters: output.invalid_parameters.unwrap_or_default(),
        })
    }
}
