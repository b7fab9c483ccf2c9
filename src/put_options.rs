use crate::ssm_errors::{SSMError, SSMResult};
use crate::ssm_parameters::{ParameterType, SSMPutParameterRequest, SessionState};

pub const STANDARD_TIER: &str = "Standard";
pub const ADVANCED_TIER: &str = "Advanced";

/// A put request plus the region it targets.
#[derive(Debug, PartialEq)]
pub struct PutOptions {
    pub request: SSMPutParameterRequest,
    pub region: String,
}

/// Parses `field=value` words (e.g. `name=/House/Stark/Arya value=Needle`).
///
/// Only the first `=` splits, so values may contain `=`. Type defaults to
/// String and the session key is used unless `key=` is given.
pub fn parse_put_options(options: &[String], session: &SessionState) -> SSMResult<PutOptions> {
    let mut name: Option<String> = None;
    let mut value: Option<String> = None;
    let mut request = SSMPutParameterRequest {
        name: String::new(),
        p_type: ParameterType::String,
        value: String::new(),
        key_id: session.key.clone(),
        description: None,
        allowed_pattern: None,
        overwrite: false,
        tier: None,
        policies: None,
    };
    let mut region = session.region.clone();

    for option in options {
        let mut parts = option.splitn(2, '=');
        let field = parts.next().unwrap_or("").to_lowercase();
        let val = match parts.next() {
            Some(val) => val.to_string(),
            None => {
                return Err(SSMError::InvalidInput(format!(
                    "invalid input {}, expected field=value",
                    option
                )))
            }
        };
        match field.as_str() {
            "name" => name = Some(val),
            "value" => value = Some(val),
            "type" => request.p_type = val.parse()?,
            "description" => request.description = Some(val),
            "key" => request.key_id = Some(val),
            "pattern" => request.allowed_pattern = Some(val),
            "overwrite" => {
                request.overwrite = val.parse().map_err(|_| {
                    SSMError::InvalidInput("overwrite must be true or false".to_string())
                })?
            }
            "region" => region = val,
            "tier" => request.tier = Some(parse_tier(&val)?),
            "policies" => {
                request.policies = Some(val);
                request.tier = Some(ADVANCED_TIER.to_string());
            }
            other => {
                return Err(SSMError::InvalidInput(format!("unknown put option {}", other)))
            }
        }
    }

    match (name, value) {
        (Some(name), Some(value)) => {
            request.name = name;
            request.value = value;
            Ok(PutOptions { request, region })
        }
        _ => Err(SSMError::InvalidInput("name and value are required".to_string())),
    }
}

fn parse_tier(s: &str) -> SSMResult<String> {
    [STANDARD_TIER, ADVANCED_TIER]
        .iter()
        .find(|t| t.eq_ignore_ascii_case(s))
        .map(|t| t.to_string())
        .ok_or_else(|| SSMError::InvalidInput("tier must be standard or advanced".to_string()))
}
