use std::fmt;
use std::str::FromStr;

use crate::ssm_errors::SSMError;

/// Parameter path separator
pub const DELIMITER: &str = "/";

/// Maximum number of names GetParameters and DeleteParameters accept per call
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    StringList,
    SecureString,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::StringList => "StringList",
            ParameterType::SecureString => "SecureString",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = SSMError;

    /// Case insensitive, so `securestring` works from the shell
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ParameterType::String,
            ParameterType::StringList,
            ParameterType::SecureString,
        ]
        .iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
        .copied()
        .ok_or_else(|| SSMError::InvalidInput(format!("Invalid type {}", s)))
    }
}

/// A parameter name together with the region it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterPath {
    pub name: String,
    pub region: String,
}

impl ParameterPath {
    pub fn new(name: &str, region: &str) -> Self {
        ParameterPath {
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}

impl fmt::Display for ParameterPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.name)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SSMParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub p_type: ParameterType,
    pub value: String,
    pub version: i64,
    pub last_modified: Option<f64>,
}

/// One entry of a parameter's history, carrying every writable field.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SSMParameterVersion {
    pub name: String,
    #[serde(rename = "type")]
    pub p_type: ParameterType,
    pub value: String,
    pub version: i64,
    pub description: Option<String>,
    pub key_id: Option<String>,
    pub allowed_pattern: Option<String>,
    pub tier: Option<String>,
    pub policies: Vec<String>,
    pub labels: Vec<String>,
    pub last_modified: Option<f64>,
    pub last_modified_user: Option<String>,
}

impl SSMParameterVersion {
    /// Policy texts re-assembled into the JSON array PutParameter expects
    pub fn policies_document(&self) -> Option<String> {
        if self.policies.is_empty() {
            None
        } else {
            Some(format!("[{}]", self.policies.join(",")))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SSMParameterRequest {
    pub name: String,
    pub with_decryption: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SSMParametersRequest {
    pub names: Vec<String>,
    pub with_decryption: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SSMParametersByPathRequest {
    pub path: String,
    pub with_decryption: Option<bool>,
    pub recursive: Option<bool>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SSMHistoryRequest {
    pub name: String,
    pub with_decryption: Option<bool>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SSMPutParameterRequest {
    pub name: String,
    pub p_type: ParameterType,
    pub value: String,
    pub key_id: Option<String>,
    pub description: Option<String>,
    pub allowed_pattern: Option<String>,
    pub overwrite: bool,
    pub tier: Option<String>,
    pub policies: Option<String>,
}

#[derive(Debug, Default)]
pub struct SSMParametersResult {
    pub parameters: Vec<SSMParameter>,
    pub invalid_parameters: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SSMParametersPage {
    pub parameters: Vec<SSMParameter>,
    pub next_token: Option<String>,
}

#[derive(Debug, Default)]
pub struct SSMHistoryPage {
    pub versions: Vec<SSMParameterVersion>,
    pub next_token: Option<String>,
}

#[derive(Debug, Default)]
pub struct SSMDeleteResult {
    pub deleted_parameters: Vec<String>,
    pub invalid_parameters: Vec<String>,
}

/// Outcome of a listing that may be interrupted.
#[derive(Debug, PartialEq)]
pub enum ListResult {
    Complete(Vec<String>),
    Cancelled,
}

/// Preferences and location of the interactive session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Always absolute, never empty
    pub cwd: String,
    pub decrypt: bool,
    pub region: String,
    pub profile: String,
    /// KMS key used for SecureString puts when none is given
    pub key: Option<String>,
}

impl SessionState {
    pub fn new(region: &str, profile: &str) -> Self {
        SessionState {
            cwd: DELIMITER.to_string(),
            decrypt: false,
            region: region.to_string(),
            profile: profile.to_string(),
            key: None,
        }
    }
}
