//! Configuration model for bundle synchronization.
//!
//! The configuration file declares bindings grouped by target kind:
//!
//! ```json
//! {
//!   "apiServices": [
//!     { "name": "v1beta1.metrics.k8s.io", "file": { "path": "/etc/ca/ca.crt" } }
//!   ],
//!   "validatingWebhookConfigurations": [
//!     { "name": "policy", "secret": { "namespace": "kube-system", "name": "ca", "key": "ca.crt" } }
//!   ],
//!   "mutatingWebhookConfigurations": []
//! }
//! ```
//!
//! Each binding's source is selected once at load time. A binding that
//! declares no source, or both, keeps a [`SourceError`] that is reported when
//! the binding is processed rather than failing the whole load.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Kind of resource a binding writes its bundle into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// `apiregistration.k8s.io/v1` APIService
    ApiService,
    /// `admissionregistration.k8s.io/v1` ValidatingWebhookConfiguration
    ValidatingWebhookConfiguration,
    /// `admissionregistration.k8s.io/v1` MutatingWebhookConfiguration
    MutatingWebhookConfiguration,
}

impl TargetKind {
    /// All kinds, in processing order
    pub const ALL: [TargetKind; 3] = [
        TargetKind::ApiService,
        TargetKind::ValidatingWebhookConfiguration,
        TargetKind::MutatingWebhookConfiguration,
    ];
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::ApiService => write!(f, "APIService"),
            TargetKind::ValidatingWebhookConfiguration => {
                write!(f, "ValidatingWebhookConfiguration")
            }
            TargetKind::MutatingWebhookConfiguration => write!(f, "MutatingWebhookConfiguration"),
        }
    }
}

/// Reference to a key inside a Secret
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSource {
    pub namespace: String,
    pub name: String,
    pub key: String,
}

/// Local file holding the bundle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    pub path: PathBuf,
}

/// Where a binding's bundle comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Secret(SecretSource),
    File(FileSource),
}

/// A binding whose declared source is unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source not specified")]
    NotSpecified,
    #[error("source must specify exactly one of secret or file, both were set")]
    Ambiguous,
}

/// One (source, target-kind, target-name) declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Name of the target resource
    pub name: String,
    /// Selected source, or why none could be selected
    pub source: Result<Source, SourceError>,
}

impl Binding {
    /// Binding with a Secret source
    pub fn secret(name: &str, namespace: &str, secret: &str, key: &str) -> Self {
        Self {
            name: name.to_string(),
            source: Ok(Source::Secret(SecretSource {
                namespace: namespace.to_string(),
                name: secret.to_string(),
                key: key.to_string(),
            })),
        }
    }

    /// Binding with a file source
    pub fn file(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            source: Ok(Source::File(FileSource { path: path.into() })),
        }
    }
}

/// Binding object as written in the configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RawBinding {
    #[serde(default)]
    name: String,
    #[serde(default)]
    secret: Option<SecretSource>,
    #[serde(default)]
    file: Option<FileSource>,
}

impl From<RawBinding> for Binding {
    fn from(raw: RawBinding) -> Self {
        let source = match (raw.secret, raw.file) {
            (Some(secret), None) => Ok(Source::Secret(secret)),
            (None, Some(file)) => Ok(Source::File(file)),
            (None, None) => Err(SourceError::NotSpecified),
            (Some(_), Some(_)) => Err(SourceError::Ambiguous),
        };
        Binding {
            name: raw.name,
            source,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfiguration {
    #[serde(default)]
    api_services: Vec<RawBinding>,
    #[serde(default)]
    validating_webhook_configurations: Vec<RawBinding>,
    #[serde(default)]
    mutating_webhook_configurations: Vec<RawBinding>,
}

/// Declared bindings, grouped by target kind in input order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    pub api_services: Vec<Binding>,
    pub validating_webhook_configurations: Vec<Binding>,
    pub mutating_webhook_configurations: Vec<Binding>,
}

impl Configuration {
    /// Load the configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parse the configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    /// Bindings for a single target kind
    pub fn bindings(&self, kind: TargetKind) -> &[Binding] {
        match kind {
            TargetKind::ApiService => &self.api_services,
            TargetKind::ValidatingWebhookConfiguration => &self.validating_webhook_configurations,
            TargetKind::MutatingWebhookConfiguration => &self.mutating_webhook_configurations,
        }
    }

    /// Every binding paired with its kind, in processing order
    pub fn iter(&self) -> impl Iterator<Item = (TargetKind, &Binding)> {
        TargetKind::ALL
            .into_iter()
            .flat_map(move |kind| self.bindings(kind).iter().map(move |b| (kind, b)))
    }

    /// Total number of bindings across all kinds
    pub fn len(&self) -> usize {
        self.api_services.len()
            + self.validating_webhook_configurations.len()
            + self.mutating_webhook_configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RawConfiguration> for Configuration {
    fn from(raw: RawConfiguration) -> Self {
        let convert = |bindings: Vec<RawBinding>| -> Vec<Binding> {
            bindings.into_iter().map(Binding::from).collect()
        };
        Configuration {
            api_services: convert(raw.api_services),
            validating_webhook_configurations: convert(raw.validating_webhook_configurations),
            mutating_webhook_configurations: convert(raw.mutating_webhook_configurations),
        }
    }
}
