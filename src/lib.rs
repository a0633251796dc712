//! cabundle-sync library crate
//!
//! Copies CA bundles from Secrets or local files into the `caBundle` fields
//! of APIService, ValidatingWebhookConfiguration and
//! MutatingWebhookConfiguration resources. One call to [`Processor::run`] is
//! one synchronization pass; scheduling repeated passes (e.g. a CronJob) is
//! left to the caller.

pub mod cluster;
pub mod config;
pub mod error;
pub mod processor;
pub mod retry;
pub mod source;
pub mod target;

pub use cluster::{ClusterApi, KubeCluster};
pub use config::{
    Binding, Configuration, FileSource, SecretSource, Source, SourceError, TargetKind,
};
pub use error::{ConfigError, Error, Result};
pub use processor::{BindingFailure, BindingOutcome, CombinedError, Processor, aggregate};
pub use retry::RetryConfig;
pub use target::CaBundleTarget;
