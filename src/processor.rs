//! Processor: runs one synchronization pass over every binding.
//!
//! Bindings are processed in declared order (APIServices, then validating,
//! then mutating webhook configurations). A failing binding never stops the
//! pass; its error is recorded and the next binding is attempted. After the
//! pass every failure is combined into a single [`CombinedError`].

use std::fmt;

use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use tracing::{info, instrument, warn};

use crate::cluster::ClusterApi;
use crate::config::{Binding, Configuration, TargetKind};
use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::{source, target};

/// Result of processing a single binding
#[derive(Debug)]
pub struct BindingOutcome {
    pub kind: TargetKind,
    pub name: String,
    pub result: Result<()>,
}

impl BindingOutcome {
    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }
}

/// A binding that failed, with its error
#[derive(Debug)]
pub struct BindingFailure {
    pub kind: TargetKind,
    pub name: String,
    pub error: Error,
}

impl fmt::Display for BindingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{} <unnamed>: {}", self.kind, self.error)
        } else {
            write!(f, "{} {:?}: {}", self.kind, self.name, self.error)
        }
    }
}

/// Every failure of a pass, in binding order
#[derive(Debug)]
pub struct CombinedError {
    failures: Vec<BindingFailure>,
}

impl CombinedError {
    pub fn failures(&self) -> &[BindingFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Individual failure messages, in binding order
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for CombinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [single] => write!(f, "{}", single),
            failures => {
                write!(f, "{} bindings failed: [", failures.len())?;
                for (i, failure) in failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl std::error::Error for CombinedError {}

/// Combine per-binding outcomes into a single result.
///
/// Succeeds only when every outcome succeeded; otherwise the error lists each
/// failure in the order the outcomes were given.
pub fn aggregate(
    outcomes: impl IntoIterator<Item = BindingOutcome>,
) -> std::result::Result<(), CombinedError> {
    let failures: Vec<BindingFailure> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome.result {
            Ok(()) => None,
            Err(error) => Some(BindingFailure {
                kind: outcome.kind,
                name: outcome.name,
                error,
            }),
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(CombinedError { failures })
    }
}

/// Applies a [`Configuration`] against a cluster.
pub struct Processor<C> {
    cluster: C,
    retry: RetryConfig,
}

impl<C: ClusterApi> Processor<C> {
    pub fn new(cluster: C) -> Self {
        Self {
            cluster,
            retry: RetryConfig::default(),
        }
    }

    /// Override the conflict retry budget used by target updates
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Run one pass and combine all failures.
    pub async fn run(&self, config: &Configuration) -> std::result::Result<(), CombinedError> {
        aggregate(self.process(config).await)
    }

    /// Run one pass, returning each binding's outcome in processing order.
    pub async fn process(&self, config: &Configuration) -> Vec<BindingOutcome> {
        let mut outcomes = Vec::with_capacity(config.len());

        for (kind, binding) in config.iter() {
            let result = self.process_binding(kind, binding).await;
            if let Err(e) = &result {
                warn!(kind = %kind, name = %binding.name, error = %e, "Binding failed");
            }
            outcomes.push(BindingOutcome {
                kind,
                name: binding.name.clone(),
                result,
            });
        }

        let applied = outcomes.iter().filter(|o| o.is_applied()).count();
        info!(
            total = outcomes.len(),
            applied = applied,
            failed = outcomes.len() - applied,
            "Synchronization pass complete"
        );
        outcomes
    }

    #[instrument(skip(self, kind, binding), fields(kind = %kind, name = %binding.name))]
    async fn process_binding(&self, kind: TargetKind, binding: &Binding) -> Result<()> {
        if binding.name.is_empty() {
            return Err(Error::Configuration(format!("{} name not set", kind)));
        }
        let source = binding.source.as_ref().map_err(|e| Error::from(*e))?;
        let bundle = source::resolve(&self.cluster, source).await?;

        let name = binding.name.as_str();
        match kind {
            TargetKind::ApiService => {
                target::apply::<APIService, _>(&self.cluster, name, &bundle, &self.retry).await
            }
            TargetKind::ValidatingWebhookConfiguration => {
                target::apply::<ValidatingWebhookConfiguration, _>(
                    &self.cluster,
                    name,
                    &bundle,
                    &self.retry,
                )
                .await
            }
            TargetKind::MutatingWebhookConfiguration => {
                target::apply::<MutatingWebhookConfiguration, _>(
                    &self.cluster,
                    name,
                    &bundle,
                    &self.retry,
                )
                .await
            }
        }
    }
}
