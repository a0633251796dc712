//! Target updaters.
//!
//! Each supported resource kind implements [`CaBundleTarget`], which knows
//! where the kind keeps its CA bundle. [`apply`] performs the
//! read-modify-write against the cluster for any such kind.
//!
//! | Kind | Bundle field(s) |
//! |------|-----------------|
//! | APIService | `spec.caBundle` |
//! | ValidatingWebhookConfiguration | `webhooks[*].clientConfig.caBundle` |
//! | MutatingWebhookConfiguration | `webhooks[*].clientConfig.caBundle` |

use std::fmt::Debug;

use k8s_openapi::ByteString;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use kube::Resource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::cluster::ClusterApi;
use crate::config::TargetKind;
use crate::error::Result;
use crate::retry::{RetryConfig, retry_on_conflict};

/// A cluster-scoped resource carrying one or more CA bundle fields.
pub trait CaBundleTarget:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind this type is bound to in the configuration
    const KIND: TargetKind;

    /// Overwrite every bundle field with `bundle`
    fn set_ca_bundle(&mut self, bundle: &[u8]);

    /// Current bundle fields, in document order
    fn ca_bundles(&self) -> Vec<Option<&[u8]>>;
}

impl CaBundleTarget for APIService {
    const KIND: TargetKind = TargetKind::ApiService;

    fn set_ca_bundle(&mut self, bundle: &[u8]) {
        self.spec.get_or_insert_with(Default::default).ca_bundle =
            Some(ByteString(bundle.to_vec()));
    }

    fn ca_bundles(&self) -> Vec<Option<&[u8]>> {
        vec![
            self.spec
                .as_ref()
                .and_then(|spec| spec.ca_bundle.as_ref())
                .map(|b| b.0.as_slice()),
        ]
    }
}

impl CaBundleTarget for ValidatingWebhookConfiguration {
    const KIND: TargetKind = TargetKind::ValidatingWebhookConfiguration;

    fn set_ca_bundle(&mut self, bundle: &[u8]) {
        for webhook in self.webhooks.iter_mut().flatten() {
            webhook.client_config.ca_bundle = Some(ByteString(bundle.to_vec()));
        }
    }

    fn ca_bundles(&self) -> Vec<Option<&[u8]>> {
        self.webhooks
            .iter()
            .flatten()
            .map(|w| w.client_config.ca_bundle.as_ref().map(|b| b.0.as_slice()))
            .collect()
    }
}

impl CaBundleTarget for MutatingWebhookConfiguration {
    const KIND: TargetKind = TargetKind::MutatingWebhookConfiguration;

    fn set_ca_bundle(&mut self, bundle: &[u8]) {
        for webhook in self.webhooks.iter_mut().flatten() {
            webhook.client_config.ca_bundle = Some(ByteString(bundle.to_vec()));
        }
    }

    fn ca_bundles(&self) -> Vec<Option<&[u8]>> {
        self.webhooks
            .iter()
            .flatten()
            .map(|w| w.client_config.ca_bundle.as_ref().map(|b| b.0.as_slice()))
            .collect()
    }
}

/// Write `bundle` into the named target.
///
/// Fetches the resource, overwrites its bundle field(s) and replaces it. The
/// replace carries the fetched `resourceVersion`, so a concurrent writer
/// causes a conflict; the whole read-modify-write is then repeated within the
/// `retry` budget.
#[instrument(skip(cluster, bundle, retry), fields(kind = %K::KIND, bytes = bundle.len()))]
pub async fn apply<K, C>(cluster: &C, name: &str, bundle: &[u8], retry: &RetryConfig) -> Result<()>
where
    K: CaBundleTarget,
    C: ClusterApi,
{
    let operation = format!("update {} {}", K::KIND, name);
    let fields = retry_on_conflict(retry, &operation, || async move {
        let mut target: K = cluster.get_target(name).await?;
        target.set_ca_bundle(bundle);
        let fields = target.ca_bundles().len();
        cluster.replace_target(name, &target).await?;
        Ok(fields)
    })
    .await?;

    if fields == 0 {
        debug!(name = %name, "Target has no bundle fields, written back unchanged");
    }
    info!(name = %name, fields = fields, "Updated CA bundle");
    Ok(())
}
