//! Access to the cluster API.
//!
//! The processor only needs four remote calls: get a Secret, and get/replace
//! a cluster-scoped target. [`ClusterApi`] captures exactly those so the core
//! can run against the real API server ([`KubeCluster`]) or an in-memory
//! cluster in tests.

use std::future::Future;

use k8s_openapi::api::core::v1::Secret;
use kube::api::PostParams;
use kube::{Api, Client};
use tracing::debug;

use crate::error::{Error, Result};
use crate::target::CaBundleTarget;

/// Remote calls used while synchronizing bundles.
pub trait ClusterApi: Send + Sync {
    /// Fetch a Secret, failing with `NotFound` if it does not exist.
    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Secret>> + Send;

    /// Fetch a cluster-scoped target by name, failing with `NotFound` if absent.
    fn get_target<K: CaBundleTarget>(&self, name: &str) -> impl Future<Output = Result<K>> + Send;

    /// Replace a target with a modified copy of a previous `get_target`.
    ///
    /// Fails with `Conflict` when the resource changed since it was read.
    fn replace_target<K: CaBundleTarget>(
        &self,
        name: &str,
        target: &K,
    ) -> impl Future<Output = Result<K>> + Send;
}

/// [`ClusterApi`] backed by a kube [`Client`].
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a cluster handle from the in-cluster service account or the
    /// local kubeconfig, whichever is available.
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }
}

impl ClusterApi for KubeCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        debug!(namespace = %namespace, name = %name, "Fetching secret");
        match api.get(name).await {
            Ok(secret) => Ok(secret),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::NotFound {
                kind: "Secret".to_string(),
                name: format!("{}/{}", namespace, name),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_target<K: CaBundleTarget>(&self, name: &str) -> Result<K> {
        let api: Api<K> = Api::all(self.client.clone());
        debug!(kind = %K::KIND, name = %name, "Fetching target");
        match api.get(name).await {
            Ok(target) => Ok(target),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(Error::target_not_found(K::KIND, name))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_target<K: CaBundleTarget>(&self, name: &str, target: &K) -> Result<K> {
        let api: Api<K> = Api::all(self.client.clone());
        match api.replace(name, &PostParams::default(), target).await {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(e)) if e.code == 404 => {
                Err(Error::target_not_found(K::KIND, name))
            }
            Err(kube::Error::Api(e)) if e.code == 409 => Err(Error::Conflict {
                kind: K::KIND,
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
