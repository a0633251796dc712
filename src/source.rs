//! Source resolver: turns a binding's declared source into bundle bytes.

use tracing::{debug, instrument};

use crate::cluster::ClusterApi;
use crate::config::{FileSource, SecretSource, Source};
use crate::error::{Error, Result};

/// Produce the raw bundle for `source`. Reads only.
pub async fn resolve<C: ClusterApi>(cluster: &C, source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Secret(secret) => resolve_secret(cluster, secret).await,
        Source::File(file) => resolve_file(file).await,
    }
}

#[instrument(skip(cluster, source), fields(namespace = %source.namespace, secret = %source.name, key = %source.key))]
async fn resolve_secret<C: ClusterApi>(cluster: &C, source: &SecretSource) -> Result<Vec<u8>> {
    let secret = cluster.get_secret(&source.namespace, &source.name).await?;

    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&source.key))
        .ok_or_else(|| Error::KeyNotFound {
            namespace: source.namespace.clone(),
            name: source.name.clone(),
            key: source.key.clone(),
        })?;

    debug!(bytes = value.0.len(), "Resolved bundle from secret");
    Ok(value.0.clone())
}

#[instrument(skip(source), fields(path = %source.path.display()))]
async fn resolve_file(source: &FileSource) -> Result<Vec<u8>> {
    let data = tokio::fs::read(&source.path)
        .await
        .map_err(|e| Error::Io {
            path: source.path.clone(),
            source: e,
        })?;

    debug!(bytes = data.len(), "Resolved bundle from file");
    Ok(data)
}
