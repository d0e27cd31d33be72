//! Kubernetes watch streams.
//!
//! Each collection is followed with a [`watcher`], which lists it, watches
//! from the list's resource version, and lists again whenever the watch
//! cannot resume (for example after `410 Gone`). A list shows up as
//! [`ChangeEvent::Restarted`], one `Added` per object, then
//! [`ChangeEvent::Relisted`], so the bridge can drop rows whose objects went
//! away while nobody was watching.

use std::fmt::{Debug, Display};

use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher::{self, watcher};
use kube::runtime::WatchStreamExt;
use kube::{Client, Config, Resource};
use kt_table::ChangeEvent;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{TuiError, TuiResult};

/// Connected source of watch streams for one namespace.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
    namespace: String,
    watch_timeout_secs: u32,
}

impl std::fmt::Debug for KubeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSource")
            .field("namespace", &self.namespace)
            .field("watch_timeout_secs", &self.watch_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl KubeSource {
    /// Build a client from `config`.
    pub async fn connect(config: &ClientConfig) -> TuiResult<Self> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            cluster: None,
            user: None,
        };

        let kube_config = match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| TuiError::Config(format!("{}: {e}", path.display())))?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| TuiError::Config(e.to_string()))?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| TuiError::Config(e.to_string()))?,
            (None, None) => Config::infer()
                .await
                .map_err(|e| TuiError::Config(e.to_string()))?,
        };

        info!(
            cluster = %kube_config.cluster_url,
            namespace = %config.namespace,
            "kubernetes client configured"
        );

        Ok(Self {
            client: Client::try_from(kube_config)?,
            namespace: config.namespace.clone(),
            watch_timeout_secs: config.watch_timeout_secs,
        })
    }

    /// Namespace this source watches.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Watch one collection.
    ///
    /// The collection is checked with a one-item list first, so a missing
    /// permission or unreachable server is a startup error here. Once the
    /// stream is returned, failures surface as [`ChangeEvent::Unrecognized`]
    /// items while the watcher backs off and retries.
    pub async fn subscribe<K>(
        &self,
        collection: &str,
    ) -> TuiResult<BoxStream<'static, ChangeEvent<K>>>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug
            + Send
            + Sync
            + 'static,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &self.namespace);
        api.list(&ListParams::default().limit(1)).await?;

        info!(collection, namespace = %self.namespace, "collection readable, watching");

        let config = watcher::Config::default().timeout(self.watch_timeout_secs);
        let collection = collection.to_string();
        let changes = watcher(api, config)
            .default_backoff()
            .map(move |item| translate(&collection, item));
        Ok(changes.boxed())
    }
}

/// Map one watcher item to a table change.
///
/// The watcher does not tell creations from updates outside a list, so live
/// applies become `Modified`; the bridge upserts both the same way.
fn translate<K, E: Display>(
    collection: &str,
    item: Result<watcher::Event<K>, E>,
) -> ChangeEvent<K> {
    match item {
        Ok(watcher::Event::Init) => ChangeEvent::Restarted,
        Ok(watcher::Event::InitApply(obj)) => ChangeEvent::Added(obj),
        Ok(watcher::Event::InitDone) => ChangeEvent::Relisted,
        Ok(watcher::Event::Apply(obj)) => ChangeEvent::Modified(obj),
        Ok(watcher::Event::Delete(obj)) => ChangeEvent::Deleted(obj),
        Err(err) => {
            warn!(collection, error = %err, "watch error, retrying");
            ChangeEvent::Unrecognized(format!("watch error: {err}"))
        }
    }
}
