//! Persisting annotation bookkeeping on AzureStackHCIMachine resources
//!
//! The annotation accessors in `hci_common::annotations` only mutate an
//! in-memory object. This module closes the loop: fetch the latest machine,
//! apply the accessor, and write the object back with a replace that carries
//! its `resourceVersion`. A stale write is rejected by the API server with a
//! conflict, in which case the whole read-modify-write is retried against a
//! fresh copy.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use serde::Serialize;
use tracing::{debug, info, instrument};

#[cfg(test)]
use mockall::automock;

use hci_common::kube_utils::resource_key;
use hci_common::retry::{retry_with_backoff, RetryConfig};
use hci_common::{AnnotationContent, AnnotationError, AnnotationExt, Error, FIELD_MANAGER};

use crate::crd::AzureStackHCIMachine;

/// Trait abstracting Kubernetes client operations for AzureStackHCIMachine
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MachineClient: Send + Sync {
    /// Get a machine by name, `None` if it does not exist
    async fn get_machine(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<AzureStackHCIMachine>, Error>;

    /// Replace a machine, guarded by its `resourceVersion`
    ///
    /// Returns the object as stored by the API server. A stale
    /// `resourceVersion` yields [`Error::Conflict`].
    async fn replace_machine(
        &self,
        machine: &AzureStackHCIMachine,
    ) -> Result<AzureStackHCIMachine, Error>;
}

/// Real Kubernetes client implementation
pub struct MachineClientImpl {
    client: Client,
}

impl MachineClientImpl {
    /// Create a new MachineClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MachineClient for MachineClientImpl {
    async fn get_machine(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<AzureStackHCIMachine>, Error> {
        let api: Api<AzureStackHCIMachine> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_machine(
        &self,
        machine: &AzureStackHCIMachine,
    ) -> Result<AzureStackHCIMachine, Error> {
        let name = machine.name_any();
        let namespace = machine.namespace().ok_or_else(|| {
            Error::internal_with_context(
                "replace_machine",
                format!("machine {name} has no namespace"),
            )
        })?;
        let key = resource_key(&namespace, &name);

        // Without a resourceVersion the replace would be unconditional
        if machine.resource_version().is_none() {
            return Err(Error::internal_with_context(
                "replace_machine",
                format!("machine {key} has no resourceVersion"),
            ));
        }

        let api: Api<AzureStackHCIMachine> = Api::namespaced(self.client.clone(), &namespace);
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        api.replace(&name, &params, machine)
            .await
            .map_err(|e| Error::from_kube_for(key, e))
    }
}

/// Controller context shared by machine annotation operations
pub struct Context {
    /// Client used to read and write machines
    pub client: Arc<dyn MachineClient>,
    /// Retry budget for conflicting writes
    pub retry: RetryConfig,
}

impl Context {
    /// Create a context with the default retry budget
    pub fn new(client: Arc<dyn MachineClient>) -> Self {
        Self {
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Create a context backed by a real kube client
    pub fn from_client(client: Client) -> Self {
        Self::new(Arc::new(MachineClientImpl::new(client)))
    }

    /// Override the retry budget for conflicting writes
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Set a string annotation on a machine and persist it.
pub async fn update_machine_annotation(
    ctx: &Context,
    name: &str,
    namespace: &str,
    annotation: &str,
    content: &str,
) -> Result<AzureStackHCIMachine, Error> {
    update_machine(ctx, name, namespace, |machine| {
        machine.set_annotation(annotation, content);
        Ok(())
    })
    .await
}

/// Set a JSON annotation on a machine and persist it.
pub async fn update_machine_annotation_json(
    ctx: &Context,
    name: &str,
    namespace: &str,
    annotation: &str,
    content: &AnnotationContent,
) -> Result<AzureStackHCIMachine, Error> {
    update_machine(ctx, name, namespace, |machine| {
        machine.set_annotation_json(annotation, content)
    })
    .await
}

/// Encode `content` as a JSON annotation on a machine and persist it.
///
/// Nothing is written if `content` does not encode to a JSON object.
pub async fn update_machine_annotation_json_as<T>(
    ctx: &Context,
    name: &str,
    namespace: &str,
    annotation: &str,
    content: &T,
) -> Result<AzureStackHCIMachine, Error>
where
    T: Serialize + Sync + ?Sized,
{
    update_machine(ctx, name, namespace, |machine| {
        machine.set_annotation_json_as(annotation, content)
    })
    .await
}

/// Fetch a machine and decode the JSON annotation stored under `annotation`.
///
/// An unset annotation yields an empty object. Corrupt content is returned
/// as [`Error::Annotation`].
#[instrument(skip(ctx), fields(machine = %resource_key(namespace, name)))]
pub async fn machine_annotation_json(
    ctx: &Context,
    name: &str,
    namespace: &str,
    annotation: &str,
) -> Result<AnnotationContent, Error> {
    let machine = ctx
        .client
        .get_machine(name, namespace)
        .await?
        .ok_or_else(|| Error::not_found(resource_key(namespace, name)))?;

    Ok(machine.annotation_json(annotation)?)
}

/// Read-modify-write a machine, retrying on write conflicts.
///
/// `mutate` runs against a fresh copy on every attempt. If it fails, no
/// write is issued.
#[instrument(skip(ctx, mutate), fields(machine = %resource_key(namespace, name)))]
async fn update_machine<F>(
    ctx: &Context,
    name: &str,
    namespace: &str,
    mutate: F,
) -> Result<AzureStackHCIMachine, Error>
where
    F: Fn(&mut AzureStackHCIMachine) -> Result<(), AnnotationError> + Sync,
{
    let key = resource_key(namespace, name);
    let key = key.as_str();
    let mutate = &mutate;

    let updated = retry_with_backoff(
        &ctx.retry,
        "update_machine_annotations",
        Error::is_conflict,
        move || async move {
            let mut machine = ctx
                .client
                .get_machine(name, namespace)
                .await?
                .ok_or_else(|| Error::not_found(key))?;

            mutate(&mut machine)?;

            debug!(
                resource_version = ?machine.resource_version(),
                "Writing machine annotations"
            );
            ctx.client.replace_machine(&machine).await
        },
    )
    .await?;

    info!(
        resource_version = ?updated.resource_version(),
        "Machine annotations updated"
    );
    Ok(updated)
}
