//! Generic resilient repository over one downstream collection
//!
//! `DownstreamClient<R>` performs exactly one HTTP round trip per operation
//! against a fixed base URL and presents a uniform failure contract:
//! unavailability (5xx, transport failures, breaker rejections) becomes
//! `ServiceError::ServiceUnavailable`, anything else is returned as-is.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::core::{FailureObserver, OutboundPolicy, Resource, ResourceRepository, ServiceClient};
use crate::error::{mapping, Result, ServiceError};
use crate::services::common::{build_target, decode_required, read_body_text, run_cancellable};

/// Logical operation, used for failure messages and log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Delete,
}

impl Operation {
    /// Short name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Delete => "delete",
        }
    }

    /// Message carried by `ServiceError::ServiceUnavailable` for this operation
    pub fn failure_message<R: Resource>(&self) -> String {
        match self {
            Operation::List => format!("failed to list {}", R::COLLECTION),
            _ => format!("failed to {} {}", self.as_str(), R::SINGULAR),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable state shared by clones of one client
pub(crate) struct ClientInner {
    pub(crate) http: Client,
    pub(crate) service_name: String,
    pub(crate) base_url: Url,
    pub(crate) api_prefix: String,
    pub(crate) owner_param: String,
    pub(crate) policy: Option<Arc<dyn OutboundPolicy>>,
    pub(crate) observer: Arc<dyn FailureObserver>,
}

/// Resilient CRUD client for resource type `R`
pub struct DownstreamClient<R> {
    inner: Arc<ClientInner>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for DownstreamClient<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _resource: PhantomData,
        }
    }
}

impl<R> fmt::Debug for DownstreamClient<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownstreamClient")
            .field("service_name", &self.inner.service_name)
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_prefix", &self.inner.api_prefix)
            .finish()
    }
}

impl<R: Resource> DownstreamClient<R> {
    pub(crate) fn from_inner(inner: ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
            _resource: PhantomData,
        }
    }

    /// Query parameter carrying the owner id
    pub fn owner_param(&self) -> &str {
        &self.inner.owner_param
    }

    /// List resources, abandoning the request if `cancel` fires
    pub async fn list_with_cancel(&self, owner_id: &str, cancel: &CancellationToken) -> Result<Vec<R>> {
        let op = Operation::List;
        let result = async {
            require_owner(owner_id)?;
            let url = build_target(
                &self.inner.base_url,
                &self.collection_path(),
                &[(self.owner_param(), owner_id)],
            )?;
            let response = self.send(op, self.inner.http.get(url), cancel).await?;
            run_cancellable(cancel, op.as_str(), decode_required(response, op.as_str())).await
        }
        .await;

        self.finish(op, result)
    }

    /// Get one resource, abandoning the request if `cancel` fires
    pub async fn get_with_cancel(
        &self,
        owner_id: &str,
        resource_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<R> {
        let op = Operation::Get;
        let result = async {
            require_owner(owner_id)?;
            let url = build_target(
                &self.inner.base_url,
                &self.item_path(resource_id),
                &[(self.owner_param(), owner_id)],
            )?;
            let response = self.send(op, self.inner.http.get(url), cancel).await?;
            run_cancellable(cancel, op.as_str(), decode_required(response, op.as_str())).await
        }
        .await;

        self.finish(op, result)
    }

    /// Create a resource, abandoning the request if `cancel` fires
    pub async fn create_with_cancel(&self, resource: &R, cancel: &CancellationToken) -> Result<R> {
        let op = Operation::Create;
        let result = async {
            let url = build_target(&self.inner.base_url, &self.collection_path(), &[])?;
            let response = self.send(op, self.inner.http.post(url).json(resource), cancel).await?;
            run_cancellable(cancel, op.as_str(), decode_required(response, op.as_str())).await
        }
        .await;

        self.finish(op, result)
    }

    /// Delete a resource, abandoning the request if `cancel` fires
    pub async fn delete_with_cancel(
        &self,
        owner_id: &str,
        resource_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let op = Operation::Delete;
        let result = async {
            require_owner(owner_id)?;
            let url = build_target(
                &self.inner.base_url,
                &self.item_path(resource_id),
                &[(self.owner_param(), owner_id)],
            )?;
            self.send(op, self.inner.http.delete(url), cancel).await?;
            Ok::<(), ServiceError>(())
        }
        .await;

        self.finish(op, result)
    }

    fn collection_path(&self) -> String {
        format!("{}/{}/", self.inner.api_prefix, R::COLLECTION)
    }

    fn item_path(&self, resource_id: Uuid) -> String {
        format!("{}/{}/{}/", self.inner.api_prefix, R::COLLECTION, resource_id.hyphenated())
    }

    /// Admit, send and validate the status of one request
    async fn send(&self, op: Operation, request: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(ServiceError::cancelled(format!("{} cancelled before start", op)));
        }

        if let Some(policy) = &self.inner.policy {
            policy.admit()?;
        }

        debug!(service = %self.inner.service_name, operation = %op, "Sending downstream request");

        let response = run_cancellable(cancel, op.as_str(), async {
            request.send().await.map_err(ServiceError::from)
        })
        .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = run_cancellable(cancel, op.as_str(), async { Ok(read_body_text(response).await) }).await?;
        self.inner.observer.on_unsuccessful_response(
            &self.inner.service_name,
            op.as_str(),
            status.as_u16(),
            &body,
        );

        Err(ServiceError::status(status.as_u16(), body))
    }

    /// Report the outcome to the policy and translate failures
    fn finish<T>(&self, op: Operation, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Some(policy) = &self.inner.policy {
                    policy.record_success();
                }
                Ok(value)
            }
            Err(err) => {
                let answered = reached_service(&err);
                let translated = mapping::translate(err, &op.failure_message::<R>(), &self.inner.service_name);

                if let ServiceError::ServiceUnavailable { source, .. } = &translated {
                    // Rejections never reached the service
                    if !matches!(&**source, ServiceError::CircuitBroken(_)) {
                        if let Some(policy) = &self.inner.policy {
                            policy.record_failure();
                        }
                    }
                    self.inner.observer.on_unavailable(&self.inner.service_name, op.as_str(), &translated);
                } else if answered {
                    if let Some(policy) = &self.inner.policy {
                        policy.record_success();
                    }
                }

                Err(translated)
            }
        }
    }
}

/// The service produced a response, even if the caller cannot use it
fn reached_service(err: &ServiceError) -> bool {
    match err {
        ServiceError::Status { status, .. } => *status < 500,
        ServiceError::Parsing(_) | ServiceError::MissingBody(_) => true,
        _ => false,
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        return Err(ServiceError::validation("owner id must not be empty"));
    }
    Ok(())
}

impl<R: Resource> ServiceClient for DownstreamClient<R> {
    fn name(&self) -> &str {
        &self.inner.service_name
    }

    fn base_url(&self) -> &Url {
        &self.inner.base_url
    }
}

#[async_trait]
impl<R: Resource> ResourceRepository<R> for DownstreamClient<R> {
    async fn list(&self, owner_id: &str) -> Result<Vec<R>> {
        self.list_with_cancel(owner_id, &CancellationToken::new()).await
    }

    async fn get(&self, owner_id: &str, resource_id: Uuid) -> Result<R> {
        self.get_with_cancel(owner_id, resource_id, &CancellationToken::new()).await
    }

    async fn create(&self, resource: &R) -> Result<R> {
        self.create_with_cancel(resource, &CancellationToken::new()).await
    }

    async fn delete(&self, owner_id: &str, resource_id: Uuid) -> Result<()> {
        self.delete_with_cancel(owner_id, resource_id, &CancellationToken::new()).await
    }
}
