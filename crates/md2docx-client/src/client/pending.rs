//! Fire-and-collect handles for API calls.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};

/// Outcome of one submitted call, delivered exactly once.
///
/// Awaiting yields that call's result and nothing else. Dropping the
/// handle detaches it: the request still runs to completion.
#[derive(Debug)]
pub struct PendingReply<T> {
    handle: JoinHandle<ApiResult<T>>,
}

impl<T> PendingReply<T> {
    /// True once the call has completed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for PendingReply<T> {
    type Output = ApiResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined.unwrap_or_else(|e| Err(ApiError::transport("submitted request", e.to_string())))
        })
    }
}

impl ApiClient {
    /// Run `call` in the background and return a handle to its outcome.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// ```no_run
    /// # use md2docx_client::{ApiClient, ApiClientConfig};
    /// # async fn demo(client: ApiClient) {
    /// let reply = client.submit(|c| async move { c.get_config().await });
    /// // ... other work ...
    /// let config = reply.await;
    /// # }
    /// ```
    pub fn submit<T, F, Fut>(&self, call: F) -> PendingReply<T>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        PendingReply {
            handle: tokio::spawn(call(self.clone())),
        }
    }
}
