//! Contract with the fetch runtime.
//!
//! Adapters hand the runtime a [`QueryOptions`] or [`MutationOptions`]: the
//! derived key, the deferred operation and the caller's pass-through
//! extras. Scheduling, caching and retries belong to the runtime.

mod direct;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use route_query_keys::QueryKey;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapters::Body;
use crate::client::ArgsBag;
use crate::error::QueryError;

pub use direct::DirectRuntime;

/// Per-invocation context handed to a query function.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub query_key: QueryKey,
    /// Cancelled by the runtime when the query is no longer wanted.
    pub signal: CancellationToken,
}

pub type QueryFn =
    Arc<dyn Fn(QueryContext) -> BoxFuture<'static, Result<Body, QueryError>> + Send + Sync>;

/// Receives the mutation variables and the runtime's cancellation signal.
pub type MutationFn = Arc<
    dyn Fn(Option<ArgsBag>, CancellationToken) -> BoxFuture<'static, Result<Body, QueryError>>
        + Send
        + Sync,
>;

pub type Select = Arc<dyn Fn(Body) -> Body + Send + Sync>;

pub type OnSuccess = Arc<dyn Fn(&Body, Option<&ArgsBag>) + Send + Sync>;

pub type OnError = Arc<dyn Fn(&QueryError, Option<&ArgsBag>) + Send + Sync>;

/// Caller-supplied query options passed through to the runtime untouched.
#[derive(Clone, Default)]
pub struct QueryExtras {
    pub enabled: Option<bool>,
    pub stale_time: Option<Duration>,
    pub gc_time: Option<Duration>,
    pub refetch_interval: Option<Duration>,
    /// Additional attempts after a failure.
    pub retry: Option<u32>,
    pub select: Option<Select>,
    pub meta: Option<Value>,
}

impl QueryExtras {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    #[must_use]
    pub fn gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = Some(gc_time);
        self
    }

    #[must_use]
    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn select(mut self, select: impl Fn(Body) -> Body + Send + Sync + 'static) -> Self {
        self.select = Some(Arc::new(select));
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl fmt::Debug for QueryExtras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExtras")
            .field("enabled", &self.enabled)
            .field("stale_time", &self.stale_time)
            .field("gc_time", &self.gc_time)
            .field("refetch_interval", &self.refetch_interval)
            .field("retry", &self.retry)
            .field("select", &self.select.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Caller-supplied mutation options passed through to the runtime untouched.
#[derive(Clone, Default)]
pub struct MutationExtras {
    pub retry: Option<u32>,
    pub on_success: Option<OnSuccess>,
    pub on_error: Option<OnError>,
    pub meta: Option<Value>,
}

impl MutationExtras {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn on_success(
        mut self,
        callback: impl Fn(&Body, Option<&ArgsBag>) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(
        mut self,
        callback: impl Fn(&QueryError, Option<&ArgsBag>) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl fmt::Debug for MutationExtras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationExtras")
            .field("retry", &self.retry)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Options for one query. The key and function are fixed at construction;
/// only the extras can be changed afterwards.
#[derive(Clone)]
pub struct QueryOptions {
    query_key: QueryKey,
    query_fn: QueryFn,
    pub extras: QueryExtras,
}

impl QueryOptions {
    pub fn new(query_key: QueryKey, query_fn: QueryFn, extras: QueryExtras) -> Self {
        Self {
            query_key,
            query_fn,
            extras,
        }
    }

    #[must_use]
    pub fn query_key(&self) -> &QueryKey {
        &self.query_key
    }

    #[must_use]
    pub fn query_fn(&self) -> &QueryFn {
        &self.query_fn
    }

    /// Run the query function once with a fresh context.
    pub async fn fetch(&self, signal: CancellationToken) -> Result<Body, QueryError> {
        let context = QueryContext {
            query_key: self.query_key.clone(),
            signal,
        };
        (self.query_fn)(context).await
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("query_key", &self.query_key)
            .field("extras", &self.extras)
            .finish_non_exhaustive()
    }
}

/// Options for one mutation; see [`QueryOptions`].
#[derive(Clone)]
pub struct MutationOptions {
    mutation_key: QueryKey,
    mutation_fn: MutationFn,
    pub extras: MutationExtras,
}

impl MutationOptions {
    pub fn new(mutation_key: QueryKey, mutation_fn: MutationFn, extras: MutationExtras) -> Self {
        Self {
            mutation_key,
            mutation_fn,
            extras,
        }
    }

    #[must_use]
    pub fn mutation_key(&self) -> &QueryKey {
        &self.mutation_key
    }

    #[must_use]
    pub fn mutation_fn(&self) -> &MutationFn {
        &self.mutation_fn
    }

    /// Run the mutation function once; cancelling `signal` aborts the request.
    pub async fn execute(
        &self,
        variables: Option<ArgsBag>,
        signal: CancellationToken,
    ) -> Result<Body, QueryError> {
        (self.mutation_fn)(variables, signal).await
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("mutation_key", &self.mutation_key)
            .field("extras", &self.extras)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not run yet, or disabled.
    Idle,
    Success,
    Error,
}

/// Hook-shaped query result.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub data: Option<Body>,
    pub error: Option<Arc<QueryError>>,
    pub status: Status,
}

impl QueryResult {
    #[must_use]
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: Status::Idle,
        }
    }

    #[must_use]
    pub fn success(data: Body) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: Status::Success,
        }
    }

    #[must_use]
    pub fn failure(error: QueryError) -> Self {
        Self {
            data: None,
            error: Some(Arc::new(error)),
            status: Status::Error,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}

/// Executes query and mutation options.
#[async_trait]
pub trait FetchRuntime: Send + Sync {
    async fn run_query(&self, options: QueryOptions) -> QueryResult;

    async fn run_mutation(
        &self,
        options: &MutationOptions,
        variables: Option<ArgsBag>,
    ) -> Result<Body, QueryError>;
}

#[derive(Debug, Default)]
struct MutationState {
    data: Option<Body>,
    error: Option<Arc<QueryError>>,
    status: Option<Status>,
}

/// Hook-shaped mutation handle bound to a runtime.
pub struct MutationHandle<'r, R: ?Sized> {
    runtime: &'r R,
    options: MutationOptions,
    state: Mutex<MutationState>,
}

impl<'r, R: FetchRuntime + ?Sized> MutationHandle<'r, R> {
    pub fn new(runtime: &'r R, options: MutationOptions) -> Self {
        Self {
            runtime,
            options,
            state: Mutex::new(MutationState::default()),
        }
    }

    #[must_use]
    pub fn options(&self) -> &MutationOptions {
        &self.options
    }

    /// Run the mutation and record its outcome on the handle.
    pub async fn mutate(&self, variables: Option<ArgsBag>) -> Result<Body, Arc<QueryError>> {
        let outcome = self.runtime.run_mutation(&self.options, variables).await;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(body) => {
                state.data = Some(body.clone());
                state.error = None;
                state.status = Some(Status::Success);
                Ok(body)
            }
            Err(err) => {
                let err = Arc::new(err);
                state.error = Some(err.clone());
                state.status = Some(Status::Error);
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<Body> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<Arc<QueryError>> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .error
            .clone()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .unwrap_or(Status::Idle)
    }
}
