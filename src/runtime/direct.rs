use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{FetchRuntime, MutationOptions, QueryOptions, QueryResult};
use crate::adapters::Body;
use crate::client::ArgsBag;
use crate::error::QueryError;

/// Executes options immediately, without caching or background refetching.
///
/// Honors `enabled`, `retry` (immediate re-attempts), `select`,
/// `on_success` and `on_error`. Scheduling hints such as `stale_time` are
/// ignored. Cancelling the runtime aborts in-flight requests.
#[derive(Debug, Clone, Default)]
pub struct DirectRuntime {
    signal: CancellationToken,
}

impl DirectRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort every in-flight and future request issued through this runtime.
    pub fn cancel(&self) {
        self.signal.cancel();
    }

    fn should_retry(&self, err: &QueryError, attempt: u32, retries: u32) -> bool {
        attempt < retries
            && !self.signal.is_cancelled()
            && !err.is_aborted()
            && !matches!(err, QueryError::Misuse(_) | QueryError::Key(_))
    }
}

#[async_trait]
impl FetchRuntime for DirectRuntime {
    #[instrument(skip_all, fields(key = %options.query_key()))]
    async fn run_query(&self, options: QueryOptions) -> QueryResult {
        if options.extras.enabled == Some(false) {
            debug!("query disabled");
            return QueryResult::idle();
        }

        let retries = options.extras.retry.unwrap_or(0);
        let mut attempt = 0;
        loop {
            match options.fetch(self.signal.child_token()).await {
                Ok(body) => {
                    let data = match options.extras.select.as_ref() {
                        Some(select) => select(body),
                        None => body,
                    };
                    return QueryResult::success(data);
                }
                Err(err) if self.should_retry(&err, attempt, retries) => {
                    attempt += 1;
                    debug!(attempt, error = %err, "retrying query");
                }
                Err(err) => return QueryResult::failure(err),
            }
        }
    }

    #[instrument(skip_all, fields(key = %options.mutation_key()))]
    async fn run_mutation(
        &self,
        options: &MutationOptions,
        variables: Option<ArgsBag>,
    ) -> Result<Body, QueryError> {
        let retries = options.extras.retry.unwrap_or(0);
        let mut attempt = 0;
        let outcome = loop {
            match options.execute(variables.clone(), self.signal.child_token()).await {
                Err(err) if self.should_retry(&err, attempt, retries) => {
                    attempt += 1;
                    debug!(attempt, error = %err, "retrying mutation");
                }
                outcome => break outcome,
            }
        };

        match &outcome {
            Ok(body) => {
                if let Some(on_success) = options.extras.on_success.as_ref() {
                    on_success(body, variables.as_ref());
                }
            }
            Err(err) => {
                if let Some(on_error) = options.extras.on_error.as_ref() {
                    on_error(err, variables.as_ref());
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::FutureExt;
    use route_query_keys::{QueryKey, Verb, derive_key};
    use serde_json::json;

    use super::*;
    use crate::client::ClientError;
    use crate::error::HttpError;
    use crate::runtime::{MutationExtras, QueryContext, QueryExtras, QueryFn, Status};

    fn key() -> QueryKey {
        derive_key(Verb::Get, "https://example.com/", None).unwrap()
    }

    fn failing_then_ok(failures: u32, calls: Arc<AtomicU32>) -> QueryFn {
        Arc::new(move |_ctx: QueryContext| {
            let calls = calls.clone();
            async move {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                if attempt < failures {
                    Err(QueryError::Http(Box::new(HttpError {
                        status: 503,
                        status_text: "Service Unavailable".to_string(),
                    })))
                } else {
                    Ok(Body::Json(json!({"attempt": attempt})))
                }
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn disabled_queries_do_not_run() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = QueryOptions::new(
            key(),
            failing_then_ok(0, calls.clone()),
            QueryExtras::new().enabled(false),
        );

        let result = DirectRuntime::new().run_query(options).await;
        assert_eq!(result.status, Status::Idle);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retries_are_immediate_reattempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = QueryOptions::new(
            key(),
            failing_then_ok(2, calls.clone()),
            QueryExtras::new().retry(2),
        );

        let result = DirectRuntime::new().run_query(options).await;
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_surface_in_the_error_field() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = QueryOptions::new(key(), failing_then_ok(5, calls.clone()), QueryExtras::new());

        let result = DirectRuntime::new().run_query(options).await;
        assert!(result.is_error());
        assert!(result.data.is_none());
        let error = result.error.expect("error");
        assert_eq!(error.http_error().map(|err| err.status), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn select_transforms_the_data() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = QueryOptions::new(
            key(),
            failing_then_ok(0, calls),
            QueryExtras::new().select(|body| match body {
                Body::Json(value) => Body::Json(value["attempt"].clone()),
                other => other,
            }),
        );

        let result = DirectRuntime::new().run_query(options).await;
        assert_eq!(result.data.and_then(|body| body.into_json()), Some(json!(0)));
    }

    #[tokio::test]
    async fn mutation_callbacks_fire_once() {
        let successes = Arc::new(AtomicU32::new(0));
        let seen = successes.clone();
        let options = MutationOptions::new(
            derive_key(Verb::Post, "https://example.com/", None).unwrap(),
            Arc::new(|variables: Option<ArgsBag>, _signal: CancellationToken| {
                let echoed = serde_json::Value::Object(variables.unwrap_or_default());
                async move { Ok::<_, QueryError>(Body::Json(echoed)) }.boxed()
            }),
            MutationExtras::new().on_success(move |_, _| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let runtime = DirectRuntime::new();
        let body = runtime
            .run_mutation(&options, Some(ArgsBag::new()))
            .await
            .unwrap();
        assert_eq!(body.into_json(), Some(json!({})));
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn aborted_queries_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let query_fn: QueryFn = Arc::new(move |_ctx: QueryContext| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<Body, _>(QueryError::Client(ClientError::Aborted {
                    url: "https://example.com/".to_string(),
                }))
            }
            .boxed()
        });
        let options = QueryOptions::new(key(), query_fn, QueryExtras::new().retry(3));

        let result = DirectRuntime::new().run_query(options).await;
        assert!(result.error.expect("aborted").is_aborted());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelling_the_runtime_reaches_mutations() {
        let options = MutationOptions::new(
            derive_key(Verb::Post, "https://example.com/", None).unwrap(),
            Arc::new(|_variables: Option<ArgsBag>, signal: CancellationToken| {
                async move { Ok::<_, QueryError>(Body::Json(json!(signal.is_cancelled()))) }
                    .boxed()
            }),
            MutationExtras::new(),
        );

        let runtime = DirectRuntime::new();
        let before = runtime.run_mutation(&options, None).await.unwrap();
        runtime.cancel();
        let after = runtime.run_mutation(&options, None).await.unwrap();

        assert_eq!(before.into_json(), Some(json!(false)));
        assert_eq!(after.into_json(), Some(json!(true)));
    }
}
