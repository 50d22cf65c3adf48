//! Debounced, cancellable read/update controller for a single remote resource.
//!
//! A read trigger cancels whatever read is pending, waits out the debounce
//! window and fetches. Only the most recent read may deliver a result. Updates
//! are single-flight and a successful one is followed by exactly one read,
//! flagged as an update-driven read. Once the controller is destroyed no
//! callback fires and no state changes.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::config::LifecycleConfig;
use crate::deferred::{BoxFuture, Deferred};
use crate::error::LifecycleError;

/// Performs a read. Implementations should stop early once `cancel` fires.
pub trait ResourceFetcher<Q, R>: Send + Sync + 'static {
    fn fetch(&self, query: Q, cancel: CancellationToken) -> BoxFuture<'_, Result<R, LifecycleError>>;
}

impl<Q, R, F, Fut> ResourceFetcher<Q, R> for F
where
    F: Fn(Q, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, LifecycleError>> + Send + 'static,
{
    fn fetch(&self, query: Q, cancel: CancellationToken) -> BoxFuture<'_, Result<R, LifecycleError>> {
        Box::pin(self(query, cancel))
    }
}

/// Persists a new version of the resource.
pub trait ResourceUpdater<R>: Send + Sync + 'static {
    fn update(&self, resource: R) -> Deferred<()>;
}

impl<R, F> ResourceUpdater<R> for F
where
    F: Fn(R) -> Deferred<()> + Send + Sync + 'static,
{
    fn update(&self, resource: R) -> Deferred<()> {
        self(resource)
    }
}

/// Consumer notifications. Every method defaults to a no-op.
pub trait LifecycleCallbacks<R>: Send + Sync + 'static {
    fn on_set_start(&self) {}
    fn on_set_success(&self, _resource: &R, _is_update: bool) {}
    fn on_set_error(&self, _error: &LifecycleError) {}
    fn on_update_start(&self) {}
    fn on_update_success(&self) {}
    fn on_update_error(&self, _error: &LifecycleError) {}
}

impl<R> LifecycleCallbacks<R> for () {}

impl<R, T> LifecycleCallbacks<R> for Arc<T>
where
    T: LifecycleCallbacks<R> + ?Sized,
{
    fn on_set_start(&self) {
        (**self).on_set_start()
    }
    fn on_set_success(&self, resource: &R, is_update: bool) {
        (**self).on_set_success(resource, is_update)
    }
    fn on_set_error(&self, error: &LifecycleError) {
        (**self).on_set_error(error)
    }
    fn on_update_start(&self) {
        (**self).on_update_start()
    }
    fn on_update_success(&self) {
        (**self).on_update_success()
    }
    fn on_update_error(&self, error: &LifecycleError) {
        (**self).on_update_error(error)
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleSnapshot<R> {
    pub resource: Option<R>,
    pub loading: bool,
    pub updating: bool,
}

struct State<Q, R> {
    generation: u64,
    token: Option<CancellationToken>,
    query: Q,
    resource: Option<R>,
    loading: bool,
    updating: bool,
    observed: Option<(Option<String>, bool)>,
}

struct Inner<Q, R> {
    fetcher: Box<dyn ResourceFetcher<Q, R>>,
    updater: Box<dyn ResourceUpdater<R>>,
    callbacks: Box<dyn LifecycleCallbacks<R>>,
    config: LifecycleConfig,
    handle: Handle,
    alive: CancellationToken,
    state: Mutex<State<Q, R>>,
}

pub struct RequestLifecycle<Q, R> {
    inner: Arc<Inner<Q, R>>,
}

impl<Q, R> RequestLifecycle<Q, R>
where
    Q: Clone + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Creates a controller bound to the current tokio runtime.
    pub fn new(
        config: LifecycleConfig,
        query: Q,
        fetcher: impl ResourceFetcher<Q, R>,
        updater: impl ResourceUpdater<R>,
        callbacks: impl LifecycleCallbacks<R>,
    ) -> Result<Self, LifecycleError> {
        let handle = Handle::try_current().map_err(|_| LifecycleError::NoRuntime)?;
        Ok(Self {
            inner: Arc::new(Inner {
                fetcher: Box::new(fetcher),
                updater: Box::new(updater),
                callbacks: Box::new(callbacks),
                config,
                handle,
                alive: CancellationToken::new(),
                state: Mutex::new(State {
                    generation: 0,
                    token: None,
                    query,
                    resource: None,
                    loading: false,
                    updating: false,
                    observed: None,
                }),
            }),
        })
    }

    /// Replaces the query and issues a read for it.
    pub fn request(&self, query: Q) {
        self.inner.state.lock().query = query;
        self.inner.issue_read(false);
    }

    /// Issues a read for the current query.
    pub fn refresh(&self) {
        self.inner.issue_read(false);
    }

    /// Replaces the query without reading.
    pub fn set_query(&self, query: Q) {
        self.inner.state.lock().query = query;
    }

    /// Input-change trigger: reads when a resource is identified but not yet
    /// resolved, and only when the `(resource_id, resolved)` pair changed
    /// since the last observation.
    pub fn observe(&self, resource_id: Option<&str>, resolved: bool) {
        let should_read = {
            let mut state = self.inner.state.lock();
            let current = (resource_id.map(str::to_string), resolved);
            if state.observed.as_ref() == Some(&current) {
                return;
            }
            state.observed = Some(current);
            resource_id.is_some() && !resolved
        };
        if should_read {
            self.inner.issue_read(false);
        }
    }

    /// Starts an update unless one is already in flight. Returns whether the
    /// update was accepted.
    pub fn update(&self, resource: R) -> bool {
        {
            let mut state = self.inner.state.lock();
            if !self.inner.is_alive() || state.updating {
                tracing::debug!("update rejected; another update is in flight");
                return false;
            }
            state.updating = true;
        }
        self.inner.notify(|callbacks| callbacks.on_update_start());

        let deferred = self.inner.updater.update(resource);
        let inner = Arc::clone(&self.inner);
        self.inner.handle.spawn(async move {
            let result = deferred.resolve().await;
            inner.finish_update(result);
        });
        true
    }

    /// Tears the controller down. Pending reads are cancelled and every later
    /// completion is ignored.
    pub fn destroy(&self) {
        let mut state = self.inner.state.lock();
        if self.inner.alive.is_cancelled() {
            return;
        }
        tracing::debug!("request lifecycle destroyed");
        self.inner.alive.cancel();
        state.token = None;
        state.loading = false;
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    pub fn snapshot(&self) -> LifecycleSnapshot<R> {
        let state = self.inner.state.lock();
        LifecycleSnapshot {
            resource: state.resource.clone(),
            loading: state.loading,
            updating: state.updating,
        }
    }

    pub fn resource(&self) -> Option<R> {
        self.inner.state.lock().resource.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    pub fn is_updating(&self) -> bool {
        self.inner.state.lock().updating
    }
}

impl<Q, R> Drop for RequestLifecycle<Q, R> {
    fn drop(&mut self) {
        self.inner.alive.cancel();
    }
}

impl<Q, R> Inner<Q, R>
where
    Q: Clone + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn is_alive(&self) -> bool {
        !self.alive.is_cancelled()
    }

    // Callbacks run without the state lock held and may destroy the controller.
    fn notify(&self, f: impl FnOnce(&dyn LifecycleCallbacks<R>)) {
        if self.is_alive() {
            f(self.callbacks.as_ref());
        }
    }

    fn issue_read(self: &Arc<Self>, is_update: bool) {
        let token = self.alive.child_token();
        let (generation, query) = {
            let mut state = self.state.lock();
            if !self.is_alive() {
                return;
            }
            if let Some(previous) = state.token.replace(token.clone()) {
                previous.cancel();
            }
            state.generation += 1;
            state.loading = true;
            (state.generation, state.query.clone())
        };
        tracing::debug!(generation, is_update, "read scheduled");
        self.notify(|callbacks| callbacks.on_set_start());

        let inner = Arc::clone(self);
        self.handle.spawn(async move {
            inner.run_read(generation, token, query, is_update).await;
        });
    }

    async fn run_read(&self, generation: u64, token: CancellationToken, query: Q, is_update: bool) {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::trace!(generation, "read superseded during debounce");
                return;
            }
            _ = tokio::time::sleep(self.config.debounce) => {}
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(LifecycleError::Cancelled),
            result = self.fetcher.fetch(query, token.clone()) => result,
        };

        let resource = {
            let mut state = self.state.lock();
            if token.is_cancelled() || state.generation != generation {
                tracing::trace!(generation, "dropping stale read result");
                return;
            }
            state.loading = false;
            state.token = None;
            match result {
                Ok(resource) => {
                    state.resource = Some(resource.clone());
                    Ok(resource)
                }
                Err(err) => Err(err),
            }
        };

        match resource {
            Ok(resource) => {
                tracing::debug!(generation, is_update, "read delivered");
                self.notify(|callbacks| callbacks.on_set_success(&resource, is_update));
            }
            Err(err) if err.is_cancel() => {
                tracing::trace!(generation, "read cancelled by fetcher");
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "read failed");
                self.notify(|callbacks| callbacks.on_set_error(&err));
            }
        }
    }

    fn finish_update(self: &Arc<Self>, result: Result<(), LifecycleError>) {
        if self.is_alive() {
            match &result {
                Ok(()) => {
                    tracing::debug!("update succeeded; refreshing resource");
                    self.issue_read(true);
                    self.notify(|callbacks| callbacks.on_update_success());
                }
                Err(err) if err.is_cancel() => {
                    tracing::trace!("update cancelled");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "update failed");
                    self.notify(|callbacks| callbacks.on_update_error(err));
                }
            }
        }
        self.state.lock().updating = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, LifecycleEvent};
    use pretty_assertions::assert_eq;
    use std::sync::Weak;
    use std::time::Duration;

    type Calls = Arc<Mutex<Vec<u32>>>;

    fn fetcher(calls: Calls, latency: Duration) -> impl ResourceFetcher<u32, String> {
        move |query: u32, cancel: CancellationToken| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().push(query);
                tokio::select! {
                    _ = cancel.cancelled() => Err(LifecycleError::Cancelled),
                    _ = tokio::time::sleep(latency) => Ok(format!("resource-{query}")),
                }
            }
        }
    }

    fn noop_updater(_resource: String) -> Deferred<()> {
        Deferred::ready(Ok(()))
    }

    fn controller(
        calls: &Calls,
        log: &Arc<EventLog<String>>,
    ) -> RequestLifecycle<u32, String> {
        RequestLifecycle::new(
            LifecycleConfig::default(),
            0,
            fetcher(Arc::clone(calls), Duration::from_millis(50)),
            noop_updater,
            Arc::clone(log),
        )
        .unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_reads_deliver_only_the_latest() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.request(1);
        ctl.request(2);
        settle().await;

        assert_eq!(*calls.lock(), vec![2]);
        assert_eq!(log.delivered(), vec!["resource-2".to_string()]);
        assert_eq!(ctl.resource().as_deref(), Some("resource-2"));
        assert!(!ctl.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn reads_outside_the_debounce_window_both_fetch() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.request(1);
        settle().await;
        ctl.request(2);
        settle().await;

        assert_eq!(*calls.lock(), vec![1, 2]);
        assert_eq!(
            log.delivered(),
            vec!["resource-1".to_string(), "resource-2".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_read_is_cancelled_by_a_newer_one() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0,
            fetcher(Arc::clone(&calls), Duration::from_millis(500)),
            noop_updater,
            Arc::clone(&log),
        )
        .unwrap();

        ctl.request(1);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(ctl.is_loading());
        ctl.request(2);
        settle().await;

        assert_eq!(*calls.lock(), vec![1, 2]);
        assert_eq!(log.delivered(), vec!["resource-2".to_string()]);
        assert!(!log
            .events()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::SetError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn loading_tracks_the_pending_read() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        assert!(!ctl.snapshot().loading);
        ctl.refresh();
        assert!(ctl.snapshot().loading);
        settle().await;
        let snapshot = ctl.snapshot();
        assert!(!snapshot.loading);
        assert_eq!(snapshot.resource.as_deref(), Some("resource-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_is_reported_and_keeps_previous_resource() {
        let fail = Arc::new(Mutex::new(false));
        let log = Arc::new(EventLog::new());
        let flag = Arc::clone(&fail);
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0u32,
            move |query: u32, _cancel: CancellationToken| {
                let failing = *flag.lock();
                async move {
                    if failing {
                        Err(LifecycleError::upstream("service unavailable"))
                    } else {
                        Ok(format!("resource-{query}"))
                    }
                }
            },
            noop_updater,
            Arc::clone(&log),
        )
        .unwrap();

        ctl.request(1);
        settle().await;
        *fail.lock() = true;
        ctl.request(2);
        settle().await;

        let errors: Vec<_> = log
            .events()
            .into_iter()
            .filter(|event| matches!(event, LifecycleEvent::SetError(_)))
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(ctl.resource().as_deref(), Some("resource-1"));
        assert!(!ctl.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_reported_by_fetcher_is_silent() {
        let log = Arc::new(EventLog::new());
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0u32,
            |_query: u32, _cancel: CancellationToken| async {
                Err::<String, _>(LifecycleError::Cancelled)
            },
            noop_updater,
            Arc::clone(&log),
        )
        .unwrap();

        ctl.refresh();
        settle().await;

        assert_eq!(log.events(), vec![LifecycleEvent::SetStart]);
        assert!(!ctl.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn update_is_single_flight_and_refreshes_once() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let writes = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&writes);
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            7,
            fetcher(Arc::clone(&calls), Duration::from_millis(10)),
            move |resource: String| {
                recorded.lock().push(resource);
                Deferred::future(async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                })
            },
            Arc::clone(&log),
        )
        .unwrap();

        assert!(ctl.update("first".to_string()));
        assert!(ctl.is_updating());
        assert!(!ctl.update("second".to_string()));
        settle().await;

        assert_eq!(*writes.lock(), vec!["first".to_string()]);
        assert_eq!(*calls.lock(), vec![7]);
        assert_eq!(
            log.events(),
            vec![
                LifecycleEvent::UpdateStart,
                LifecycleEvent::SetStart,
                LifecycleEvent::UpdateSuccess,
                LifecycleEvent::SetSuccess {
                    resource: "resource-7".to_string(),
                    is_update: true
                },
            ]
        );
        assert!(!ctl.is_updating());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_reports_and_releases_the_lock() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0,
            fetcher(Arc::clone(&calls), Duration::from_millis(10)),
            |_resource: String| Deferred::ready(Err(LifecycleError::upstream("conflict"))),
            Arc::clone(&log),
        )
        .unwrap();

        assert!(ctl.update("edit".to_string()));
        settle().await;

        assert!(calls.lock().is_empty());
        assert!(log
            .events()
            .iter()
            .any(|event| matches!(event, LifecycleEvent::UpdateError(msg) if msg.contains("conflict"))));
        assert!(!ctl.is_updating());
        assert!(ctl.update("retry".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_update_task_is_silent() {
        let log = Arc::new(EventLog::new());
        let calls = Calls::default();
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0,
            fetcher(Arc::clone(&calls), Duration::from_millis(10)),
            |_resource: String| {
                let deferred: Deferred<()> = Deferred::spawn(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                });
                deferred.abort();
                deferred
            },
            Arc::clone(&log),
        )
        .unwrap();

        assert!(ctl.update("edit".to_string()));
        settle().await;

        assert_eq!(log.events(), vec![LifecycleEvent::UpdateStart]);
        assert!(calls.lock().is_empty());
        assert!(!ctl.is_updating());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_suppresses_pending_reads() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.request(1);
        ctl.destroy();
        settle().await;

        assert!(calls.lock().is_empty());
        assert_eq!(log.events(), vec![LifecycleEvent::SetStart]);
        assert!(!ctl.is_alive());

        ctl.request(2);
        assert!(!ctl.update("late".to_string()));
        settle().await;
        assert_eq!(log.events(), vec![LifecycleEvent::SetStart]);
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_during_fetch_drops_the_result() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.request(3);
        tokio::time::sleep(Duration::from_millis(320)).await;
        assert_eq!(*calls.lock(), vec![3]);
        ctl.destroy();
        settle().await;

        assert!(log.delivered().is_empty());
        assert_eq!(ctl.resource(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn update_completion_after_destroy_is_ignored() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = RequestLifecycle::new(
            LifecycleConfig::default(),
            0,
            fetcher(Arc::clone(&calls), Duration::from_millis(10)),
            |_resource: String| {
                Deferred::future(async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                })
            },
            Arc::clone(&log),
        )
        .unwrap();

        assert!(ctl.update("edit".to_string()));
        ctl.destroy();
        settle().await;

        assert_eq!(log.events(), vec![LifecycleEvent::UpdateStart]);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_clears_loading() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.request(1);
        assert!(ctl.snapshot().loading);
        ctl.destroy();
        assert!(!ctl.snapshot().loading);
        settle().await;
        assert!(!ctl.is_loading());
    }

    // Records events and destroys its controller as soon as a read starts.
    #[derive(Default)]
    struct DestroyOnRead {
        log: EventLog<String>,
        target: Mutex<Weak<RequestLifecycle<u32, String>>>,
    }

    impl LifecycleCallbacks<String> for DestroyOnRead {
        fn on_set_start(&self) {
            self.log.on_set_start();
            let target = self.target.lock().upgrade();
            if let Some(ctl) = target {
                ctl.destroy();
            }
        }
        fn on_set_success(&self, resource: &String, is_update: bool) {
            self.log.on_set_success(resource, is_update);
        }
        fn on_update_start(&self) {
            self.log.on_update_start();
        }
        fn on_update_success(&self) {
            self.log.on_update_success();
        }
        fn on_update_error(&self, error: &LifecycleError) {
            self.log.on_update_error(error);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_from_a_callback_silences_the_rest() {
        let calls = Calls::default();
        let hooks = Arc::new(DestroyOnRead::default());
        let ctl = Arc::new(
            RequestLifecycle::new(
                LifecycleConfig::default(),
                0,
                fetcher(Arc::clone(&calls), Duration::from_millis(10)),
                noop_updater,
                Arc::clone(&hooks),
            )
            .unwrap(),
        );
        *hooks.target.lock() = Arc::downgrade(&ctl);

        assert!(ctl.update("edit".to_string()));
        settle().await;

        assert_eq!(
            hooks.log.events(),
            vec![LifecycleEvent::UpdateStart, LifecycleEvent::SetStart]
        );
        assert!(calls.lock().is_empty());
        assert!(!ctl.is_alive());
        assert!(!ctl.snapshot().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn observe_reads_only_for_unresolved_changes() {
        let calls = Calls::default();
        let log = Arc::new(EventLog::new());
        let ctl = controller(&calls, &log);

        ctl.observe(None, false);
        settle().await;
        assert!(calls.lock().is_empty());

        ctl.set_query(1);
        ctl.observe(Some("roads"), false);
        settle().await;
        ctl.observe(Some("roads"), false);
        settle().await;
        assert_eq!(*calls.lock(), vec![1]);

        ctl.observe(Some("roads"), true);
        settle().await;
        assert_eq!(*calls.lock(), vec![1]);

        ctl.set_query(2);
        ctl.observe(Some("rivers"), false);
        settle().await;
        assert_eq!(*calls.lock(), vec![1, 2]);
    }

    #[test]
    fn construction_requires_a_runtime() {
        let result = RequestLifecycle::<u32, String>::new(
            LifecycleConfig::default(),
            0,
            |_query: u32, _cancel: CancellationToken| async { Ok::<_, LifecycleError>(String::new()) },
            noop_updater,
            (),
        );
        assert!(matches!(result, Err(LifecycleError::NoRuntime)));
    }
}
