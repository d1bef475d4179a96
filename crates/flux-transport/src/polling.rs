//! Pull-based polling transport.
//!
//! The transport repeatedly calls an injected `get_updates` function,
//! delivers each returned update to an [`UpdateHandler`] in strict batch
//! order, advances an offset watermark derived from update ids, and
//! suppresses redelivery of recently seen keys within a TTL window.
//!
//! Lifecycle: `idle → running → stopping → stopped`. [`PollingTransport::start`]
//! may be called at most once per instance. [`PollingTransport::stop`]
//! requests cooperative cancellation through a [`CancellationToken`] that is
//! also threaded into the fetch call, then awaits the in-flight loop; no
//! update is delivered after `stop` resolves. A batch fetched while
//! cancellation fires is discarded, not drained.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use flux_core::{Bot, Update, UpdateHandler};

use crate::dedupe::{DedupeCache, DedupeKey};
use crate::error::{FetchError, PollingError, PollingResult};

/// Parameters passed to the injected `get_updates` function.
#[derive(Clone)]
pub struct GetUpdatesParams {
    /// One past the highest update id observed so far, if any.
    pub offset: Option<i64>,
    /// Cancellation signal; the fetch must return `Ok(vec![])` promptly
    /// once triggered.
    pub cancel: CancellationToken,
}

/// The injected update source.
pub type GetUpdatesFn = Arc<
    dyn Fn(GetUpdatesParams) -> flux_core::BoxFuture<'static, Result<Vec<Update>, FetchError>>
        + Send
        + Sync,
>;

/// Wraps an async closure as a [`GetUpdatesFn`].
pub fn get_updates_fn<F, Fut>(f: F) -> GetUpdatesFn
where
    F: Fn(GetUpdatesParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Update>, FetchError>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Extracts the numeric update id used for the offset watermark.
pub type UpdateIdFn = Arc<dyn Fn(&Update) -> Option<i64> + Send + Sync>;

/// Extracts the dedupe key for an update.
pub type DedupeKeyFn = Arc<dyn Fn(&Update) -> Option<DedupeKey> + Send + Sync>;

/// Dedupe window configuration.
#[derive(Clone)]
pub struct DedupeOptions {
    /// How long a delivered key suppresses redelivery. Zero disables dedupe.
    pub ttl: Duration,
    /// Size budget of the dedupe cache. Zero disables dedupe.
    pub max_size: usize,
    /// Update id extractor; defaults to the canonical `update_id` field.
    pub update_id: Option<UpdateIdFn>,
    /// Dedupe key extractor; defaults to the numeric update id.
    pub key: Option<DedupeKeyFn>,
}

impl Default for DedupeOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(60_000),
            max_size: 1000,
            update_id: None,
            key: None,
        }
    }
}

impl DedupeOptions {
    /// Configuration with dedupe turned off.
    pub fn disabled() -> Self {
        Self {
            ttl: Duration::ZERO,
            max_size: 0,
            ..Self::default()
        }
    }
}

/// Polling transport configuration.
#[derive(Clone)]
pub struct PollingOptions {
    /// Pause between fetch batches.
    pub interval: Duration,
    /// Dedupe window configuration.
    pub dedupe: DedupeOptions,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            dedupe: DedupeOptions::default(),
        }
    }
}

enum LoopState {
    Idle,
    Running(JoinHandle<PollingResult<()>>),
    Finished,
}

/// Pull-based update transport with offset tracking and dedupe.
pub struct PollingTransport {
    get_updates: GetUpdatesFn,
    options: PollingOptions,
    cancel: CancellationToken,
    running: Arc<AtomicBool>,
    state: Mutex<LoopState>,
}

impl PollingTransport {
    /// Creates an idle transport over the given update source.
    pub fn new(get_updates: GetUpdatesFn, options: PollingOptions) -> Self {
        Self {
            get_updates,
            options,
            cancel: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(LoopState::Idle),
        }
    }

    /// Starts the fetch loop, delivering updates to `handler`.
    ///
    /// May be called at most once per instance; a second call fails with
    /// [`PollingError::AlreadyStarted`].
    pub fn start(&self, handler: Arc<dyn UpdateHandler>) -> PollingResult<()> {
        let mut state = self.state.lock();
        if !matches!(*state, LoopState::Idle) {
            return Err(PollingError::AlreadyStarted);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let get_updates = Arc::clone(&self.get_updates);
        let options = self.options.clone();
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            let result = poll_loop(get_updates, handler, options, cancel).await;
            running.store(false, Ordering::SeqCst);
            if let Err(err) = &result {
                error!(error = %err, "polling loop terminated with error");
            }
            result
        });
        *state = LoopState::Running(task);
        debug!("polling transport started");
        Ok(())
    }

    /// Whether the fetch loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests cancellation and awaits the in-flight loop.
    ///
    /// Returns the loop's terminal result: fetch or dispatch errors surface
    /// here unless the failure was solely due to cancellation. Calling
    /// `stop` on an idle or already stopped transport is a no-op.
    pub async fn stop(&self) -> PollingResult<()> {
        self.cancel.cancel();
        let task = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, LoopState::Finished) {
                LoopState::Running(task) => Some(task),
                LoopState::Idle | LoopState::Finished => None,
            }
        };

        match task {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(err) => Err(PollingError::Task(err.to_string())),
            },
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for PollingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingTransport")
            .field("running", &self.is_running())
            .finish()
    }
}

fn default_update_id(update: &Update) -> Option<i64> {
    update.get("update_id").and_then(|id| id.as_i64())
}

async fn poll_loop(
    get_updates: GetUpdatesFn,
    handler: Arc<dyn UpdateHandler>,
    options: PollingOptions,
    cancel: CancellationToken,
) -> PollingResult<()> {
    let mut watermark: Option<i64> = None;
    let mut cache = DedupeCache::new(options.dedupe.ttl, options.dedupe.max_size);
    let update_id = options
        .dedupe
        .update_id
        .clone()
        .unwrap_or_else(|| Arc::new(default_update_id));

    'poll: while !cancel.is_cancelled() {
        let offset = watermark.map(|id| id + 1);
        trace!(?offset, "fetching updates");

        let params = GetUpdatesParams {
            offset,
            cancel: cancel.clone(),
        };
        let batch = match (get_updates)(params).await {
            Ok(batch) => batch,
            Err(err) => {
                if cancel.is_cancelled() {
                    break;
                }
                return Err(PollingError::Fetch(err));
            }
        };
        // a batch fetched while cancellation fired is discarded, not drained
        if cancel.is_cancelled() {
            break;
        }

        for update in batch {
            if cancel.is_cancelled() {
                break 'poll;
            }

            if let Some(id) = update_id(&update) {
                // out-of-order ids must not move the watermark backwards
                watermark = Some(watermark.map_or(id, |seen| seen.max(id)));
            }

            let key = match &options.dedupe.key {
                Some(key_fn) => key_fn(&update),
                None => update_id(&update).map(DedupeKey::Int),
            };

            if cache.enabled()
                && let Some(key) = &key
                && cache.is_suppressed(key, Instant::now())
            {
                debug!("suppressing duplicate update within dedupe window");
                continue;
            }

            handler.handle_update(update).await?;

            if cache.enabled()
                && let Some(key) = key
            {
                cache.record(key, Instant::now());
            }
        }

        if cancel.is_cancelled() {
            break;
        }
        if options.interval.is_zero() {
            // a zero interval still has to yield back to the runtime
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(options.interval) => {}
            }
        }
    }

    Ok(())
}

/// Starts polling a bot, wiring the adapter's id extractor into dedupe.
///
/// The adapter's update id becomes the default watermark extractor and
/// dedupe key unless the options already supply their own.
pub fn start_polling(
    bot: &Arc<Bot>,
    get_updates: GetUpdatesFn,
    mut options: PollingOptions,
) -> PollingResult<Arc<PollingTransport>> {
    if options.dedupe.update_id.is_none() {
        let adapter = Arc::clone(bot.adapter());
        options.dedupe.update_id = Some(Arc::new(move |update: &Update| {
            adapter.update_id(update).and_then(|id| id.as_int())
        }));
    }
    if options.dedupe.key.is_none() {
        let adapter = Arc::clone(bot.adapter());
        options.dedupe.key = Some(Arc::new(move |update: &Update| {
            adapter.update_id(update).map(DedupeKey::from)
        }));
    }

    let transport = Arc::new(PollingTransport::new(get_updates, options));
    transport.start(Arc::clone(bot) as Arc<dyn UpdateHandler>)?;
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flux_core::{DispatchError, DispatchResult};
    use serde_json::json;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recorder {
        texts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl UpdateHandler for Recorder {
        async fn handle_update(&self, update: Update) -> DispatchResult<()> {
            if self.fail {
                return Err(DispatchError::message("handler failure"));
            }
            let text = update
                .get("message")
                .and_then(|m| m.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_owned();
            self.texts.lock().push(text);
            Ok(())
        }
    }

    fn update(id: i64, text: &str) -> Update {
        Update::new(json!({ "update_id": id, "message": { "text": text } }))
    }

    fn fast_options() -> PollingOptions {
        PollingOptions {
            interval: Duration::ZERO,
            ..PollingOptions::default()
        }
    }

    async fn until_finished(transport: &PollingTransport) {
        while transport.is_running() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_advances_offset() {
        let offsets: Arc<Mutex<Vec<Option<i64>>>> = Arc::new(Mutex::new(Vec::new()));
        let second_call = Arc::new(Notify::new());

        let seen = Arc::clone(&offsets);
        let notify = Arc::clone(&second_call);
        let source = get_updates_fn(move |params: GetUpdatesParams| {
            let seen = Arc::clone(&seen);
            let notify = Arc::clone(&notify);
            async move {
                let calls = {
                    let mut seen = seen.lock();
                    seen.push(params.offset);
                    seen.len()
                };
                match calls {
                    1 => Ok(vec![update(1, "a"), update(2, "b")]),
                    _ => {
                        notify.notify_one();
                        Ok(Vec::new())
                    }
                }
            }
        });

        let handler = Arc::new(Recorder::default());
        let transport = PollingTransport::new(source, fast_options());
        transport.start(Arc::clone(&handler) as Arc<dyn UpdateHandler>).unwrap();

        second_call.notified().await;
        transport.stop().await.unwrap();

        assert_eq!(*handler.texts.lock(), vec!["a", "b"]);
        let offsets = offsets.lock();
        assert_eq!(offsets[0], None);
        assert_eq!(offsets[1], Some(3));
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn duplicate_keys_in_one_batch_deliver_once() {
        let second_call = Arc::new(Notify::new());

        let notify = Arc::clone(&second_call);
        let calls = Arc::new(Mutex::new(0usize));
        let source = get_updates_fn(move |_params| {
            let notify = Arc::clone(&notify);
            let calls = Arc::clone(&calls);
            async move {
                let call = {
                    let mut calls = calls.lock();
                    *calls += 1;
                    *calls
                };
                if call == 1 {
                    Ok(vec![update(1, "x"), update(1, "x")])
                } else {
                    notify.notify_one();
                    Ok(Vec::new())
                }
            }
        });

        let handler = Arc::new(Recorder::default());
        let transport = PollingTransport::new(source, fast_options());
        transport.start(Arc::clone(&handler) as Arc<dyn UpdateHandler>).unwrap();

        second_call.notified().await;
        transport.stop().await.unwrap();

        assert_eq!(*handler.texts.lock(), vec!["x"]);
    }

    #[tokio::test]
    async fn disabled_dedupe_delivers_duplicates() {
        let second_call = Arc::new(Notify::new());

        let notify = Arc::clone(&second_call);
        let calls = Arc::new(Mutex::new(0usize));
        let source = get_updates_fn(move |_params| {
            let notify = Arc::clone(&notify);
            let calls = Arc::clone(&calls);
            async move {
                let call = {
                    let mut calls = calls.lock();
                    *calls += 1;
                    *calls
                };
                if call == 1 {
                    Ok(vec![update(1, "x"), update(1, "x")])
                } else {
                    notify.notify_one();
                    Ok(Vec::new())
                }
            }
        });

        let handler = Arc::new(Recorder::default());
        let options = PollingOptions {
            interval: Duration::ZERO,
            dedupe: DedupeOptions::disabled(),
        };
        let transport = PollingTransport::new(source, options);
        transport.start(Arc::clone(&handler) as Arc<dyn UpdateHandler>).unwrap();

        second_call.notified().await;
        transport.stop().await.unwrap();

        assert_eq!(*handler.texts.lock(), vec!["x", "x"]);
    }

    #[tokio::test]
    async fn start_twice_is_a_configuration_error() {
        let source = get_updates_fn(|_params| async { Ok(Vec::new()) });
        let transport = PollingTransport::new(source, fast_options());
        let handler = Arc::new(Recorder::default());

        transport.start(Arc::clone(&handler) as Arc<dyn UpdateHandler>).unwrap();
        let err = transport
            .start(Arc::clone(&handler) as Arc<dyn UpdateHandler>)
            .unwrap_err();
        assert!(matches!(err, PollingError::AlreadyStarted));

        transport.stop().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_errors_terminate_the_loop() {
        let source =
            get_updates_fn(|_params| async { Err(FetchError::message("network down")) });
        let transport = PollingTransport::new(source, fast_options());
        transport
            .start(Arc::new(Recorder::default()) as Arc<dyn UpdateHandler>)
            .unwrap();

        until_finished(&transport).await;
        let err = transport.stop().await.unwrap_err();
        assert!(matches!(err, PollingError::Fetch(_)));
    }

    #[tokio::test]
    async fn dispatch_errors_fail_fast() {
        let source = get_updates_fn(|_params| async { Ok(vec![update(1, "x")]) });
        let transport = PollingTransport::new(source, fast_options());
        let handler = Arc::new(Recorder {
            texts: Mutex::new(Vec::new()),
            fail: true,
        });
        transport.start(handler as Arc<dyn UpdateHandler>).unwrap();

        until_finished(&transport).await;
        let err = transport.stop().await.unwrap_err();
        assert!(matches!(err, PollingError::Dispatch(_)));
    }

    #[tokio::test]
    async fn batch_fetched_during_cancellation_is_discarded() {
        let source = get_updates_fn(|params: GetUpdatesParams| async move {
            // block until stop() fires, then hand back a full batch
            params.cancel.cancelled().await;
            Ok(vec![update(1, "late")])
        });

        let handler = Arc::new(Recorder::default());
        let transport = PollingTransport::new(source, fast_options());
        transport.start(Arc::clone(&handler) as Arc<dyn UpdateHandler>).unwrap();

        tokio::task::yield_now().await;
        transport.stop().await.unwrap();

        assert!(handler.texts.lock().is_empty());
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let source = get_updates_fn(|_params| async { Ok(Vec::new()) });
        let transport = PollingTransport::new(source, fast_options());
        transport
            .start(Arc::new(Recorder::default()) as Arc<dyn UpdateHandler>)
            .unwrap();

        transport.stop().await.unwrap();
        transport.stop().await.unwrap();
        assert!(!transport.is_running());
    }
}
