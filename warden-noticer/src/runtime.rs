use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc, RwLock};

use warden_client::{Client, ClientError, DEFAULT_SOCKET};
use warden_core::{classify, Notice, WorkloadEvent};

use crate::error::NoticerError;
use crate::pending::PendingEvents;
use crate::rotation::{rotate_if_needed, MAX_LOG_BYTES, MAX_ROTATED_FILES};

/// How many dispatched-but-unprocessed events may be buffered.
const EVENT_BUFFER: usize = 1000;

/// How often the probe log is checked for rotation.
const ROTATION_INTERVAL: Duration = Duration::from_secs(60);

/// Where new notices come from. Cut here so the poll loop can be driven by a
/// scripted source in tests; the real implementation is [`Client`].
pub trait NoticeSource: Send + Sync + 'static {
    fn wait_notices(
        &self,
        after: Option<DateTime<Utc>>,
        timeout: Duration,
    ) -> Result<Vec<Notice>, ClientError>;
}

impl NoticeSource for Client {
    fn wait_notices(
        &self,
        after: Option<DateTime<Utc>>,
        timeout: Duration,
    ) -> Result<Vec<Notice>, ClientError> {
        Client::wait_notices(self, after, timeout)
    }
}

/// Runtime configuration for the noticer.
#[derive(Debug, Clone)]
pub struct NoticerConfig {
    /// Control socket to long-poll for notices.
    pub socket: PathBuf,
    /// Probe executable invoked once per workload event.
    pub probe_bin: PathBuf,
    /// Event log the probe appends to, rotated by the noticer.
    pub probe_log: PathBuf,
    /// Server-side long-poll timeout per `notices` request.
    pub wait_timeout: Duration,
}

impl Default for NoticerConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            probe_bin: PathBuf::from("warden-probe"),
            probe_log: PathBuf::from("probe.log"),
            wait_timeout: Duration::from_secs(30),
        }
    }
}

struct QueuedEvent {
    id: u64,
    event: WorkloadEvent,
}

/// Start the noticer runtime and block the current thread until it exits.
pub fn start_blocking(config: NoticerConfig) -> Result<(), NoticerError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| crate::error::io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the noticer runtime.
pub async fn run(config: NoticerConfig) -> Result<(), NoticerError> {
    let source = Arc::new(Client::new(&config.socket));
    let pending = Arc::new(RwLock::new(PendingEvents::new()));

    let (event_tx, event_rx) = mpsc::channel::<QueuedEvent>(EVENT_BUFFER);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let poll_handle = {
        let shutdown = shutdown_tx.clone();
        let pending = pending.clone();
        let wait_timeout = config.wait_timeout;
        tokio::spawn(async move {
            let result =
                poll_task(source, wait_timeout, pending, event_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let emitter_handle = {
        let shutdown = shutdown_tx.clone();
        let pending = pending.clone();
        let probe_bin = config.probe_bin.clone();
        tokio::spawn(async move {
            let result = emitter_task(probe_bin, pending, event_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let probe_log = config.probe_log.clone();
        tokio::spawn(async move {
            let result = rotation_task(probe_log, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down noticer");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(NoticerError::Runtime(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (poll_result, emitter_result, rotation_result, signal_result) =
        tokio::join!(poll_handle, emitter_handle, rotation_handle, signal_handle);

    handle_join("notice_poll", poll_result)?;
    handle_join("emitter", emitter_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

/// Long-poll for notices, classify each one, and queue the resulting events.
///
/// The cursor advances past every delivered notice, dispatched or not, so a
/// notice is never handed to the probe twice. A poll failure is fatal: the
/// daemon going away is not something worth retrying through.
async fn poll_task<S: NoticeSource>(
    source: Arc<S>,
    wait_timeout: Duration,
    pending: Arc<RwLock<PendingEvents>>,
    event_tx: mpsc::Sender<QueuedEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), NoticerError> {
    tracing::debug!("noticer poll loop starting");

    let mut after: Option<DateTime<Utc>> = None;
    loop {
        let source = source.clone();
        let cursor = after;
        let wait = tokio::task::spawn_blocking(move || source.wait_notices(cursor, wait_timeout));

        let notices = tokio::select! {
            _ = shutdown_rx.recv() => break,
            joined = wait => joined
                .map_err(|err| NoticerError::Runtime(format!("notice poll join error: {err}")))??,
        };

        for notice in notices {
            tracing::info!(
                notice_type = %notice.notice_type,
                key = %notice.key,
                data = ?notice.last_data,
                "processing notice",
            );

            if let Some(event_type) = classify(&notice) {
                let event = WorkloadEvent::from_notice(event_type, &notice);
                let id = pending.write().await.add(event.clone());
                event_tx
                    .send(QueuedEvent { id, event })
                    .await
                    .map_err(|_| NoticerError::ChannelClosed("event queue"))?;
            } else {
                tracing::info!(
                    notice_type = %notice.notice_type,
                    key = %notice.key,
                    "ignoring notice",
                );
            }
            after = Some(notice.last_repeated);
        }
    }

    tracing::debug!("noticer poll loop stopped");
    Ok(())
}

/// Hand each queued event to the probe as four argument strings.
async fn emitter_task(
    probe_bin: PathBuf,
    pending: Arc<RwLock<PendingEvents>>,
    mut event_rx: mpsc::Receiver<QueuedEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), NoticerError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_event = event_rx.recv() => {
                let Some(QueuedEvent { id, event }) = maybe_event else { break };

                let output = Command::new(&probe_bin)
                    .arg(event.event_type.as_str())
                    .arg(&event.notice_id.0)
                    .arg(event.notice_type.as_str())
                    .arg(&event.notice_key)
                    .output()
                    .await;

                match output {
                    Ok(output) if output.status.success() => {
                        tracing::debug!(
                            event_type = %event.event_type,
                            key = %event.notice_key,
                            "probe completed",
                        );
                    }
                    Ok(output) => {
                        tracing::error!(
                            event_type = %event.event_type,
                            key = %event.notice_key,
                            status = %output.status,
                            stderr = %String::from_utf8_lossy(&output.stderr),
                            "probe exited with error",
                        );
                    }
                    Err(err) => {
                        tracing::error!(
                            probe = %probe_bin.display(),
                            error = %err,
                            "could not execute probe",
                        );
                    }
                }

                pending.write().await.remove(id);
            }
        }
    }
    Ok(())
}

async fn rotation_task(
    probe_log: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), NoticerError> {
    let mut interval = tokio::time::interval(ROTATION_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let log = probe_log.clone();
                let rotated = tokio::task::spawn_blocking(move || {
                    rotate_if_needed(&log, MAX_LOG_BYTES, MAX_ROTATED_FILES)
                })
                .await;

                match rotated {
                    Ok(Ok(true)) => tracing::info!(log = %probe_log.display(), "rotated probe log"),
                    Ok(Ok(false)) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(log = %probe_log.display(), error = %err, "log rotation failed");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "log rotation task join failed");
                    }
                }
            }
        }
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), NoticerError>, tokio::task::JoinError>,
) -> Result<(), NoticerError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(NoticerError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use serde_json::json;

    use warden_core::types::{NoticeId, NoticeType};
    use warden_core::WorkloadEventType;

    fn notice(id: &str, notice_type: NoticeType, key: &str, repeated_at: i64) -> Notice {
        let mut last_data = serde_json::Map::new();
        if notice_type == NoticeType::ChangeUpdate {
            last_data.insert("kind".to_string(), json!("perform-check"));
        }
        Notice {
            id: NoticeId::from(id),
            user_id: Some(0),
            notice_type,
            key: key.to_string(),
            first_occurred: Utc.timestamp_opt(repeated_at, 0).unwrap(),
            last_repeated: Utc.timestamp_opt(repeated_at, 0).unwrap(),
            occurrences: 1,
            last_data,
        }
    }

    /// Scripted notice source: one `Vec<Notice>` batch per poll, then an
    /// error to stop the loop. Records the cursor passed to each poll.
    struct ScriptedSource {
        batches: Mutex<Vec<Vec<Notice>>>,
        cursors: Mutex<Vec<Option<DateTime<Utc>>>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Vec<Notice>>) -> Self {
            Self {
                batches: Mutex::new(batches),
                cursors: Mutex::new(Vec::new()),
            }
        }
    }

    impl NoticeSource for ScriptedSource {
        fn wait_notices(
            &self,
            after: Option<DateTime<Utc>>,
            _timeout: Duration,
        ) -> Result<Vec<Notice>, ClientError> {
            self.cursors.lock().unwrap().push(after);
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                Err(ClientError::Protocol("script exhausted".to_string()))
            } else {
                Ok(batches.remove(0))
            }
        }
    }

    #[tokio::test]
    async fn poll_loop_queues_dispatchable_notices_and_advances_cursor() {
        let source = Arc::new(ScriptedSource::new(vec![vec![
            notice("1", NoticeType::Custom, "example.com/reload", 100),
            notice("2", NoticeType::Unknown, "whatever", 200),
            notice("3", NoticeType::ChangeUpdate, "42", 300),
        ]]));
        let pending = Arc::new(RwLock::new(PendingEvents::new()));
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, _) = broadcast::channel(1);

        let result = poll_task(
            source.clone(),
            Duration::from_secs(30),
            pending.clone(),
            event_tx,
            shutdown_tx.subscribe(),
        )
        .await;

        // Second poll hits the exhausted script and ends the loop.
        assert!(matches!(result, Err(NoticerError::Client(_))));

        let first = event_rx.recv().await.expect("first event");
        assert_eq!(first.event.event_type, WorkloadEventType::Custom);
        assert_eq!(first.event.notice_key, "example.com/reload");

        let second = event_rx.recv().await.expect("second event");
        assert_eq!(second.event.event_type, WorkloadEventType::PerformCheck);
        assert_eq!(second.event.notice_type, NoticeType::ChangeUpdate);
        assert_eq!(second.event.notice_key, "42");

        assert!(event_rx.try_recv().is_err(), "unknown notice not queued");
        assert_eq!(pending.read().await.len(), 2);

        // Cursor starts empty, then trails the last delivered notice even
        // though that notice was ignored.
        let cursors = source.cursors.lock().unwrap();
        assert_eq!(cursors[0], None);
        assert_eq!(cursors[1], Some(Utc.timestamp_opt(300, 0).unwrap()));
    }

    #[tokio::test]
    async fn poll_loop_stops_on_shutdown() {
        // Endless empty batches; shutdown is the only way out.
        let source = Arc::new(ScriptedSource::new(vec![Vec::new(); 1000]));
        let pending = Arc::new(RwLock::new(PendingEvents::new()));
        let (event_tx, _event_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, _) = broadcast::channel(1);

        let task = tokio::spawn(poll_task(
            source,
            Duration::from_millis(10),
            pending,
            event_tx,
            shutdown_tx.subscribe(),
        ));

        shutdown_tx.send(()).expect("signal shutdown");
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poll task should stop")
            .expect("join");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn emitter_drains_queue_and_clears_pending() {
        let pending = Arc::new(RwLock::new(PendingEvents::new()));
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, _) = broadcast::channel(1);

        let event = WorkloadEvent {
            event_type: WorkloadEventType::Custom,
            notice_id: NoticeId::from("1"),
            notice_type: NoticeType::Custom,
            notice_key: "example.com/reload".to_string(),
        };
        let id = pending.write().await.add(event.clone());
        event_tx
            .send(QueuedEvent { id, event })
            .await
            .expect("queue event");
        drop(event_tx); // closing the queue ends the emitter

        // `true` stands in for the probe: accepts any arguments, exits 0.
        emitter_task(
            PathBuf::from("true"),
            pending.clone(),
            event_rx,
            shutdown_tx.subscribe(),
        )
        .await
        .expect("emitter");

        assert!(pending.read().await.is_empty());
    }

    #[tokio::test]
    async fn emitter_survives_missing_probe_binary() {
        let pending = Arc::new(RwLock::new(PendingEvents::new()));
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (shutdown_tx, _) = broadcast::channel(1);

        let event = WorkloadEvent {
            event_type: WorkloadEventType::ChangeUpdated,
            notice_id: NoticeId::from("2"),
            notice_type: NoticeType::ChangeUpdate,
            notice_key: "42".to_string(),
        };
        let id = pending.write().await.add(event.clone());
        event_tx
            .send(QueuedEvent { id, event })
            .await
            .expect("queue event");
        drop(event_tx);

        let result = emitter_task(
            PathBuf::from("/nonexistent/warden-probe"),
            pending.clone(),
            event_rx,
            shutdown_tx.subscribe(),
        )
        .await;

        // Spawn failures are logged, not fatal; the event still leaves the
        // pending registry.
        assert!(result.is_ok());
        assert!(pending.read().await.is_empty());
    }
}
