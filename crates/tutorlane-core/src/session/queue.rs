//! Per-session FIFO turn lanes with barge-in cancellation.
//!
//! Each session owns a [`SessionLane`]. A task runs only once it reaches the
//! front of its lane, so at most one task per session executes at a time.
//! Barge-in cancels the running task and drops every queued task ahead of
//! the new one. A cancelled task's result is discarded by [`TurnQueue::enqueue`]
//! unless the task claimed its commit point first ([`LaneTicket::try_commit`]).

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("turn superseded by a newer turn")]
    Superseded,

    #[error("turn queue is shut down")]
    Closed,
}

/// Handed to each task when it starts executing.
#[derive(Debug, Clone)]
pub struct LaneTicket {
    /// Fires when a newer turn barges in or the session is cancelled.
    pub cancellation: CancellationToken,
    /// Tasks that were ahead of this one when it was enqueued.
    pub queue_depth: usize,
    committed: Arc<AtomicBool>,
}

impl LaneTicket {
    /// Claim the commit point. Fails once the task is cancelled; after a
    /// successful claim the task's result is delivered even if a barge-in
    /// follows.
    pub fn try_commit(&self) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }
        self.committed.store(true, Ordering::Release);
        true
    }

    pub fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct PendingTask {
    id: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct LaneState {
    /// Running task (if any) at the front, then waiting tasks in order.
    tasks: VecDeque<PendingTask>,
    running: Option<u64>,
}

/// Serialization unit for one session.
#[derive(Debug)]
pub struct SessionLane {
    session_id: String,
    state: Mutex<LaneState>,
    turn_changed: Notify,
    next_id: AtomicU64,
    last_active: Mutex<Instant>,
}

/// Snapshot for the session status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneStatus {
    pub session_id: String,
    pub depth: usize,
    pub running: bool,
    pub idle_secs: u64,
}

impl SessionLane {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: Mutex::new(LaneState::default()),
            turn_changed: Notify::new(),
            next_id: AtomicU64::new(0),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LaneState> {
        self.state.lock().expect("session lane lock poisoned")
    }

    fn touch(&self) {
        *self.last_active.lock().expect("session lane lock poisoned") = Instant::now();
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Add a task to the back of the lane, returning its id, token and depth.
    fn register(&self, allow_barge_in: bool) -> (u64, CancellationToken, usize) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let mut state = self.lock();
        if allow_barge_in && !state.tasks.is_empty() {
            let running = state.running;
            for task in &state.tasks {
                task.token.cancel();
            }
            state.tasks.retain(|task| Some(task.id) == running);
            tracing::info!(session_id = %self.session_id, "barge-in: superseding earlier turns");
        }
        let depth = state.tasks.len();
        state.tasks.push_back(PendingTask {
            id,
            token: token.clone(),
        });
        drop(state);
        self.touch();
        (id, token, depth)
    }

    /// Mark `id` running if it is at the front of the lane.
    fn try_start(&self, id: u64) -> bool {
        let mut state = self.lock();
        if state.running.is_none() && state.tasks.front().is_some_and(|task| task.id == id) {
            state.running = Some(id);
            true
        } else {
            false
        }
    }

    fn finish(&self, id: u64) {
        {
            let mut state = self.lock();
            state.tasks.retain(|task| task.id != id);
            if state.running == Some(id) {
                state.running = None;
            }
        }
        self.touch();
        self.turn_changed.notify_waiters();
    }

    /// Cancel every task in the lane. Returns how many were signalled.
    fn cancel_all(&self) -> usize {
        let mut state = self.lock();
        let running = state.running;
        let count = state.tasks.len();
        for task in &state.tasks {
            task.token.cancel();
        }
        state.tasks.retain(|task| Some(task.id) == running);
        drop(state);
        self.turn_changed.notify_waiters();
        count
    }

    pub fn depth(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running.is_some()
    }

    fn is_idle(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .expect("session lane lock poisoned")
            .elapsed()
    }

    fn status(&self) -> LaneStatus {
        let state = self.lock();
        LaneStatus {
            session_id: self.session_id.clone(),
            depth: state.tasks.len(),
            running: state.running.is_some(),
            idle_secs: self.idle_for().as_secs(),
        }
    }
}

/// Removes a task from its lane however the enqueue future ends.
struct LaneSlot {
    lane: Arc<SessionLane>,
    id: u64,
}

impl Drop for LaneSlot {
    fn drop(&mut self) {
        self.lane.finish(self.id);
    }
}

/// Process-wide registry of session lanes.
#[derive(Debug, Default)]
pub struct TurnQueue {
    lanes: DashMap<String, Arc<SessionLane>>,
    closed: AtomicBool,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lane for `session_id`, created on first use.
    pub fn get_lane(&self, session_id: &str) -> Arc<SessionLane> {
        self.lanes
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(SessionLane::new(session_id)))
            .clone()
    }

    /// Run `task` in the session's lane once every earlier task has finished.
    ///
    /// With `allow_barge_in`, earlier tasks are cancelled first. Returns
    /// [`QueueError::Superseded`] if this task is cancelled while waiting,
    /// or cancelled before it claimed its commit point.
    pub async fn enqueue<T, F, Fut>(
        &self,
        session_id: &str,
        allow_barge_in: bool,
        task: F,
    ) -> Result<T, QueueError>
    where
        F: FnOnce(LaneTicket) -> Fut,
        Fut: Future<Output = T>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }

        // Register under the map entry so a concurrent purge cannot drop
        // the lane between lookup and registration.
        let (lane, id, token, queue_depth) = {
            let entry = self
                .lanes
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(SessionLane::new(session_id)));
            let (id, token, depth) = entry.register(allow_barge_in);
            (Arc::clone(entry.value()), id, token, depth)
        };
        let _slot = LaneSlot {
            lane: Arc::clone(&lane),
            id,
        };

        loop {
            let notified = lane.turn_changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if token.is_cancelled() {
                return Err(QueueError::Superseded);
            }
            if lane.try_start(id) {
                break;
            }
            tokio::select! {
                _ = token.cancelled() => return Err(QueueError::Superseded),
                _ = &mut notified => {}
            }
        }

        tracing::debug!(session_id, queue_depth, "turn started");
        let committed = Arc::new(AtomicBool::new(false));
        let value = task(LaneTicket {
            cancellation: token.clone(),
            queue_depth,
            committed: Arc::clone(&committed),
        })
        .await;

        if token.is_cancelled() && !committed.load(Ordering::Acquire) {
            tracing::debug!(session_id, "discarding superseded turn result");
            return Err(QueueError::Superseded);
        }
        Ok(value)
    }

    /// Barge-in without a new turn: cancel everything in the session's lane.
    pub fn cancel_session(&self, session_id: &str) -> usize {
        self.lanes
            .get(session_id)
            .map(|lane| lane.cancel_all())
            .unwrap_or(0)
    }

    pub fn lane_status(&self, session_id: &str) -> Option<LaneStatus> {
        self.lanes.get(session_id).map(|lane| lane.status())
    }

    pub fn queue_depth(&self, session_id: &str) -> usize {
        self.lanes.get(session_id).map(|lane| lane.depth()).unwrap_or(0)
    }

    pub fn active_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Drop lanes with no tasks that have been idle for at least `max_idle`.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let before = self.lanes.len();
        self.lanes
            .retain(|_, lane| !(lane.is_idle() && lane.idle_for() >= max_idle));
        before.saturating_sub(self.lanes.len())
    }

    /// Refuse new turns and cancel every in-flight one.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        for lane in self.lanes.iter() {
            lane.cancel_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Tracks how many tasks are executing at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        async fn hold(&self, duration: Duration) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(duration).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_one_at_a_time_in_order() {
        let queue = Arc::new(TurnQueue::new());
        let gauge = Arc::new(Gauge::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let queue = Arc::clone(&queue);
            let gauge = Arc::clone(&gauge);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue("s1", false, |_| async move {
                        gauge.hold(Duration::from_millis(10)).await;
                        order.lock().unwrap().push(i);
                    })
                    .await
            }));
            // Let each task register before the next is spawned.
            tokio::task::yield_now().await;
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_with_barge_in_never_overlaps() {
        let queue = Arc::new(TurnQueue::new());
        let gauge = Arc::new(Gauge::default());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let queue = Arc::clone(&queue);
            let gauge = Arc::clone(&gauge);
            handles.push(tokio::spawn(async move {
                queue
                    .enqueue("s1", true, |_| async move {
                        gauge.hold(Duration::from_millis(5)).await;
                    })
                    .await
            }));
        }
        let mut completed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                completed += 1;
            }
        }
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
        assert!(completed >= 1, "the last turn always completes");
    }

    #[tokio::test(start_paused = true)]
    async fn barge_in_supersedes_running_task() {
        let queue = Arc::new(TurnQueue::new());
        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("s1", true, |ticket| async move {
                        tokio::select! {
                            _ = ticket.cancellation.cancelled() => "cancelled",
                            _ = tokio::time::sleep(Duration::from_secs(5)) => "finished",
                        }
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.lane_status("s1").unwrap().running);

        let second = queue
            .enqueue("s1", true, |ticket| async move { ticket.queue_depth })
            .await;

        assert_eq!(first.await.unwrap(), Err(QueueError::Superseded));
        assert_eq!(second, Ok(1), "the running turn was ahead of it");
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_of_cancelled_task_is_discarded() {
        let queue = Arc::new(TurnQueue::new());
        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("s1", true, |_| async move {
                        // Ignores cancellation and completes anyway.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        "stale"
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = queue.enqueue("s1", true, |_| async { "fresh" }).await;
        assert_eq!(second, Ok("fresh"));
        assert_eq!(first.await.unwrap(), Err(QueueError::Superseded));
    }

    #[tokio::test(start_paused = true)]
    async fn committed_task_survives_late_barge_in() {
        let queue = Arc::new(TurnQueue::new());
        let first = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("s1", true, |ticket| async move {
                        assert!(ticket.try_commit());
                        // Cancelled after the commit point; keeps its result.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        assert!(ticket.cancellation.is_cancelled());
                        assert!(!ticket.try_commit());
                        "committed"
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = queue.enqueue("s1", true, |_| async { "fresh" }).await;
        assert_eq!(second, Ok("fresh"));
        assert_eq!(first.await.unwrap(), Ok("committed"));
    }

    #[tokio::test(start_paused = true)]
    async fn barge_in_drops_queued_tasks() {
        let queue = Arc::new(TurnQueue::new());
        let spawn = |barge: bool, label: &'static str, hold_ms: u64| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("s1", barge, |_| async move {
                        tokio::time::sleep(Duration::from_millis(hold_ms)).await;
                        label
                    })
                    .await
            })
        };
        let running = spawn(false, "running", 100);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let queued = spawn(false, "queued", 10);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(queue.queue_depth("s1"), 2);

        let barging = spawn(true, "barging", 10);
        assert_eq!(queued.await.unwrap(), Err(QueueError::Superseded));
        assert_eq!(running.await.unwrap(), Err(QueueError::Superseded));
        assert_eq!(barging.await.unwrap(), Ok("barging"));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_run_concurrently() {
        let queue = Arc::new(TurnQueue::new());
        let started = Instant::now();
        let a = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("a", false, |_| tokio::time::sleep(Duration::from_millis(100)))
                    .await
            })
        };
        let b = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("b", false, |_| tokio::time::sleep(Duration::from_millis(100)))
                    .await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(queue.active_lanes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_session_signals_in_flight_turn() {
        let queue = Arc::new(TurnQueue::new());
        let turn = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("s1", false, |ticket| async move {
                        ticket.cancellation.cancelled().await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(queue.cancel_session("s1"), 1);
        assert_eq!(turn.await.unwrap(), Err(QueueError::Superseded));
        assert_eq!(queue.cancel_session("unknown"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_idle_lanes() {
        let queue = Arc::new(TurnQueue::new());
        queue.enqueue("idle", false, |_| async {}).await.unwrap();
        let busy = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue
                    .enqueue("busy", false, |_| tokio::time::sleep(Duration::from_secs(120)))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(queue.purge_idle(Duration::from_secs(60)), 1);
        assert!(queue.lane_status("idle").is_none());
        assert!(queue.lane_status("busy").is_some());
        busy.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn closed_queue_refuses_turns() {
        let queue = TurnQueue::new();
        queue.shutdown();
        let result = queue.enqueue("s1", false, |_| async { 1 }).await;
        assert_eq!(result, Err(QueueError::Closed));
    }
}
