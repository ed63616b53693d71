use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use recordflow_action_executor::{ActionExecutor, ModuleExecutor, PageDriver};
use recordflow_core_types::RunId;
use recordflow_module_store::{Module, ModuleStore, VariableStore};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::FlowError;
use crate::events::FlowEvent;
use crate::ports::RecordSource;
use crate::runner::LoopAwareRunner;

/// How often the worker re-checks the run state while paused or between
/// records.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

const EVENT_CAPACITY: usize = 64;

/// Run lifecycle state. Stopping is not a resting state; `stop()` returns
/// the controller to `Idle`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// State shared between the controller and its worker task.
///
/// Transitions happen only through the methods below; the worker reads
/// through the same handle, so there are no free-floating mutable flags.
struct RunShared {
    state: RwLock<RunState>,
    cancel: Mutex<CancellationToken>,
    generation: AtomicU64,
}

impl RunShared {
    fn new() -> Self {
        Self {
            state: RwLock::new(RunState::Idle),
            cancel: Mutex::new(CancellationToken::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn state(&self) -> RunState {
        *self.state.read()
    }

    /// Idle -> Running, arming a fresh cancellation token and bumping the
    /// run generation.
    fn try_begin(&self) -> Option<(CancellationToken, u64)> {
        let mut state = self.state.write();
        if *state != RunState::Idle {
            return None;
        }
        *state = RunState::Running;
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Some((token, generation))
    }

    fn pause(&self) {
        let mut state = self.state.write();
        if *state == RunState::Running {
            *state = RunState::Paused;
        }
    }

    fn resume(&self) {
        let mut state = self.state.write();
        if *state == RunState::Paused {
            *state = RunState::Running;
        }
    }

    /// Any state -> Idle; wakes the worker out of its poll sleeps.
    fn stop(&self) {
        let mut state = self.state.write();
        if *state == RunState::Idle {
            return;
        }
        *state = RunState::Idle;
        self.cancel.lock().cancel();
    }

    /// Idle transition performed by a worker as it exits. A worker whose
    /// run was stopped and already superseded must not idle the successor.
    fn finish(&self, generation: u64) {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) == generation {
            *state = RunState::Idle;
        }
    }
}

/// Drives records through the module list on a background worker task.
///
/// Owns the run/pause/stop state machine; control calls come from any
/// thread, the worker observes them at record boundaries.
pub struct FlowController {
    driver: Arc<dyn PageDriver>,
    executor: Arc<dyn ModuleExecutor>,
    source: Arc<Mutex<Box<dyn RecordSource>>>,
    modules: Arc<RwLock<ModuleStore>>,
    shared: Arc<RunShared>,
    events: broadcast::Sender<FlowEvent>,
}

impl FlowController {
    pub fn new(driver: Arc<dyn PageDriver>, source: Box<dyn RecordSource>) -> Self {
        let executor = Arc::new(ActionExecutor::new(Arc::clone(&driver)));
        Self::with_executor(driver, executor, source)
    }

    /// Construct with a custom executor (used by tests to script module
    /// outcomes).
    pub fn with_executor(
        driver: Arc<dyn PageDriver>,
        executor: Arc<dyn ModuleExecutor>,
        source: Box<dyn RecordSource>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            driver,
            executor,
            source: Arc::new(Mutex::new(source)),
            modules: Arc::new(RwLock::new(ModuleStore::new())),
            shared: Arc::new(RunShared::new()),
            events,
        }
    }

    /// Shared handle to the editable module list. Edits during a run are
    /// not observed: `start()` snapshots the list.
    pub fn modules(&self) -> Arc<RwLock<ModuleStore>> {
        Arc::clone(&self.modules)
    }

    pub fn state(&self) -> RunState {
        self.shared.state()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub async fn connect(&self, port: u16) -> Result<(), FlowError> {
        self.driver.connect(port).await?;
        Ok(())
    }

    /// Load records from a file; returns how many are available.
    pub fn load_records(&self, path: &Path) -> Result<usize, FlowError> {
        let mut source = self.source.lock();
        source.load(path)?;
        Ok(source.count())
    }

    /// Begin a run. Valid from `Idle` only, with an active connection, at
    /// least one record and a non-empty, loop-consistent module list.
    pub async fn start(&self) -> Result<RunId, FlowError> {
        if self.shared.state() != RunState::Idle {
            return Err(FlowError::AlreadyActive);
        }
        if !self.driver.is_connected().await {
            return Err(FlowError::NotConnected);
        }

        let total = {
            let mut source = self.source.lock();
            source.reset();
            source.count()
        };
        if total == 0 {
            return Err(FlowError::NoRecords);
        }

        // Snapshot the list for the whole run; concurrent edits stay
        // invisible to the worker.
        let modules = self.modules.read().list();
        if modules.is_empty() {
            return Err(FlowError::NoModules);
        }
        validate_loop_refs(&modules)?;

        let Some((cancel, generation)) = self.shared.try_begin() else {
            return Err(FlowError::AlreadyActive);
        };

        let run_id = RunId::new();
        info!(run = %run_id, total, "run started");
        let _ = self.events.send(FlowEvent::Started {
            run_id: run_id.clone(),
            total,
        });

        let worker = Worker {
            runner: LoopAwareRunner::new(Arc::clone(&self.executor)),
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            cancel,
            generation,
            modules,
            run_id: run_id.clone(),
            total,
        };
        tokio::spawn(worker.run());

        Ok(run_id)
    }

    /// Suspend at the next record boundary. The in-flight record always
    /// completes.
    pub fn pause(&self) {
        self.shared.pause();
    }

    pub fn resume(&self) {
        self.shared.resume();
    }

    /// End the run; the worker observes this at its next poll point and
    /// emits the finished summary. No-op from `Idle`.
    pub fn stop(&self) {
        self.shared.stop();
    }
}

/// Every loop-back reference in a run snapshot must resolve to a
/// strictly-earlier module. The editor tolerates dangling references while
/// reordering, a run does not.
fn validate_loop_refs(modules: &[Module]) -> Result<(), FlowError> {
    for (i, module) in modules.iter().enumerate() {
        if let Some(target) = module.loop_back_to {
            let resolved = modules[..i].iter().any(|m| m.id == target);
            if !resolved {
                return Err(FlowError::InvalidLoopRef {
                    id: module.id,
                    name: module.name.clone(),
                });
            }
        }
    }
    Ok(())
}

struct Worker {
    runner: LoopAwareRunner,
    source: Arc<Mutex<Box<dyn RecordSource>>>,
    shared: Arc<RunShared>,
    events: broadcast::Sender<FlowEvent>,
    cancel: CancellationToken,
    generation: u64,
    modules: Vec<Module>,
    run_id: RunId,
    total: usize,
}

impl Worker {
    async fn run(self) {
        let mut processed = 0usize;
        let mut index = 0usize;

        loop {
            // Pause/stop poll; pausing only ever takes effect here, between
            // records.
            let stopped = loop {
                // The token is this run's own stop signal. Shared state is
                // not enough: a successor run may have set it back to
                // Running before this worker's in-flight record finished.
                if self.cancel.is_cancelled() {
                    break true;
                }
                match self.shared.state() {
                    RunState::Running => break false,
                    RunState::Idle => break true,
                    RunState::Paused => self.poll_sleep().await,
                }
            };
            if stopped {
                debug!(run = %self.run_id, "stop observed");
                break;
            }

            let record = self.source.lock().next();
            let Some(record) = record else {
                debug!(run = %self.run_id, "record source exhausted");
                break;
            };
            index += 1;

            let mut vars = VariableStore::seeded_from(&record);
            let outcome = self.runner.run(&self.modules, &mut vars).await;
            processed += 1;

            if !outcome.ok {
                warn!(run = %self.run_id, index, error = ?outcome.error, "record failed");
            }
            let _ = self.events.send(FlowEvent::RecordFinished {
                run_id: self.run_id.clone(),
                index,
                total: self.total,
                ok: outcome.ok,
                detail: outcome.error,
            });
        }

        self.shared.finish(self.generation);
        info!(run = %self.run_id, processed, "run finished");
        let _ = self.events.send(FlowEvent::Finished {
            run_id: self.run_id.clone(),
            processed,
        });
    }

    async fn poll_sleep(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = sleep(POLL_INTERVAL) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recordflow_action_executor::{ActionOutcome, Element};
    use recordflow_core_types::{DriverError, ModuleId};
    use recordflow_module_store::ActionSpec;
    use crate::ports::{InMemoryRecords, Record};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    struct FakeDriver {
        connected: AtomicBool,
    }

    impl FakeDriver {
        fn connected() -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(true),
            })
        }

        fn disconnected() -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl PageDriver for FakeDriver {
        async fn connect(&self, _port: u16) -> Result<(), DriverError> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disconnect(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }

        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn find(&self, _locator: &str) -> Result<Option<Box<dyn Element>>, DriverError> {
            Ok(None)
        }
    }

    /// Executor that acquires a permit per record (one module per record in
    /// these tests), letting the test decide when each record may proceed.
    struct GatedExecutor {
        gate: Semaphore,
        entered: AtomicUsize,
        calls: AtomicUsize,
    }

    impl GatedExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                entered: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }

        /// Yield until `n` executor calls have begun (possibly still
        /// blocked on the gate).
        async fn wait_entered(&self, n: usize) {
            for _ in 0..1000 {
                if self.entered.load(Ordering::SeqCst) >= n {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("executor never reached {n} call(s)");
        }
    }

    #[async_trait]
    impl ModuleExecutor for GatedExecutor {
        async fn execute(
            &self,
            _module: &Module,
            _vars: &VariableStore,
        ) -> ActionOutcome {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.expect("gate closed");
            permit.forget();
            self.calls.fetch_add(1, Ordering::SeqCst);
            ActionOutcome::success(None)
        }
    }

    struct InstantExecutor;

    #[async_trait]
    impl ModuleExecutor for InstantExecutor {
        async fn execute(
            &self,
            _module: &Module,
            _vars: &VariableStore,
        ) -> ActionOutcome {
            ActionOutcome::success(None)
        }
    }

    fn records(n: usize) -> Box<InMemoryRecords> {
        let rows = (0..n)
            .map(|i| {
                let mut record = Record::new();
                record.insert("row".to_string(), i.to_string());
                record
            })
            .collect();
        Box::new(InMemoryRecords::new(vec!["row".to_string()], rows))
    }

    fn add_click_module(controller: &FlowController) {
        let modules = controller.modules();
        let mut store = modules.write();
        let module = store.add("click");
        module.locator = "#button".to_string();
        module.action = ActionSpec::Click;
    }

    async fn next_event(rx: &mut broadcast::Receiver<FlowEvent>) -> FlowEvent {
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn start_rejects_missing_preconditions() {
        // Not connected.
        let controller =
            FlowController::with_executor(FakeDriver::disconnected(), Arc::new(InstantExecutor), records(1));
        add_click_module(&controller);
        assert!(matches!(controller.start().await, Err(FlowError::NotConnected)));
        assert_eq!(controller.state(), RunState::Idle);

        // No records.
        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(InstantExecutor), records(0));
        add_click_module(&controller);
        assert!(matches!(controller.start().await, Err(FlowError::NoRecords)));
        assert_eq!(controller.state(), RunState::Idle);

        // No modules.
        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(InstantExecutor), records(1));
        assert!(matches!(controller.start().await, Err(FlowError::NoModules)));
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn start_rejects_unresolvable_loop_references() {
        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(InstantExecutor), records(1));
        {
            let modules = controller.modules();
            let mut store = modules.write();
            store.add("first");
            let second = store.add("second");
            // Forward reference: inert for the editor, rejected at start.
            second.loop_back_to = Some(ModuleId(99));
        }

        assert!(matches!(
            controller.start().await,
            Err(FlowError::InvalidLoopRef { .. })
        ));
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn run_processes_every_record_and_returns_to_idle() {
        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(InstantExecutor), records(3));
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        controller.start().await.expect("start");
        assert!(matches!(next_event(&mut rx).await, FlowEvent::Started { total: 3, .. }));

        for expected in 1..=3 {
            match next_event(&mut rx).await {
                FlowEvent::RecordFinished { index, ok, .. } => {
                    assert_eq!(index, expected);
                    assert!(ok);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        match next_event(&mut rx).await {
            FlowEvent::Finished { processed, .. } => assert_eq!(processed, 3),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn record_failures_do_not_halt_the_run() {
        struct FailingExecutor;

        #[async_trait]
        impl ModuleExecutor for FailingExecutor {
            async fn execute(&self, _m: &Module, _v: &VariableStore) -> ActionOutcome {
                ActionOutcome::failure("element not found")
            }
        }

        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(FailingExecutor), records(2));
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        controller.start().await.expect("start");
        let _ = next_event(&mut rx).await; // Started

        for _ in 0..2 {
            let event = next_event(&mut rx).await;
            match &event {
                FlowEvent::RecordFinished { ok, detail, .. } => {
                    assert!(!*ok);
                    assert!(detail.as_deref().unwrap().contains("element not found"));
                    assert!(event.message().contains("failed"));
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        match next_event(&mut rx).await {
            FlowEvent::Finished { processed, .. } => assert_eq!(processed, 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn pause_takes_effect_at_the_record_boundary() {
        let executor = GatedExecutor::new();
        let controller = FlowController::with_executor(
            FakeDriver::connected(),
            Arc::clone(&executor) as Arc<dyn ModuleExecutor>,
            records(2),
        );
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        controller.start().await.expect("start");
        let _ = next_event(&mut rx).await; // Started

        // Record 1 is in flight (blocked on the gate). Pause now: the
        // in-flight record must still complete.
        executor.wait_entered(1).await;
        controller.pause();
        executor.gate.add_permits(1);
        match next_event(&mut rx).await {
            FlowEvent::RecordFinished { index: 1, ok: true, .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(controller.state(), RunState::Paused);

        // Paused: record 2 must not start even with a permit available.
        executor.gate.add_permits(1);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

        controller.resume();
        match next_event(&mut rx).await {
            FlowEvent::RecordFinished { index: 2, .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
        match next_event(&mut rx).await {
            FlowEvent::Finished { processed, .. } => assert_eq!(processed, 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_lets_the_in_flight_record_finish_then_ends_the_run() {
        let executor = GatedExecutor::new();
        let controller = FlowController::with_executor(
            FakeDriver::connected(),
            Arc::clone(&executor) as Arc<dyn ModuleExecutor>,
            records(3),
        );
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        controller.start().await.expect("start");
        let _ = next_event(&mut rx).await; // Started

        // Stop while record 1 is mid-module.
        executor.wait_entered(1).await;
        controller.stop();
        executor.gate.add_permits(1);

        match next_event(&mut rx).await {
            FlowEvent::RecordFinished { index: 1, .. } => {}
            other => panic!("unexpected event {other:?}"),
        }
        match next_event(&mut rx).await {
            FlowEvent::Finished { processed, .. } => assert_eq!(processed, 1),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_stopped_worker_does_not_bleed_into_the_next_run() {
        let executor = GatedExecutor::new();
        let controller = FlowController::with_executor(
            FakeDriver::connected(),
            Arc::clone(&executor) as Arc<dyn ModuleExecutor>,
            records(3),
        );
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        let first = controller.start().await.expect("start");
        let _ = next_event(&mut rx).await; // Started

        // Stop while record 1 is mid-module, then restart before the old
        // worker's in-flight record has completed.
        executor.wait_entered(1).await;
        controller.stop();
        let second = controller.start().await.expect("restart");
        assert_ne!(first, second);

        // The new worker begins its record 1; the old one still sits on
        // the gate.
        executor.wait_entered(2).await;

        // One permit: the old worker finishes its record and must exit
        // without pulling another record or idling the new run.
        executor.gate.add_permits(1);
        loop {
            if let FlowEvent::Finished { run_id, .. } = next_event(&mut rx).await {
                assert_eq!(run_id, first);
                break;
            }
        }
        assert_eq!(controller.state(), RunState::Running);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(executor.entered.load(Ordering::SeqCst), 2);

        // The new run still owns all three records.
        executor.gate.add_permits(3);
        loop {
            match next_event(&mut rx).await {
                FlowEvent::RecordFinished { run_id, .. } => assert_eq!(run_id, second),
                FlowEvent::Finished { run_id, processed } => {
                    assert_eq!(run_id, second);
                    assert_eq!(processed, 3);
                    break;
                }
                FlowEvent::Started { .. } => {}
            }
        }
        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn stop_from_idle_is_a_no_op() {
        let controller =
            FlowController::with_executor(FakeDriver::connected(), Arc::new(InstantExecutor), records(0));
        controller.stop();
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn start_while_running_is_rejected() {
        let executor = GatedExecutor::new();
        let controller = FlowController::with_executor(
            FakeDriver::connected(),
            Arc::clone(&executor) as Arc<dyn ModuleExecutor>,
            records(1),
        );
        add_click_module(&controller);
        let mut rx = controller.subscribe();

        controller.start().await.expect("start");
        let _ = next_event(&mut rx).await; // Started
        assert!(matches!(controller.start().await, Err(FlowError::AlreadyActive)));

        executor.gate.add_permits(1);
        let _ = next_event(&mut rx).await; // RecordFinished
        let _ = next_event(&mut rx).await; // Finished
    }
}
