// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use pulse_core::{FakeClock, TaskStatus};
use std::time::Duration;

struct ScriptedHandler {
    outcome: Mutex<Option<Result<(), HandlerError>>>,
}

impl ScriptedHandler {
    fn new(outcome: Result<(), HandlerError>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Some(outcome)),
        })
    }
}

#[async_trait]
impl TaskHandler for ScriptedHandler {
    async fn do_task(
        &self,
        _state: &Arc<State>,
        _task_id: &TaskId,
        _change_id: &ChangeId,
        _cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        self.outcome
            .lock()
            .take()
            .unwrap_or(Err(HandlerError::Failed("no script".into())))
    }
}

struct WaitsForCancel;

#[async_trait]
impl TaskHandler for WaitsForCancel {
    async fn do_task(
        &self,
        _state: &Arc<State>,
        _task_id: &TaskId,
        _change_id: &ChangeId,
        cancel: CancellationToken,
    ) -> Result<(), HandlerError> {
        cancel.cancelled().await;
        Err(HandlerError::Stopped)
    }
}

fn setup(kind: &str, handler: Arc<dyn TaskHandler>) -> (Arc<State>, Arc<TaskRunner>, TaskId) {
    let state = Arc::new(State::empty());
    let task_id = {
        let mut guard = state.lock();
        let change_id = guard.new_change(kind, "test", 0);
        guard.new_task(&change_id, kind, "test")
    };

    let mut registry = HandlerRegistry::new();
    registry.register(kind, handler);
    let runner = TaskRunner::new(Arc::clone(&state), registry, Arc::new(FakeClock::default()));
    (state, runner, task_id)
}

#[tokio::test]
async fn successful_handler_moves_task_to_done() {
    let (state, runner, task_id) = setup("perform-check", ScriptedHandler::new(Ok(())));
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(1)).await;

    let guard = state.lock();
    assert_eq!(guard.task(&task_id).unwrap().status, TaskStatus::Done);
}

#[tokio::test]
async fn retry_requeues_to_do_and_requests_ensure_before() {
    let (state, runner, task_id) = setup(
        "perform-check",
        ScriptedHandler::new(Err(HandlerError::Retry(Duration::from_millis(5)))),
    );
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(1)).await;

    let guard = state.lock();
    assert_eq!(guard.task(&task_id).unwrap().status, TaskStatus::Do);
    drop(guard);
    assert!(state.take_ensure_before().is_some());
}

#[tokio::test]
async fn failure_moves_task_to_error_and_logs_message() {
    let (state, runner, task_id) = setup(
        "perform-check",
        ScriptedHandler::new(Err(HandlerError::Failed("probe unreachable".into()))),
    );
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(1)).await;

    let guard = state.lock();
    let task = guard.task(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Error);
    assert!(task.log.iter().any(|l| l.contains("probe unreachable")));
}

#[tokio::test]
async fn missing_handler_errors_the_task() {
    let state = Arc::new(State::empty());
    let task_id = {
        let mut guard = state.lock();
        let change_id = guard.new_change("unknown-kind", "test", 0);
        guard.new_task(&change_id, "unknown-kind", "test")
    };
    let runner = TaskRunner::new(Arc::clone(&state), HandlerRegistry::new(), Arc::new(FakeClock::default()));
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(1)).await;

    let guard = state.lock();
    assert_eq!(guard.task(&task_id).unwrap().status, TaskStatus::Error);
}

#[tokio::test]
async fn shutdown_cancels_running_handlers_and_holds_the_task() {
    let (state, runner, task_id) = setup("perform-check", Arc::new(WaitsForCancel));
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(2)).await;

    let guard = state.lock();
    assert_eq!(guard.task(&task_id).unwrap().status, TaskStatus::Hold);
}

#[tokio::test]
async fn spawn_is_a_no_op_if_task_already_running() {
    let (_, runner, task_id) = setup("perform-check", Arc::new(WaitsForCancel));
    runner.spawn(task_id.clone());
    assert!(runner.is_running(&task_id));
    runner.spawn(task_id.clone());
    runner.shutdown(Duration::from_secs(1)).await;
    assert!(!runner.is_running(&task_id));
}
