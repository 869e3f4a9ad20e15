//! Builds the per-request SSE generators behind `StreamResults` and
//! `StreamTasks`. Each call to these functions produces an independent
//! stream tied to one HTTP connection; nothing here is shared across
//! subscribers beyond the `AppState` they all read from.

use std::collections::HashSet;

use async_stream::stream;
use osint_protocol::TaskAssignment;
use osint_result_bus::QueueState;
use tokio_stream::Stream;

use crate::sse::SseFrame;
use crate::state::SharedAppState;

/// `StreamResults(token, task_id)`: yields every [`osint_protocol::ResultEnvelope`]
/// pushed for `task_id`, draining the result bus in a loop until the task
/// reaches a terminal state.
pub fn stream_results(state: SharedAppState, task_id: String) -> impl Stream<Item = SseFrame> {
    stream! {
        let mut last_seq = 0u64;
        loop {
            match state.results.drain_once(&task_id, last_seq).await {
                QueueState::Items { envelopes, last_seq: new_seq } => {
                    last_seq = new_seq;
                    for envelope in envelopes {
                        yield SseFrame::data(&envelope);
                    }
                }
                QueueState::TimedOut => {
                    // The bus's own closed flag is the primary signal, but
                    // also consult the Task Store directly so a task that
                    // went terminal without the bus ever being told (a gap
                    // closed elsewhere, or a future caller that forgets to
                    // call `close`) still ends the stream within one wait.
                    match state.tasks.get(&task_id).await {
                        Ok(Some(task)) if task.status.is_terminal() => break,
                        _ => yield SseFrame::KeepAlive,
                    }
                }
                QueueState::Closed => {
                    break;
                }
            }
        }
    }
}

/// `StreamTasks(token)`: on each poll iteration, purges expired
/// assignments and fails over dead workers, then yields every assignment
/// for this worker's token not already sent on this stream. Terminates
/// once the worker is removed from the registry (failover or otherwise).
pub fn stream_tasks(state: SharedAppState, token: String) -> impl Stream<Item = SseFrame> {
    stream! {
        let mut sent: HashSet<String> = HashSet::new();
        loop {
            if !state.fleet.is_token_live(&token) {
                break;
            }

            state.fleet.purge_expired();
            state.fleet.failover_dead(state.config.heartbeat_timeout());

            if !state.fleet.is_token_live(&token) {
                break;
            }

            let assignments = match state.fleet.assignments_for_token(&token) {
                Ok(assignments) => assignments,
                Err(_) => break,
            };

            for (task_id, assignment) in assignments {
                if sent.contains(&task_id) {
                    continue;
                }
                let task = match state.tasks.get(&task_id).await {
                    Ok(Some(task)) => task,
                    _ => continue,
                };
                let assignment_view = TaskAssignment {
                    task_id: task_id.clone(),
                    keywords: task.keywords.clone(),
                    category: task.categories.first().cloned().unwrap_or_default(),
                    location: task.locations.first().cloned().unwrap_or_default(),
                    start_time: task.start_time,
                    end_time: task.end_time,
                    sources: assignment.sources.clone(),
                };
                sent.insert(task_id);
                yield SseFrame::data(&assignment_view);
            }

            tokio::time::sleep(state.config.stream_poll_interval()).await;
        }
    }
}
