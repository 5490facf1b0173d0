//! Bounded fork-join worker pools.

use super::cancel::CancellationToken;
use super::TaskError;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Result of one task.
pub type TaskOutcome<T> = Result<T, TaskError>;

/// Run `task` over every item on a pool of at most `threads` workers.
///
/// Every item yields an outcome, in input order. A failing or panicking task
/// does not affect its siblings. Items whose task has not started when
/// `token` is cancelled report [`TaskError::Cancelled`].
pub fn run_tasks<I, T, F>(
    threads: usize,
    items: Vec<I>,
    token: &CancellationToken,
    task: F,
) -> Vec<TaskOutcome<T>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> TaskOutcome<T> + Sync,
{
    let run_one = |item: I| -> TaskOutcome<T> {
        if token.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        match panic::catch_unwind(AssertUnwindSafe(|| task(item))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
        }
    };

    if threads <= 1 || items.len() <= 1 {
        return items.into_iter().map(run_one).collect();
    }

    match ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(|| items.into_par_iter().map(run_one).collect()),
        Err(e) => {
            log::warn!("could not start a {}-thread pool ({}); running serially", threads, e);
            items.into_iter().map(run_one).collect()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
