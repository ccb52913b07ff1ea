//! Non-blocking variants backed by tokio's blocking pool
//!
//! Each call moves the whole synchronous operation onto one blocking task.
//! Cancellation is checked before the task starts; an operation that has
//! begun runs to completion. Progress callbacks fire on the worker thread.

use std::io::{Read, Seek, Write};
use std::path::PathBuf;

use sfdata_format::{Result, SfError, Value};
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressObserver;
use crate::reader::LoadOutcome;
use crate::writer::WriteSummary;
use crate::ContainerOptions;

async fn run_blocking<T, F>(cancel: &CancellationToken, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(SfError::Cancelled);
    }
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || {
        if cancel.is_cancelled() {
            return Err(SfError::Cancelled);
        }
        work()
    })
    .await
    .map_err(|e| SfError::TaskFailed(e.to_string()))?
}

/// Non-blocking [`crate::save_to_file_with_progress`]
pub async fn save_to_file_async<P>(
    value: Value,
    path: impl Into<PathBuf>,
    options: ContainerOptions,
    mut observer: P,
    cancel: &CancellationToken,
) -> Result<WriteSummary>
where
    P: ProgressObserver + Send + 'static,
{
    let path = path.into();
    run_blocking(cancel, move || {
        crate::save_to_file_with_progress(&value, &path, &options, &mut observer)
    })
    .await
}

/// Non-blocking [`crate::load_from_file_detailed`]
pub async fn load_from_file_async<P>(
    path: impl Into<PathBuf>,
    options: ContainerOptions,
    mut observer: P,
    cancel: &CancellationToken,
) -> Result<LoadOutcome>
where
    P: ProgressObserver + Send + 'static,
{
    let path = path.into();
    run_blocking(cancel, move || {
        crate::load_from_file_detailed(&path, &options, &mut observer)
    })
    .await
}

/// Non-blocking [`crate::save_to_stream_with_progress`]; the sink is handed back
pub async fn save_to_stream_async<W, P>(
    value: Value,
    mut sink: W,
    options: ContainerOptions,
    mut observer: P,
    cancel: &CancellationToken,
) -> Result<(W, WriteSummary)>
where
    W: Write + Seek + Send + 'static,
    P: ProgressObserver + Send + 'static,
{
    run_blocking(cancel, move || {
        let summary =
            crate::save_to_stream_with_progress(&value, &mut sink, &options, &mut observer)?;
        Ok((sink, summary))
    })
    .await
}

/// Non-blocking [`crate::load_from_stream_detailed`]; the source is handed back
pub async fn load_from_stream_async<R, P>(
    mut source: R,
    options: ContainerOptions,
    mut observer: P,
    cancel: &CancellationToken,
) -> Result<(R, LoadOutcome)>
where
    R: Read + Seek + Send + 'static,
    P: ProgressObserver + Send + 'static,
{
    run_blocking(cancel, move || {
        let outcome = crate::load_from_stream_detailed(&mut source, &options, &mut observer)?;
        Ok((source, outcome))
    })
    .await
}
