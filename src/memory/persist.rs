//! Background sidecar writer.
//!
//! `store` only nudges this thread; bursts of nudges collapse into a single
//! sidecar rewrite. Explicit flushes wait for the write and get its result.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

use super::index::{write_sidecar, RecordIndex};

enum PersistMsg {
    Dirty,
    Flush(Sender<std::io::Result<()>>),
    Shutdown,
}

pub(crate) struct IndexPersister {
    path: PathBuf,
    index: Arc<RwLock<RecordIndex>>,
    tx: Sender<PersistMsg>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl IndexPersister {
    pub(crate) fn spawn(path: PathBuf, index: Arc<RwLock<RecordIndex>>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let thread_path = path.clone();
        let thread_index = Arc::clone(&index);
        let handle = std::thread::Builder::new()
            .name("mnemos-index-writer".into())
            .spawn(move || run(rx, thread_path, thread_index))?;
        Ok(Self {
            path,
            index,
            tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Schedule a save without waiting for it.
    pub(crate) fn notify(&self) {
        if self.tx.send(PersistMsg::Dirty).is_err() {
            tracing::warn!("index writer stopped; sidecar save skipped");
        }
    }

    /// Save now and wait for the result.
    pub(crate) fn flush(&self) -> std::io::Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(PersistMsg::Flush(ack_tx)).is_ok() {
            if let Ok(result) = ack_rx.recv() {
                return result;
            }
        }
        // Writer thread is gone; nothing else can race on the temp file.
        save(&self.path, &self.index)
    }

    fn shutdown(&self) {
        let _ = self.tx.send(PersistMsg::Shutdown);
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("index writer thread panicked");
            }
        }
    }
}

impl Drop for IndexPersister {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(rx: Receiver<PersistMsg>, path: PathBuf, index: Arc<RwLock<RecordIndex>>) {
    while let Ok(first) = rx.recv() {
        let mut dirty = false;
        let mut acks = Vec::new();
        let mut shutdown = false;

        for msg in std::iter::once(first).chain(rx.try_iter()) {
            match msg {
                PersistMsg::Dirty => dirty = true,
                PersistMsg::Flush(ack) => acks.push(ack),
                PersistMsg::Shutdown => shutdown = true,
            }
        }

        if dirty || !acks.is_empty() {
            let result = save(&path, &index);
            match &result {
                Ok(()) => tracing::debug!(path = %path.display(), "index sidecar saved"),
                Err(e) => tracing::error!(path = %path.display(), error = %e, "index sidecar save failed"),
            }
            for ack in acks {
                let reply = match &result {
                    Ok(()) => Ok(()),
                    Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
                };
                let _ = ack.send(reply);
            }
        }

        if shutdown {
            break;
        }
    }
}

fn save(path: &std::path::Path, index: &RwLock<RecordIndex>) -> std::io::Result<()> {
    // Render under the read lock, write without it.
    let text = index
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_sidecar();
    write_sidecar(path, &text)
}
