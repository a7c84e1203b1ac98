// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel fabric: buffered edges between wants.
//!
//! Each provider->user edge is one [`Edge`], shared by both endpoints.
//! Clones refer to the same underlying channel, so the reconciler can
//! reuse an edge across topology regenerations without dropping buffered
//! messages. Identity is pointer identity on the shared allocation.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffer capacity of every edge.
pub const EDGE_CAPACITY: usize = 100;

struct EdgeInner {
    name: String,
    tx: mpsc::Sender<Value>,
    // Exactly one want consumes each edge, so the receiver mutex is
    // uncontended; it exists to keep Edge cloneable.
    rx: tokio::sync::Mutex<mpsc::Receiver<Value>>,
}

/// A buffered message channel between one provider and one user.
#[derive(Clone)]
pub struct Edge {
    inner: Arc<EdgeInner>,
}

impl Edge {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(EDGE_CAPACITY);
        Self {
            inner: Arc::new(EdgeInner {
                name: name.into(),
                tx,
                rx: tokio::sync::Mutex::new(rx),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Non-blocking send. Returns false when the buffer is full and the
    /// message was dropped.
    pub fn try_send(&self, value: Value) -> bool {
        self.inner.tx.try_send(value).is_ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<Value> {
        let mut rx = self.inner.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Await the next message.
    pub async fn recv(&self) -> Option<Value> {
        self.inner.rx.lock().await.recv().await
    }

    /// Number of messages currently buffered.
    pub fn buffered(&self) -> usize {
        self.inner.tx.max_capacity() - self.inner.tx.capacity()
    }

    /// True when both handles refer to the same underlying channel.
    pub fn same_channel(&self, other: &Edge) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("name", &self.inner.name)
            .field("buffered", &self.buffered())
            .finish()
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
