//! Scripted transport for driver tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Connection, Transport};
use crate::error::{BroadcasterError, Result};

#[derive(Default)]
struct MockInner {
    pending: usize,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    fail_writes: usize,
    fail_read: bool,
    accepted: usize,
    closed: usize,
}

/// Shared view of everything the driver did through the mock
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a client for the next `accept`
    pub fn add_pending(&self) {
        self.inner.lock().unwrap().pending += 1;
    }

    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().unwrap().inbound.push_back(data.to_vec());
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.inner.lock().unwrap().fail_writes = count;
    }

    pub fn fail_next_read(&self) {
        self.inner.lock().unwrap().fail_read = true;
    }

    pub fn written(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .written
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn clear_written(&self) {
        self.inner.lock().unwrap().written.clear();
    }

    pub fn accepted(&self) -> usize {
        self.inner.lock().unwrap().accepted
    }

    pub fn closed(&self) -> usize {
        self.inner.lock().unwrap().closed
    }
}

impl Transport for MockTransport {
    type Connection = MockConnection;

    async fn accept(&mut self) -> Result<MockConnection> {
        let mut inner = self.inner.lock().unwrap();
        if inner.pending == 0 {
            return Err(BroadcasterError::unavailable("no mock client"));
        }
        inner.pending -= 1;
        inner.accepted += 1;
        Ok(MockConnection {
            inner: Arc::clone(&self.inner),
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub struct MockConnection {
    inner: Arc<Mutex<MockInner>>,
}

impl Connection for MockConnection {
    async fn read_nonblocking(&mut self) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_read {
            inner.fail_read = false;
            return Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset).into());
        }
        Ok(inner.inbound.pop_front())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes > 0 {
            inner.fail_writes -= 1;
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }
        inner.written.push(bytes.to_vec());
        Ok(())
    }

    async fn close(&mut self) {
        self.inner.lock().unwrap().closed += 1;
    }

    fn peer(&self) -> &str {
        "mock-peer"
    }
}
