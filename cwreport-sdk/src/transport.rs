//! Transports that deliver batches to the backend.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use cwreport_types::Batch;

use crate::error::TransportError;

/// Delivers one batch at a time.
///
/// Delivery is synchronous: `deliver` blocks until the batch is accepted or
/// fails as a whole. Transports never split batches and never retry.
pub trait Transport: Send + Sync {
    /// Deliver a batch of at most 20 datapoints.
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        (**self).deliver(batch)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        (**self).deliver(batch)
    }
}

/// Keeps every delivered batch in memory.
///
/// Clones share the same storage, so a test can hand one clone to a
/// reporter and inspect the other.
///
/// # Example
///
/// ```rust
/// use cwreport_sdk::{MemoryTransport, Transport};
/// use cwreport_types::Batch;
///
/// let transport = MemoryTransport::new();
/// transport.deliver(&Batch::new("app")).unwrap();
/// assert_eq!(transport.deliveries(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    batches: Arc<Mutex<Vec<Batch>>>,
    fail_after: Option<usize>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `successes` deliveries, then fail every later one.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            batches: Arc::default(),
            fail_after: Some(successes),
        }
    }

    /// Batches delivered so far, in order.
    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    /// Number of successful deliveries.
    pub fn deliveries(&self) -> usize {
        self.batches.lock().len()
    }

    /// Forget every delivered batch.
    pub fn clear(&self) {
        self.batches.lock().clear();
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        let mut batches = self.batches.lock();
        if self.fail_after.is_some_and(|limit| batches.len() >= limit) {
            return Err(TransportError::Io(std::io::Error::other(
                "memory transport configured to fail",
            )));
        }
        batches.push(batch.clone());
        Ok(())
    }
}

/// Appends each batch to a file as one line of JSON.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    /// Create a file transport. The file is created on first delivery.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Transport for FileTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(batch)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }
}

/// Hands batches to a bounded tokio channel.
///
/// Never waits for capacity: a full channel is a failed delivery.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: tokio::sync::mpsc::Sender<Batch>,
}

#[cfg(feature = "tokio")]
impl ChannelTransport {
    /// Create a channel transport and return both the transport and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cwreport_sdk::ChannelTransport;
    ///
    /// let (transport, mut rx) = ChannelTransport::new(16);
    ///
    /// // Later, receive batches
    /// // while let Some(batch) = rx.recv().await {
    /// //     println!("Got batch of {} datapoints", batch.len());
    /// // }
    /// ```
    pub fn new(buffer: usize) -> (Self, tokio::sync::mpsc::Receiver<Batch>) {
        let (tx, rx) = tokio::sync::mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[cfg(feature = "tokio")]
impl Transport for ChannelTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        use tokio::sync::mpsc::error::TrySendError;

        self.tx.try_send(batch.clone()).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::ChannelFull,
            TrySendError::Closed(_) => TransportError::ChannelClosed,
        })
    }
}

/// POSTs each batch as JSON to an HTTP endpoint.
///
/// Any non-2xx response is a failed delivery. Must not be called from
/// inside an async task; the reporter runs deliveries on the blocking pool.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    headers: Vec<(String, String)>,
    timeout: std::time::Duration,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

    /// Create a transport for an endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: Vec::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(feature = "http")]
impl Transport for HttpTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let mut request = client.post(&self.endpoint).json(batch);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
