//! Mock Fluentd service for testing
//!
//! Listens on a loopback TCP port, decodes incoming MessagePack forward
//! messages and records them so tests can assert on what an exporter
//! actually put on the wire.

use std::io::{Cursor, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rmpv::Value as MpValue;
use tracing::{debug, info, warn};

use crate::error::FluentdError;
use crate::fluentd::EventTime;

/// A single `[time, record]` entry decoded from a forward message.
#[derive(Debug, Clone)]
pub struct ReceivedEntry {
    /// Event timestamp, when encoded as the EventTime extension.
    pub time: Option<EventTime>,
    /// The record map, kept as a raw MessagePack value.
    pub record: MpValue,
}

/// A decoded forward-protocol message: a tag plus its entries.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// The Fluentd tag the message was addressed to.
    pub tag: String,
    /// The entries carried by the message, in wire order.
    pub entries: Vec<ReceivedEntry>,
}

/// Mock Fluentd server state
#[derive(Debug, Default)]
struct MockServerState {
    /// Messages received, in arrival order
    received_messages: Vec<ReceivedMessage>,
    /// Count of connections accepted
    connections: u64,
}

/// Mock Fluentd server for testing
#[derive(Debug, Clone)]
pub struct MockFluentdServer {
    state: Arc<Mutex<MockServerState>>,
}

impl MockFluentdServer {
    /// Create a new mock Fluentd server
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockServerState::default())),
        }
    }

    /// Start the server on an ephemeral loopback port.
    ///
    /// Returns the address where the server is listening. The accept
    /// loop runs on a background thread for the lifetime of the
    /// process; tests create a fresh server per case.
    pub fn start(&self) -> Result<SocketAddr, FluentdError> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;

        let state = self.state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        {
                            let mut state = lock_state(&state);
                            state.connections += 1;
                        }
                        let conn_state = state.clone();
                        thread::spawn(move || read_connection(stream, conn_state));
                    }
                    Err(e) => {
                        warn!(error = %e, "Mock Fluentd accept failed");
                        break;
                    }
                }
            }
        });

        info!(addr = %addr, "Mock Fluentd server started");
        Ok(addr)
    }

    /// Start the server and return its endpoint as a `tcp://` URL.
    pub fn start_endpoint(&self) -> Result<String, FluentdError> {
        let addr = self.start()?;
        Ok(format!("tcp://{}", addr))
    }

    /// Get all messages received so far
    pub fn received_messages(&self) -> Vec<ReceivedMessage> {
        lock_state(&self.state).received_messages.clone()
    }

    /// Get the number of messages received so far
    pub fn message_count(&self) -> usize {
        lock_state(&self.state).received_messages.len()
    }

    /// Get the number of connections accepted so far
    pub fn connection_count(&self) -> u64 {
        lock_state(&self.state).connections
    }

    /// Wait until at least `count` messages have arrived.
    ///
    /// Polls the received buffer until the count is reached or the
    /// timeout elapses, then returns whatever has arrived.
    pub fn wait_for_messages(&self, count: usize, timeout: Duration) -> Vec<ReceivedMessage> {
        let deadline = Instant::now() + timeout;
        loop {
            let messages = self.received_messages();
            if messages.len() >= count || Instant::now() >= deadline {
                return messages;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Reset the received state (for test isolation)
    pub fn reset(&self) {
        let mut state = lock_state(&self.state);
        state.received_messages.clear();
    }
}

impl Default for MockFluentdServer {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_state(state: &Arc<Mutex<MockServerState>>) -> std::sync::MutexGuard<'_, MockServerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read one connection to EOF, decoding forward messages as they
/// become complete in the stream buffer.
fn read_connection(mut stream: TcpStream, state: Arc<Mutex<MockServerState>>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                drain_messages(&mut buffer, &state);
            }
            Err(e) => {
                debug!(error = %e, "Mock Fluentd read failed");
                break;
            }
        }
    }
    drain_messages(&mut buffer, &state);
}

/// Decode as many complete MessagePack values as the buffer holds,
/// leaving any trailing partial value for the next read.
fn drain_messages(buffer: &mut Vec<u8>, state: &Arc<Mutex<MockServerState>>) {
    let mut cursor = Cursor::new(buffer.as_slice());
    let mut consumed = 0u64;
    loop {
        match rmpv::decode::read_value(&mut cursor) {
            Ok(value) => {
                consumed = cursor.position();
                match parse_forward_message(&value) {
                    Some(message) => {
                        let mut state = lock_state(state);
                        state.received_messages.push(message);
                    }
                    None => warn!(?value, "Mock Fluentd received a non-forward message"),
                }
            }
            Err(_) => break,
        }
    }
    buffer.drain(..consumed as usize);
}

/// Parse a decoded value as a forward message: `[tag, [[time, record], ...]]`.
fn parse_forward_message(value: &MpValue) -> Option<ReceivedMessage> {
    let outer = value.as_array()?;
    if outer.len() != 2 {
        return None;
    }
    let tag = outer[0].as_str()?.to_owned();
    let mut entries = Vec::new();
    for entry in outer[1].as_array()? {
        let pair = entry.as_array()?;
        if pair.len() != 2 {
            return None;
        }
        if !pair[1].is_map() {
            return None;
        }
        entries.push(ReceivedEntry {
            time: parse_event_time(&pair[0]),
            record: pair[1].clone(),
        });
    }
    Some(ReceivedMessage { tag, entries })
}

/// Extract an EventTime from a fixext8 value with the reserved type tag.
fn parse_event_time(value: &MpValue) -> Option<EventTime> {
    match value {
        MpValue::Ext(ext_type, data) => {
            if *ext_type != crate::fluentd::value::EVENT_TIME_EXT_TYPE {
                return None;
            }
            let bytes: [u8; 8] = data.as_slice().try_into().ok()?;
            Some(EventTime::from_bytes(bytes))
        }
        _ => None,
    }
}
