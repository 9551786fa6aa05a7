use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};
use xapilink_codec::{decode_payload, encode_payload, DecodedValue, Value};
use xapilink_frame::{
    FrameConfig, FrameError, FrameHeader, FrameReader, FrameType, FrameWriter, MAX_WIRE_PAYLOAD,
};
use xapilink_schema::{CommandEntry, Schema};
use xapilink_transport::LinkStream;

use crate::error::{HostError, Result};
use crate::events::{EventQueue, EventStream};

/// How decoded events are delivered.
#[derive(Clone, Default)]
pub enum EventMode {
    /// Append to the link's event queue; consumers drain it with
    /// [`Link::pop_event`] or [`Link::events`].
    #[default]
    Queue,
    /// Invoke the handler synchronously on the reader thread. The queue is
    /// bypassed; a slow handler delays response resolution.
    Handler(Arc<dyn Fn(DecodedValue) + Send + Sync>),
}

impl std::fmt::Debug for EventMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventMode::Queue => f.write_str("Queue"),
            EventMode::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Link tunables.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Default deadline for a command's response.
    pub response_timeout: Duration,
    /// Reader thread poll interval. Bounds how long close() waits.
    pub read_timeout: Duration,
    /// Write timeout applied to the stream.
    pub write_timeout: Duration,
    /// Largest payload accepted or sent.
    pub max_payload: usize,
    /// Resynchronization bound before the stream is declared dead.
    pub max_resync_skips: usize,
    /// Event delivery mode.
    pub event_mode: EventMode,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
            write_timeout: Duration::from_secs(1),
            max_payload: MAX_WIRE_PAYLOAD,
            max_resync_skips: 4096,
            event_mode: EventMode::Queue,
        }
    }
}

type CommandOutcome = Result<DecodedValue>;

/// The single outstanding command. `(device, class, message)` ids must match
/// for a response to resolve it.
struct PendingCommand {
    device_id: u8,
    class_id: u8,
    message_id: u8,
    command: String,
    tx: SyncSender<CommandOutcome>,
}

impl PendingCommand {
    fn matches(&self, header: &FrameHeader) -> bool {
        self.device_id == header.device_id
            && self.class_id == header.class_id
            && self.message_id == header.message_id
    }
}

struct Shared {
    pending: Mutex<Option<PendingCommand>>,
    events: EventQueue,
    /// Set on transport failure or close; terminal.
    closed: AtomicBool,
    /// Close requested; the reader exits at its next poll.
    stop: AtomicBool,
    /// Lifetime resynchronization discard count, mirrored from the reader.
    skipped: AtomicU64,
}

/// A live connection to a device stack.
///
/// Owns the write side and a dedicated reader thread that decodes every
/// inbound frame, resolves command responses, and delivers events. Commands
/// are strictly one-at-a-time per link; concurrent callers queue on an
/// internal gate.
pub struct Link {
    schema: Arc<Schema>,
    writer: Mutex<FrameWriter<LinkStream>>,
    gate: Mutex<()>,
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
    config: LinkConfig,
}

impl Link {
    /// Open a link over a connected stream.
    ///
    /// Clones the stream for the reader thread and applies the configured
    /// timeouts to both halves.
    pub fn open(stream: LinkStream, schema: Arc<Schema>, config: LinkConfig) -> Result<Self> {
        let reader_stream = stream.try_clone()?;
        let frame_config = FrameConfig {
            max_payload: config.max_payload,
            read_timeout: Some(config.read_timeout),
            write_timeout: Some(config.write_timeout),
            max_resync_skips: config.max_resync_skips,
            devices: Some(schema.device_ids()),
        };

        let frame_reader = FrameReader::with_config_stream(reader_stream, frame_config.clone())?;
        let writer = FrameWriter::with_config_stream(stream, frame_config)?;

        let shared = Arc::new(Shared {
            pending: Mutex::new(None),
            events: EventQueue::new(),
            closed: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            skipped: AtomicU64::new(0),
        });

        let reader = {
            let schema = Arc::clone(&schema);
            let shared = Arc::clone(&shared);
            let event_mode = config.event_mode.clone();
            std::thread::Builder::new()
                .name("xapilink-reader".to_string())
                .spawn(move || reader_loop(frame_reader, schema, shared, event_mode))
                .map_err(|e| HostError::Transport(e.into()))?
        };

        Ok(Self {
            schema,
            writer: Mutex::new(writer),
            gate: Mutex::new(()),
            shared,
            reader: Some(reader),
            config,
        })
    }

    /// Invoke a command with the default response timeout.
    pub fn call(
        &self,
        device: &str,
        class: &str,
        command: &str,
        args: &[Value],
    ) -> Result<DecodedValue> {
        self.call_with_timeout(device, class, command, args, self.config.response_timeout)
    }

    /// Invoke a command and wait up to `timeout` for the response.
    ///
    /// On timeout the pending slot is cleared before returning, so the link
    /// is idle again; a response that straggles in later is discarded.
    /// Commands defined without a response return an empty value right
    /// after the write.
    pub fn call_with_timeout(
        &self,
        device: &str,
        class: &str,
        command: &str,
        args: &[Value],
        timeout: Duration,
    ) -> Result<DecodedValue> {
        let entry = self.lookup(device, class, command)?;
        let payload = encode_payload(&entry.command, args)?;
        let descriptor = &entry.command;

        // Half-duplex: one command in flight per link.
        let _gate = self.gate.lock().expect("command gate poisoned");
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(HostError::Closed);
        }

        let Some(_response) = entry.response.as_ref() else {
            self.write_command(descriptor.device_id, descriptor.class_id, descriptor.id, &payload)?;
            return Ok(DecodedValue::new(Arc::clone(descriptor), Vec::new()));
        };

        let (tx, rx) = mpsc::sync_channel(1);
        {
            let mut slot = self.shared.pending.lock().expect("pending slot poisoned");
            *slot = Some(PendingCommand {
                device_id: descriptor.device_id,
                class_id: descriptor.class_id,
                message_id: descriptor.id,
                command: descriptor.qualified_name(),
                tx,
            });
        }

        if let Err(err) = self.write_command(
            descriptor.device_id,
            descriptor.class_id,
            descriptor.id,
            &payload,
        ) {
            self.shared
                .pending
                .lock()
                .expect("pending slot poisoned")
                .take();
            return Err(err);
        }

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                let cleared = self
                    .shared
                    .pending
                    .lock()
                    .expect("pending slot poisoned")
                    .take()
                    .is_some();
                if !cleared {
                    // The reader resolved the slot as the deadline fired.
                    if let Ok(outcome) = rx.try_recv() {
                        return outcome;
                    }
                }
                warn!(
                    command = %self.qualified(device, class, command),
                    ?timeout,
                    "no response before deadline"
                );
                Err(HostError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(HostError::Closed),
        }
    }

    /// Pop the next queued event, waiting up to `timeout` (forever when
    /// `None`). Returns `None` on timeout or once the link is closed and
    /// the queue drained.
    pub fn pop_event(&self, timeout: Option<Duration>) -> Option<DecodedValue> {
        self.shared.events.pop(timeout)
    }

    /// Iterate queued events with two independent clocks: a per-item wait
    /// bound and a total bound for the whole iteration. Without a per-item
    /// wait the stream drains what is buffered and stops.
    pub fn events(
        &self,
        timeout_per_item: Option<Duration>,
        max_total: Option<Duration>,
    ) -> EventStream<'_> {
        self.shared.events.stream(timeout_per_item, max_total)
    }

    /// Number of events currently queued.
    pub fn pending_events(&self) -> usize {
        self.shared.events.len()
    }

    /// Whether the link has failed or been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Bytes discarded so far while resynchronizing on corrupted input.
    pub fn skipped_bytes(&self) -> u64 {
        self.shared.skipped.load(Ordering::Relaxed)
    }

    /// The loaded definitions this link dispatches against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Compare a version string reported by the device against the loaded
    /// definition. A mismatch is logged, never an error: decoding usually
    /// still works across minor revisions.
    pub fn check_peer_version(&self, device: &str, reported: &str) {
        match self.schema.version(device) {
            Some(expected) if expected != reported => warn!(
                device,
                expected, reported, "device version differs from loaded definition"
            ),
            None => debug!(device, reported, "definition carries no version to compare"),
            _ => {}
        }
    }

    /// Stop the reader thread and mark the link closed. Idempotent; also
    /// runs on drop.
    pub fn close(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(handle) = self.reader.take() {
            // The reader notices the flag at its next read timeout poll.
            let _ = handle.join();
        }
    }

    fn write_command(&self, device_id: u8, class_id: u8, message_id: u8, payload: &[u8]) -> Result<()> {
        self.writer
            .lock()
            .expect("frame writer poisoned")
            .send(FrameType::Command, device_id, class_id, message_id, payload)
            .map_err(Into::into)
    }

    fn lookup(&self, device: &str, class: &str, command: &str) -> Result<&CommandEntry> {
        let device_schema = self
            .schema
            .device(device)
            .ok_or_else(|| HostError::UnknownDevice(device.to_string()))?;
        let class_schema = device_schema
            .class(class)
            .ok_or_else(|| HostError::UnknownClass {
                device: device.to_string(),
                class: class.to_string(),
            })?;
        class_schema
            .command(command)
            .ok_or_else(|| HostError::UnknownCommand {
                device: device.to_string(),
                class: class.to_string(),
                command: command.to_string(),
            })
    }

    fn qualified(&self, device: &str, class: &str, command: &str) -> String {
        format!("{device}.{class}.{command}")
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("closed", &self.is_closed())
            .field("pending_events", &self.pending_events())
            .finish_non_exhaustive()
    }
}

fn reader_loop(
    mut reader: FrameReader<LinkStream>,
    schema: Arc<Schema>,
    shared: Arc<Shared>,
    event_mode: EventMode,
) {
    loop {
        if shared.stop.load(Ordering::Acquire) {
            break;
        }
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            // Read timeout is the stop-flag poll interval.
            Err(FrameError::TimedOut) => continue,
            Err(err) => {
                if !shared.stop.load(Ordering::Acquire) {
                    warn!(error = %err, "link reader stopped");
                }
                break;
            }
        };
        shared
            .skipped
            .store(reader.skipped_bytes(), Ordering::Relaxed);

        let header = frame.header;
        match header.frame_type {
            FrameType::Command => {
                // Device-to-host command frames carry responses.
                let Some(descriptor) =
                    schema.response_for(header.device_id, header.class_id, header.message_id)
                else {
                    warn!(
                        device_id = header.device_id,
                        class_id = header.class_id,
                        message_id = header.message_id,
                        "response frame matches no known command"
                    );
                    continue;
                };
                let decoded = match decode_payload(Arc::clone(descriptor), &frame.payload) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        warn!(
                            error = %err,
                            message = %descriptor.qualified_name(),
                            "dropping undecodable response"
                        );
                        continue;
                    }
                };
                resolve_pending(&shared, &header, decoded);
            }
            FrameType::Event => {
                let Some(descriptor) =
                    schema.event_for(header.device_id, header.class_id, header.message_id)
                else {
                    warn!(
                        device_id = header.device_id,
                        class_id = header.class_id,
                        message_id = header.message_id,
                        "event frame matches no known event"
                    );
                    continue;
                };
                let decoded = match decode_payload(Arc::clone(descriptor), &frame.payload) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        warn!(
                            error = %err,
                            message = %descriptor.qualified_name(),
                            "dropping undecodable event"
                        );
                        continue;
                    }
                };
                match &event_mode {
                    EventMode::Queue => shared.events.push(decoded),
                    EventMode::Handler(handler) => handler(decoded),
                }
            }
        }
    }

    shutdown_shared(&shared);
}

/// Mark the link failed/closed: terminal flag, wake the blocked caller if
/// any, release event waiters.
fn shutdown_shared(shared: &Shared) {
    shared.closed.store(true, Ordering::Release);
    if let Some(pending) = shared
        .pending
        .lock()
        .expect("pending slot poisoned")
        .take()
    {
        let _ = pending.tx.send(Err(HostError::Closed));
    }
    shared.events.close();
}

fn resolve_pending(shared: &Shared, header: &FrameHeader, decoded: DecodedValue) {
    let mut slot = shared.pending.lock().expect("pending slot poisoned");
    let Some(pending) = slot.take_if(|p| p.matches(header)) else {
        // Late (caller already timed out) or mismatched: both are symptoms
        // of lost correlation. Drop the frame.
        warn!(
            message = %decoded.qualified_name(),
            outstanding = slot.as_ref().map(|p| p.command.as_str()).unwrap_or("<none>"),
            "dropping response with no matching outstanding command"
        );
        return;
    };
    drop(slot);

    let outcome = match decoded.result_code() {
        Some(code) if code != 0 => Err(HostError::CommandFailed {
            code,
            command: pending.command,
            response: decoded,
        }),
        _ => Ok(decoded),
    };
    // The caller may have timed out between the slot check and here.
    let _ = pending.tx.send(outcome);
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    use bytes::{BufMut, BytesMut};

    use super::*;

    const DEFINITION: &str = r#"{
        "device_id": 0,
        "device_name": "bt",
        "version": "3.2.1",
        "classes": [
            {
                "name": "system",
                "id": 1,
                "commands": [
                    {
                        "name": "hello",
                        "id": 0,
                        "params": [],
                        "returns": [ { "name": "result", "type": "errorcode" } ]
                    },
                    {
                        "name": "reset",
                        "id": 1,
                        "params": [ { "name": "dfu", "type": "uint8" } ],
                        "no_response": true
                    },
                    {
                        "name": "echo",
                        "id": 2,
                        "params": [ { "name": "value", "type": "uint8" } ],
                        "returns": [
                            { "name": "result", "type": "errorcode" },
                            { "name": "value", "type": "uint8" }
                        ]
                    }
                ],
                "events": [
                    {
                        "name": "boot",
                        "id": 0,
                        "params": [
                            { "name": "major", "type": "uint16" },
                            { "name": "minor", "type": "uint16" }
                        ]
                    }
                ]
            }
        ]
    }"#;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_sources(&[DEFINITION]).expect("definition should load"))
    }

    fn test_config() -> LinkConfig {
        LinkConfig {
            response_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(20),
            ..LinkConfig::default()
        }
    }

    /// Device side of a socketpair: framed reader/writer over raw streams.
    struct FakeDevice {
        reader: FrameReader<UnixStream>,
        writer: FrameWriter<UnixStream>,
    }

    impl FakeDevice {
        fn new(stream: UnixStream) -> Self {
            let write_half = stream.try_clone().expect("socketpair should clone");
            Self {
                reader: FrameReader::new(stream),
                writer: FrameWriter::new(write_half),
            }
        }

        fn recv_command(&mut self) -> xapilink_frame::Frame {
            self.reader.read_frame().expect("device should read command")
        }

        fn respond(&mut self, class_id: u8, message_id: u8, payload: &[u8]) {
            self.writer
                .send(FrameType::Command, 0, class_id, message_id, payload)
                .expect("device should write response");
        }

        fn emit(&mut self, class_id: u8, message_id: u8, payload: &[u8]) {
            self.writer
                .send(FrameType::Event, 0, class_id, message_id, payload)
                .expect("device should write event");
        }
    }

    fn open_pair() -> (Link, FakeDevice) {
        open_pair_with(test_config())
    }

    fn open_pair_with(config: LinkConfig) -> (Link, FakeDevice) {
        let (host_side, device_side) = UnixStream::pair().expect("socketpair should open");
        let link = Link::open(LinkStream::from_unix_stream(host_side), schema(), config)
            .expect("link should open");
        (link, FakeDevice::new(device_side))
    }

    fn boot_payload(major: u16, minor: u16) -> Vec<u8> {
        let mut payload = BytesMut::new();
        payload.put_u16_le(major);
        payload.put_u16_le(minor);
        payload.to_vec()
    }

    #[test]
    fn hello_after_boot_scenario() {
        let (link, mut device) = open_pair();

        device.emit(1, 0, &boot_payload(3, 2));

        let boot = link
            .pop_event(Some(Duration::from_secs(2)))
            .expect("boot event should arrive");
        assert_eq!(boot.qualified_name(), "bt_evt_system_boot");
        assert_eq!(boot.field("major").unwrap().as_u64(), Some(3));

        let responder = std::thread::spawn(move || {
            let frame = device.recv_command();
            assert_eq!(frame.header.frame_type, FrameType::Command);
            assert_eq!((frame.header.class_id, frame.header.message_id), (1, 0));
            device.respond(1, 0, &[0x00, 0x00]);
        });

        let response = link.call("bt", "system", "hello", &[]).unwrap();
        assert_eq!(response.result_code(), Some(0));
        responder.join().unwrap();
    }

    #[test]
    fn non_zero_result_code_maps_to_command_failed() {
        let (link, mut device) = open_pair();

        let responder = std::thread::spawn(move || {
            device.recv_command();
            device.respond(1, 0, &[0x80, 0x01]);
        });

        let err = link.call("bt", "system", "hello", &[]).unwrap_err();
        match err {
            HostError::CommandFailed { code, command, response } => {
                assert_eq!(code, 0x0180);
                assert_eq!(command, "bt_cmd_system_hello");
                assert_eq!(response.result_code(), Some(0x0180));
            }
            other => panic!("expected CommandFailed, got {other}"),
        }
        responder.join().unwrap();
    }

    #[test]
    fn fire_and_forget_returns_immediately() {
        let (link, mut device) = open_pair();

        let response = link.call("bt", "system", "reset", &[Value::from(1u8)]).unwrap();
        assert!(response.is_empty());

        let frame = device.recv_command();
        assert_eq!((frame.header.class_id, frame.header.message_id), (1, 1));
        assert_eq!(frame.payload.as_ref(), &[1]);
    }

    #[test]
    fn second_caller_blocks_until_first_resolves() {
        let (link, mut device) = open_pair();
        let link = Arc::new(link);

        let device_thread = std::thread::spawn(move || {
            for _ in 0..2 {
                let frame = device.recv_command();
                assert_eq!(frame.header.message_id, 2);
                // Echo the argument back after a pause so the second caller
                // has to wait on the gate.
                std::thread::sleep(Duration::from_millis(50));
                device.respond(1, 2, &[0x00, 0x00, frame.payload[0]]);
            }
        });

        let first = {
            let link = Arc::clone(&link);
            std::thread::spawn(move || link.call("bt", "system", "echo", &[Value::from(11u8)]))
        };
        std::thread::sleep(Duration::from_millis(10));
        let second = {
            let link = Arc::clone(&link);
            std::thread::spawn(move || link.call("bt", "system", "echo", &[Value::from(22u8)]))
        };

        let r1 = first.join().unwrap().unwrap();
        let r2 = second.join().unwrap().unwrap();
        // Each caller gets the response to its own argument.
        assert_eq!(r1.field("value").unwrap().as_u64(), Some(11));
        assert_eq!(r2.field("value").unwrap().as_u64(), Some(22));
        device_thread.join().unwrap();
    }

    #[test]
    fn timeout_returns_link_to_idle_and_drops_late_response() {
        let (link, mut device) = open_pair();

        let device_thread = std::thread::spawn(move || {
            // Ignore hello until well past the caller's deadline.
            let frame = device.recv_command();
            assert_eq!(frame.header.message_id, 0);
            std::thread::sleep(Duration::from_millis(150));
            device.respond(1, 0, &[0x00, 0x00]);

            // Then serve echo normally.
            let frame = device.recv_command();
            assert_eq!(frame.header.message_id, 2);
            device.respond(1, 2, &[0x00, 0x00, frame.payload[0]]);
        });

        let err = link
            .call_with_timeout("bt", "system", "hello", &[], Duration::from_millis(40))
            .unwrap_err();
        assert!(matches!(err, HostError::Timeout(_)));

        // The late hello response must not leak into the next call.
        let response = link.call("bt", "system", "echo", &[Value::from(9u8)]).unwrap();
        assert_eq!(response.field("value").unwrap().as_u64(), Some(9));
        device_thread.join().unwrap();
    }

    #[test]
    fn resynchronizes_after_junk_bytes() {
        let (link, mut device) = open_pair();

        // First byte of each junk word decodes to device id 15, unknown here.
        let junk = [0xFFu8; 7];
        use std::io::Write;
        device
            .writer
            .get_mut()
            .write_all(&junk)
            .expect("junk should write");
        device.emit(1, 0, &boot_payload(1, 0));

        let boot = link
            .pop_event(Some(Duration::from_secs(2)))
            .expect("event should arrive after resync");
        assert_eq!(boot.qualified_name(), "bt_evt_system_boot");
        assert_eq!(link.skipped_bytes(), junk.len() as u64);
    }

    #[test]
    fn undecodable_event_is_dropped_and_reading_continues() {
        let (link, mut device) = open_pair();

        // boot wants 4 payload bytes; send 2.
        device.emit(1, 0, &[0x03, 0x00]);
        device.emit(1, 0, &boot_payload(4, 4));

        let boot = link
            .pop_event(Some(Duration::from_secs(2)))
            .expect("valid event should still arrive");
        assert_eq!(boot.field("major").unwrap().as_u64(), Some(4));
        assert_eq!(link.pending_events(), 0);
    }

    #[test]
    fn event_order_is_preserved_around_command_traffic() {
        let (link, mut device) = open_pair();

        let device_thread = std::thread::spawn(move || {
            device.emit(1, 0, &boot_payload(1, 0));
            let frame = device.recv_command();
            device.emit(1, 0, &boot_payload(2, 0));
            device.respond(1, 2, &[0x00, 0x00, frame.payload[0]]);
            device.emit(1, 0, &boot_payload(3, 0));
        });

        link.call("bt", "system", "echo", &[Value::from(1u8)]).unwrap();
        device_thread.join().unwrap();

        let majors: Vec<u64> = link
            .events(Some(Duration::from_millis(200)), Some(Duration::from_secs(2)))
            .map(|e| e.field("major").unwrap().as_u64().unwrap())
            .collect();
        assert_eq!(majors, vec![1, 2, 3]);
    }

    #[test]
    fn handler_mode_bypasses_the_queue() {
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let config = LinkConfig {
            event_mode: EventMode::Handler(Arc::new(move |event| {
                let major = event.field("major").unwrap().as_u64().unwrap();
                sink.lock().unwrap().push(major);
            })),
            ..test_config()
        };
        let (link, mut device) = open_pair_with(config);

        device.emit(1, 0, &boot_payload(7, 0));

        let deadline = Instant::now() + Duration::from_secs(2);
        while seen.lock().unwrap().is_empty() {
            assert!(Instant::now() < deadline, "handler should run");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*seen.lock().unwrap(), vec![7]);
        assert_eq!(link.pending_events(), 0);
    }

    #[test]
    fn peer_disconnect_closes_the_link() {
        let (link, device) = open_pair();
        drop(device);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !link.is_closed() {
            assert!(Instant::now() < deadline, "reader should observe EOF");
            std::thread::sleep(Duration::from_millis(5));
        }

        let err = link.call("bt", "system", "hello", &[]).unwrap_err();
        assert!(matches!(err, HostError::Closed));
        assert!(link.pop_event(Some(Duration::from_millis(10))).is_none());
    }

    #[test]
    fn caller_blocked_on_response_is_released_by_disconnect() {
        let (link, mut device) = open_pair();
        let link = Arc::new(link);

        let caller = {
            let link = Arc::clone(&link);
            std::thread::spawn(move || link.call("bt", "system", "hello", &[]))
        };

        // Read the command, then hang up instead of responding.
        device.recv_command();
        drop(device);

        let err = caller.join().unwrap().unwrap_err();
        assert!(matches!(err, HostError::Closed | HostError::Timeout(_)));
    }

    #[test]
    fn unknown_names_are_rejected_before_any_io() {
        let (link, _device) = open_pair();

        assert!(matches!(
            link.call("zigbee", "system", "hello", &[]).unwrap_err(),
            HostError::UnknownDevice(_)
        ));
        assert!(matches!(
            link.call("bt", "mesh", "hello", &[]).unwrap_err(),
            HostError::UnknownClass { .. }
        ));
        assert!(matches!(
            link.call("bt", "system", "warp", &[]).unwrap_err(),
            HostError::UnknownCommand { .. }
        ));
    }

    #[test]
    fn argument_mismatch_is_rejected_before_any_io() {
        let (link, _device) = open_pair();

        let err = link.call("bt", "system", "echo", &[]).unwrap_err();
        assert!(matches!(err, HostError::Argument(_)));
    }

    #[test]
    fn close_is_idempotent_and_runs_on_drop() {
        let (mut link, _device) = open_pair();
        link.close();
        link.close();
        assert!(link.is_closed());
    }
}
