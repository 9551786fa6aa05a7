//! Drives a simulated device over a socketpair: boot event, hello command,
//! then a fire-and-forget reset.
//!
//! Run with: cargo run --example hello-device

#[cfg(unix)]
fn main() {
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;
    use std::time::Duration;

    use xapilink::frame::{FrameReader, FrameType, FrameWriter};
    use xapilink::host::{Link, LinkConfig};
    use xapilink::schema::Schema;
    use xapilink::transport::LinkStream;

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

    let schema = Arc::new(Schema::from_sources(&[DEFINITION]).expect("definition should load"));
    let (host_side, device_side) = UnixStream::pair().expect("socketpair should open");

    // Simulated firmware: announce boot, answer hello, stop on reset.
    let device = std::thread::spawn(move || {
        let read_half = device_side.try_clone().expect("stream should clone");
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(device_side);

        // boot(major=3, minor=2)
        writer
            .send(FrameType::Event, 0, 1, 0, &[0x03, 0x00, 0x02, 0x00])
            .expect("boot event should send");

        while let Ok(frame) = reader.read_frame() {
            match (frame.header.class_id, frame.header.message_id) {
                (1, 0) => writer
                    .send(FrameType::Command, 0, 1, 0, &[0x00, 0x00])
                    .expect("hello response should send"),
                (1, 1) => return,
                _ => {}
            }
        }
    });

    let link = Link::open(
        LinkStream::from_unix_stream(host_side),
        schema,
        LinkConfig::default(),
    )
    .expect("link should open");

    let boot = link
        .pop_event(Some(Duration::from_secs(2)))
        .expect("boot event should arrive");
    println!("event:    {boot}");

    let response = link
        .call("bt", "system", "hello", &[])
        .expect("hello should succeed");
    println!("response: {response}");

    link.call("bt", "system", "reset", &[1u8.into()])
        .expect("reset should send");

    device.join().expect("device thread should finish");
}

#[cfg(not(unix))]
fn main() {
    eprintln!("this example needs Unix domain sockets");
}
