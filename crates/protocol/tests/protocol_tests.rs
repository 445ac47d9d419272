//! Protocol integration tests
//!
//! Exercises the public wire surface end-to-end: raw byte inputs a real
//! client could send, and the exact JSON the server must produce.

use protocol::{
    AttachArgs, CommandRequest, CommandResponse, DeviceDescriptor, ProtocolError, decode_request,
    decode_response, encode_request, encode_response,
};
use std::collections::BTreeMap;

fn hub_device(bus_id: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        bus_id: bus_id.parse().unwrap(),
        vendor_id: 0x0bda,
        product_id: 0x5400,
        device_node: "/dev/bus/usb/001/004".to_string(),
        serial: String::new(),
        description: "Realtek 4-Port Hub".to_string(),
        attributes: BTreeMap::new(),
    }
}

#[test]
fn list_request_from_raw_bytes() {
    let req = decode_request(br#"{"command":"list"}"#).unwrap();
    assert_eq!(req, CommandRequest::List);
}

#[test]
fn attach_request_with_all_selector_fields() {
    let raw = br#"{"command":"attach","id":"0BDA:5400","bus":"1-2.3","serial":"S1","description":"hub","first":true}"#;
    let CommandRequest::Attach(args) = decode_request(raw).unwrap() else {
        panic!("expected attach");
    };
    assert_eq!(args.id.as_deref(), Some("0BDA:5400"));
    assert_eq!(args.bus.as_deref(), Some("1-2.3"));
    assert_eq!(args.serial.as_deref(), Some("S1"));
    assert_eq!(args.description.as_deref(), Some("hub"));
    assert!(args.first);
}

#[test]
fn list_response_wire_shape() {
    let response = CommandResponse::devices(vec![hub_device("1-2")]);
    let bytes = encode_response(&response).unwrap();
    let text = std::str::from_utf8(&bytes).unwrap();

    assert!(text.ends_with('\n'));
    assert!(text.contains(r#""status":"success""#));
    assert!(text.contains(r#""busId":"1-2""#));
    assert!(text.contains(r#""vendorId":"0bda""#));
    assert!(text.contains(r#""productId":"5400""#));
}

#[test]
fn each_response_variant_roundtrips() {
    let variants = vec![
        CommandResponse::devices(vec![hub_device("1-2"), hub_device("2-1.4")]),
        CommandResponse::ok(),
        CommandResponse::failure("ambiguous match (2 candidates)"),
        CommandResponse::error("Invalid JSON: expected value at line 1 column 1"),
    ];
    for variant in variants {
        let bytes = encode_response(&variant).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), variant);
    }
}

#[test]
fn malformed_bytes_stage_to_distinct_errors() {
    assert!(matches!(
        decode_request(b"not-json"),
        Err(ProtocolError::InvalidJson(_))
    ));
    assert!(matches!(
        decode_request(b"{}"),
        Err(ProtocolError::InvalidCommand)
    ));
    assert!(matches!(
        decode_request(br#"{"command":"poke"}"#),
        Err(ProtocolError::UnknownCommand)
    ));
}

#[test]
fn encoded_request_fits_single_read() {
    // Worst-case realistic attach request stays well under the 1 KiB
    // single-read ceiling.
    let req = CommandRequest::Attach(AttachArgs {
        id: Some("ffff:ffff".to_string()),
        bus: Some("12-1.2.3.4.5.6".to_string()),
        serial: Some("X".repeat(64)),
        description: Some("Y".repeat(128)),
        first: true,
    });
    let bytes = encode_request(&req).unwrap();
    assert!(bytes.len() <= protocol::MAX_REQUEST_SIZE);
}
