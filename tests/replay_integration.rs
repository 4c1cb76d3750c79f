//! Recorded-session replay integration tests
//!
//! Feeds a complete recorded document through a [`ReplaySource`] and
//! exercises the downstream surface the way widgets do: slot resolution,
//! lookback queries, namespace traversal, and structured decoding.

mod common;

use std::sync::Arc;

use ntdata_rs::decode::{pose2d_decoders, to_pose2d};
use ntdata_rs::sink::{DataSink, RetentionPolicy, SinkEvent, SinkOptions};
use ntdata_rs::source::{DataSource, ReplaySource};
use ntdata_rs::types::{DataType, Value};
use ntdata_rs::Slot;

const DOCUMENT: &str = r#"[
    {"type": "connected"},
    {"type": "topicAnnounced", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}},
    {"type": "topicAnnounced", "topic": {"uid": 2, "name": "/SmartDashboard/Enabled", "type": "boolean", "properties": {}}},
    {"type": "topicAnnounced", "topic": {"uid": 3, "name": "/Pose", "type": "struct:Pose2d", "properties": {}}},
    {"type": "topicAnnounced", "topic": {"uid": 4, "name": "/SmartDashboard/Field", "type": "Field2d", "properties": {}}},
    {"type": "dataReceived", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}, "value": 1.0, "timestamp": 1000000},
    {"type": "dataReceived", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}, "value": 2.0, "timestamp": 2000000},
    {"type": "dataReceived", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}, "value": 3.0, "timestamp": 3000000},
    {"type": "dataReceived", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}, "value": 4.0, "timestamp": 4000000},
    {"type": "dataReceived", "topic": {"uid": 1, "name": "/SmartDashboard/Speed", "type": "double", "properties": {}}, "value": 5.0, "timestamp": 5000000},
    {"type": "dataReceived", "topic": {"uid": 2, "name": "/SmartDashboard/Enabled", "type": "boolean", "properties": {}}, "value": true, "timestamp": 1500000},
    {"type": "dataReceived", "topic": {"uid": 3, "name": "/Pose", "type": "struct:Pose2d", "properties": {}}, "value": {"translation": {"x": 3.0, "y": 4.0}, "rotation": {"value": 0.0}}, "timestamp": 2500000}
]"#;

fn replayed() -> Arc<DataSink> {
    let sink = common::test_sink();
    let mut source = ReplaySource::from_json(sink.clone(), DOCUMENT).unwrap();
    source.connect("ignored");
    sink
}

#[test]
fn test_document_populates_channels() {
    let sink = replayed();
    assert_eq!(sink.channel_count(), 4);

    let speed = sink.get("nt", "/SmartDashboard/Speed").unwrap();
    assert_eq!(speed.data_type(), DataType::Number);
    assert_eq!(speed.record_count(), 5);

    let enabled = sink.get("nt", "/SmartDashboard/Enabled").unwrap();
    assert_eq!(enabled.latest().unwrap().value, Value::Boolean(true));
}

#[test]
fn test_namespace_tree_shape() {
    let sink = replayed();

    sink.with_suppliers(|suppliers| {
        assert_eq!(suppliers.len(), 1);
        let root = &suppliers[0].root;

        // top level: Pose, SmartDashboard (collated order)
        let names: Vec<_> = root.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Pose", "SmartDashboard"]);

        let dashboard = &root.nodes[1];
        let names: Vec<_> = dashboard.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Enabled", "Field", "Speed"]);

        // channels bound at the leaves, ids rewritten to slot form
        let speed = &dashboard.nodes[2];
        assert_eq!(speed.id, "nt:/SmartDashboard/Speed");
        assert!(speed.channel.is_some());
    });

    // four announcements, four revision bumps
    assert_eq!(sink.supplier_revision("nt"), Some(4));
}

#[test]
fn test_lookback_query_from_tail() {
    let sink = replayed();
    let speed = sink.get("nt", "/SmartDashboard/Speed").unwrap();

    let window = speed.lookback(2_000_000);
    let values: Vec<_> = window.iter().map(|r| r.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::Number(3.0), Value::Number(4.0), Value::Number(5.0)]
    );

    let latest_only = speed.lookback(0);
    assert_eq!(latest_only.len(), 1);
    assert_eq!(latest_only[0].value, Value::Number(5.0));
}

#[test]
fn test_slot_round_trip_for_replayed_channels() {
    let sink = replayed();

    let field = sink.get("nt", "/SmartDashboard/Field").unwrap();
    assert_eq!(field.data_type(), DataType::Composite);
    assert_eq!(field.slot(), "nt:/SmartDashboard/Field/*");

    let parsed = Slot::to_channel(&field.slot()).unwrap();
    assert_eq!(parsed.source, "nt");
    assert_eq!(parsed.id, "/SmartDashboard/Field");
    assert!(parsed.composite);

    // the slot resolves back to the same channel
    let resolved = sink.get_slot(&field.slot()).unwrap();
    assert!(Arc::ptr_eq(&field, &resolved));
}

#[test]
fn test_structured_record_decodes_to_pose() {
    let sink = replayed();
    let pose_channel = sink.get("nt", "/Pose").unwrap();
    let record = pose_channel.latest().unwrap();

    let registry = pose2d_decoders();
    let pose = to_pose2d(&record.value, pose_channel.structured_type(), &registry);
    assert_eq!(pose.x, 3.0);
    assert_eq!(pose.y, 4.0);
    assert_eq!(pose.theta, 0.0);
}

#[test]
fn test_retention_sweep_after_replay() {
    let (sink, _events) = DataSink::new(SinkOptions {
        retention: RetentionPolicy {
            max_size: 2,
            max_time_seconds: 60,
        },
        ..Default::default()
    });
    let sink = Arc::new(sink);

    let mut source = ReplaySource::from_json(sink.clone(), DOCUMENT).unwrap();
    source.connect("ignored");

    sink.enforce_retention(5_000_000);

    let speed = sink.get("nt", "/SmartDashboard/Speed").unwrap();
    let timestamps: Vec<_> = speed.records().iter().map(|r| r.timestamp_micros).collect();
    assert_eq!(timestamps, vec![4_000_000, 5_000_000]);
}

#[test]
fn test_structural_events_fired_during_replay() {
    let (sink, events) = DataSink::new(SinkOptions::default());
    let sink = Arc::new(sink);

    let mut source = ReplaySource::from_json(sink.clone(), DOCUMENT).unwrap();
    source.connect("ignored");

    let mut added = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            SinkEvent::ChannelAdded(_) => added += 1,
            SinkEvent::ChannelRemoved(_) => {}
        }
    }
    assert_eq!(added, 4);
}

#[test]
fn test_document_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, DOCUMENT).unwrap();

    let sink = common::test_sink();
    let mut source = ReplaySource::from_file(sink.clone(), &path).unwrap();
    assert_eq!(source.events().len(), 12);

    source.connect("ignored");
    assert_eq!(sink.channel_count(), 4);
}
