// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn send_and_try_recv() {
    let edge = Edge::new("a_to_b");
    assert!(edge.try_send(json!(1)));
    assert!(edge.try_send(json!(2)));
    assert_eq!(edge.try_recv(), Some(json!(1)));
    assert_eq!(edge.try_recv(), Some(json!(2)));
    assert_eq!(edge.try_recv(), None);
}

#[test]
fn clones_share_the_buffer() {
    let edge = Edge::new("a_to_b");
    let other = edge.clone();
    assert!(edge.try_send(json!("msg")));
    assert_eq!(other.try_recv(), Some(json!("msg")));
    assert!(edge.same_channel(&other));
}

#[test]
fn distinct_edges_are_not_same_channel() {
    let a = Edge::new("x_to_y");
    let b = Edge::new("x_to_y");
    assert!(!a.same_channel(&b));
}

#[test]
fn full_buffer_drops_sends() {
    let edge = Edge::new("a_to_b");
    for i in 0..EDGE_CAPACITY {
        assert!(edge.try_send(json!(i)));
    }
    assert_eq!(edge.buffered(), EDGE_CAPACITY);
    assert!(!edge.try_send(json!("overflow")));
    // Draining one slot makes room again.
    assert_eq!(edge.try_recv(), Some(json!(0)));
    assert!(edge.try_send(json!("fits")));
}

#[tokio::test]
async fn async_recv_waits_for_message() {
    let edge = Edge::new("a_to_b");
    let rx = edge.clone();
    let task = tokio::spawn(async move { rx.recv().await });
    tokio::task::yield_now().await;
    assert!(edge.try_send(json!(42)));
    let received = task.await.ok().flatten();
    assert_eq!(received, Some(json!(42)));
}

#[test]
fn name_and_debug() {
    let edge = Edge::new("p_to_u");
    assert_eq!(edge.name(), "p_to_u");
    let debug = format!("{:?}", edge);
    assert!(debug.contains("p_to_u"));
}
