//! Room history integration tests.
//!
//! Ring history replay on join, channel membership scoping and the
//! cold-room warm-up from the persistence store.

mod common;

use common::TestServer;
use parleyd::protocol::{Identity, Message, RoomId};
use parleyd::store::{MemoryStore, PersistenceStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn later_connection_replays_public_history() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut ada = server.connect("Ada").await?;

    ada.send_public("hi").await?;
    let message = ada.recv_event("newMessage").await?;
    assert_eq!(message["message"]["content"], "hi");

    let mut bob = server.connect_raw().await?;
    bob.register("Bob").await?;
    let history = bob.recv_event("roomHistory").await?;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[0]["sender"], "ada");
    Ok(())
}

#[tokio::test]
async fn channel_join_replays_channel_history() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut ada = server.connect("Ada").await?;

    ada.send(json!({"type": "joinChannel", "channelId": "general"}))
        .await?;
    ada.recv_event("roomHistory").await?;
    ada.send_channel("general", "channel talk").await?;
    ada.recv_event("newMessage").await?;

    let mut bob = server.connect("Bob").await?;
    bob.send(json!({"type": "joinChannel", "channelId": "general"}))
        .await?;
    let history = bob.recv_event("roomHistory").await?;
    assert_eq!(history["roomId"], "general");
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "channel talk");
    Ok(())
}

#[tokio::test]
async fn unknown_channel_is_rejected() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut ada = server.connect("Ada").await?;

    ada.send(json!({"type": "joinChannel", "channelId": "sekrit"}))
        .await?;
    let error = ada.recv_event("errorEvent").await?;
    assert_eq!(error["code"], "unknownChannel");
    Ok(())
}

#[tokio::test]
async fn channel_traffic_stays_inside_the_channel() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut ada = server.connect("Ada").await?;
    let mut bob = server.connect("Bob").await?;

    ada.send(json!({"type": "joinChannel", "channelId": "random"}))
        .await?;
    ada.recv_event("roomHistory").await?;
    ada.send_channel("random", "members only").await?;
    ada.recv_event("newMessage").await?;

    // Bob never joined the channel.
    bob.assert_no_event("newMessage", Duration::from_millis(300))
        .await?;
    Ok(())
}

#[tokio::test]
async fn blank_message_is_rejected() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut ada = server.connect("Ada").await?;

    ada.send_public("   ").await?;
    let error = ada.recv_event("errorEvent").await?;
    assert_eq!(error["code"], "emptyMessage");
    Ok(())
}

#[tokio::test]
async fn cold_channel_warms_from_the_store() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    store
        .save(&Message {
            id: 41,
            room_id: RoomId("general".to_string()),
            sender: Identity::from("carol"),
            sender_name: "Carol".to_string(),
            content: "from a previous life".to_string(),
            created_at: chrono::Utc::now(),
            reactions: Default::default(),
            read_by: Default::default(),
        })
        .await?;

    let server = TestServer::spawn_with_store(store).await?;
    let mut ada = server.connect("Ada").await?;

    ada.send(json!({"type": "joinChannel", "channelId": "general"}))
        .await?;
    let history = ada.recv_event("roomHistory").await?;
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "from a previous life");
    assert_eq!(messages[0]["sender"], "carol");
    Ok(())
}
