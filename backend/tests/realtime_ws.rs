use std::net::SocketAddr;
use std::time::Duration;

use backend::web_server::AppState;
use common::{BookingDto, ServerEvent, DASHBOARD_CHANNEL};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

mod helpers;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: &SocketAddr) -> (Client, String) {
    let (mut socket, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to open websocket");
    let hello = next_event(&mut socket).await;
    assert_eq!(hello.event, "connected");
    let id = hello.data["id"].as_str().unwrap().to_string();
    (socket, id)
}

async fn next_event(socket: &mut Client) -> ServerEvent {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timed out waiting for an event")
            .expect("Socket closed")
            .expect("Socket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("Malformed event");
        }
    }
}

async fn send(socket: &mut Client, body: serde_json::Value) {
    socket
        .send(Message::Text(body.to_string().into()))
        .await
        .expect("Failed to send");
}

/// Waits until the server side has processed membership changes.
async fn wait_until(state: &AppState, check: impl Fn(&AppState) -> bool) {
    for _ in 0..100 {
        if check(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Condition not reached in time");
}

async fn post_booking(addr: &SocketAddr, client: &reqwest::Client) -> BookingDto {
    let response = client
        .post(format!("http://{addr}/api/bookings"))
        .json(&json!({
            "car_id": 3,
            "customer_name": "Rahul Nair",
            "customer_phone": "9876543210",
            "pickup_date": "2025-05-10",
            "return_date": "2025-05-12"
        }))
        .send()
        .await
        .expect("Failed to execute booking request.");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse booking")
}

#[tokio::test]
async fn test_dashboard_sockets_receive_booking_events() {
    let (addr, client, state) = helpers::spawn_app().await;

    let (mut dashboard, dashboard_id) = connect(&addr).await;
    let (mut idle, idle_id) = connect(&addr).await;
    assert_ne!(dashboard_id, idle_id);

    send(&mut dashboard, json!({ "event": "joinDashboard" })).await;
    wait_until(&state, |s| {
        s.gateway.registry().is_member(&dashboard_id, DASHBOARD_CHANNEL)
    })
    .await;
    assert!(!state.gateway.registry().is_member(&idle_id, DASHBOARD_CHANNEL));

    let booking = post_booking(&addr, &client).await;

    let event = next_event(&mut dashboard).await;
    assert_eq!(event.event, "bookingCreated");
    let delivered: BookingDto = serde_json::from_value(event.data).unwrap();
    assert_eq!(delivered, booking);

    // The idle socket gets nothing; a bad message proves the socket is still
    // served and that the next frame it sees is the error reply.
    send(&mut idle, json!({ "event": "fly" })).await;
    let reply = next_event(&mut idle).await;
    assert_eq!(reply.event, "error");
}

#[tokio::test]
async fn test_leave_and_disconnect_stop_delivery() {
    let (addr, client, state) = helpers::spawn_app().await;
    let registry = state.gateway.registry().clone();

    let (mut first, first_id) = connect(&addr).await;
    let (mut second, second_id) = connect(&addr).await;
    send(&mut first, json!({ "event": "joinDashboard" })).await;
    send(&mut second, json!({ "event": "joinDashboard" })).await;
    wait_until(&state, |s| s.gateway.registry().member_count(DASHBOARD_CHANNEL) == 2).await;

    send(&mut second, json!({ "event": "leaveDashboard" })).await;
    wait_until(&state, |s| {
        !s.gateway.registry().is_member(&second_id, DASHBOARD_CHANNEL)
    })
    .await;

    post_booking(&addr, &client).await;
    assert_eq!(next_event(&mut first).await.event, "bookingCreated");

    first.close(None).await.unwrap();
    wait_until(&state, |s| !s.gateway.registry().contains(&first_id)).await;
    assert_eq!(registry.member_count(DASHBOARD_CHANNEL), 0);
    assert_eq!(state.gateway.publish_dashboard("bookingCreated", json!({})), 0);

    // Rejoining after a leave works on the same socket.
    send(&mut second, json!({ "event": "joinDashboard" })).await;
    wait_until(&state, |s| s.gateway.registry().is_member(&second_id, DASHBOARD_CHANNEL)).await;
    assert_eq!(state.gateway.publish_dashboard("bookingCreated", json!({"id": 1})), 1);
    assert_eq!(next_event(&mut second).await.data, json!({"id": 1}));
}
