//! Lookup protocol: client retry rules and the agent's UDP server.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

use common::{agent_config, empty_body, relations_body, MockRegistry};
use namesrv_agent::lifecycle::Agent;
use namesrv_agent::protocol::{ClientError, NameClient, Request, Response};

/// A fake agent answering every request with `reply(seq)`.
async fn fake_agent<F>(reply: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(u64) -> (u64, &'static str) + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap().to_string();
    let received = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&received);
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
            let Ok(request) = Request::decode(&buf[..len]) else {
                continue;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let (seq, addr) = reply(request.seq);
            let response = Response { seq, addr }.encode();
            let _ = socket.send_to(&response, peer).await;
        }
    });

    (addr, received)
}

fn client(agent: &str) -> NameClient {
    NameClient::new(agent).with_timeout(Duration::from_secs(1))
}

#[tokio::test]
async fn test_sequence_mismatch_is_retried_once() {
    let (agent, received) = fake_agent(|seq| (seq.wrapping_add(1), "10.0.0.1:9000")).await;

    let err = client(&agent).resolve("svc.a").await.unwrap_err();
    assert!(matches!(err, ClientError::SequenceMismatch { .. }), "got {:?}", err);
    assert_eq!(received.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_address_is_retried_once() {
    let (agent, received) = fake_agent(|seq| (seq, "")).await;

    let err = client(&agent).resolve("svc.a").await.unwrap_err();
    assert!(matches!(err, ClientError::NoAddress(ref name) if name == "svc.a"));
    assert_eq!(received.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_attempt_can_succeed() {
    let (agent, received) = {
        let calls = Arc::new(AtomicUsize::new(0));
        fake_agent(move |seq| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                (seq, "")
            } else {
                (seq, "10.0.0.1:9000")
            }
        })
        .await
    };

    assert_eq!(client(&agent).resolve("svc.a").await.unwrap(), "10.0.0.1:9000");
    assert_eq!(received.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_agent_answers_lookups() {
    let registry = MockRegistry::start(|target| {
        if target.contains("name=svc.a") {
            (
                200,
                relations_body("v1", &[("10.0.0.1", 9000, false, 2), ("10.0.0.2", 9000, false, 1)]),
            )
        } else {
            (200, empty_body())
        }
    })
    .await;

    let agent = Agent::start(agent_config(&registry.addr())).await.unwrap();
    let client = client(&agent.local_addr().to_string());

    let mut picks = Vec::new();
    for _ in 0..3 {
        picks.push(client.resolve("svc.a").await.unwrap());
    }
    assert_eq!(picks, vec!["10.0.0.1:9000", "10.0.0.1:9000", "10.0.0.2:9000"]);

    // The registry's own name resolves to the static address.
    assert_eq!(client.resolve("namesrv.ns").await.unwrap(), registry.addr());

    let err = client.resolve("svc.unknown").await.unwrap_err();
    assert!(matches!(err, ClientError::NoAddress(_)));

    agent.stop().await;
}

#[tokio::test]
async fn test_malformed_datagram_gets_no_reply() {
    let registry = MockRegistry::start(|_| (200, empty_body())).await;
    let agent = Agent::start(agent_config(&registry.addr())).await.unwrap();

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.connect(agent.local_addr()).await.unwrap();

    for garbage in [&b"no separator"[..], &b"abc,svc.a"[..], &b"\xff\xfe,svc.a"[..]] {
        socket.send(garbage).await.unwrap();
    }
    let mut buf = [0u8; 1024];
    let reply = tokio::time::timeout(Duration::from_millis(300), socket.recv(&mut buf)).await;
    assert!(reply.is_err(), "malformed request was answered");

    // A well-formed request on the same socket still gets its answer.
    socket.send(&Request { seq: 7, name: "" }.encode()).await.unwrap();
    let len = tokio::time::timeout(Duration::from_secs(1), socket.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let response = Response::decode(&buf[..len]).unwrap();
    assert_eq!(response.seq, 7);
    assert_eq!(response.addr, "");

    agent.stop().await;
}
