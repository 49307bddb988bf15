// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use orch_core::SystemClock;
use orch_wire::{read_message, write_message, RequestId, ResponseStatus};
use tokio::net::TcpListener;

async fn spawn_worker(respond: impl Fn(AnalyzerRequest) -> AnalyzerResponse + Send + Sync + 'static) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("local_addr").to_string();
    let respond = std::sync::Arc::new(respond);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let respond = respond.clone();
            tokio::spawn(async move {
                let raw = read_message(&mut stream).await.expect("read failed");
                let request: AnalyzerRequest = decode(&raw).expect("decode failed");
                let response = respond(request);
                let out = encode(&response).expect("encode failed");
                write_message(&mut stream, &out).await.expect("write failed");
            });
        }
    });
    addr
}

fn request(id: &str) -> AnalyzerRequest {
    AnalyzerRequest::StaticAnalyze {
        request_id: RequestId::new(id),
        model: "openai_gpt-4o".to_string(),
        app_number: 1,
        source_dir: "/src".to_string(),
        tools: vec!["bandit".to_string()],
        options: Default::default(),
    }
}

fn client(addr: String) -> TcpAnalyzerClient<SystemClock> {
    TcpAnalyzerClient::new(
        addr,
        2,
        5,
        Duration::from_secs(30),
        Duration::from_secs(300),
        Duration::from_secs(10),
        SystemClock,
    )
}

#[tokio::test]
async fn analyze_round_trips_successful_response() {
    let addr = spawn_worker(|req| {
        AnalyzerResponse::success(req.request_id().clone(), Default::default())
    })
    .await;
    let client = client(addr);

    let response = client
        .analyze(request("req-1"), Duration::from_secs(5), CancellationToken::new())
        .await
        .expect("analyze failed");
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.request_id, RequestId::new("req-1"));
}

#[tokio::test]
async fn analyze_maps_worker_error_status_to_remote_error() {
    let addr = spawn_worker(|req| AnalyzerResponse::error(req.request_id().clone(), "tool crashed")).await;
    let client = client(addr);

    let err = client
        .analyze(request("req-2"), Duration::from_secs(5), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RemoteError { .. }));
}

#[tokio::test]
async fn remote_error_does_not_trip_the_breaker() {
    let addr = spawn_worker(|req| AnalyzerResponse::error(req.request_id().clone(), "boom")).await;
    let client = client(addr);

    for i in 0..10 {
        let _ = client
            .analyze(request(&format!("req-{i}")), Duration::from_secs(5), CancellationToken::new())
            .await;
    }

    // Breaker threshold is 5; if remote_error tripped it, this 11th call
    // would fast-fail with BreakerOpen instead of reaching the worker.
    let err = client
        .analyze(request("req-11"), Duration::from_secs(5), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RemoteError { .. }));
}

#[tokio::test]
async fn cancellation_surfaces_as_cancelled_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("local_addr").to_string();
    tokio::spawn(async move {
        // Accept but never respond, so the call hangs until cancelled.
        while let Ok((_stream, _)) = listener.accept().await {}
    });
    let client = client(addr);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    let err = client.analyze(request("req-cancel"), Duration::from_secs(30), cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled { .. }));
}
