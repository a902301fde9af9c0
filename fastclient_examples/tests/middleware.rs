mod common;
use common::*;

use fastclient_core::prelude::*;
use fastclient_test_support::{MockReply, assert_request, echo, mock};
use http::header::{AUTHORIZATION, HeaderName};
use http::{HeaderValue, StatusCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Retries server errors and transport failures up to `max` attempts.
/// Non-idempotent methods go out once.
struct Retry {
    max: u32,
}

impl Middleware for Retry {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response, ApiClientError>> {
        Box::pin(async move {
            if !req.method.is_idempotent() {
                return next.run(req).await;
            }
            let mut last = Err(ApiClientError::middleware("retry budget is zero"));
            for _ in 0..self.max {
                last = next.run(req.clone()).await;
                match &last {
                    Ok(resp) if !resp.status.is_server_error() => break,
                    _ => continue,
                }
            }
            last
        })
    }
}

#[tokio::test]
async fn short_circuit_never_reaches_the_transport() {
    let (transport, handle) = mock().build();
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let api = Client::new(config(transport).with_middleware(|req: Request, _next: Next| async move {
        Ok::<_, ApiClientError>(Response::for_request(&req, StatusCode::OK, "cached"))
    }))
    .unwrap();
    let seen = hook_calls.clone();
    let _sub = api.on_request(move |req: Request| {
        seen.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, FxError>(req) }
    });

    let resp = api.execute(&search(), CallArgs::new()).await.unwrap();
    assert_eq!(resp.text().unwrap(), "cached");
    handle.assert_recorded_len(0);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    handle.finish();
}

#[tokio::test]
async fn middleware_can_edit_the_request() {
    let (transport, handle) = echo();
    let api = Client::new(config(transport).with_middleware(|mut req: Request, next: Next| async move {
        req.headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer t0k3n"));
        next.run(req).await
    }))
    .unwrap();
    api.execute(&search(), CallArgs::new()).await.unwrap();
    assert_request(&handle.last()).header(AUTHORIZATION, "Bearer t0k3n");
}

#[tokio::test]
async fn retry_sees_increasing_attempt_numbers() {
    let (transport, handle) = mock()
        .fail("connection reset")
        .reply(MockReply::status(StatusCode::BAD_GATEWAY))
        .reply(MockReply::ok_text("finally".into()))
        .build();
    let api = Client::new(config(transport).with_middleware(Retry { max: 5 })).unwrap();
    let attempts = Arc::new(std::sync::Mutex::new(Vec::new()));
    let log = attempts.clone();
    let _sub = api.on_request(move |req: Request| {
        log.lock().unwrap().push(req.meta.attempt);
        async move { Ok::<_, FxError>(req) }
    });

    let resp = api
        .endpoint(EndpointDescriptor::get("/flaky").text())
        .call(CallArgs::new())
        .await
        .unwrap();
    assert_eq!(resp, "finally");

    let recorded = handle.recorded();
    assert_eq!(recorded.len(), 3);
    for (i, req) in recorded.iter().enumerate() {
        assert_request(req).path("/flaky").attempt(i as u32 + 1);
    }
    // Hooks run once per attempt.
    assert_eq!(*attempts.lock().unwrap(), [1, 2, 3]);
    handle.finish();
}

#[tokio::test]
async fn retry_gives_up_with_the_last_error() {
    let (transport, handle) = mock().fail("down").fail("still down").build();
    let api = Client::new(config(transport).with_middleware(Retry { max: 2 })).unwrap();
    let err = api.execute(&search(), CallArgs::new()).await.unwrap_err();
    match err.root() {
        ApiClientError::Transport(e) => assert_eq!(e.to_string(), "still down"),
        other => panic!("unexpected: {other:?}"),
    }
    handle.finish();
}

#[tokio::test]
async fn retry_leaves_non_idempotent_calls_alone() {
    let (transport, handle) = mock().fail("connection reset").build();
    let api = Client::new(config(transport).with_middleware(Retry { max: 5 })).unwrap();
    let err = api
        .execute(&EndpointDescriptor::post("/orders"), CallArgs::new().body("{}"))
        .await
        .unwrap_err();
    match err.root() {
        ApiClientError::Transport(e) => assert_eq!(e.to_string(), "connection reset"),
        other => panic!("unexpected: {other:?}"),
    }
    handle.assert_recorded_len(1);
    assert_request(&handle.last()).method(Method::Post).path("/orders").attempt(1);
    handle.finish();
}

#[tokio::test]
async fn middleware_errors_name_the_endpoint() {
    let (transport, handle) = mock().build();
    let api = Client::new(config(transport).with_middleware(|_req: Request, _next: Next| async move {
        Err::<Response, _>(ApiClientError::middleware("offline mode"))
    }))
    .unwrap();
    let ping = api.endpoint(EndpointDescriptor::get("/ping").with_name("ping"));
    let err = ping.call(CallArgs::new()).await.unwrap_err();
    match &err {
        ApiClientError::InEndpoint { endpoint, source } => {
            assert_eq!(endpoint, "ping");
            assert!(matches!(**source, ApiClientError::Middleware(_)));
        }
        other => panic!("unexpected: {other:?}"),
    }
    handle.finish();
}

#[tokio::test]
async fn response_hooks_run_inside_the_middleware() {
    let (transport, _handle) = echo();
    let api = Client::new(config(transport).with_middleware(|req: Request, next: Next| async move {
        let resp = next.run(req).await?;
        // The response hook already ran by the time `next` returns.
        assert!(resp.headers.contains_key("x-hooked"));
        Ok::<_, ApiClientError>(resp)
    }))
    .unwrap();
    let _sub = api.on_response(|mut resp: Response| async move {
        resp.headers
            .insert(HeaderName::from_static("x-hooked"), HeaderValue::from_static("1"));
        Ok::<_, FxError>(resp)
    });
    api.execute(&search(), CallArgs::new()).await.unwrap();
}
