mod common;
use common::*;

use fastclient_core::prelude::*;
use fastclient_test_support::{assert_request, echo};
use http::HeaderValue;
use http::header::HeaderName;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counter(count: &Arc<AtomicUsize>) -> impl RequestHook {
    let count = count.clone();
    move |req: Request| {
        count.fetch_add(1, Ordering::SeqCst);
        async move { Ok::<_, FxError>(req) }
    }
}

fn marker(tag: &'static str) -> impl RequestHook {
    move |mut req: Request| async move {
        req.headers
            .append(HeaderName::from_static("x-marker"), HeaderValue::from_static(tag));
        Ok::<_, FxError>(req)
    }
}

#[tokio::test]
async fn subscribe_and_unsubscribe() {
    let (transport, _handle) = echo();
    let api = client(transport);
    let search = api.endpoint(search());
    let calls = Arc::new(AtomicUsize::new(0));

    let sub = api.on_request(counter(&calls));
    for _ in 0..3 {
        search.call(CallArgs::new()).await.unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    sub.unsubscribe();
    sub.unsubscribe();
    assert!(!sub.is_active());
    for _ in 0..3 {
        search.call(CallArgs::new()).await.unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unsubscribing_one_handler_keeps_the_others() {
    let (transport, _handle) = echo();
    let api = client(transport);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let sub = api.on_request(counter(&first));
    let _keep = api.on_request(counter(&second));

    api.execute(&search(), CallArgs::new()).await.unwrap();
    sub.unsubscribe();
    api.execute(&search(), CallArgs::new()).await.unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn request_hooks_run_in_registration_order() {
    let (transport, handle) = echo();
    let api = client(transport);
    let _a = api.on_request(marker("h1"));
    let _b = api.on_request(marker("h2"));
    api.execute(&search(), CallArgs::new()).await.unwrap();

    let sent = handle.last();
    let markers: Vec<_> = sent
        .headers
        .get_all("x-marker")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(markers, ["h1", "h2"]);
}

#[tokio::test]
async fn response_hooks_see_the_transport_response() {
    let (transport, _handle) = echo();
    let api = client(transport);
    let _sub = api.on_response(|mut resp: Response| async move {
        resp.headers
            .insert(HeaderName::from_static("x-seen"), HeaderValue::from_static("yes"));
        Ok::<_, FxError>(resp)
    });
    let resp = api.execute(&search(), CallArgs::new()).await.unwrap();
    assert_eq!(resp.header_str("x-seen"), Some("yes"));
}

#[tokio::test]
async fn failing_hook_aborts_the_call() {
    let (transport, handle) = echo();
    let api = client(transport);
    let _sub = api.on_request(|_req: Request| async move {
        Err::<Request, FxError>("blocked".into())
    });
    let err = api.execute(&search(), CallArgs::new()).await.unwrap_err();
    match err.root() {
        ApiClientError::Hook { phase, source } => {
            assert_eq!(*phase, Phase::Request);
            assert_eq!(source.to_string(), "blocked");
        }
        other => panic!("unexpected: {other:?}"),
    }
    handle.assert_recorded_len(0);
}

#[tokio::test]
async fn clients_sharing_a_bus_share_hooks() {
    let (transport, handle) = echo();
    let bus = HookBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let _sub = bus.on_request(counter(&calls));

    let a = Client::new(config(transport.clone()).with_hook_bus(bus.clone())).unwrap();
    let b = Client::new(config(transport.clone()).with_hook_bus(bus.clone())).unwrap();
    let c = client(transport);
    assert!(a.hooks().same_bus(b.hooks()));
    assert!(!a.hooks().same_bus(c.hooks()));

    a.execute(&search(), CallArgs::new()).await.unwrap();
    b.execute(&search(), CallArgs::new()).await.unwrap();
    c.execute(&search(), CallArgs::new()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    handle.assert_recorded_len(3);
    assert_request(&handle.last()).path("/");
}
