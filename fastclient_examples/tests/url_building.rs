mod common;
use common::*;

use fastclient_core::prelude::*;
use fastclient_test_support::{assert_request, echo};

#[tokio::test]
async fn every_call_reaches_the_transport() {
    let (transport, handle) = echo();
    let search = client(transport).endpoint(search());
    for _ in 0..3 {
        search.call(CallArgs::new().query("q", "123")).await.unwrap();
    }
    handle.assert_recorded_len(3);
}

#[tokio::test]
async fn query_params_are_in_the_url() {
    let (transport, handle) = echo();
    let search = client(transport).endpoint(search());
    let resp = search
        .call(CallArgs::new().query("a", 123).query("b", true).query("c", "abc"))
        .await
        .unwrap();
    assert_eq!(resp.url.as_str(), "https://localhost:3000/?a=123&b=true&c=abc");
    assert_request(&handle.last())
        .method(Method::Get)
        .query_values("a", &["123"])
        .query_keys_exact(&["a", "b", "c"]);
}

#[tokio::test]
async fn falsy_query_values_are_dropped() {
    let (transport, handle) = echo();
    let search = client(transport).endpoint(search());
    search
        .call(
            CallArgs::new()
                .query("keep", "x")
                .query("empty", "")
                .query("zero", 0)
                .query("no", false)
                .query("nan", f64::NAN),
        )
        .await
        .unwrap();
    assert_request(&handle.last())
        .query_string(Some("keep=x"))
        .query_absent("zero");

    search
        .call(CallArgs::new().query("zero", 0u8))
        .await
        .unwrap();
    assert_request(&handle.last())
        .url("https://localhost:3000/")
        .query_string(None);
}

#[tokio::test]
async fn path_params_are_in_the_url() {
    let (transport, _handle) = echo();
    let get = client(transport).endpoint(get());
    let resp = get.call(CallArgs::new().path("id", 123)).await.unwrap();
    assert_eq!(resp.url.as_str(), "https://localhost:3000/123");
}

#[tokio::test]
async fn path_and_query_params_are_in_the_url() {
    let (transport, handle) = echo();
    let get = client(transport).endpoint(get());
    let resp = get
        .call(CallArgs::new().path("id", "123").query("test", 321))
        .await
        .unwrap();
    assert_eq!(resp.url.as_str(), "https://localhost:3000/123?test=321");
    assert_request(&handle.last())
        .host("localhost")
        .path("/123")
        .query_has("test", "321")
        .endpoint("GET /{id}")
        .attempt(1);
}

#[tokio::test]
async fn missing_path_param_is_sent_literally() {
    let (transport, handle) = echo();
    let api = client(transport);
    let repo = api.endpoint(EndpointDescriptor::get("/orgs/{a}/repos/{b}"));
    repo.call(CallArgs::new().path("a", "1")).await.unwrap();
    assert_request(&handle.last()).path("/orgs/1/repos/%7Bb%7D");
}

#[tokio::test]
async fn missing_path_param_fails_in_strict_mode() {
    let (transport, handle) = echo();
    let api = Client::new(config(transport).with_strict_placeholders(true)).unwrap();
    let repo = api.endpoint(
        EndpointDescriptor::get("/orgs/{a}/repos/{b}").with_name("repo"),
    );
    let err = repo.call(CallArgs::new().path("a", "1")).await.unwrap_err();
    match err.root() {
        ApiClientError::UnresolvedPlaceholder { name, .. } => assert_eq!(name, "b"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(err, ApiClientError::InEndpoint { ref endpoint, .. } if endpoint == "repo"));
    handle.assert_recorded_len(0);
}

#[tokio::test]
async fn base_path_is_kept_for_relative_templates() {
    let (transport, handle) = echo();
    let api = Client::new(ClientConfig::new("https://api.example.com/v2/").with_transport(transport))
        .unwrap();
    let user = api.endpoint(EndpointDescriptor::get("users/{id}"));
    user.call(CallArgs::new().path("id", 7)).await.unwrap();
    assert_request(&handle.last()).url("https://api.example.com/v2/users/7");
}

#[tokio::test]
async fn path_value_cannot_redirect_to_another_host() {
    let (transport, handle) = echo();
    let get = client(transport).endpoint(get());
    let err = get
        .call(CallArgs::new().path("id", "/evil.example"))
        .await
        .unwrap_err();
    match err.root() {
        ApiClientError::ForeignOrigin { base, url } => {
            assert_eq!(base, "https://localhost:3000/");
            assert_eq!(url, "https://evil.example/");
        }
        other => panic!("unexpected: {other:?}"),
    }
    handle.assert_recorded_len(0);
}

#[tokio::test]
async fn f32_query_values_are_not_widened() {
    let (transport, handle) = echo();
    let search = client(transport).endpoint(search());
    search
        .call(CallArgs::new().query("ratio", 0.1f32))
        .await
        .unwrap();
    assert_request(&handle.last()).query_string(Some("ratio=0.1"));
}
