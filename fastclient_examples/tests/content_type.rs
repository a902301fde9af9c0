mod common;
use common::*;

use fastclient_core::prelude::*;
use fastclient_test_support::{assert_request, echo};
use http::HeaderValue;
use http::header::CONTENT_TYPE;

#[tokio::test]
async fn write_methods_default_to_json() {
    let (transport, handle) = echo();
    let api = client(transport);
    for desc in [
        EndpointDescriptor::post("/items"),
        EndpointDescriptor::put("/items/{id}"),
        EndpointDescriptor::patch("/items/{id}"),
    ] {
        let method = desc.method();
        api.endpoint(desc)
            .call(CallArgs::new().path("id", 1).body(r#"{"name":"x"}"#))
            .await
            .unwrap();
        assert_request(&handle.last())
            .method(method)
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"name":"x"}"#);
    }
}

#[tokio::test]
async fn content_type_option_overrides_the_default() {
    let (transport, handle) = echo();
    let upload = client(transport).endpoint(EndpointDescriptor::post("/upload"));
    upload
        .call(CallArgs::new().body("plain words").content_type("text/plain"))
        .await
        .unwrap();
    assert_request(&handle.last()).header(CONTENT_TYPE, "text/plain");
}

#[tokio::test]
async fn explicit_header_wins_over_both() {
    let (transport, handle) = echo();
    let upload = client(transport).endpoint(EndpointDescriptor::post("/upload"));
    upload
        .call(
            CallArgs::new()
                .header(CONTENT_TYPE, HeaderValue::from_static("application/xml"))
                .content_type("text/plain"),
        )
        .await
        .unwrap();
    assert_request(&handle.last()).header(CONTENT_TYPE, "application/xml");
}

#[tokio::test]
async fn read_methods_send_no_content_type() {
    let (transport, handle) = echo();
    let api = client(transport);
    api.endpoint(get()).call(CallArgs::new().path("id", 1)).await.unwrap();
    assert_request(&handle.last())
        .header_absent(CONTENT_TYPE)
        .body_absent();

    api.endpoint(EndpointDescriptor::delete("/{id}"))
        .call(CallArgs::new().path("id", 1))
        .await
        .unwrap();
    assert_request(&handle.last())
        .method(Method::Delete)
        .header_absent(CONTENT_TYPE);
}

#[tokio::test]
async fn get_with_body_is_rejected_before_sending() {
    let (transport, handle) = echo();
    let err = client(transport)
        .endpoint(search())
        .call(CallArgs::new().body("nope"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        ApiClientError::BodyNotAllowed { method: Method::Get }
    ));
    handle.assert_recorded_len(0);
}

#[tokio::test]
async fn json_helper_serializes_the_body() {
    #[derive(serde::Serialize)]
    struct NewItem<'a> {
        name: &'a str,
        qty: u32,
    }

    let (transport, handle) = echo();
    let create = client(transport).endpoint(EndpointDescriptor::post("/items"));
    let args = CallArgs::new()
        .json(&NewItem { name: "pen", qty: 2 })
        .unwrap();
    create.call(args).await.unwrap();
    assert_request(&handle.last())
        .header(CONTENT_TYPE, "application/json")
        .body(r#"{"name":"pen","qty":2}"#);
}
