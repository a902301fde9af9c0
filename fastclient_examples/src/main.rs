use fastclient_core::prelude::*;
use fastclient_examples::oauth::{OAuth, auth_registry};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "http://localhost:5292";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let base = dotenvy::var("FASTCLIENT_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let email = dotenvy::var("FASTCLIENT_EMAIL").unwrap_or_else(|_| "test_email@test.com".to_string());
    let password = SecretString::new(dotenvy::var("FASTCLIENT_PASSWORD").unwrap_or_default());

    let config = ClientConfig::new(base)
        .with_debug_level(DebugLevel::V)
        .with_debug_sink(StderrDebugSink);

    // Auth calls go through a client without the middleware.
    let oauth = Arc::new(OAuth::new(Client::new(config.clone())?.bind(auth_registry())));
    let api = Client::new(config.with_shared_middleware(oauth.clone()))?;
    let protected = api.endpoint(EndpointDescriptor::get("/api/protected").with_name("protected"));

    oauth.sign_in(&email, &password).await?;

    let (a, b, c) = tokio::join!(
        protected.call(CallArgs::new()),
        protected.call(CallArgs::new()),
        protected.call(CallArgs::new()),
    );
    for resp in [a?, b?, c?] {
        println!("{} -> {}", resp.url, resp.status);
    }

    // Expire the token, then fire a burst: one refresh serves all three.
    oauth.cache().expire();
    let (a, b, c) = tokio::join!(
        protected.call(CallArgs::new()),
        protected.call(CallArgs::new()),
        protected.call(CallArgs::new()),
    );
    for resp in [a?, b?, c?] {
        println!("{} -> {}", resp.url, resp.status);
    }
    println!("refreshes: {}", oauth.cache().refreshes());
    Ok(())
}
