use fastclient_core::prelude::*;
use fastclient_test_support::MockTransport;

pub const BASE: &str = "https://localhost:3000";

#[allow(unused)]
pub fn config(transport: MockTransport) -> ClientConfig {
    ClientConfig::new(BASE).with_transport(transport)
}

#[allow(unused)]
pub fn client(transport: MockTransport) -> Client {
    Client::new(config(transport)).unwrap()
}

#[allow(unused)]
pub fn search() -> EndpointDescriptor {
    EndpointDescriptor::get("/")
}

#[allow(unused)]
pub fn get() -> EndpointDescriptor {
    EndpointDescriptor::get("/{id}")
}
