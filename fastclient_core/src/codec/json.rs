use crate::endpoint::ResponseParser;
use crate::error::FxError;
use crate::transport::{BoxFuture, Response};
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Decodes the response body as JSON into `T`.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseParser<T> for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn parse<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<T, FxError>> {
        Box::pin(async move { serde_json::from_slice(&resp.body).map_err(FxError::from) })
    }
}

pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(value).map(Bytes::from)
}
