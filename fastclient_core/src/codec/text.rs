use crate::endpoint::ResponseParser;
use crate::error::FxError;
use crate::transport::{BoxFuture, Response};

/// Decodes the response body as UTF-8 text.
#[derive(Default)]
pub struct Text;

impl ResponseParser<String> for Text {
    fn parse<'a>(&'a self, resp: Response) -> BoxFuture<'a, Result<String, FxError>> {
        Box::pin(async move {
            let s = std::str::from_utf8(&resp.body)?;
            Ok(s.to_string())
        })
    }
}
