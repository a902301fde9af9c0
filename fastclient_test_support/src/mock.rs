use bytes::Bytes;
use fastclient_core::prelude::Method;
use fastclient_core::transport::*;
use http::{HeaderMap, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub meta: RequestMeta,
    pub method: Method,
    pub url: url::Url,
    pub headers: http::HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl RecordedRequest {
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_deref().and_then(|b| std::str::from_utf8(b).ok())
    }
}

#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl MockReply {
    pub fn ok_json(body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    pub fn ok_text(body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain"),
        );
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Clone, Debug)]
enum Scripted {
    Reply(MockReply),
    Fail(String),
}

#[derive(Debug)]
struct MockState {
    recorded: Mutex<Vec<RecordedRequest>>,
    script: Mutex<VecDeque<Scripted>>,
    echo: bool,
}

/// Records every request. Answers from the script in order; in echo mode an
/// exhausted script answers 200 with the request headers mirrored back.
#[derive(Clone)]
pub struct MockTransport {
    st: Arc<MockState>,
}

pub struct MockHandle {
    st: Arc<MockState>,
    finished: bool,
}

#[derive(Default)]
pub struct MockBuilder {
    script: Vec<Scripted>,
    echo: bool,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, r: MockReply) -> Self {
        self.script.push(Scripted::Reply(r));
        self
    }

    pub fn replies(mut self, rs: impl IntoIterator<Item = MockReply>) -> Self {
        self.script.extend(rs.into_iter().map(Scripted::Reply));
        self
    }

    /// Next send fails with a transport error.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.script.push(Scripted::Fail(message.into()));
        self
    }

    pub fn echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn build(self) -> (MockTransport, MockHandle) {
        let st = Arc::new(MockState {
            recorded: Mutex::new(Vec::new()),
            script: Mutex::new(self.script.into_iter().collect()),
            echo: self.echo,
        });
        (
            MockTransport { st: st.clone() },
            MockHandle {
                st,
                finished: false,
            },
        )
    }
}

pub fn mock() -> MockBuilder {
    MockBuilder::new()
}

/// Echo-mode transport with its handle.
pub fn echo() -> (MockTransport, MockHandle) {
    MockBuilder::new().echo().build()
}

impl MockHandle {
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.st.recorded.lock().unwrap().clone()
    }

    pub fn recorded_len(&self) -> usize {
        self.st.recorded.lock().unwrap().len()
    }

    pub fn last(&self) -> RecordedRequest {
        self.st
            .recorded
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| panic!("no request recorded"))
    }

    pub fn assert_recorded_len(&self, expected: usize) {
        let got = self.recorded_len();
        if got != expected {
            let reqs = self.recorded();
            panic!(
                "recorded request count mismatch\n  expected: {expected}\n  got: {got}\n  recorded:\n{:#?}",
                reqs
            );
        }
    }

    pub fn remaining_replies(&self) -> usize {
        self.st.script.lock().unwrap().len()
    }

    pub fn assert_no_remaining_replies(&self) {
        let left = self.remaining_replies();
        if left != 0 {
            panic!("mock replies not fully consumed: remaining={left}");
        }
    }

    pub fn finish(mut self) {
        self.assert_no_remaining_replies();
        self.finished = true;
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if self.finished || std::thread::panicking() {
            return;
        }
        let left = self.st.script.lock().unwrap().len();
        if left != 0 {
            panic!("mock replies not fully consumed (drop): remaining={left}");
        }
    }
}

impl Transport for MockTransport {
    fn send<'a>(&'a self, req: Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let st = &self.st;
            st.recorded.lock().unwrap().push(RecordedRequest {
                meta: req.meta.clone(),
                method: req.method,
                url: req.url.clone(),
                headers: req.headers.clone(),
                body: req.body.clone(),
                timeout: req.timeout,
            });

            let next = st.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(reply)) => {
                    let mut resp = Response::for_request(&req, reply.status, reply.body);
                    resp.headers = reply.headers;
                    Ok(resp)
                }
                Some(Scripted::Fail(message)) => Err(TransportError::msg(message)),
                None if st.echo => {
                    let mut resp = Response::for_request(&req, StatusCode::OK, Bytes::new());
                    resp.headers = req.headers.clone();
                    Ok(resp)
                }
                None => panic!(
                    "MockTransport: no more scripted replies, but send() was called.\nlast_request={:#?}",
                    st.recorded.lock().unwrap().last()
                ),
            }
        })
    }
}
