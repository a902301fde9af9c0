use crate::codec::{self, Format};
use crate::method::Method;
use crate::template::TemplateWarning;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
#[derive(Default)]
pub enum DebugLevel {
    #[default]
    None = 0,
    V = 1,
    VV = 2,
}

impl DebugLevel {
    #[inline]
    pub fn is_enabled(self) -> bool {
        self != DebugLevel::None
    }

    #[inline]
    pub fn is_verbose(self) -> bool {
        self >= DebugLevel::V
    }

    #[inline]
    pub fn is_very_verbose(self) -> bool {
        self >= DebugLevel::VV
    }
}

impl core::fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DebugLevel::None => f.write_str("none"),
            DebugLevel::V => f.write_str("v"),
            DebugLevel::VV => f.write_str("vv"),
        }
    }
}

/// Receives pipeline diagnostics. Request/response events are only emitted
/// when the call's `DebugLevel` asks for them; template warnings always are.
pub trait DebugSink: Send + Sync + 'static {
    fn request_start(&self, dbg: DebugLevel, method: Method, url: &str, endpoint: &str, attempt: u32);
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn request_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize);

    fn response_status(&self, dbg: DebugLevel, status: StatusCode, url: &str, ok: bool);
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn response_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize);

    fn template_warning(&self, endpoint: &str, template: &str, warning: &TemplateWarning);
}

#[derive(Default)]
pub struct NoopDebugSink;
impl DebugSink for NoopDebugSink {
    #[inline]
    fn request_start(&self, _: DebugLevel, _: Method, _: &str, _: &str, _: u32) {}
    #[inline]
    fn request_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn request_body(&self, _: DebugLevel, _: &Bytes, _: Format, _: usize) {}
    #[inline]
    fn response_status(&self, _: DebugLevel, _: StatusCode, _: &str, _: bool) {}
    #[inline]
    fn response_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn response_body(&self, _: DebugLevel, _: &Bytes, _: Format, _: usize) {}
    #[inline]
    fn template_warning(&self, _: &str, _: &str, _: &TemplateWarning) {}
}

/// Plain `[fastclient:v] -> GET url (endpoint)` lines on stderr.
#[derive(Default)]
pub struct StderrDebugSink;
impl DebugSink for StderrDebugSink {
    fn request_start(&self, dbg: DebugLevel, method: Method, url: &str, endpoint: &str, attempt: u32) {
        if attempt <= 1 {
            eprintln!("[fastclient:{}] -> {} {} ({})", dbg, method, url, endpoint);
        } else {
            eprintln!(
                "[fastclient:{}] -> {} {} ({}) attempt={}",
                dbg, method, url, endpoint, attempt
            );
        }
    }
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[fastclient:{}] request headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn request_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        eprintln!(
            "[fastclient:{}] request body ({} bytes): {}",
            dbg,
            body.len(),
            preview
        );
    }

    fn response_status(&self, dbg: DebugLevel, status: StatusCode, url: &str, ok: bool) {
        let tag = if ok { "ok" } else { "error" };
        eprintln!("[fastclient:{}] <- {} {} ({})", dbg, status.as_u16(), url, tag);
    }
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[fastclient:{}] response headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn response_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        eprintln!(
            "[fastclient:{}] response body ({} bytes): {}",
            dbg,
            body.len(),
            preview
        );
    }

    fn template_warning(&self, endpoint: &str, template: &str, warning: &TemplateWarning) {
        eprintln!("[fastclient:warn] endpoint {} template {:?}: {}", endpoint, template, warning);
    }
}

/// Emits `tracing` events under the `fastclient` target.
#[derive(Default)]
pub struct TracingDebugSink;
impl DebugSink for TracingDebugSink {
    fn request_start(&self, dbg: DebugLevel, method: Method, url: &str, endpoint: &str, attempt: u32) {
        tracing::debug!(target: "fastclient", %dbg, %method, url, endpoint, attempt, "request");
    }
    fn request_headers(&self, _dbg: DebugLevel, headers: &HeaderMap) {
        for (k, v) in headers.iter() {
            let value = header_value_for_debug(k, v);
            tracing::trace!(target: "fastclient", header = %k, %value, "request header");
        }
    }
    fn request_body(&self, _dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        tracing::trace!(target: "fastclient", len = body.len(), %preview, "request body");
    }

    fn response_status(&self, _dbg: DebugLevel, status: StatusCode, url: &str, ok: bool) {
        if ok {
            tracing::debug!(target: "fastclient", status = status.as_u16(), url, "response");
        } else {
            tracing::warn!(target: "fastclient", status = status.as_u16(), url, "error response");
        }
    }
    fn response_headers(&self, _dbg: DebugLevel, headers: &HeaderMap) {
        for (k, v) in headers.iter() {
            let value = header_value_for_debug(k, v);
            tracing::trace!(target: "fastclient", header = %k, %value, "response header");
        }
    }
    fn response_body(&self, _dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        tracing::trace!(target: "fastclient", len = body.len(), %preview, "response body");
    }

    fn template_warning(&self, endpoint: &str, template: &str, warning: &TemplateWarning) {
        tracing::warn!(target: "fastclient", endpoint, template, %warning, "path template");
    }
}

fn is_sensitive_header_name(name: &HeaderName) -> bool {
    // HeaderName::as_str() is normalized to lowercase.
    let n = name.as_str();
    matches!(n, "authorization" | "proxy-authorization" | "cookie" | "set-cookie")
        || n.contains("token")
        || n.contains("secret")
        || n.contains("api-key")
        || n.contains("apikey")
        || n.ends_with("-key")
}

pub(crate) fn header_value_for_debug(name: &HeaderName, value: &HeaderValue) -> String {
    if value.is_sensitive() || is_sensitive_header_name(name) {
        "<redacted>".to_string()
    } else {
        value.to_str().unwrap_or("<non-utf8>").to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::header::{ACCEPT, AUTHORIZATION, COOKIE};

    #[test]
    fn redacts_sensitive_headers_by_name() {
        assert!(is_sensitive_header_name(&AUTHORIZATION));
        assert!(is_sensitive_header_name(&COOKIE));
        assert!(is_sensitive_header_name(&HeaderName::from_static("x-refresh-token")));
        assert!(is_sensitive_header_name(&HeaderName::from_static("x-api-key")));
        assert!(!is_sensitive_header_name(&ACCEPT));

        let secret = HeaderValue::from_static("s3cr3t");
        assert_eq!(header_value_for_debug(&AUTHORIZATION, &secret), "<redacted>");
        assert_eq!(
            header_value_for_debug(&ACCEPT, &HeaderValue::from_static("application/json")),
            "application/json"
        );
    }

    #[test]
    fn redacts_values_marked_sensitive() {
        let mut v = HeaderValue::from_static("hunter2");
        v.set_sensitive(true);
        assert_eq!(
            header_value_for_debug(&HeaderName::from_static("x-custom"), &v),
            "<redacted>"
        );
    }

    #[test]
    fn levels_are_ordered() {
        assert!(!DebugLevel::None.is_enabled());
        assert!(DebugLevel::V.is_verbose() && !DebugLevel::V.is_very_verbose());
        assert!(DebugLevel::VV.is_verbose() && DebugLevel::VV.is_very_verbose());
        assert_eq!(DebugLevel::VV.to_string(), "vv");
    }
}
