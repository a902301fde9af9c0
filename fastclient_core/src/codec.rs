use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use http::HeaderMap;
use http::header::CONTENT_TYPE;

#[cfg(feature = "json")]
pub(crate) mod json;

pub(crate) mod text;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    Binary,
    Text,
}

impl Format {
    /// Text for JSON, `text/*`, form bodies and untyped payloads; binary otherwise.
    pub fn from_headers(headers: &HeaderMap) -> Format {
        let ct = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let essence = ct.split(';').next().unwrap_or("").trim();
        if essence.is_empty()
            || essence.starts_with("text/")
            || essence == "application/json"
            || essence.ends_with("+json")
            || essence == "application/x-www-form-urlencoded"
            || essence == "application/xml"
        {
            Format::Text
        } else {
            Format::Binary
        }
    }
}

pub(crate) fn format_bytes_for_debug(format: Format, bytes: &[u8], max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    match format {
        Format::Text => {
            // Worst case UTF-8 expansion for lossy preview: cap by ~4 bytes per char.
            let max_bytes = max_chars.saturating_mul(4).max(1);
            let slice_len = bytes.len().min(max_bytes);
            let s0 = String::from_utf8_lossy(&bytes[..slice_len]).to_string();
            let mut s = truncate_for_debug(&s0, max_chars);
            if slice_len < bytes.len() && !s.ends_with('…') {
                s.push('…');
            }
            s
        }
        Format::Binary => {
            // base64 expands 3 bytes -> 4 chars.
            let max_bytes = max_chars.saturating_mul(3).div_ceil(4).max(1);
            let slice_len = bytes.len().min(max_bytes);
            let s0 = STANDARD_NO_PAD.encode(&bytes[..slice_len]);
            let mut s = truncate_for_debug(&s0, max_chars);
            if slice_len < bytes.len() && !s.ends_with('…') {
                s.push('…');
            }
            s
        }
    }
}

pub(crate) fn truncate_for_debug(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let mut it = s.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        match it.next() {
            Some(c) => out.push(c),
            None => return out,
        }
    }
    if it.next().is_some() {
        out.push('…');
    }
    out
}
