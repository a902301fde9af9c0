use core::fmt;
use http::HeaderValue;
use http::header::InvalidHeaderValue;

/// Credential wrapper that never reveals its contents in Debug/Display.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Explicit escape hatch to read the secret.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Bearer <secret>` as a header value flagged sensitive, so debug
    /// output redacts it whatever the header name.
    pub fn bearer(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut v = HeaderValue::try_from(format!("Bearer {}", self.0))?;
        v.set_sensitive(true);
        Ok(v)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl From<String> for SecretString {
    #[inline]
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl From<&str> for SecretString {
    #[inline]
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}
