use core::fmt;

/// HTTP methods an endpoint descriptor can use.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

/// What a method does with a request body.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BodyRule {
    /// No body may be sent.
    Forbidden,
    /// A body may be sent; no Content-Type is implied.
    Allowed,
    /// A body may be sent; Content-Type defaults to JSON when absent.
    Json,
}

struct MethodInfo {
    http: http::Method,
    body: BodyRule,
    idempotent: bool,
}

static TABLE: [MethodInfo; 6] = [
    MethodInfo {
        http: http::Method::GET,
        body: BodyRule::Forbidden,
        idempotent: true,
    },
    MethodInfo {
        http: http::Method::HEAD,
        body: BodyRule::Forbidden,
        idempotent: true,
    },
    MethodInfo {
        http: http::Method::POST,
        body: BodyRule::Json,
        idempotent: false,
    },
    MethodInfo {
        http: http::Method::PUT,
        body: BodyRule::Json,
        idempotent: true,
    },
    MethodInfo {
        http: http::Method::DELETE,
        body: BodyRule::Allowed,
        idempotent: true,
    },
    MethodInfo {
        http: http::Method::PATCH,
        body: BodyRule::Json,
        idempotent: false,
    },
];

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
    ];

    #[inline]
    fn info(self) -> &'static MethodInfo {
        &TABLE[self as usize]
    }

    #[inline]
    pub fn as_http(self) -> http::Method {
        self.info().http.clone()
    }

    #[inline]
    pub fn body_rule(self) -> BodyRule {
        self.info().body
    }

    #[inline]
    pub fn is_idempotent(self) -> bool {
        self.info().idempotent
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    #[inline]
    fn from(m: Method) -> Self {
        m.as_http()
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = http::Method;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        Method::ALL
            .into_iter()
            .find(|candidate| candidate.info().http == *m)
            .ok_or_else(|| m.clone())
    }
}
