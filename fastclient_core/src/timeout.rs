use core::time::Duration;

/// Per-call override for the request timeout.
///
/// - `Inherit`: keep the timeout layered from client, endpoint and call args.
/// - `Clear`: send this request without a timeout.
/// - `Set(d)`: force `d` for this request.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum TimeoutOverride {
    #[default]
    Inherit,
    Clear,
    Set(Duration),
}

impl TimeoutOverride {
    #[inline]
    pub fn apply(self, inherited: Option<Duration>) -> Option<Duration> {
        match self {
            TimeoutOverride::Inherit => inherited,
            TimeoutOverride::Clear => None,
            TimeoutOverride::Set(d) => Some(d),
        }
    }
}

/// Client default, then endpoint, then call args; the most specific wins.
#[inline]
pub(crate) fn layered(
    client: Option<Duration>,
    endpoint: Option<Duration>,
    call: Option<Duration>,
) -> Option<Duration> {
    call.or(endpoint).or(client)
}
