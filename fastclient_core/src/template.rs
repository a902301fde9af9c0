//! Path templates (`/users/{id}/posts`) and URL resolution against a base.

use crate::error::ApiClientError;
use crate::types::Params;
use std::fmt;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A `/`-separated path template. A segment that is exactly `{identifier}`
/// is a substitution point; any other use of braces is kept as literal text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TemplateWarningReason {
    /// Braces that do not span the whole segment, e.g. `v{n}` or `{a}{b}`.
    PartialSegmentBraces,
    /// `{...}` whose content is not an identifier, e.g. `{}` or `{a-b}`.
    InvalidIdentifier,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateWarning {
    pub segment: String,
    pub reason: TemplateWarningReason,
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            TemplateWarningReason::PartialSegmentBraces => "braces must span the whole segment",
            TemplateWarningReason::InvalidIdentifier => "placeholder is not an identifier",
        };
        write!(f, "segment {:?} is sent literally: {}", self.segment, why)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl PathTemplate {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = raw
            .split('/')
            .map(|seg| {
                match seg
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .filter(|name| is_identifier(name))
                {
                    Some(name) => Segment::Placeholder(name.to_string()),
                    None => Segment::Literal(seg.to_string()),
                }
            })
            .collect();
        Self { raw, segments }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance; repeats are kept.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Segments that look like placeholders but will not be substituted.
    pub fn warnings(&self) -> Vec<TemplateWarning> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(lit) if lit.contains(['{', '}']) => {
                    let whole = lit.starts_with('{')
                        && lit.ends_with('}')
                        && lit[1..lit.len().saturating_sub(1).max(1)].find(['{', '}']).is_none();
                    Some(TemplateWarning {
                        segment: lit.clone(),
                        reason: if whole {
                            TemplateWarningReason::InvalidIdentifier
                        } else {
                            TemplateWarningReason::PartialSegmentBraces
                        },
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Substitutes placeholders from `args`. A placeholder without an argument
    /// stays as literal `{name}` unless `strict` is set.
    pub fn render(&self, args: &Params, strict: bool) -> Result<String, ApiClientError> {
        let mut out = String::with_capacity(self.raw.len());
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('/');
            }
            match seg {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Placeholder(name) => match args.get(name) {
                    Some(v) => out.push_str(&v.to_string()),
                    None if strict => {
                        return Err(ApiClientError::UnresolvedPlaceholder {
                            name: name.clone(),
                            template: self.raw.clone(),
                        });
                    }
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        Ok(out)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for PathTemplate {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for PathTemplate {
    fn from(s: String) -> Self {
        Self::parse(s)
    }
}

/// Renders `template`, joins it onto `base` and appends the truthy `query`
/// entries in insertion order. The result always keeps the base's scheme,
/// host and port.
pub fn resolve_url(
    template: &PathTemplate,
    path: &Params,
    query: &Params,
    base: &Url,
    strict: bool,
) -> Result<Url, ApiClientError> {
    let rendered = template.render(path, strict)?;
    let mut url = base.join(&rendered)?;
    if url.origin() != base.origin() {
        return Err(ApiClientError::ForeignOrigin {
            base: base.to_string(),
            url: url.to_string(),
        });
    }

    let pairs: Vec<(&str, String)> = query
        .iter()
        .filter(|(_, v)| !v.is_falsy())
        .map(|(k, v)| (k, v.to_string()))
        .collect();
    if !pairs.is_empty() {
        let mut qp = url.query_pairs_mut();
        for (k, v) in pairs {
            qp.append_pair(k, &v);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::ParamValue;

    fn base() -> Url {
        Url::parse("https://localhost:3000").unwrap()
    }

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn placeholders_substitute_in_place() {
        let t = PathTemplate::parse("/orgs/{a}/repos/{b}");
        assert_eq!(t.placeholders().collect::<Vec<_>>(), ["a", "b"]);
        let path = params(&[("a", "1".into()), ("b", "2".into())]);
        assert_eq!(t.render(&path, false).unwrap(), "/orgs/1/repos/2");
    }

    #[test]
    fn missing_placeholder_stays_literal() {
        let t = PathTemplate::parse("/orgs/{a}/repos/{b}");
        let path = params(&[("a", "1".into())]);
        assert_eq!(t.render(&path, false).unwrap(), "/orgs/1/repos/{b}");

        let url = resolve_url(&t, &path, &Params::new(), &base(), false).unwrap();
        assert_eq!(url.as_str(), "https://localhost:3000/orgs/1/repos/%7Bb%7D");
    }

    #[test]
    fn missing_placeholder_fails_when_strict() {
        let t = PathTemplate::parse("/{id}");
        match t.render(&Params::new(), true) {
            Err(ApiClientError::UnresolvedPlaceholder { name, template }) => {
                assert_eq!(name, "id");
                assert_eq!(template, "/{id}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn repeated_placeholder_uses_same_value() {
        let t = PathTemplate::parse("/{id}/mirror/{id}");
        let path = params(&[("id", 7.into())]);
        assert_eq!(t.render(&path, false).unwrap(), "/7/mirror/7");
    }

    #[test]
    fn query_keeps_order_and_drops_falsy() {
        let t = PathTemplate::parse("/");
        let query = params(&[
            ("a", 123.into()),
            ("b", true.into()),
            ("c", "abc".into()),
            ("zero", 0.into()),
            ("empty", "".into()),
            ("no", false.into()),
        ]);
        let url = resolve_url(&t, &Params::new(), &query, &base(), false).unwrap();
        assert_eq!(url.as_str(), "https://localhost:3000/?a=123&b=true&c=abc");
    }

    #[test]
    fn only_falsy_query_leaves_no_question_mark() {
        let t = PathTemplate::parse("/x");
        let query = params(&[("a", 0.into())]);
        let url = resolve_url(&t, &Params::new(), &query, &base(), false).unwrap();
        assert_eq!(url.as_str(), "https://localhost:3000/x");
    }

    #[test]
    fn relative_templates_join_and_absolute_ones_override() {
        let base = Url::parse("https://host/api/v1/").unwrap();
        let rel = PathTemplate::parse("users/{id}");
        let abs = PathTemplate::parse("/users/{id}");
        let path = params(&[("id", "9".into())]);
        let none = Params::new();
        assert_eq!(
            resolve_url(&rel, &path, &none, &base, false).unwrap().as_str(),
            "https://host/api/v1/users/9"
        );
        assert_eq!(
            resolve_url(&abs, &path, &none, &base, false).unwrap().as_str(),
            "https://host/users/9"
        );
    }

    #[test]
    fn path_values_cannot_move_the_request_off_the_base_host() {
        let t = PathTemplate::parse("/{id}");
        for id in ["/evil.example", "//evil.example/x", "/evil.example:8443"] {
            let path = params(&[("id", id.into())]);
            match resolve_url(&t, &path, &Params::new(), &base(), false) {
                Err(ApiClientError::ForeignOrigin { url, .. }) => {
                    assert!(url.contains("evil.example"), "{url}");
                }
                other => panic!("{id}: unexpected {other:?}"),
            }
        }

        let path = params(&[("id", "a/b".into())]);
        let url = resolve_url(&t, &path, &Params::new(), &base(), false).unwrap();
        assert_eq!(url.as_str(), "https://localhost:3000/a/b");
    }

    #[test]
    fn partial_braces_are_literal_and_warned() {
        let t = PathTemplate::parse("/v{n}/{}/{ok}/{a-b}");
        assert_eq!(t.placeholders().collect::<Vec<_>>(), ["ok"]);
        let reasons: Vec<_> = t.warnings().into_iter().map(|w| w.reason).collect();
        assert_eq!(
            reasons,
            [
                TemplateWarningReason::PartialSegmentBraces,
                TemplateWarningReason::InvalidIdentifier,
                TemplateWarningReason::InvalidIdentifier,
            ]
        );
        assert!(PathTemplate::parse("/users/{id}").warnings().is_empty());
    }
}
