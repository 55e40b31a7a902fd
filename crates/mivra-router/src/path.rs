//! Path pattern compilation and matching.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::PathParams;

/// A `{name}` placeholder inside a route pattern.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder regex is valid")
});

/// A compiled path pattern for matching URLs.
///
/// Pattern syntax:
/// - `/contact` - literal path, matched verbatim
/// - `/users/{id}` - `id` captures one or more characters other than `/`
///
/// Matching is anchored at both ends: `/users/{id}` does not match
/// `/users/5/edit` nor `/users/5/`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a path pattern string.
    ///
    /// # Example
    ///
    /// ```
    /// use mivra_router::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/{id}/comments/{comment_id}").unwrap();
    /// let params = pattern.match_path("/posts/123/comments/456").unwrap();
    /// assert_eq!(params.get("id"), Some("123"));
    /// assert_eq!(params.get("comment_id"), Some("456"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self> {
        let mut source = String::from("^");
        let mut param_names = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            source.push_str(&regex::escape(&pattern[last..whole.start()]));
            source.push_str("([^/]+)");
            param_names.push(name.as_str().to_string());
            last = whole.end();
        }

        source.push_str(&regex::escape(&pattern[last..]));
        source.push('$');

        Self::from_parts(pattern, &source, param_names)
    }

    /// Rebuilds a pattern from its already-compiled parts.
    ///
    /// Used when loading the route cache. Fails when the regex does not
    /// compile or does not have one capture group per parameter name.
    pub fn from_parts(pattern: &str, regex_source: &str, param_names: Vec<String>) -> Result<Self> {
        let invalid = |message: String| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        };

        let regex = Regex::new(regex_source).map_err(|e| invalid(e.to_string()))?;
        let groups = regex.captures_len() - 1;
        if groups != param_names.len() {
            return Err(invalid(format!(
                "{groups} capture groups for {} parameters",
                param_names.len()
            )));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            param_names,
        })
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(value) = caps.get(i + 1) {
                params.insert(name.clone(), value.as_str());
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the compiled regex source.
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns the parameter names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

/// Substitutes `{key}` placeholders in a raw pattern.
///
/// Values are percent-encoded. Placeholders without a supplied value are
/// left in the output as-is, and keys that appear nowhere are ignored.
///
/// ```
/// use mivra_router::path::expand;
///
/// assert_eq!(expand("/users/{id}", &[("id", "a b")]), "/users/a%20b");
/// assert_eq!(expand("/users/{id}", &[]), "/users/{id}");
/// ```
pub fn expand(pattern: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(pattern.to_string(), |path, (key, value)| {
        path.replace(&format!("{{{key}}}"), &percent_encode(value))
    })
}

/// RFC 3986 percent-encoding: everything but unreserved characters.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        let pattern = PathPattern::new("/contact").unwrap();
        assert!(pattern.match_path("/contact").unwrap().is_empty());
        assert!(pattern.match_path("/contact/").is_none());
        assert!(pattern.match_path("/contact/us").is_none());
        assert!(pattern.match_path("/about").is_none());
    }

    #[test]
    fn test_root_path() {
        let pattern = PathPattern::new("/").unwrap();
        assert!(pattern.match_path("/").is_some());
        assert!(pattern.match_path("").is_none());
        assert!(pattern.match_path("/x").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = PathPattern::new("/users/{id}").unwrap();
        let params = pattern.match_path("/users/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(pattern.param_names(), ["id"]);
    }

    #[test]
    fn test_params_recover_substituted_values() {
        let pattern = PathPattern::new("/p/{a}-{b}/x.{ext}").unwrap();
        let values = [("a", "foo bar"), ("b", "%41"), ("ext", "tar.gz")];
        let path = format!("/p/{}-{}/x.{}", values[0].1, values[1].1, values[2].1);

        let params = pattern.match_path(&path).unwrap();
        for (name, value) in values {
            assert_eq!(params.get(name), Some(value), "param {name}");
        }
    }

    #[test]
    fn test_param_never_spans_slash() {
        let pattern = PathPattern::new("/users/{id}").unwrap();
        assert!(pattern.match_path("/users/1/2").is_none());
        assert!(pattern.match_path("/users/").is_none());

        let pattern = PathPattern::new("/files/{name}/raw").unwrap();
        assert!(pattern.match_path("/files/a/b/raw").is_none());
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = PathPattern::new("/feed.xml").unwrap();
        assert!(pattern.match_path("/feed.xml").is_some());
        assert!(pattern.match_path("/feedXxml").is_none());

        let pattern = PathPattern::new("/a+b/(x)").unwrap();
        assert!(pattern.match_path("/a+b/(x)").is_some());
        assert!(pattern.match_path("/aab/x").is_none());
    }

    #[test]
    fn test_invalid_placeholders_stay_literal() {
        let pattern = PathPattern::new("/raw/{1abc}/{ok}").unwrap();
        assert_eq!(pattern.param_names(), ["ok"]);
        let params = pattern.match_path("/raw/{1abc}/yes").unwrap();
        assert_eq!(params.get("ok"), Some("yes"));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let a = PathPattern::new("/posts/{post}/comments/{comment}").unwrap();
        let b = PathPattern::new("/posts/{post}/comments/{comment}").unwrap();
        assert_eq!(a.regex_source(), b.regex_source());
        assert_eq!(a.param_names(), b.param_names());
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let compiled = PathPattern::new("/users/{id}").unwrap();
        let rebuilt = PathPattern::from_parts(
            compiled.pattern(),
            compiled.regex_source(),
            compiled.param_names().to_vec(),
        )
        .unwrap();
        assert_eq!(
            rebuilt.match_path("/users/9").unwrap().get("id"),
            Some("9")
        );

        assert!(PathPattern::from_parts("/users/{id}", compiled.regex_source(), vec![]).is_err());
        assert!(PathPattern::from_parts("/users/{id}", "^/users/([^/]+$", vec!["id".into()]).is_err());
    }

    #[test]
    fn test_expand() {
        assert_eq!(expand("/contact", &[]), "/contact");
        assert_eq!(expand("/users/{id}", &[("id", "a b")]), "/users/a%20b");
        assert_eq!(
            expand("/users/{id}", &[("id", "x/y?z=ü")]),
            "/users/x%2Fy%3Fz%3D%C3%BC"
        );
        assert_eq!(expand("/users/{id}", &[("other", "1")]), "/users/{id}");
        assert_eq!(
            expand("/a/{x}/b/{x}", &[("x", "1")]),
            "/a/1/b/1"
        );
    }

    #[test]
    fn test_percent_encode_unreserved() {
        assert_eq!(percent_encode("AZaz09-_.~"), "AZaz09-_.~");
        assert_eq!(percent_encode("a+b&c"), "a%2Bb%26c");
    }
}
