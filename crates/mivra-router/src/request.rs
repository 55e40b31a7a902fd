//! HTTP request type.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP methods a route can be registered for.
///
/// The declaration order is also the order in which method buckets are
/// scanned during dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// DELETE method
    Delete,
}

impl Method {
    /// Every routable method, in bucket order.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    /// Parses a method from a string, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unsupported method: {s}"))
    }
}

/// Path parameters extracted from the URL, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter, replacing an earlier value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Gets a parameter value or returns an error.
    pub fn require(&self, key: &str) -> Result<&str, String> {
        self.get(key)
            .ok_or_else(|| format!("Missing path parameter: {key}"))
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true when no parameter was captured.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// An incoming HTTP request as the router sees it.
///
/// The method is kept as the raw verb the client sent so that requests for
/// verbs no route uses still reach the 405/404 logic.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method, uppercased.
    pub method: String,
    /// Request path, without the query string.
    pub path: String,
    /// Query string parameters.
    pub query: HashMap<String, String>,
    /// Form body parameters.
    pub form: HashMap<String, String>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

impl Request {
    /// Creates a new request from a method and a request URI.
    ///
    /// Anything after the first `?` is parsed as the query string.
    pub fn new(method: impl AsRef<str>, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Self::parse_query_string(query)),
            None => (uri, HashMap::new()),
        };
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query,
            form: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(uri: &str) -> Self {
        Self::new(Method::Get, uri)
    }

    /// Creates a POST request.
    pub fn post(uri: &str) -> Self {
        Self::new(Method::Post, uri)
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Looks up an input value: form body first, then query string.
    pub fn input(&self, key: &str) -> Option<&str> {
        self.form
            .get(key)
            .or_else(|| self.query.get(key))
            .map(String::as_str)
    }

    /// Like [`Request::input`], with a fallback value.
    pub fn input_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.input(key).unwrap_or(default)
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets a form field.
    #[must_use]
    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    /// Sets a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Gets a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Parses query parameters from a query string.
    pub fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (urlencoding_decode(key), urlencoding_decode(value))
            })
            .collect()
    }
}

/// Form-style URL decoding: `+` is a space, `%XX` is a byte.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("post"), Some(Method::Post));
        assert_eq!(Method::parse("PATCH"), None);
        assert_eq!("delete".parse::<Method>(), Ok(Method::Delete));
    }

    #[test]
    fn test_method_serde_token() {
        let json = serde_json::to_string(&Method::Put).unwrap();
        assert_eq!(json, "\"PUT\"");
        let back: Method = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Method::Put);
    }

    #[test]
    fn test_path_params_keep_order() {
        let mut params = PathParams::new();
        params.insert("post", "42");
        params.insert("comment", "7");
        params.insert("post", "43");

        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["post", "comment"]);
        assert_eq!(params.get("post"), Some("43"));
        assert_eq!(params.parse::<i64>("comment"), Some(7));
        assert!(params.require("missing").is_err());
    }

    #[test]
    fn test_request_strips_query() {
        let req = Request::new("get", "/contact?ref=home&q=a+b");
        assert_eq!(req.method(), "GET");
        assert_eq!(req.path(), "/contact");
        assert_eq!(req.input("ref"), Some("home"));
        assert_eq!(req.input("q"), Some("a b"));
    }

    #[test]
    fn test_input_prefers_form() {
        let req = Request::post("/contact?name=query")
            .with_form("name", "form")
            .with_header("Content-Type", "application/x-www-form-urlencoded");

        assert_eq!(req.input("name"), Some("form"));
        assert_eq!(req.input_or("email", "none"), "none");
        assert_eq!(
            req.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_query_string_parsing() {
        let query = Request::parse_query_string("name=John+Doe&age=30&city=New%20York&bad=%zz");
        assert_eq!(query.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(query.get("age"), Some(&"30".to_string()));
        assert_eq!(query.get("city"), Some(&"New York".to_string()));
        assert_eq!(query.get("bad"), Some(&"%zz".to_string()));
    }
}
