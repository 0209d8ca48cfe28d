//! Label page query parameters.
//!
//! A label page is addressed as `.../label?f=<packfile>&r=<flpid>&c=<json commands>`.
//! We only need the query string and the page origin (used as the default server base).

use crate::command::{Command, CommandError, parse_commands};

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("page URL has no query string")]
    NoQuery,

    #[error("query parameter `{0}` is missing")]
    MissingParam(&'static str),

    #[error("query parameter `c`: {0}")]
    Commands(#[from] CommandError),
}

/// Everything a label page asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelQuery {
    /// `f`
    pub packfile: String,
    /// `r`
    pub flp_id: String,
    /// `c`
    pub commands: Vec<Command>,
}

impl LabelQuery {
    pub fn from_page_url(url: &str) -> Result<Self, QueryError> {
        let (_, rest) = url.split_once('?').ok_or(QueryError::NoQuery)?;
        let query = rest.split_once('#').map_or(rest, |(q, _)| q);
        Self::from_query_string(query)
    }

    /// Parse `f`, `r` and `c` from a raw query string (without the leading `?`).
    ///
    /// The first occurrence of a parameter wins.
    pub fn from_query_string(query: &str) -> Result<Self, QueryError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let get = |key: &'static str| -> Result<String, QueryError> {
            query
                .split('&')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                    (form_decode(k) == key).then(|| form_decode(v))
                })
                .next()
                .ok_or(QueryError::MissingParam(key))
        };

        let packfile = get("f")?;
        let flp_id = get("r")?;
        let commands = parse_commands(&get("c")?)?;

        Ok(Self {
            packfile,
            flp_id,
            commands,
        })
    }
}

/// `scheme://host[:port]` of a page URL, if it has one.
pub fn page_origin(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let after = &url[scheme_end + 3..];
    let host_len = after.find(['/', '?', '#']).unwrap_or(after.len());
    if host_len == 0 {
        return None;
    }
    Some(&url[..scheme_end + 3 + host_len])
}

/// Decode `application/x-www-form-urlencoded` text: `+` is a space, `%XX` a byte.
///
/// Malformed escapes are kept verbatim.
pub fn form_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
