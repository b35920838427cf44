//! HTTP response head parsing.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::fetcher::FetchError;

/// `HTTP/<d>.<d> <3-digit code> <reason>` — anything else is malformed.
static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^HTTP/\d\.\d (\d{3}) (.*)$").expect("valid regex"));

/// A parsed HTTP response: validated status line, header mapping, raw body.
///
/// Header names are case-folded to lowercase and values trimmed; duplicate
/// header names keep the last occurrence (plain mapping semantics, no
/// multi-value support). The body is kept as raw bytes — transfer encoding
/// is never applied (the request always sends `Connection: close` and reads
/// to EOF), and character decoding is the caller's concern.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Split a raw response at the first blank line and parse the head.
    pub fn parse(raw: &[u8]) -> Result<Self, FetchError> {
        let boundary = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .ok_or_else(|| {
                FetchError::MalformedResponse(
                    "missing blank line between headers and body".into(),
                )
            })?;

        let head = String::from_utf8_lossy(&raw[..boundary]);
        let body = raw[boundary + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap_or_default();
        let caps = STATUS_LINE.captures(status_line).ok_or_else(|| {
            FetchError::MalformedResponse(format!("bad status line: {status_line:?}"))
        })?;

        let status_code: u16 = caps[1].parse().map_err(|_| {
            FetchError::MalformedResponse(format!("bad status code in {status_line:?}"))
        })?;
        let reason = caps[2].to_string();

        let mut headers = HashMap::new();
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                return Err(FetchError::MalformedResponse(format!(
                    "header line missing ':' separator: {line:?}"
                )));
            };
            headers.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(HttpResponse {
            status_code,
            reason,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_status_line_and_body() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/xml\r\n\r\n<rss/>";
        let response = HttpResponse::parse(raw).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.reason, "OK");
        assert_eq!(
            response.headers.get("content-type").map(String::as_str),
            Some("text/xml")
        );
        assert_eq!(response.body, b"<rss/>");
    }

    #[test]
    fn header_names_case_folded_values_trimmed() {
        let raw = b"HTTP/1.1 200 OK\r\nLocation:   http://example.com/next  \r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();

        assert_eq!(
            response.headers.get("location").map(String::as_str),
            Some("http://example.com/next")
        );
        assert!(response.headers.get("Location").is_none());
    }

    #[test]
    fn duplicate_header_last_occurrence_wins() {
        let raw = b"HTTP/1.0 200 OK\r\nX-Tag: first\r\nX-Tag: second\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();

        assert_eq!(response.headers.get("x-tag").map(String::as_str), Some("second"));
    }

    #[test]
    fn header_value_may_contain_colons() {
        let raw = b"HTTP/1.0 200 OK\r\nLocation: https://example.com:8080/feed\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();

        assert_eq!(
            response.headers.get("location").map(String::as_str),
            Some("https://example.com:8080/feed")
        );
    }

    #[test]
    fn multi_word_reason_is_preserved() {
        let raw = b"HTTP/1.1 404 Not Found\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();

        assert_eq!(response.status_code, 404);
        assert_eq!(response.reason, "Not Found");
    }

    #[test]
    fn empty_header_block_is_valid() {
        let raw = b"HTTP/1.0 200 OK\r\n\r\nbody";
        let response = HttpResponse::parse(raw).unwrap();

        assert!(response.headers.is_empty());
        assert_eq!(response.body, b"body");
    }

    #[test]
    fn rejects_non_http_status_line() {
        let raw = b"ICY 200 OK\r\n\r\n";
        let err = HttpResponse::parse(raw).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_status_line_without_reason_separator() {
        let raw = b"HTTP/1.0 200\r\n\r\n";
        let err = HttpResponse::parse(raw).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_header_line_without_colon() {
        let raw = b"HTTP/1.0 200 OK\r\nbogus header line\r\n\r\n";
        let err = HttpResponse::parse(raw).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("separator"), "unexpected message: {msg}");
    }

    #[test]
    fn rejects_response_without_blank_line() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/xml\r\n";
        let err = HttpResponse::parse(raw).unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }

    #[test]
    fn lowercase_http_token_accepted() {
        let raw = b"http/1.0 200 OK\r\n\r\n";
        let response = HttpResponse::parse(raw).unwrap();
        assert_eq!(response.status_code, 200);
    }
}
