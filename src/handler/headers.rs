use super::EchoLogger;
use super::json::to_string_html_safe;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;

/// Canonical MIME form of a header name
///
/// The first letter and every letter following a hyphen are upper-cased,
/// everything else is lower-cased: `x-test` becomes `X-Test`.
///
/// ```
/// use echosrv::handler::canonical_header_name;
/// use http::header::CONTENT_LENGTH;
///
/// assert_eq!(canonical_header_name(&CONTENT_LENGTH), "Content-Length");
/// ```
pub fn canonical_header_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

/// Header value as text, with invalid UTF-8 replaced
pub(crate) fn header_value_text(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_owned(),
        Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
    }
}

/// Writes one `* Name: "value"` line per header value, ordered by canonical name
///
/// Values of a repeated header keep their arrival order and are quoted with
/// HTML-significant characters escaped (`a<b` prints as `"a\u003cb"`). A
/// value that cannot be JSON-encoded is reported to `logger` and left out.
pub fn write_sorted_headers(out: &mut Vec<u8>, headers: &HeaderMap, logger: &dyn EchoLogger) {
    let sorted: BTreeMap<String, &HeaderName> = headers
        .keys()
        .map(|name| (canonical_header_name(name), name))
        .collect();

    for (canonical, name) in sorted {
        for value in headers.get_all(name) {
            match to_string_html_safe(&header_value_text(value)) {
                Ok(quoted) => {
                    out.extend_from_slice(format!("* {canonical}: {quoted}\n").as_bytes());
                }
                Err(err) => logger.failure("cannot marshal header value", &err),
            }
        }
    }
}
