use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::io;

/// Compact JSON formatter that escapes HTML-significant characters
///
/// `<`, `>` and `&` are written as `\u003c`, `\u003e` and `\u0026`, and
/// the line and paragraph separators as `\u2028` and `\u2029`,
/// so echoed text can be embedded in HTML or JavaScript unchanged. Keys and
/// values are escaped alike.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serializes `value` as compact JSON with HTML-significant characters escaped
///
/// ```
/// use echosrv::handler::json::to_vec_html_safe;
///
/// let encoded = to_vec_html_safe("a<b && c>d").unwrap();
/// assert_eq!(encoded, br#""a\u003cb \u0026\u0026 c\u003ed""#);
/// ```
pub fn to_vec_html_safe<T>(value: &T) -> serde_json::Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let mut out = Vec::with_capacity(128);
    let mut serializer = Serializer::with_formatter(&mut out, HtmlSafeFormatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Same as [`to_vec_html_safe`] but returns a `String`
pub fn to_string_html_safe<T>(value: &T) -> serde_json::Result<String>
where
    T: ?Sized + Serialize,
{
    let encoded = to_vec_html_safe(value)?;
    // The formatter only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&encoded).into_owned())
}
