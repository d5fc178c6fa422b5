//! XML text helpers shared by the serializer and the part reader.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use quick_xml::events::BytesStart;

// Static initialization: automaton is built only once, thread-safe
static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});


/// Escape XML special characters.
///
/// ```
/// use quire::common::xml::escape_xml;
/// assert_eq!(escape_xml("a & b"), "a &amp; b");
/// assert_eq!(escape_xml("<t>\"x\"</t>"), "&lt;t&gt;&quot;x&quot;&lt;/t&gt;");
/// ```
#[inline]
pub fn escape_xml(s: &str) -> String {
    XML_ESCAPER.replace_all(s, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Value of a predefined entity or a numeric character reference, given
/// the text between `&` and `;` (`amp`, `#x41`, `#66`).
pub(crate) fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        },
    }
}

/// Unescape predefined entities and numeric character references.
/// Unknown entities are left as-is.
///
/// ```
/// use quire::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
/// assert_eq!(unescape_xml("line1&#xA;line2&#33;"), "line1\nline2!");
/// assert_eq!(unescape_xml("&invalid; &#65;"), "&invalid; A");
/// ```
pub fn unescape_xml(s: &str) -> String {
    if let Ok(text) = quick_xml::escape::unescape(s) {
        return text.into_owned();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = memchr::memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let resolved = tail
            .find(';')
            .and_then(|semi| Some((semi, resolve_reference(&tail[1..semi])?)));
        match resolved {
            Some((semi, c)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

/// Look up an attribute by its qualified name (e.g. `b"w:val"`), unescaped.
pub fn attr(e: &BytesStart<'_>, qname: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == qname)
        .map(|a| unescape_xml(&String::from_utf8_lossy(&a.value)))
}

/// Look up an attribute by local name, ignoring the namespace prefix.
pub fn attr_local(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| unescape_xml(&String::from_utf8_lossy(&a.value)))
}

/// Interpret an OOXML on/off property (`<w:b/>`, `<w:b w:val="0"/>`, ...).
pub fn on_off(e: &BytesStart<'_>) -> bool {
    match attr_local(e, b"val").as_deref() {
        None => true,
        Some("0" | "false" | "off") => false,
        Some(_) => true,
    }
}
