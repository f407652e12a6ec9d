//! Filename sanitization and `Content-Disposition` handling (RFC 6266).

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left unescaped in an RFC 5987 `ext-value` (`attr-char`).
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Reduces `name` to a base name safe to embed in a quoted header parameter.
///
/// Everything up to the last `/` or `\` is dropped, and every `"` and control
/// character is removed. Falls back to `default` when nothing is left.
pub fn sanitize_filename(name: &str, default: &str) -> String {
    let base = name
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let clean: String = base
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();

    if clean.is_empty() || clean == "." || clean == ".." {
        default.to_owned()
    } else {
        clean
    }
}

/// Builds an `attachment` disposition value for `filename`.
///
/// Printable ASCII names are sent as a quoted `filename`. Anything else also
/// gets an ASCII fallback and a UTF-8 `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    let is_plain = filename.chars().all(|c| c.is_ascii() && !c.is_ascii_control());
    if is_plain {
        return format!("attachment; filename={}", quote(filename));
    }

    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() {
                c
            } else {
                '?'
            }
        })
        .collect();

    format!(
        "attachment; filename={}; filename*=UTF-8''{}",
        quote(&fallback),
        utf8_percent_encode(filename, ATTR_CHAR)
    )
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// `filename*` wins over `filename`. Returns `None` when the header carries
/// no filename or cannot be parsed.
pub fn parse_filename(header: &str) -> Option<String> {
    let params = parse_params(header)?;

    let extended = params
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("filename*"))
        .and_then(|(_, value)| decode_ext_value(value));

    extended.or_else(|| {
        params
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("filename"))
            .map(|(_, value)| value)
    })
}

/// Splits `type; name=value; name="quoted"` into parameters.
fn parse_params(header: &str) -> Option<Vec<(String, String)>> {
    let mut rest = header.trim_start();
    let type_end = rest.find(';').unwrap_or(rest.len());
    if rest[..type_end].trim().is_empty() {
        return None;
    }
    rest = &rest[type_end..];

    let mut params = Vec::new();
    while let Some(after_semicolon) = rest.strip_prefix(';') {
        rest = after_semicolon.trim_start();
        if rest.is_empty() {
            break;
        }

        let eq = rest.find('=')?;
        let name = rest[..eq].trim().to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let (value, consumed) = unquote(quoted)?;
            rest = &quoted[consumed..];
            value
        } else {
            let end = rest.find(';').unwrap_or(rest.len());
            let value = rest[..end].trim().to_owned();
            rest = &rest[end..];
            value
        };

        params.push((name, value));
        rest = rest.trim_start();
        if !rest.is_empty() && !rest.starts_with(';') {
            return None;
        }
    }

    Some(params)
}

/// Reads a quoted-string body, returning the value and the bytes consumed
/// including the closing quote.
fn unquote(input: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(escaped);
            }
            '"' => return Some((value, index + 1)),
            _ => value.push(c),
        }
    }
    None
}

/// Decodes an RFC 5987 `charset'lang'pct-encoded` value.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    if charset.eq_ignore_ascii_case("utf-8") {
        String::from_utf8(bytes).ok()
    } else if charset.eq_ignore_ascii_case("iso-8859-1") {
        Some(bytes.into_iter().map(char::from).collect())
    } else {
        None
    }
}
