//! Just enough RFC 4180 for the result and URL tables.

use std::borrow::Cow;

/// Quote a field if it contains a delimiter, a quote or a line break.
pub(crate) fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One line, newline included.
pub(crate) fn line(fields: &[&str]) -> String {
    let mut out = fields.iter().map(|field| escape(field)).collect::<Vec<_>>().join(",");
    out.push('\n');
    out
}

/// Split a single line into fields. Returns `None` if a quoted field is
/// never closed.
pub(crate) fn split(line: &str) -> Option<Vec<String>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            },
            (true, '"') => quoted = false,
            (true, c) => field.push(c),
            (false, '"') if field.is_empty() => quoted = true,
            (false, ',') => fields.push(std::mem::take(&mut field)),
            (false, c) => field.push(c),
        }
    }
    if quoted {
        return None;
    }
    fields.push(field);
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("usr/bin/foo", "usr/bin/foo")]
    #[case("a,b", "\"a,b\"")]
    #[case("say \"hi\"", "\"say \"\"hi\"\"\"")]
    #[case("two\nlines", "\"two\nlines\"")]
    #[case("", "")]
    fn test_escape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape(input), expected);
    }

    #[test]
    fn test_line() {
        assert_eq!(line(&["foo", "1.2.3", "a,b"]), "foo,1.2.3,\"a,b\"\n");
    }

    #[rstest]
    #[case("url,state", vec!["url", "state"])]
    #[case("https://m.example/a.deb,-1\r\n", vec!["https://m.example/a.deb", "-1"])]
    #[case("\"https://m.example/a,b.deb\",1", vec!["https://m.example/a,b.deb", "1"])]
    #[case("\"say \"\"hi\"\"\",x", vec!["say \"hi\"", "x"])]
    #[case("solo", vec!["solo"])]
    #[case(",", vec!["", ""])]
    fn test_split(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split(input).unwrap(), expected);
    }

    #[test]
    fn test_split_unterminated() {
        assert_eq!(split("\"open,1"), None);
    }
}
