use std::borrow::Cow;

/// Decodes the character references servers emit when they escape attribute
/// values and text (`&amp;`, `&#34;`, `&#x27;`, ...). Unknown references are
/// kept verbatim.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_reference(&candidate[1..end]).map(|c| (c, end)))
        {
            Some((decoded, end)) => {
                output.push(decoded);
                rest = &candidate[end + 1..];
            }
            None => {
                output.push('&');
                rest = &candidate[1..];
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

fn decode_reference(reference: &str) -> Option<char> {
    if let Some(numeric) = reference.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match reference {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}

pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>') || (quotes && c == '"');
    if !input.contains(needs_escape) {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' if quotes => output.push_str("&#34;"),
            c => output.push(c),
        }
    }
    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(
            decode_entities("onclick({&#34;id&#34;:&#34;inc&#34;}, $event) &amp;&lt;&gt;&#x27;"),
            r#"onclick({"id":"inc"}, $event) &<>'"#
        );
    }

    #[test]
    fn keeps_unknown_references_and_bare_ampersands() {
        assert_eq!(decode_entities("a & b &bogus; &#xZZ;"), "a & b &bogus; &#xZZ;");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn escapes_for_text_and_attributes() {
        assert_eq!(escape_text(r#"<a href="x">&"#), r#"&lt;a href="x"&gt;&amp;"#);
        assert_eq!(escape_attribute(r#"say "hi""#), "say &#34;hi&#34;");
    }
}
