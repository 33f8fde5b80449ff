//! Markup sanitization for user-supplied rich-text content: drops
//! forbidden elements with their content, strips intrinsic event handlers
//! and javascript: attribute values, and restricts css classes to the
//! published `pub-` namespace. A string -> string filter like the checksum
//! rewriter, applied to untrusted fragments before they join a response.

/// Elements removed entirely, content included.
const FORBIDDEN_ELEMENTS: &[&str] = &[
    "script", "iframe", "element", "applet", "form", "frame", "frameset", "link", "style",
];

/// Intrinsic event attributes are never trusted.
const EVENT_ATTRIBUTES: &[&str] = &[
    "onabort", "onblur", "onchange", "onclick", "ondblclick", "onerror", "onfocus", "onkeydown",
    "onkeypress", "onkeyup", "onload", "onmousedown", "onmousemove", "onmouseout", "onmouseover",
    "onmouseup", "onreset", "onresize", "onselect", "onsubmit", "onunload",
];

/// Attributes stripped from images (map/description indirection).
const FORBIDDEN_IMG_ATTRIBUTES: &[&str] = &["longdesc", "usemap", "ismap"];

/// Only classes published for embedding survive.
const ALLOWED_CLASS_PREFIX: &str = "pub-";

#[derive(Debug, PartialEq)]
struct Attribute {
    name: String,
    value: Option<String>,
}

/// Sanitize an untrusted markup fragment.
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < input.len() {
        let Some(open_rel) = input[i..].find('<') else {
            out.push_str(&input[i..]);
            break;
        };
        let open = i + open_rel;
        out.push_str(&input[i..open]);

        if input[open..].starts_with("<!--") {
            match input[open..].find("-->") {
                Some(end_rel) => {
                    let end = open + end_rel + 3;
                    out.push_str(&input[open..end]);
                    i = end;
                }
                None => {
                    out.push_str(&input[open..]);
                    i = input.len();
                }
            }
            continue;
        }

        let Some(close_rel) = input[open..].find('>') else {
            out.push_str(&input[open..]);
            break;
        };
        let close = open + close_rel;

        let closing = bytes.get(open + 1) == Some(&b'/');
        let name_start = if closing { open + 2 } else { open + 1 };
        let name: String = input[name_start..close]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if closing {
            if !FORBIDDEN_ELEMENTS.contains(&name.as_str()) {
                out.push_str(&input[open..close + 1]);
            }
            i = close + 1;
            continue;
        }

        if FORBIDDEN_ELEMENTS.contains(&name.as_str()) {
            // Drop the element and everything inside it.
            let close_tag = format!("</{}", name);
            match input[close + 1..].to_lowercase().find(&close_tag) {
                Some(rel) => {
                    let after = close + 1 + rel;
                    match input[after..].find('>') {
                        Some(end_rel) => i = after + end_rel + 1,
                        None => break,
                    }
                }
                None => break,
            }
            continue;
        }

        let self_closing = input[open..close].ends_with('/');
        let attrs_end = if self_closing { close - 1 } else { close };
        let attrs_start = name_start + name.len();
        let attributes = parse_attributes(&input[attrs_start..attrs_end]);

        out.push('<');
        out.push_str(&name);
        for attribute in attributes {
            if let Some(kept) = filter_attribute(&name, attribute) {
                out.push(' ');
                out.push_str(&kept.name);
                if let Some(value) = kept.value {
                    out.push_str("=\"");
                    out.push_str(&value);
                    out.push('"');
                }
            }
        }
        out.push_str(if self_closing { "/>" } else { ">" });
        i = close + 1;
    }

    out
}

fn filter_attribute(element: &str, attribute: Attribute) -> Option<Attribute> {
    let name = attribute.name.to_lowercase();

    if EVENT_ATTRIBUTES.contains(&name.as_str()) {
        return None;
    }
    if element == "img" && FORBIDDEN_IMG_ATTRIBUTES.contains(&name.as_str()) {
        return None;
    }
    if let Some(value) = &attribute.value {
        if value.trim().to_lowercase().starts_with("javascript:") {
            return None;
        }
    }
    if name == "class" {
        let allowed = attribute
            .value
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .filter(|class| class.starts_with(ALLOWED_CLASS_PREFIX))
            .collect::<Vec<_>>()
            .join(" ");
        if allowed.is_empty() {
            return None;
        }
        return Some(Attribute {
            name,
            value: Some(allowed),
        });
    }

    Some(attribute)
}

/// Parse `name="value"` pairs, respecting single and double quotes.
fn parse_attributes(span: &str) -> Vec<Attribute> {
    let mut attributes = Vec::new();
    let mut chars = span.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let mut name = String::new();
        while matches!(chars.peek(), Some(c) if !c.is_whitespace() && *c != '=' && *c != '/') {
            name.push(chars.next().unwrap_or_default());
        }
        if name.is_empty() {
            match chars.next() {
                Some(_) => continue,
                None => break,
            }
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek() != Some(&'=') {
            attributes.push(Attribute { name, value: None });
            continue;
        }
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        match chars.peek() {
            Some(&quote) if quote == '"' || quote == '\'' => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
                    value.push(chars.next().unwrap_or_default());
                }
            }
        }
        attributes.push(Attribute {
            name,
            value: Some(value),
        });
    }

    attributes
}
