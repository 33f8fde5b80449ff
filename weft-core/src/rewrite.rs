//! Response-content checksum rewriting: scans rendered markup for link,
//! form, image and area tags and injects a tamper-detection digest over
//! the URL's tokens. The scan is a single left-to-right pass over the
//! immutable input building a fresh output buffer.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

/// Query parameter / hidden field carrying the digest.
pub const CHECKSUM_ATTRIBUTE_NAME: &str = "_request_checksum_";

/// Marker comment immediately preceding a tag that opts out of rewriting.
pub const NO_CHECKSUM_PREFIX: &str = "<!-- NO_CHECKSUM -->";

/// Token prefixes excluded from the digest input: checksum itself, the
/// pagination marker, the locale parameter and container-internal
/// attributes may vary without invalidating the digest.
const EXCLUDED_TOKEN_PREFIXES: &[&str] = &[
    CHECKSUM_ATTRIBUTE_NAME,
    "page=",
    "locale",
    "weft.request.",
    "ok",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Anchor,
    Form,
    Image,
    Area,
}

impl TagKind {
    fn url_attribute(&self) -> &'static str {
        match self {
            TagKind::Anchor | TagKind::Area => "href",
            TagKind::Form => "action",
            TagKind::Image => "src",
        }
    }
}

/// Digest over the sorted, de-duplicated URL tokens plus the per-session
/// secret. Order of query parameters does not affect the result.
pub fn calculate_checksum(request_string: &str, secret: Option<&str>) -> String {
    let without_fragment = match request_string.rfind('#') {
        Some(index) => &request_string[..index],
        None => request_string,
    };

    let mut tokens = BTreeSet::new();
    for part in split_tokens(without_fragment) {
        if !is_relevant_part(part) {
            continue;
        }
        match part.find('=') {
            Some(index) => {
                tokens.insert(&part[..index]);
                tokens.insert(&part[index + 1..]);
            }
            None => {
                tokens.insert(part);
            }
        }
    }

    let mut input = String::new();
    for token in tokens {
        input.push_str(token);
    }
    if let Some(secret) = secret {
        input.push_str(secret);
    }

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Split on `?`, `&amp;` and `&`, in that match order.
fn split_tokens(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            tokens.push(&s[start..i]);
            i += 1;
            start = i;
        } else if s[i..].starts_with("&amp;") {
            tokens.push(&s[start..i]);
            i += 5;
            start = i;
        } else if bytes[i] == b'&' {
            tokens.push(&s[start..i]);
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    tokens.push(&s[start..]);
    tokens
}

fn is_relevant_part(part: &str) -> bool {
    !part.is_empty()
        && !EXCLUDED_TOKEN_PREFIXES
            .iter()
            .any(|prefix| part.starts_with(prefix))
}

fn has_unrewritable_scheme(body: &str) -> bool {
    body.contains("javascript:")
        || body.contains("mailto:")
        || body.contains("http://")
        || body.contains("https://")
}

/// The rewriting filter. One instance per response, carrying the session
/// secret of the authenticated user (if any).
pub struct ChecksumRewriter {
    secret: Option<String>,
}

impl ChecksumRewriter {
    pub fn new(secret: Option<&str>) -> Self {
        ChecksumRewriter {
            secret: secret.map(str::to_string),
        }
    }

    /// Rewrite a rendered response body: links, images and areas get a
    /// checksum query parameter; forms get a hidden field after the open
    /// tag. Tags preceded by the no-checksum marker, and URL bodies that
    /// are javascript:, mailto: or absolute http(s), pass through
    /// untouched.
    pub fn rewrite(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len() + 128);
        let mut offset = 0;

        loop {
            let Some((tag_start, kind)) = next_tag(source, offset) else {
                out.push_str(&source[offset..]);
                break;
            };

            if is_prefixed(source, tag_start) {
                out.push_str(&source[offset..tag_start + 1]);
                offset = tag_start + 1;
                continue;
            }

            let Some(close_rel) = source[tag_start..].find('>') else {
                out.push_str(&source[offset..]);
                break;
            };
            let tag_close = tag_start + close_rel;

            let Some((body_start, body_end)) =
                attr_body(source, tag_start, tag_close, kind.url_attribute())
            else {
                out.push_str(&source[offset..tag_start + 1]);
                offset = tag_start + 1;
                continue;
            };
            let body = &source[body_start..body_end];

            match kind {
                TagKind::Form => {
                    out.push_str(&source[offset..tag_close + 1]);
                    let checksum = calculate_checksum(body, self.secret.as_deref());
                    out.push_str("<input type=\"hidden\" name=\"");
                    out.push_str(CHECKSUM_ATTRIBUTE_NAME);
                    out.push_str("\" value=\"");
                    out.push_str(&checksum);
                    out.push_str("\"/>");
                    offset = tag_close + 1;
                }
                TagKind::Anchor | TagKind::Area | TagKind::Image => {
                    if has_unrewritable_scheme(body) {
                        out.push_str(&source[offset..tag_close + 1]);
                        offset = tag_close + 1;
                        continue;
                    }

                    // The parameter goes before a fragment when one is
                    // present (images carry no fragments).
                    let fragment = if kind == TagKind::Image {
                        None
                    } else {
                        body.find('#').filter(|index| *index > 0)
                    };
                    let insert_at = body_start + fragment.unwrap_or(body.len());

                    let checksum = calculate_checksum(body, self.secret.as_deref());
                    let separator = if body.contains('?') { "&amp;" } else { "?" };

                    out.push_str(&source[offset..insert_at]);
                    out.push_str(separator);
                    out.push_str(CHECKSUM_ATTRIBUTE_NAME);
                    out.push('=');
                    out.push_str(&checksum);
                    out.push_str(&source[insert_at..tag_close + 1]);
                    offset = tag_close + 1;
                }
            }
        }

        out
    }
}

/// Leftmost of the recognized tag openers at or after `offset`.
fn next_tag(source: &str, offset: usize) -> Option<(usize, TagKind)> {
    let candidates = [
        ("<a ", TagKind::Anchor),
        ("<form ", TagKind::Form),
        ("<img ", TagKind::Image),
        ("<area ", TagKind::Area),
    ];
    candidates
        .iter()
        .filter_map(|(pattern, kind)| {
            source[offset..]
                .find(pattern)
                .map(|index| (offset + index, *kind))
        })
        .min_by_key(|(index, _)| *index)
}

fn is_prefixed(source: &str, tag_start: usize) -> bool {
    tag_start >= NO_CHECKSUM_PREFIX.len()
        && source[tag_start - NO_CHECKSUM_PREFIX.len()..tag_start] == *NO_CHECKSUM_PREFIX
}

/// The span of the quoted value of `attr` inside the tag, quotes excluded.
fn attr_body(source: &str, tag_start: usize, tag_close: usize, attr: &str) -> Option<(usize, usize)> {
    let span = &source[tag_start..tag_close];
    let pattern = format!(" {}=", attr);
    let rel = span.find(&pattern)?;
    let value_start = tag_start + rel + pattern.len();
    let quote = *source.as_bytes().get(value_start)? as char;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let body_start = value_start + 1;
    let body_end = source[body_start..].find(quote)? + body_start;
    Some((body_start, body_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_checksum_is_order_independent() {
        let a = calculate_checksum("/page?a=1&b=2", Some("secret"));
        let b = calculate_checksum("/page?b=2&a=1", Some("secret"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_depends_on_secret() {
        let a = calculate_checksum("/page?a=1", Some("one"));
        let b = calculate_checksum("/page?a=1", Some("two"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_checksum_is_deterministic() {
        let a = calculate_checksum("/page?a=1&b=2", None);
        let b = calculate_checksum("/page?a=1&b=2", None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_excluded_tokens_do_not_change_checksum() {
        let base = calculate_checksum("/page?a=1", None);
        assert_eq!(base, calculate_checksum("/page?a=1&page=3", None));
        assert_eq!(base, calculate_checksum("/page?a=1&locale=en", None));
        assert_eq!(base, calculate_checksum("/page?a=1&weft.request.id=7", None));
        assert_eq!(
            base,
            calculate_checksum(
                &format!("/page?a=1&{}=stale", CHECKSUM_ATTRIBUTE_NAME),
                None
            )
        );
        assert_ne!(base, calculate_checksum("/page?a=2", None));
    }

    #[test]
    fn test_fragment_is_stripped_from_digest_input() {
        assert_eq!(
            calculate_checksum("/page?a=1#top", None),
            calculate_checksum("/page?a=1", None)
        );
    }

    #[test]
    fn test_entity_separator_splits_tokens() {
        assert_eq!(
            calculate_checksum("/page?a=1&amp;b=2", None),
            calculate_checksum("/page?a=1&b=2", None)
        );
    }

    #[test]
    fn test_link_gets_checksum_parameter() {
        let rewriter = ChecksumRewriter::new(None);
        let out = rewriter.rewrite("<p><a href=\"/show?id=3\">x</a></p>");
        let checksum = calculate_checksum("/show?id=3", None);
        assert_eq!(
            out,
            format!(
                "<p><a href=\"/show?id=3&amp;{}={}\">x</a></p>",
                CHECKSUM_ATTRIBUTE_NAME, checksum
            )
        );
    }

    #[test]
    fn test_link_without_query_uses_question_mark() {
        let rewriter = ChecksumRewriter::new(None);
        let out = rewriter.rewrite("<a href=\"/show\">x</a>");
        assert!(out.contains(&format!("/show?{}=", CHECKSUM_ATTRIBUTE_NAME)));
    }

    #[test]
    fn test_checksum_inserted_before_fragment() {
        let rewriter = ChecksumRewriter::new(None);
        let out = rewriter.rewrite("<a href=\"/show?id=3#details\">x</a>");
        let checksum = calculate_checksum("/show?id=3#details", None);
        assert!(out.contains(&format!(
            "/show?id=3&amp;{}={}#details",
            CHECKSUM_ATTRIBUTE_NAME, checksum
        )));
    }

    #[test]
    fn test_form_gets_hidden_field() {
        let rewriter = ChecksumRewriter::new(Some("s"));
        let out = rewriter.rewrite("<form action=\"/save\" method=\"post\"><input/></form>");
        let checksum = calculate_checksum("/save", Some("s"));
        assert_eq!(
            out,
            format!(
                "<form action=\"/save\" method=\"post\"><input type=\"hidden\" name=\"{}\" value=\"{}\"/><input/></form>",
                CHECKSUM_ATTRIBUTE_NAME, checksum
            )
        );
    }

    #[test]
    fn test_absolute_and_script_urls_pass_through() {
        let rewriter = ChecksumRewriter::new(None);
        for markup in [
            "<a href=\"https://example.org/x\">x</a>",
            "<a href=\"http://example.org/x\">x</a>",
            "<a href=\"javascript:void(0)\">x</a>",
            "<a href=\"mailto:a@b.c\">x</a>",
        ] {
            assert_eq!(rewriter.rewrite(markup), markup);
        }
    }

    #[test]
    fn test_no_checksum_marker_opts_out() {
        let rewriter = ChecksumRewriter::new(None);
        let markup = format!("{}<a href=\"/show\">x</a>", NO_CHECKSUM_PREFIX);
        assert_eq!(rewriter.rewrite(&markup), markup);
    }

    #[test]
    fn test_marked_tag_does_not_shadow_later_tags() {
        let rewriter = ChecksumRewriter::new(None);
        let markup = format!(
            "{}<a href=\"/one\">x</a><a href=\"/two\">y</a>",
            NO_CHECKSUM_PREFIX
        );
        let out = rewriter.rewrite(&markup);
        assert!(out.contains("href=\"/one\""));
        assert!(out.contains(&format!("/two?{}=", CHECKSUM_ATTRIBUTE_NAME)));
    }

    #[test]
    fn test_image_source_is_rewritten() {
        let rewriter = ChecksumRewriter::new(None);
        let out = rewriter.rewrite("<img src=\"/chart?w=5\"/>");
        assert!(out.contains(&format!("/chart?w=5&amp;{}=", CHECKSUM_ATTRIBUTE_NAME)));
    }

    #[test]
    fn test_tags_without_url_attribute_pass_through() {
        let rewriter = ChecksumRewriter::new(None);
        let markup = "<a name=\"anchor\">x</a>";
        assert_eq!(rewriter.rewrite(markup), markup);
    }
}
