//! Open Frames compatibility: mirrors `fc:frame:*` meta tags as `of:*` tags
//! and advertises the protocols the frame accepts.

use std::sync::LazyLock;

use regex::Regex;

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<meta.*?/>").expect("meta tag pattern compiles"));

static FRAME_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"property="fc:frame:(image:aspect_ratio|image|button:\d+:action|button:\d+:target|button:\d+|input:text|state|post_url)""#,
    )
    .expect("frame property pattern compiles")
});

static HEAD_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<head>").expect("head pattern compiles"));

pub const ACCEPTS: [(&str, &str); 3] = [
    ("of:accepts:farcaster", "vNext"),
    ("of:accepts:xmtp", "2024-02-01"),
    ("of:accepts:lens", "1.1"),
];

/// Returns `html` with Open Frames tags inserted right after `<head>`.
///
/// Documents without a `<head>` element are returned unchanged.
pub fn rewrite(html: &str) -> String {
    let Some(head) = HEAD_OPEN.find(html) else {
        return html.to_string();
    };

    let mut open_frame_tags = String::new();
    for tag in META_TAG.find_iter(html) {
        let tag = tag.as_str();
        if FRAME_PROPERTY.is_match(tag) {
            open_frame_tags.push_str(&FRAME_PROPERTY.replace(tag, r#"property="of:$1""#));
        }
    }
    for (property, content) in ACCEPTS {
        open_frame_tags.push_str(&format!(
            "<meta property=\"{property}\" content=\"{content}\"/>"
        ));
    }

    let mut rewritten = String::with_capacity(html.len() + open_frame_tags.len());
    rewritten.push_str(&html[..head.end()]);
    rewritten.push_str(&open_frame_tags);
    rewritten.push_str(&html[head.end()..]);
    rewritten
}
