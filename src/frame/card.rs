//! SVG card images, 1200×630 to match the 1.91:1 frame aspect ratio.

use std::fmt::Write as _;

use crate::config::CollectionConfig;

use super::{Screen, escape_markup};

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 630;
const WRAP_COLUMNS: usize = 46;

const WHITE: &str = "white";
const BLACK: &str = "black";
const RED: &str = "red";
const GREEN: &str = "rgb(88,156,84)";
const PURPLE: &str = "rgb(71,42,145)";
const BROWN: &str = "rgb(116,80,73)";
const FONT: &str = "'Madimi One', sans-serif";

pub fn render(screen: &Screen, collection: &CollectionConfig) -> String {
    match screen {
        Screen::Home => home(collection),
        Screen::Search => panel(
            collection,
            &collection.title,
            &format!(
                "This action will check the number of {} tokens you have in your wallet.",
                collection.frame_label
            ),
            GREEN,
        ),
        Screen::Found { username, total } => panel(
            collection,
            "Result",
            &format!(
                "@{username}, you have ({total}) {} tokens in your wallet.",
                collection.frame_label
            ),
            GREEN,
        ),
        Screen::NotFound => panel(collection, "Error", "User data not found.", RED),
        Screen::Failed => panel(
            collection,
            "Error",
            "Uh oh, something went wrong. Try again.",
            RED,
        ),
    }
}

fn home(collection: &CollectionConfig) -> String {
    let mut svg = open_svg(BROWN);
    let _ = write!(
        svg,
        r#"<text x="600" y="290" text-anchor="middle" font-family="{FONT}" font-size="72" font-weight="900" fill="{WHITE}">{}</text>"#,
        escape_markup(&collection.title)
    );
    let _ = write!(
        svg,
        r#"<text x="600" y="380" text-anchor="middle" font-family="{FONT}" font-size="36" fill="{WHITE}">{}</text>"#,
        escape_markup(&collection.frame_label)
    );
    svg.push_str("</svg>");
    svg
}

fn panel(collection: &CollectionConfig, heading: &str, body: &str, body_color: &str) -> String {
    let mut svg = open_svg(WHITE);
    let _ = write!(
        svg,
        r#"<text x="600" y="170" text-anchor="middle" font-family="{FONT}" font-size="64" font-weight="900" text-decoration="underline" fill="{PURPLE}">{}</text>"#,
        escape_markup(heading)
    );

    let lines = wrap_words(body, WRAP_COLUMNS);
    let _ = write!(
        svg,
        r#"<text x="600" y="290" text-anchor="middle" font-family="{FONT}" font-size="36" fill="{body_color}">"#
    );
    for (index, line) in lines.iter().enumerate() {
        let dy = if index == 0 { 0 } else { 48 };
        let _ = write!(
            svg,
            r#"<tspan x="600" dy="{dy}">{}</tspan>"#,
            escape_markup(line)
        );
    }
    svg.push_str("</text>");

    if let Some(creator) = &collection.creator {
        let _ = write!(
            svg,
            r#"<text x="600" y="540" text-anchor="middle" font-family="{FONT}" font-size="28"><tspan fill="{BLACK}">created by </tspan><tspan fill="{PURPLE}" text-decoration="underline">{}</tspan></text>"#,
            escape_markup(creator)
        );
    }
    svg.push_str("</svg>");
    svg
}

fn open_svg(background: &str) -> String {
    let mut svg = String::with_capacity(2048);
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}"><rect width="100%" height="100%" fill="{background}"/>"#
    );
    svg
}

/// Greedy word wrap; words longer than `columns` get a line of their own.
pub fn wrap_words(text: &str, columns: usize) -> Vec<String> {
    assert!(columns > 0, "Wrap width must be positive");
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > columns && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, SAMPLE_CONFIG};

    fn collection() -> CollectionConfig {
        ApiConfig::from_toml(SAMPLE_CONFIG)
            .expect("sample config")
            .collection
    }

    #[test]
    fn result_card_shows_username_and_total() {
        let svg = render(
            &Screen::Found {
                username: "alice".to_string(),
                total: 3,
            },
            &collection(),
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("@alice, you have (3) $DP#5"));
        assert!(svg.contains("created by"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn not_found_card_uses_error_copy() {
        let svg = render(&Screen::NotFound, &collection());
        assert!(svg.contains(">Error<"));
        assert!(svg.contains("User data not found."));
    }

    #[test]
    fn hostile_usernames_are_escaped() {
        let svg = render(
            &Screen::Found {
                username: "<script>".to_string(),
                total: 0,
            },
            &collection(),
        );
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;"));
    }

    #[test]
    fn wrap_words_respects_columns() {
        let lines = wrap_words("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert_eq!(wrap_words("supercalifragilistic x", 5), vec!["supercalifragilistic", "x"]);
        assert!(wrap_words("   ", 5).is_empty());
    }
}
