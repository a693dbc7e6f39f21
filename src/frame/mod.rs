//! Frame documents for the Home → Search → Result flow.
//!
//! A frame is an HTML page whose `fc:frame:*` meta tags describe the card
//! image, an optional text input and up to four buttons. Card images are
//! rendered by [`card`] and served from `/image/{slug}`.

use std::fmt::Write as _;

use crate::config::FrameConfig;

pub mod card;
pub mod open_frames;

pub const MAX_BUTTONS: usize = 4;
pub const IMAGE_ASPECT_RATIO: &str = "1.91:1";

/// Every state the frame can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Home,
    Search,
    Found { username: String, total: u64 },
    NotFound,
    Failed,
}

impl Screen {
    pub fn slug(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Search => "search",
            Screen::Found { .. } => "result",
            Screen::NotFound => "not-found",
            Screen::Failed => "error",
        }
    }

    fn image_url(&self, config: &FrameConfig) -> String {
        let mut url = format!("{}/image/{}", config.public_url, self.slug());
        if let Screen::Found { username, total } = self {
            let total = total.to_string();
            let query = reqwest::Url::parse_with_params(
                "http://localhost/",
                &[("username", username.as_str()), ("total", total.as_str())],
            )
            .ok()
            .and_then(|parsed| parsed.query().map(str::to_string))
            .unwrap_or_default();
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    /// POSTs the frame payload back to `target`.
    Post { target: String },
    /// Opens `target` in the client.
    Link { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

impl Button {
    fn post(label: &str, target: String) -> Self {
        Self {
            label: label.to_string(),
            action: ButtonAction::Post { target },
        }
    }

    fn link(label: &str, target: &str) -> Self {
        Self {
            label: label.to_string(),
            action: ButtonAction::Link {
                target: target.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    pub image_url: String,
    pub post_url: String,
    pub input_placeholder: Option<String>,
    pub buttons: Vec<Button>,
}

impl Frame {
    pub fn for_screen(screen: &Screen, config: &FrameConfig, title: &str) -> Self {
        let route = |path: &str| format!("{}{path}", config.public_url);
        let mut input_placeholder = None;
        let mut post_url = route("/");

        let buttons = match screen {
            Screen::Home => {
                let mut buttons = vec![Button::post("Search", route("/search"))];
                if let Some(url) = &config.action_install_url {
                    buttons.push(Button::link("Add Action", url));
                }
                if let Some(url) = &config.share_url {
                    buttons.push(Button::link("Share", url));
                }
                if let Some(url) = &config.channel_url {
                    buttons.push(Button::link("Channel", url));
                }
                buttons
            }
            Screen::Search => {
                input_placeholder = Some("Enter username e.g. boothang".to_string());
                post_url = route("/result");
                vec![
                    Button::post("⇧ Submit", route("/result")),
                    Button::post("⏏︎ Cancel", route("/")),
                ]
            }
            Screen::Found { .. } => vec![
                Button::post("⎋ Home", route("/")),
                Button::post("⏏︎ Back", route("/search")),
            ],
            Screen::NotFound | Screen::Failed => {
                vec![Button::post("⏏︎ Try Again", route("/search"))]
            }
        };
        assert!(buttons.len() <= MAX_BUTTONS, "Frame button limit exceeded");

        Self {
            title: title.to_string(),
            image_url: screen.image_url(config),
            post_url,
            input_placeholder,
            buttons,
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(1024);
        html.push_str("<!DOCTYPE html><html lang=\"en\"><head>");
        push_meta(&mut html, "fc:frame", "vNext");
        push_meta(&mut html, "fc:frame:image", &self.image_url);
        push_meta(&mut html, "fc:frame:image:aspect_ratio", IMAGE_ASPECT_RATIO);
        push_meta(&mut html, "og:image", &self.image_url);
        push_meta(&mut html, "og:title", &self.title);
        push_meta(&mut html, "fc:frame:post_url", &self.post_url);
        if let Some(placeholder) = &self.input_placeholder {
            push_meta(&mut html, "fc:frame:input:text", placeholder);
        }
        for (index, button) in self.buttons.iter().enumerate() {
            let position = index + 1;
            push_meta(&mut html, &format!("fc:frame:button:{position}"), &button.label);
            let (kind, target) = match &button.action {
                ButtonAction::Post { target } => ("post", target),
                ButtonAction::Link { target } => ("link", target),
            };
            push_meta(&mut html, &format!("fc:frame:button:{position}:action"), kind);
            push_meta(&mut html, &format!("fc:frame:button:{position}:target"), target);
        }
        let _ = write!(html, "<title>{}</title>", escape_markup(&self.title));
        html.push_str("</head><body></body></html>");
        html
    }
}

fn push_meta(html: &mut String, property: &str, content: &str) {
    let _ = write!(
        html,
        "<meta property=\"{property}\" content=\"{}\"/>",
        escape_markup(content)
    );
}

/// Escapes text for HTML attributes and SVG/XML text nodes.
pub fn escape_markup(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
