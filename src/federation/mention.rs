//! Mention and link rendering
//!
//! Turns raw post text into HTML plus the list of mentioned actors.
//! Literal text is always HTML-escaped; only the two anchor templates
//! below are emitted as markup.

use html_escape::{encode_double_quoted_attribute, encode_text};
use lazy_static::lazy_static;
use regex::Regex;

use crate::data::MentionTarget;

lazy_static! {
    /// `@user@domain` or a bare http(s) URL, scanned left to right
    static ref TOKEN_RE: Regex = Regex::new(
        r"(?P<mention>@(?P<user>\w+)@(?P<domain>[\w.\-]+))|(?P<url>https?://\S+)"
    )
    .expect("valid mention regex");
}

/// Rendered post body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    /// Paragraph-wrapped HTML
    pub html: String,
    /// Mentions in order of appearance, duplicates kept
    pub mentions: Vec<MentionTarget>,
}

/// Render mentions and links in `text`.
///
/// Pure and infallible: anything that is not a mention or URL passes
/// through as escaped text.
pub fn render_mentions(text: &str) -> RenderedText {
    let mut html = String::with_capacity(text.len() + 7);
    let mut mentions = Vec::new();
    let mut last = 0;

    html.push_str("<p>");

    for caps in TOKEN_RE.captures_iter(text) {
        let Some(token) = caps.get(0) else {
            continue;
        };
        html.push_str(&encode_text(&text[last..token.start()]));
        last = token.end();

        if let (Some(user), Some(domain)) = (caps.name("user"), caps.name("domain")) {
            // Sentence punctuation after a handle is not part of the domain.
            let host = domain.as_str().trim_end_matches(['.', '-']);
            if host.is_empty() {
                html.push_str(&encode_text(token.as_str()));
                continue;
            }

            let mention = MentionTarget {
                href: format!("https://{}/@{}", host, user.as_str()),
                display_name: format!("@{}@{}", user.as_str(), host),
            };
            push_mention_anchor(&mut html, &mention);
            html.push_str(&encode_text(&domain.as_str()[host.len()..]));
            mentions.push(mention);
        } else if let Some(url) = caps.name("url") {
            push_link_anchor(&mut html, url.as_str());
        }
    }

    html.push_str(&encode_text(&text[last..]));
    html.push_str("</p>");

    RenderedText { html, mentions }
}

fn push_mention_anchor(html: &mut String, mention: &MentionTarget) {
    html.push_str(r#"<span class="h-card"><a href=""#);
    html.push_str(&encode_double_quoted_attribute(&mention.href));
    html.push_str(r#"" class="u-url mention">"#);
    html.push_str(&encode_text(&mention.display_name));
    html.push_str("</a></span>");
}

fn push_link_anchor(html: &mut String, url: &str) {
    html.push_str(r#"<a href=""#);
    html.push_str(&encode_double_quoted_attribute(url));
    html.push_str(r#"" target="_blank" rel="noopener noreferrer">"#);
    html.push_str(&encode_text(url));
    html.push_str("</a>");
}
