//! Public post links (`t.me/<channel>/<post id>`).

use std::sync::LazyLock;

use regex::Regex;

static POST_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"t\.me/([A-Za-z0-9_]+)/(\d+)").ok());

/// A public channel post referenced by a `t.me` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLink {
    /// Channel username with a leading `@`.
    pub channel: String,
    pub message_id: i32,
}

/// Find the first post link in `text`.
pub fn find_post_link(text: &str) -> Option<PostLink> {
    let captures = POST_LINK.as_ref()?.captures(text)?;
    let username = captures.get(1)?.as_str();
    // Private links (`t.me/c/<id>/<post>`) cannot be copied by username.
    if username == "c" {
        return None;
    }
    let message_id = captures.get(2)?.as_str().parse::<i32>().ok()?;
    Some(PostLink {
        channel: format!("@{username}"),
        message_id,
    })
}
