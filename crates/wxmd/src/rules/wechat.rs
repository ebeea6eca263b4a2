//! Built-in rules for WeChat article widgets and standard media elements.

use super::{Filter, MediaRule};
use crate::media::{MediaKind, MediaSummary};
use crate::node::Node;
use crate::utilities::clean_attribute;

/// Create all built-in rules, in lookup order
pub fn wechat_rules() -> Vec<MediaRule> {
    vec![
        mpvoice_rule(),
        qqmusic_rule(),
        audio_rule(),
        iframe_rule(),
        video_rule(),
        videosnap_rule(),
        miniprogram_rule(),
        embed_rule(),
    ]
}

fn mpvoice_rule() -> MediaRule {
    MediaRule::for_tags(&["mpvoice", "mp-common-mpaudio"], |node| {
        Some(
            MediaSummary::new(MediaKind::Audio)
                .with_title(node.attr("name"))
                .with_author(node.attr("author"))
                .with_duration(node.attr("play_length"))
                .with_url(node.attr("src")),
        )
    })
}

fn qqmusic_rule() -> MediaRule {
    MediaRule::for_tags(&["qqmusic", "mp-common-qqmusic"], |node| {
        Some(
            MediaSummary::new(MediaKind::Audio)
                .with_title(node.attr("musicname"))
                .with_author(node.attr("singer"))
                .with_duration(node.attr("play_length"))
                .with_url(node.attr("audiourl")),
        )
    })
}

fn audio_rule() -> MediaRule {
    MediaRule::for_tag("audio", |node| {
        Some(
            MediaSummary::new(MediaKind::Audio)
                .with_title(node.attr("title"))
                .with_url(element_source(node).as_deref()),
        )
    })
}

// An iframe without a usable URL is only worth the generic notice.
fn iframe_rule() -> MediaRule {
    MediaRule::for_tag("iframe", |node| {
        let summary = MediaSummary::new(MediaKind::Video)
            .with_title(node.attr("data-title").or_else(|| node.attr("title")))
            .with_url(node.attr_non_empty("data-src").or_else(|| node.attr("src")));
        summary.url.is_some().then_some(summary)
    })
}

fn video_rule() -> MediaRule {
    MediaRule::for_tag("video", |node| {
        Some(
            MediaSummary::new(MediaKind::Video)
                .with_title(node.attr("title"))
                .with_url(element_source(node).as_deref()),
        )
    })
}

fn videosnap_rule() -> MediaRule {
    MediaRule::for_tags(&["mpvideosnap", "mp-common-videosnap"], |node| {
        Some(
            MediaSummary::new(MediaKind::Video)
                .with_title(node.attr("data-desc"))
                .with_author(node.attr("data-nickname")),
        )
    })
}

fn miniprogram_rule() -> MediaRule {
    MediaRule::new(
        Filter::predicate(|node| {
            matches!(node.tag_name(), "mp-miniprogram" | "mp-common-miniprogram")
                || node.has_attr("data-miniprogram-appid")
        }),
        |node| {
            Some(
                MediaSummary::new(MediaKind::MiniProgram)
                    .with_title(node.attr("data-miniprogram-title")),
            )
        },
    )
}

fn embed_rule() -> MediaRule {
    MediaRule::for_tags(&["embed", "object"], |_| Some(MediaSummary::generic()))
}

/// `src` of the element itself, else of its first `source` descendant
fn element_source(node: &Node) -> Option<String> {
    let own = clean_attribute(node.attr("src"));
    if !own.is_empty() {
        return Some(own);
    }
    node.find_descendant(&|n: &Node| n.tag_name() == "source")
        .map(|source| clean_attribute(source.attr("src")))
        .filter(|src| !src.is_empty())
}
