//! Convert a Node tree to Markdown AST
//!
//! This module transforms the sanitized DOM tree into the Markdown AST
//! defined in wxmd-core. Runs of text and inline elements inside a container
//! become paragraphs; block elements flush the run.

use wxmd_core::{inlines_are_blank, Block, Inline, ListItem};

use crate::node::{Node, NodeType};
use crate::proxy::{rewrite_image_src, ImageProxy};
use crate::utilities::{collapse_whitespace, has_block_descendant, is_block};

/// Elements with inline formatting meaning
const FORMATTING_ELEMENTS: &[&str] = &[
    "strong", "b", "em", "i", "a", "code", "kbd", "samp", "tt", "img", "br",
];

/// Elements rendered as inline code
const CODE_ELEMENTS: &[&str] = &["code", "kbd", "samp", "tt"];

/// Attributes that may carry an image source, in order of preference
const IMAGE_SOURCES: &[&str] = &["src", "data-src", "data-original"];

/// Settings the converter needs from the caller
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    pub image_proxy: &'a ImageProxy,
    pub default_image_alt: &'a str,
}

/// Convert a Node tree to a Markdown AST document
pub fn to_document(node: &Node, options: &ConvertContext) -> Block {
    let ctx = Context::default();

    let blocks = if node.is_element() {
        convert_sequence(std::iter::once(node), options, ctx)
    } else {
        convert_sequence(node.children(), options, ctx)
    };

    Block::Document(blocks)
}

/// Inline formatting already open around the current node
#[derive(Debug, Default, Clone, Copy)]
struct Context {
    in_strong: bool,
    in_em: bool,
    in_link: bool,
}

/// Convert sibling nodes to blocks, grouping inline runs into paragraphs
fn convert_sequence<'n>(
    nodes: impl Iterator<Item = &'n Node>,
    options: &ConvertContext,
    ctx: Context,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut run = Vec::new();

    for node in nodes {
        if acts_as_block(node) {
            flush_paragraph(&mut run, &mut blocks);
            blocks.extend(convert_block_element(node, options, ctx));
        } else {
            run.extend(convert_inline_node(node, options, ctx));
        }
    }
    flush_paragraph(&mut run, &mut blocks);

    blocks
}

fn convert_children(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<Block> {
    convert_sequence(node.children(), options, ctx)
}

fn flush_paragraph(run: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    let inlines = merge_inlines(std::mem::take(run));
    if !inlines_are_blank(&inlines) {
        blocks.push(Block::Paragraph(inlines));
    }
}

/// Block elements, and pass-through elements wrapping block content
fn acts_as_block(node: &Node) -> bool {
    if !node.is_element() {
        return false;
    }
    let tag = node.tag_name();
    is_block(tag) || (!FORMATTING_ELEMENTS.contains(&tag) && has_block_descendant(node))
}

/// Convert a block-level element
fn convert_block_element(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<Block> {
    let tag = node.tag_name();

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse().unwrap_or(1);
            // Emphasis inside a heading is dropped
            let heading_ctx = Context {
                in_strong: true,
                in_em: true,
                ..ctx
            };
            let inlines = collect_inlines(node, options, heading_ctx);
            if inlines_are_blank(&inlines) {
                Vec::new()
            } else {
                vec![Block::Heading {
                    level,
                    content: inlines,
                }]
            }
        }

        "blockquote" => {
            let blocks = convert_children(node, options, ctx);
            if blocks.is_empty() {
                Vec::new()
            } else {
                vec![Block::BlockQuote(blocks)]
            }
        }

        "ul" | "ol" => convert_list(node, options, ctx).into_iter().collect(),

        "pre" => convert_code_block(node).into_iter().collect(),

        "hr" => vec![Block::ThematicBreak],

        "table" => convert_table(node, options, ctx).into_iter().collect(),

        // Paragraphs, containers, stray list items and unknown wrappers
        _ => convert_children(node, options, ctx),
    }
}

/// Convert a `ul`/`ol` element; the `start` attribute is ignored
fn convert_list(node: &Node, options: &ConvertContext, ctx: Context) -> Option<Block> {
    let items = collect_list_items(node, options, ctx);
    if items.is_empty() {
        None
    } else {
        Some(Block::List {
            ordered: node.tag_name() == "ol",
            items,
        })
    }
}

fn collect_list_items(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = Vec::new();

    for child in node.children() {
        match child.tag_name() {
            "li" => items.push(ListItem::new(convert_children(child, options, ctx))),

            // Lists directly inside lists belong to the previous item
            "ul" | "ol" => {
                if let Some(nested) = convert_list(child, options, ctx) {
                    match items.last_mut() {
                        Some(item) => item.content.push(nested),
                        None => items.push(ListItem::new(vec![nested])),
                    }
                }
            }

            _ => {
                let blocks = convert_sequence(std::iter::once(child), options, ctx);
                if blocks.is_empty() {
                    continue;
                }
                match items.last_mut() {
                    Some(item) => item.content.extend(blocks),
                    None => items.push(ListItem::new(blocks)),
                }
            }
        }
    }

    items
}

/// Convert a `pre` element into a fenced code block
fn convert_code_block(node: &Node) -> Option<Block> {
    let codes: Vec<&Node> = node
        .element_children()
        .filter(|c| c.tag_name() == "code")
        .collect();

    let (text, language) = if codes.is_empty() {
        (pre_text(node), node.attr_non_empty("lang"))
    } else {
        let text = codes.iter().map(|c| pre_text(c)).collect::<Vec<_>>().join("\n");
        let language = node
            .attr_non_empty("lang")
            .or_else(|| codes.iter().find_map(|c| c.attr_non_empty("lang")));
        (text, language)
    };

    let code = trim_blank_lines(&text.replace('\u{a0}', " "));
    if code.trim().is_empty() {
        return None;
    }

    Some(Block::CodeBlock {
        language: language.map(str::to_string),
        code,
    })
}

/// Raw text of a code element, with `br` as newline
fn pre_text(node: &Node) -> String {
    match node.node_type {
        NodeType::Text => node.value.clone().unwrap_or_default(),
        NodeType::Element if node.tag_name() == "br" => "\n".to_string(),
        NodeType::Comment => String::new(),
        _ => node.children().map(pre_text).collect(),
    }
}

/// Drop whitespace-only lines at the start and end of code
fn trim_blank_lines(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());

    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end]
            .iter()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Convert a table element; every `tr` becomes a row, the first is the header
fn convert_table(node: &Node, options: &ConvertContext, ctx: Context) -> Option<Block> {
    let mut rows = Vec::new();
    collect_rows(node, options, ctx, &mut rows);

    if rows.is_empty() {
        None
    } else {
        Some(Block::Table { rows })
    }
}

fn collect_rows(
    node: &Node,
    options: &ConvertContext,
    ctx: Context,
    rows: &mut Vec<Vec<Vec<Inline>>>,
) {
    for child in node.element_children() {
        match child.tag_name() {
            "thead" | "tbody" | "tfoot" => collect_rows(child, options, ctx, rows),
            "tr" => {
                let row: Vec<Vec<Inline>> = child
                    .element_children()
                    .filter(|cell| matches!(cell.tag_name(), "td" | "th"))
                    .map(|cell| collect_inlines(cell, options, ctx))
                    .collect();
                if !row.is_empty() {
                    rows.push(row);
                }
            }
            _ => {}
        }
    }
}

/// Collect inline content from a node
fn collect_inlines(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<Inline> {
    let inlines = node
        .children()
        .flat_map(|child| convert_inline_node(child, options, ctx))
        .collect();
    merge_inlines(inlines)
}

fn convert_inline_node(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<Inline> {
    match node.node_type {
        NodeType::Text => {
            let text = collapse_whitespace(node.value.as_deref().unwrap_or(""));
            if text.is_empty() {
                Vec::new()
            } else {
                vec![Inline::Text(text)]
            }
        }
        NodeType::Element => convert_inline_element(node, options, ctx),
        _ => Vec::new(),
    }
}

/// Convert an inline element. Same-kind emphasis and links nested inside
/// each other are flattened.
fn convert_inline_element(node: &Node, options: &ConvertContext, ctx: Context) -> Vec<Inline> {
    let tag = node.tag_name();

    match tag {
        "strong" | "b" => {
            let inner = collect_inlines(node, options, Context { in_strong: true, ..ctx });
            if ctx.in_strong || inlines_are_blank(&inner) {
                inner
            } else {
                vec![Inline::Strong(inner)]
            }
        }

        "em" | "i" => {
            let inner = collect_inlines(node, options, Context { in_em: true, ..ctx });
            if ctx.in_em || inlines_are_blank(&inner) {
                inner
            } else {
                vec![Inline::Emphasis(inner)]
            }
        }

        _ if CODE_ELEMENTS.contains(&tag) => {
            let code = pre_text(node).replace('\u{a0}', " ");
            if code.is_empty() {
                Vec::new()
            } else {
                vec![Inline::Code(code)]
            }
        }

        "a" => {
            let content = collect_inlines(node, options, Context { in_link: true, ..ctx });
            if ctx.in_link || inlines_are_blank(&content) {
                return content;
            }
            match node.attr_non_empty("href") {
                Some(href) if !is_script_href(href) => vec![Inline::Link {
                    content,
                    url: href.to_string(),
                }],
                _ => content,
            }
        }

        "img" => convert_image(node, options).into_iter().collect(),

        "br" => vec![Inline::LineBreak],

        "hr" => vec![Inline::LineBreak],

        "pre" => {
            let code = trim_blank_lines(&pre_text(node).replace('\u{a0}', " "));
            if code.trim().is_empty() {
                Vec::new()
            } else {
                vec![Inline::Code(code)]
            }
        }

        // Block content inside inline context keeps its own lines
        _ if acts_as_block(node) => {
            let inner = collect_inlines(node, options, ctx);
            if inlines_are_blank(&inner) {
                return Vec::new();
            }
            let mut inlines = Vec::with_capacity(inner.len() + 2);
            inlines.push(Inline::LineBreak);
            inlines.extend(inner);
            inlines.push(Inline::LineBreak);
            inlines
        }

        // span, font and unknown elements pass their content through
        _ => collect_inlines(node, options, ctx),
    }
}

fn is_script_href(href: &str) -> bool {
    href.get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

fn convert_image(node: &Node, options: &ConvertContext) -> Option<Inline> {
    let url = IMAGE_SOURCES
        .iter()
        .filter_map(|name| node.attr(name))
        .find_map(|src| rewrite_image_src(src, options.image_proxy));

    let Some(url) = url else {
        tracing::trace!("dropped image without usable source");
        return None;
    };

    let alt = node
        .attr("alt")
        .map(|alt| collapse_whitespace(alt).trim().to_string())
        .filter(|alt| !alt.is_empty())
        .unwrap_or_else(|| options.default_image_alt.to_string());

    Some(Inline::Image { alt, url })
}

/// Merge adjacent text and adjacent same-kind emphasis
fn merge_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(inlines.len());

    for inline in inlines {
        let inline = match (merged.last_mut(), inline) {
            (Some(Inline::Text(prev)), Inline::Text(text)) => {
                prev.push_str(&text);
                *prev = collapse_whitespace(prev);
                continue;
            }
            (Some(Inline::Strong(prev)), Inline::Strong(inner))
            | (Some(Inline::Emphasis(prev)), Inline::Emphasis(inner)) => {
                let mut joined = std::mem::take(prev);
                joined.extend(inner);
                *prev = merge_inlines(joined);
                continue;
            }
            (_, inline) => inline,
        };
        merged.push(inline);
    }

    merged
}
