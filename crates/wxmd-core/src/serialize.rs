//! Markdown AST serialization
//!
//! Converts Markdown AST nodes into tokenised Markdown text. Code blocks and
//! code spans are written as placeholder tokens; their content lives in the
//! [`VerbatimTable`] carried next to the text.

use crate::ast::{Block, Inline, ListItem};
use crate::verbatim::{Verbatim, VerbatimTable};

/// Serialized Markdown plus the verbatim regions its tokens refer to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markup {
    pub text: String,
    pub verbatim: VerbatimTable,
}

/// Serialize a block to tokenised Markdown
pub fn serialize(block: &Block) -> Markup {
    let mut table = VerbatimTable::new();
    let mut output = String::with_capacity(4096);
    serialize_block(block, &mut table, &mut output);

    Markup {
        text: output.trim_matches('\n').to_string(),
        verbatim: table,
    }
}

fn serialize_block(block: &Block, table: &mut VerbatimTable, out: &mut String) {
    match block {
        Block::Document(blocks) => serialize_blocks(blocks, table, out),

        Block::Heading { level, content } => {
            let text = single_line(&render_inlines(content, table));
            if text.is_empty() {
                return;
            }
            for _ in 0..(*level).clamp(1, 6) {
                out.push('#');
            }
            out.push(' ');
            out.push_str(&text);
            out.push_str("\n\n");
        }

        Block::Paragraph(inlines) => {
            let text = render_inlines(inlines, table);
            let text = text.trim();
            if !text.is_empty() {
                out.push_str(text);
                out.push_str("\n\n");
            }
        }

        Block::BlockQuote(blocks) => {
            let start_len = out.len();
            serialize_blocks(blocks, table, out);

            let content = out[start_len..].trim().to_string();
            out.truncate(start_len);
            if content.is_empty() {
                return;
            }

            for (i, line) in content.lines().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push('>');
                if !line.is_empty() {
                    out.push(' ');
                    out.push_str(line);
                }
            }
            out.push_str("\n\n");
        }

        Block::List { ordered, items } => {
            let start_len = out.len();
            serialize_list(*ordered, items, "", table, out);
            if out.len() > start_len {
                out.push('\n');
            }
        }

        Block::CodeBlock { language, code } => {
            if code.trim().is_empty() {
                return;
            }
            let token = table.insert(Verbatim::Fence {
                language: language.clone().filter(|l| !l.is_empty()),
                code: code.clone(),
            });
            out.push_str(&token);
            out.push_str("\n\n");
        }

        Block::ThematicBreak => out.push_str("---\n\n"),

        Block::Table { rows } => serialize_table(rows, table, out),
    }
}

fn serialize_blocks(blocks: &[Block], table: &mut VerbatimTable, out: &mut String) {
    for block in blocks {
        if !block.is_blank() {
            serialize_block(block, table, out);
        }
    }
}

// Writes one line per item. Nested lists add two spaces under a bullet and
// three under a number, on top of the parent's indentation.
fn serialize_list(
    ordered: bool,
    items: &[ListItem],
    indent: &str,
    table: &mut VerbatimTable,
    out: &mut String,
) {
    let child_indent = format!("{indent}{}", if ordered { "   " } else { "  " });

    for (i, item) in items.iter().filter(|item| !item.is_blank()).enumerate() {
        out.push_str(indent);
        if ordered {
            out.push_str(&(i + 1).to_string());
            out.push_str(". ");
        } else {
            out.push_str("- ");
        }
        serialize_list_item(item, &child_indent, table, out);
    }
}

fn serialize_list_item(
    item: &ListItem,
    child_indent: &str,
    table: &mut VerbatimTable,
    out: &mut String,
) {
    // Text that shares the marker line, then everything below it
    let mut lead = String::new();
    let mut body = String::new();

    for block in item.content.iter().filter(|b| !b.is_blank()) {
        match block {
            Block::Paragraph(inlines) if body.is_empty() => {
                let text = single_line(&render_inlines(inlines, table));
                if !lead.is_empty() && !text.is_empty() {
                    lead.push(' ');
                }
                lead.push_str(&text);
            }
            Block::List { ordered, items } => {
                serialize_list(*ordered, items, child_indent, table, &mut body);
            }
            other => {
                let mut nested = String::new();
                serialize_block(other, table, &mut nested);
                for line in nested.trim_end().lines() {
                    if !line.is_empty() {
                        body.push_str(child_indent);
                        body.push_str(line);
                    }
                    body.push('\n');
                }
            }
        }
    }

    if !lead.is_empty() {
        out.push_str(&lead);
        out.push('\n');
        out.push_str(&body);
        return;
    }

    // A nested list with nothing before it starts on the marker line
    let starts_with_list = matches!(
        item.content.iter().find(|b| !b.is_blank()),
        Some(Block::List { .. })
    );
    match body.strip_prefix(child_indent) {
        Some(rest) if starts_with_list => out.push_str(rest),
        _ => {
            out.truncate(out.trim_end_matches(' ').len());
            out.push('\n');
            out.push_str(&body);
        }
    }
}

fn serialize_table(rows: &[Vec<Vec<Inline>>], table: &mut VerbatimTable, out: &mut String) {
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| row.iter().map(|cell| render_cell(cell, table)).collect())
        .collect();

    // Every row is padded to the widest one
    let columns = rendered.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return;
    }

    for (i, row) in rendered.iter().enumerate() {
        out.push('|');
        for column in 0..columns {
            let cell = row.get(column).map(String::as_str).unwrap_or("");
            out.push(' ');
            out.push_str(if cell.is_empty() { " " } else { cell });
            out.push_str(" |");
        }
        out.push('\n');

        if i == 0 {
            out.push('|');
            for _ in 0..columns {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }

    out.push('\n');
}

fn render_cell(cell: &[Inline], table: &mut VerbatimTable) -> String {
    let ctx = InlineContext {
        in_cell: true,
        ..InlineContext::default()
    };
    single_line(&render_inlines_in(cell, table, ctx)).replace('|', "\\|")
}

/// Surroundings that change how inline markup is written
#[derive(Debug, Default, Clone, Copy)]
struct InlineContext {
    /// Directly enclosed by `**`, so `*` at either edge would form a run
    in_strong: bool,
    /// Inside a table cell, where `|` must be escaped even in code
    in_cell: bool,
}

fn render_inlines(inlines: &[Inline], table: &mut VerbatimTable) -> String {
    render_inlines_in(inlines, table, InlineContext::default())
}

fn render_inlines_in(inlines: &[Inline], table: &mut VerbatimTable, ctx: InlineContext) -> String {
    let mut out = String::new();
    serialize_inlines(inlines, table, ctx, &mut out);
    out
}

fn serialize_inlines(
    inlines: &[Inline],
    table: &mut VerbatimTable,
    ctx: InlineContext,
    out: &mut String,
) {
    for (i, inline) in inlines.iter().enumerate() {
        let at_strong_edge = ctx.in_strong
            && (out.trim().is_empty() || inlines[i + 1..].iter().all(Inline::is_blank));
        let beside_star = at_strong_edge
            || out.ends_with('*')
            || inlines.get(i + 1).is_some_and(starts_with_star);
        serialize_inline(inline, table, ctx, beside_star, out);
    }
}

fn starts_with_star(inline: &Inline) -> bool {
    match inline {
        Inline::Strong(_) => true,
        Inline::Text(text) => text.starts_with('*'),
        _ => false,
    }
}

fn serialize_inline(
    inline: &Inline,
    table: &mut VerbatimTable,
    ctx: InlineContext,
    beside_star: bool,
    out: &mut String,
) {
    match inline {
        Inline::Text(text) => out.push_str(text),

        Inline::Strong(content) => {
            let strong_ctx = InlineContext {
                in_strong: true,
                ..ctx
            };
            let inner = render_inlines_in(content, table, strong_ctx);
            push_delimited(&inner, "**", out);
        }

        // `_` whenever `*` would run into another `*`
        Inline::Emphasis(content) => {
            let emphasis_ctx = InlineContext {
                in_strong: false,
                ..ctx
            };
            let inner = render_inlines_in(content, table, emphasis_ctx);
            let trimmed = inner.trim();
            let delimiter = if beside_star || trimmed.starts_with('*') || trimmed.ends_with('*') {
                "_"
            } else {
                "*"
            };
            push_delimited(&inner, delimiter, out);
        }

        Inline::Code(code) => {
            if !code.is_empty() {
                let span = Verbatim::Span(code.replace('\n', " "));
                let entry = if ctx.in_cell {
                    Verbatim::Raw(span.render().replace('|', "\\|"))
                } else {
                    span
                };
                out.push_str(&table.insert(entry));
            }
        }

        Inline::Link { content, url } => {
            let link_ctx = InlineContext {
                in_strong: false,
                ..ctx
            };
            let inner = single_line(&render_inlines_in(content, table, link_ctx));
            if inner.is_empty() {
                return;
            }
            out.push('[');
            out.push_str(&inner);
            out.push_str("](");
            out.push_str(&escape_url(url));
            out.push(')');
        }

        Inline::Image { alt, url } => {
            out.push_str("![");
            out.push_str(&alt.replace('[', "\\[").replace(']', "\\]"));
            out.push_str("](");
            out.push_str(&escape_url(url));
            out.push(')');
        }

        Inline::LineBreak => out.push('\n'),
    }
}

/// Wrap text in delimiters, keeping edge whitespace outside them
fn push_delimited(inner: &str, delimiter: &str, out: &mut String) {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        out.push_str(inner);
        return;
    }

    let leading = &inner[..inner.len() - inner.trim_start().len()];
    let trailing = &inner[inner.trim_end().len()..];
    out.push_str(leading);
    out.push_str(delimiter);
    out.push_str(trimmed);
    out.push_str(delimiter);
    out.push_str(trailing);
}

/// Join the non-empty lines of some text with single spaces
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_url(url: &str) -> String {
    url.trim()
        .replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn paragraph(s: &str) -> Block {
        Block::Paragraph(vec![text(s)])
    }

    fn item(s: &str) -> ListItem {
        ListItem::from_inlines(vec![text(s)])
    }

    fn render(block: &Block) -> String {
        let markup = serialize(block);
        markup.verbatim.restore(&markup.text).unwrap()
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render(&paragraph("Hello World")), "Hello World");
    }

    #[test]
    fn test_heading_atx() {
        let block = Block::Heading {
            level: 3,
            content: vec![text("Section"), Inline::LineBreak, text("two")],
        };
        assert_eq!(render(&block), "### Section two");
    }

    #[test]
    fn test_blank_heading_is_dropped() {
        let block = Block::Document(vec![
            Block::Heading {
                level: 1,
                content: vec![text("  ")],
            },
            paragraph("body"),
        ]);
        assert_eq!(render(&block), "body");
    }

    #[test]
    fn test_strong_moves_whitespace_outside() {
        let block = Block::Paragraph(vec![
            text("a"),
            Inline::Strong(vec![text(" bold ")]),
            text("b"),
        ]);
        assert_eq!(render(&block), "a **bold** b");
    }

    #[test]
    fn test_emphasis() {
        let block = Block::Paragraph(vec![Inline::Emphasis(vec![text("italic")])]);
        assert_eq!(render(&block), "*italic*");
    }

    #[test]
    fn test_link_and_image() {
        let block = Block::Paragraph(vec![
            Inline::Link {
                content: vec![text("Example")],
                url: "https://example.com/a b".to_string(),
            },
            text(" "),
            Inline::Image {
                alt: "a [b]".to_string(),
                url: "image.png".to_string(),
            },
        ]);
        assert_eq!(
            render(&block),
            "[Example](https://example.com/a%20b) ![a \\[b\\]](image.png)"
        );
    }

    #[test]
    fn test_empty_link_is_dropped() {
        let block = Block::Paragraph(vec![
            text("x"),
            Inline::Link {
                content: vec![text(" ")],
                url: "https://example.com".to_string(),
            },
        ]);
        assert_eq!(render(&block), "x");
    }

    #[test]
    fn test_inline_code_is_tokenised() {
        let block = Block::Paragraph(vec![text("run "), Inline::Code("a<b>".to_string())]);
        let markup = serialize(&block);
        assert!(!markup.text.contains("a<b>"));
        assert_eq!(markup.verbatim.len(), 1);
        assert_eq!(render(&block), "run `a<b>`");
    }

    #[test]
    fn test_code_block() {
        let block = Block::CodeBlock {
            language: Some("js".to_string()),
            code: "let a = 1;\n\n\nlet b = 2;".to_string(),
        };
        assert_eq!(render(&block), "```js\nlet a = 1;\n\n\nlet b = 2;\n```");
    }

    #[test]
    fn test_blockquote() {
        let block = Block::BlockQuote(vec![paragraph("one"), paragraph("two")]);
        assert_eq!(render(&block), "> one\n>\n> two");
    }

    #[test]
    fn test_unordered_list() {
        let block = Block::List {
            ordered: false,
            items: vec![item("a"), item("b")],
        };
        assert_eq!(render(&block), "- a\n- b");
    }

    #[test]
    fn test_ordered_list_skips_blank_items() {
        let block = Block::List {
            ordered: true,
            items: vec![item("a"), item("  "), item("b")],
        };
        assert_eq!(render(&block), "1. a\n2. b");
    }

    #[test]
    fn test_nested_list_indentation() {
        let inner = Block::List {
            ordered: true,
            items: vec![item("one"), item("two")],
        };
        let deeper = Block::List {
            ordered: false,
            items: vec![item("deep")],
        };
        let block = Block::List {
            ordered: false,
            items: vec![
                ListItem::new(vec![paragraph("A"), inner]),
                ListItem::new(vec![
                    paragraph("B"),
                    Block::List {
                        ordered: true,
                        items: vec![ListItem::new(vec![paragraph("x"), deeper])],
                    },
                ]),
            ],
        };
        assert_eq!(
            render(&block),
            "- A\n  1. one\n  2. two\n- B\n  1. x\n     - deep"
        );
    }

    #[test]
    fn test_item_blocks_stay_indented() {
        let block = Block::List {
            ordered: false,
            items: vec![
                ListItem::new(vec![
                    paragraph("a"),
                    Block::CodeBlock {
                        language: None,
                        code: "code\n\n  x".to_string(),
                    },
                ]),
                item("b"),
            ],
        };
        assert_eq!(render(&block), "- a\n  ```\n  code\n\n    x\n  ```\n- b");
    }

    #[test]
    fn test_item_starting_with_nested_list() {
        let block = Block::List {
            ordered: true,
            items: vec![ListItem::new(vec![Block::List {
                ordered: false,
                items: vec![item("x"), item("y")],
            }])],
        };
        assert_eq!(render(&block), "1. - x\n   - y");
    }

    #[test]
    fn test_item_starting_with_block() {
        let block = Block::List {
            ordered: false,
            items: vec![ListItem::new(vec![Block::BlockQuote(vec![paragraph("q")])])],
        };
        assert_eq!(render(&block), "-\n  > q");
    }

    #[test]
    fn test_nested_emphasis_uses_underscores() {
        let nested = Block::Paragraph(vec![Inline::Strong(vec![Inline::Emphasis(vec![
            text("x"),
        ])])]);
        assert_eq!(render(&nested), "**_x_**");

        let trailing = Block::Paragraph(vec![
            Inline::Strong(vec![text("bold "), Inline::Emphasis(vec![text("tail")])]),
            text(" after"),
        ]);
        assert_eq!(render(&trailing), "**bold _tail_** after");

        let inside = Block::Paragraph(vec![Inline::Strong(vec![
            text("a "),
            Inline::Emphasis(vec![text("b")]),
            text(" c"),
        ])]);
        assert_eq!(render(&inside), "**a *b* c**");
    }

    #[test]
    fn test_adjacent_emphasis_uses_underscores() {
        let after_strong = Block::Paragraph(vec![
            Inline::Strong(vec![text("a")]),
            Inline::Emphasis(vec![text("b")]),
        ]);
        assert_eq!(render(&after_strong), "**a**_b_");

        let before_strong = Block::Paragraph(vec![
            Inline::Emphasis(vec![text("it")]),
            Inline::Strong(vec![text("bold")]),
        ]);
        assert_eq!(render(&before_strong), "_it_**bold**");

        let wrapping_strong = Block::Paragraph(vec![Inline::Emphasis(vec![Inline::Strong(vec![
            text("x"),
        ])])]);
        assert_eq!(render(&wrapping_strong), "_**x**_");
    }

    #[test]
    fn test_table() {
        let block = Block::Table {
            rows: vec![
                vec![vec![text("A")], vec![text("B")]],
                vec![vec![text("1")], vec![text("2")]],
            ],
        };
        assert_eq!(render(&block), "| A | B |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_table_pads_short_rows_and_escapes_pipes() {
        let block = Block::Table {
            rows: vec![
                vec![vec![text("A")], vec![text("B")], vec![text("C")]],
                vec![vec![text("x|y")], vec![]],
            ],
        };
        assert_eq!(
            render(&block),
            "| A | B | C |\n| --- | --- | --- |\n| x\\|y |   |   |"
        );
    }

    #[test]
    fn test_table_escapes_pipes_in_code() {
        let block = Block::Table {
            rows: vec![
                vec![vec![text("A")]],
                vec![vec![Inline::Code("a|b".to_string())]],
            ],
        };
        assert_eq!(render(&block), "| A |\n| --- |\n| `a\\|b` |");
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        let block = Block::Document(vec![Block::Table { rows: vec![] }, paragraph("after")]);
        assert_eq!(render(&block), "after");
    }

    #[test]
    fn test_thematic_break_between_paragraphs() {
        let block = Block::Document(vec![paragraph("a"), Block::ThematicBreak, paragraph("b")]);
        assert_eq!(render(&block), "a\n\n---\n\nb");
    }
}
