//! wxmd-core - Markdown AST, serialization and normalization
//!
//! This crate holds the data structures the `wxmd` converter builds and the
//! text passes that turn them into clean Markdown.
//!
//! # Architecture
//!
//! ```text
//!              serialize                    normalize_markup
//! Markdown AST ─────────▶ Markup { text, verbatim } ─────────▶ Markdown String
//! ```
//!
//! Code blocks and code spans travel through normalization as placeholder
//! tokens and are restored verbatim at the end.
//!
//! # Example
//!
//! ```rust
//! use wxmd_core::{render, Block, Inline};
//!
//! let ast = Block::Document(vec![
//!     Block::Heading {
//!         level: 1,
//!         content: vec![Inline::Text("Hello World".to_string())],
//!     },
//!     Block::Paragraph(vec![
//!         Inline::Text("This is ".to_string()),
//!         Inline::Strong(vec![Inline::Text("bold".to_string())]),
//!         Inline::Text(" text.".to_string()),
//!     ]),
//! ]);
//!
//! let markdown = render(&ast).unwrap();
//! assert_eq!(markdown, "# Hello World\n\nThis is **bold** text.");
//! ```

mod ast;
mod entities;
mod normalize;
mod serialize;
mod verbatim;

pub use ast::{inlines_are_blank, Block, Inline, ListItem};
pub use entities::{decode_numeric, lookup_named, NAMED_ENTITIES};
pub use normalize::{normalize, normalize_markup};
pub use serialize::{serialize, Markup};
pub use verbatim::{
    has_sentinels, strip_sentinels, Verbatim, VerbatimError, VerbatimTable, SENTINEL_CLOSE,
    SENTINEL_OPEN,
};

/// Serialize and normalize a document in one step
pub fn render(block: &Block) -> Result<String, VerbatimError> {
    normalize_markup(serialize(block))
}
