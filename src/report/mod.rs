//! Output of view models as JSON or Markdown.

mod generator;

pub use generator::{generate_json, generate_markdown, generate_markdown_list, MarkdownSection, TableRow};
