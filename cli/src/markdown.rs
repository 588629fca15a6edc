//! Lightweight markdown rendering for the terminal transcript.
//!
//! Flattens the event stream into styled plain text: headings bold, inline
//! code highlighted, code blocks indented, lists bulleted. Anything fancier
//! falls through as plain text.

use crossterm::style::Stylize;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

#[derive(Debug, Default, Clone, Copy)]
struct StyleState {
    heading: bool,
    strong: bool,
    emphasis: bool,
    code_block: bool,
}

impl StyleState {
    fn apply(self, text: &str) -> String {
        if self.code_block {
            return text
                .lines()
                .map(|line| format!("    {}\n", line.dark_yellow()))
                .collect();
        }
        if self.heading {
            return format!("{}", text.bold().cyan());
        }
        match (self.strong, self.emphasis) {
            (true, _) => format!("{}", text.bold()),
            (false, true) => format!("{}", text.italic()),
            (false, false) => text.to_string(),
        }
    }
}

/// Render markdown into an ANSI-styled string.
pub fn render(input: &str) -> String {
    let mut out = String::new();
    let mut style = StyleState::default();
    let mut list_depth = 0usize;

    for event in Parser::new(input) {
        match event {
            Event::Start(Tag::Heading { .. }) => style.heading = true,
            Event::End(TagEnd::Heading(_)) => {
                style.heading = false;
                out.push_str("\n\n");
            }
            Event::Start(Tag::Strong) => style.strong = true,
            Event::End(TagEnd::Strong) => style.strong = false,
            Event::Start(Tag::Emphasis) => style.emphasis = true,
            Event::End(TagEnd::Emphasis) => style.emphasis = false,
            Event::Start(Tag::CodeBlock(_)) => {
                style.code_block = true;
                out.push('\n');
            }
            Event::End(TagEnd::CodeBlock) => {
                style.code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("• ");
            }
            Event::End(TagEnd::Item) => out.push('\n'),
            Event::End(TagEnd::Paragraph) => out.push_str("\n\n"),
            Event::Text(text) => out.push_str(&style.apply(&text)),
            Event::Code(code) => out.push_str(&format!("{}", code.as_ref().yellow())),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────────────\n"),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::render;

    #[test]
    fn renders_heading_and_inline_code() {
        let out = render("# Plan\n\nEdit `main.rs` next.");
        assert!(out.contains("Plan"));
        assert!(out.contains("main.rs"));
        assert!(out.contains("Edit "));
    }

    #[test]
    fn code_blocks_are_indented() {
        let out = render("```rust\nfn main() {}\n```");
        assert!(out.contains("    "));
        assert!(out.contains("fn main() {}"));
    }

    #[test]
    fn list_items_get_bullets() {
        let out = render("- first\n- second");
        assert_eq!(out.matches('•').count(), 2);
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("just words"), "just words");
    }
}
