//! Line-oriented block parsing for chat messages
//!
//! Turns a message's raw text into headings, bullet lists and paragraphs.
//! Only the small subset of markdown the assistant is asked to produce is
//! recognised; everything else is a paragraph. Blocks are recomputed from
//! the message text on every render and never stored.

/// A renderable unit derived from message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock {
    /// `#`, `##` or `###` heading (level 1-3)
    Heading { level: u8, text: String },
    /// Consecutive `* ` lines, in order
    List(Vec<String>),
    /// Any other non-blank line, verbatim
    Paragraph(String),
}

const LIST_PREFIX: &str = "* ";

// Checked in order: the longest heading marker first
const HEADING_PREFIXES: [(&str, u8); 3] = [("### ", 3), ("## ", 2), ("# ", 1)];

/// Parse message text into display blocks.
///
/// Single pass over `\n`-separated lines. List lines accumulate until a
/// non-list line flushes them as one [`DisplayBlock::List`]. If nothing is
/// produced, the original text comes back as a single paragraph so a
/// message never renders empty.
pub fn render_blocks(text: &str) -> Vec<DisplayBlock> {
    let mut blocks = Vec::new();
    let mut list_items: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if let Some(item) = line.strip_prefix(LIST_PREFIX) {
            list_items.push(item.to_string());
            continue;
        }

        flush_list(&mut list_items, &mut blocks);

        if let Some(block) = classify_line(line) {
            blocks.push(block);
        }
    }

    flush_list(&mut list_items, &mut blocks);

    if blocks.is_empty() {
        blocks.push(DisplayBlock::Paragraph(text.to_string()));
    }

    blocks
}

fn flush_list(items: &mut Vec<String>, blocks: &mut Vec<DisplayBlock>) {
    if !items.is_empty() {
        blocks.push(DisplayBlock::List(std::mem::take(items)));
    }
}

fn classify_line(line: &str) -> Option<DisplayBlock> {
    for (prefix, level) in HEADING_PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some(DisplayBlock::Heading {
                level,
                text: rest.to_string(),
            });
        }
    }

    if line.trim().is_empty() {
        None
    } else {
        Some(DisplayBlock::Paragraph(line.to_string()))
    }
}
