use crate::block::{Block, List, Span};
use crate::config::ConversionOptions;
use crate::length::Orientation;
use crate::stylesheet::Stylesheet;

/// Lists with at most this many items (nested ones included) are kept on
/// one page.
const UNBREAKABLE_LIST_ITEMS: usize = 5;

/// Convert blocks to a complete Typst document
pub fn blocks_to_typst(
    blocks: &[Block],
    options: &ConversionOptions,
    stylesheet: Option<&Stylesheet>,
) -> String {
    let mut out = String::new();
    emit_preamble(options, stylesheet, &mut out);
    emit_blocks(blocks, false, &mut out);
    out
}

fn emit_preamble(options: &ConversionOptions, stylesheet: Option<&Stylesheet>, out: &mut String) {
    out.push_str(&format!(
        "#set page(paper: \"{}\", margin: {}, flipped: {})\n",
        options.paper_format.typst_name(),
        options.page_border.to_typst(),
        options.orientation == Orientation::Landscape,
    ));
    // Optimized line breaking avoids most widows and orphans
    out.push_str("#set par(linebreaks: \"optimized\")\n");
    if let Some(sheet) = stylesheet {
        out.push_str(&sheet.to_typst());
    }
    out.push('\n');
}

/// `nested` is set inside containers, where page breaks are not allowed.
fn emit_blocks(blocks: &[Block], nested: bool, out: &mut String) {
    let mut i = 0;
    while i < blocks.len() {
        let block = &blocks[i];

        match block {
            Block::Heading { .. } => {
                // Keep a heading on the same page as the block after it
                out.push_str("#block(breakable: false)[\n");
                emit_heading(block, out);
                if let Some(next) = blocks.get(i + 1).filter(|next| keeps_with_heading(next)) {
                    emit_block(next, true, out);
                    i += 1;
                }
                out.push_str("]\n\n");
            }
            _ => emit_block(block, nested, out),
        }

        i += 1;
    }
}

fn keeps_with_heading(block: &Block) -> bool {
    !matches!(block, Block::Heading { .. } | Block::PageBreak)
}

fn emit_heading(block: &Block, out: &mut String) {
    if let Block::Heading { level, content } = block {
        for _ in 0..*level {
            out.push('=');
        }
        out.push(' ');
        spans_to_typst(content, out);
        out.push_str("\n\n");
    }
}

fn emit_block(block: &Block, nested: bool, out: &mut String) {
    match block {
        Block::Heading { .. } => {
            emit_heading(block, out);
        }
        Block::Paragraph { content } => {
            spans_to_typst(content, out);
            out.push_str("\n\n");
        }
        Block::CodeBlock { language, content } => {
            let fence = "`".repeat(longest_backtick_run(content).max(2) + 1);
            out.push_str("#block(breakable: false)[\n");
            out.push_str(&fence);
            if let Some(lang) = language {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push_str("\n]\n\n");
        }
        Block::List(list) => {
            if list.total_items() <= UNBREAKABLE_LIST_ITEMS {
                out.push_str("#block(breakable: false)[\n");
                list_to_typst(list, 0, out);
                out.push_str("]\n\n");
            } else {
                list_to_typst(list, 0, out);
                out.push('\n');
            }
        }
        Block::Table { headers, rows } => {
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(headers, rows, out);
            out.push_str("]\n\n");
        }
        Block::Quote { blocks } => {
            out.push_str("#quote(block: true)[\n");
            emit_blocks(blocks, true, out);
            out.push_str("]\n\n");
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
        Block::PageBreak if nested => {
            log::debug!("Dropping page break inside a container");
        }
        Block::PageBreak => {
            out.push_str("#pagebreak()\n\n");
        }
    }
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0)
}

fn spans_to_typst(spans: &[Span], out: &mut String) {
    for (i, span) in spans.iter().enumerate() {
        let before_word = spans.get(i + 1).is_some_and(starts_with_word_char);
        span_to_typst(span, before_word, out);
    }
}

fn ends_with_word_char(out: &str) -> bool {
    out.chars().next_back().is_some_and(char::is_alphanumeric)
}

/// Whether the emitted form of `span` begins with a letter or digit.
fn starts_with_word_char(span: &Span) -> bool {
    match span {
        Span::Text(text) => text.chars().next().is_some_and(char::is_alphanumeric),
        _ => false,
    }
}

/// `before_word` is set when the next span begins with a word character.
fn span_to_typst(span: &Span, before_word: bool, out: &mut String) {
    // Markup delimiters do not work inside words, functions do
    let in_word = before_word || ends_with_word_char(out);
    match span {
        Span::Text(text) => push_escaped(text, out),
        Span::Bold(inner) if in_word => wrap_call("strong", inner, out),
        Span::Bold(inner) => {
            out.push('*');
            spans_to_typst(inner, out);
            out.push('*');
        }
        Span::Italic(inner) if in_word => wrap_call("emph", inner, out),
        Span::Italic(inner) => {
            out.push('_');
            spans_to_typst(inner, out);
            out.push('_');
        }
        Span::Strikethrough(inner) => wrap_call("strike", inner, out),
        Span::Code(text) if text.contains('`') => {
            out.push_str("#raw(");
            push_string_literal(text, out);
            out.push(')');
        }
        Span::Code(text) => {
            out.push('`');
            out.push_str(text);
            out.push('`');
        }
        Span::Link { url, content } => {
            out.push_str("#link(");
            push_string_literal(url, out);
            out.push(')');
            if !content.is_empty() {
                out.push('[');
                spans_to_typst(content, out);
                out.push(']');
            }
        }
        Span::LineBreak => {
            out.push_str(" \\\n");
        }
    }
}

fn wrap_call(function: &str, inner: &[Span], out: &mut String) {
    out.push('#');
    out.push_str(function);
    out.push('[');
    spans_to_typst(inner, out);
    out.push(']');
}

/// Escape special Typst characters in plain text
fn push_escaped(text: &str, out: &mut String) {
    for ch in text.chars() {
        let at_line_start = out.is_empty() || out.ends_with('\n');
        // An argument list directly after a function call would extend it
        let after_call = out.ends_with(']') || out.ends_with(')');
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '/' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            '=' | '+' | '-' if at_line_start => {
                out.push('\\');
                out.push(ch);
            }
            '(' if after_call => {
                out.push('\\');
                out.push(ch);
            }
            // `2.` opening a line would start a numbered list
            '.' if ends_with_line_start_number(out) => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

fn ends_with_line_start_number(out: &str) -> bool {
    let before = out.trim_end_matches(|c: char| c.is_ascii_digit());
    before.len() < out.len() && (before.is_empty() || before.ends_with('\n'))
}

fn push_string_literal(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

fn list_to_typst(list: &List, indent: usize, out: &mut String) {
    let marker = if list.ordered { "+" } else { "-" };
    let indent_str = "  ".repeat(indent);
    // Continuation lines must be indented past the marker
    let continuation = format!("\n{indent_str}  ");

    for item in &list.items {
        out.push_str(&indent_str);
        out.push_str(marker);
        out.push(' ');
        match item.checked {
            Some(true) => out.push_str("\\[x\\] "),
            Some(false) => out.push_str("\\[ \\] "),
            None => {}
        }
        let mut content = String::new();
        spans_to_typst(&item.content, &mut content);
        out.push_str(&content.replace('\n', &continuation));
        out.push('\n');

        if !item.blocks.is_empty() {
            let mut body = String::new();
            emit_blocks(&item.blocks, true, &mut body);
            out.push('\n');
            for line in body.trim_end().lines() {
                if !line.is_empty() {
                    out.push_str(&indent_str);
                    out.push_str("  ");
                    out.push_str(line);
                }
                out.push('\n');
            }
        }

        if let Some(nested) = &item.nested {
            list_to_typst(nested, indent + 1, out);
        }
    }
}

fn table_to_typst(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], out: &mut String) {
    let col_count = headers.len();
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {col_count},\n"));

    for cell in headers {
        out.push_str("  [*");
        spans_to_typst(cell, out);
        out.push_str("*],\n");
    }

    for row in rows {
        for cell in row {
            out.push_str("  [");
            spans_to_typst(cell, out);
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}
