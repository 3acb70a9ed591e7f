use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::block::{Block, List, ListItem, Span};

/// Paragraph text that forces a page break.
const PAGE_BREAK_MARKER: &str = "---pagebreak---";

/// Strip YAML front matter from the beginning of a document
fn strip_frontmatter(markdown: &str) -> &str {
    let body = match markdown
        .strip_prefix("---\n")
        .or_else(|| markdown.strip_prefix("---\r\n"))
    {
        Some(body) => body,
        None => return markdown,
    };
    match body.find("\n---") {
        Some(end) if is_metadata(&body[..end]) => {
            let rest = &body[end + 4..];
            // Drop the remainder of the closing delimiter line
            match rest.find('\n') {
                Some(nl) => rest[nl + 1..].trim_start_matches(['\n', '\r']),
                None => "",
            }
        }
        _ => markdown,
    }
}

/// Front matter is a run of `key: value` lines with no blank line.
fn is_metadata(front: &str) -> bool {
    let mut lines = front.lines();
    lines.clone().all(|line| !line.trim().is_empty())
        && lines.any(|line| line.split_once(':').is_some_and(|(key, _)| !key.trim().is_empty()))
}

/// Parse markdown text into a list of blocks
pub fn parse(markdown: &str) -> Vec<Block> {
    let markdown = strip_frontmatter(markdown);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }

    blocks
}

#[derive(Default)]
struct ParseState {
    // Inline content being built
    spans: Vec<Span>,
    // Parent span buffers while inside bold/italic/strike/link
    span_stack: Vec<Vec<Span>>,

    heading_level: Option<u8>,

    in_code_block: bool,
    code_language: Option<String>,
    code_content: String,

    link_urls: Vec<String>,

    list_stack: Vec<ListBuilder>,

    // One buffer per open block quote
    quote_stack: Vec<Vec<Block>>,

    in_table: bool,
    in_table_head: bool,
    table_headers: Vec<Vec<Span>>,
    table_rows: Vec<Vec<Vec<Span>>>,
    current_row: Vec<Vec<Span>>,
}

struct ListBuilder {
    ordered: bool,
    items: Vec<ListItem>,
    current_item_spans: Vec<Span>,
    current_item_checked: Option<bool>,
    current_item_nested: Option<Box<List>>,
    current_item_blocks: Vec<Block>,
    // Open quotes when the list started; deeper quotes sit inside an item
    quote_depth: usize,
}

impl ParseState {
    /// Push a finished block into the innermost open list item or quote, or
    /// the document.
    fn emit(&mut self, blocks: &mut Vec<Block>, block: Block) {
        if let Some(list) = self.innermost_list() {
            list.current_item_blocks.push(block);
            return;
        }
        match self.quote_stack.last_mut() {
            Some(quote) => quote.push(block),
            None => blocks.push(block),
        }
    }

    /// The open list, unless a quote was opened inside its current item.
    fn innermost_list(&mut self) -> Option<&mut ListBuilder> {
        let quotes = self.quote_stack.len();
        self.list_stack
            .last_mut()
            .filter(|list| list.quote_depth == quotes)
    }

    fn open_inline(&mut self) {
        self.span_stack.push(std::mem::take(&mut self.spans));
    }

    fn close_inline(&mut self, wrap: impl FnOnce(Vec<Span>) -> Span) {
        let inner = std::mem::take(&mut self.spans);
        if let Some(mut parent) = self.span_stack.pop() {
            parent.push(wrap(inner));
            self.spans = parent;
        }
    }
}

fn is_page_break(content: &[Span]) -> bool {
    matches!(content, [Span::Text(text)] if text.trim() == PAGE_BREAK_MARKER)
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Block>) {
    match event {
        Event::Start(Tag::Heading { level, .. }) => {
            state.heading_level = Some(heading_level_to_u8(level));
        }
        Event::End(TagEnd::Heading(_)) => {
            if let Some(level) = state.heading_level.take() {
                let content = std::mem::take(&mut state.spans);
                state.emit(blocks, Block::Heading { level, content });
            }
        }

        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.spans);
            if content.is_empty() || state.in_table {
                return;
            }
            if is_page_break(&content) {
                state.emit(blocks, Block::PageBreak);
                return;
            }
            // Loose list items join their leading paragraphs
            if let Some(list) = state
                .innermost_list()
                .filter(|list| list.current_item_blocks.is_empty())
            {
                if !list.current_item_spans.is_empty() {
                    list.current_item_spans.push(Span::LineBreak);
                }
                list.current_item_spans.extend(content);
            } else {
                state.emit(blocks, Block::Paragraph { content });
            }
        }

        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                state.spans.push(Span::Text(text.into_string()));
            }
        }

        Event::Code(code) => {
            state.spans.push(Span::Code(code.into_string()));
        }

        Event::Start(Tag::Strong | Tag::Emphasis | Tag::Strikethrough) => {
            state.open_inline();
        }
        Event::End(TagEnd::Strong) => state.close_inline(Span::Bold),
        Event::End(TagEnd::Emphasis) => state.close_inline(Span::Italic),
        Event::End(TagEnd::Strikethrough) => state.close_inline(Span::Strikethrough),

        Event::Start(Tag::Link { dest_url, .. }) => {
            state.link_urls.push(dest_url.into_string());
            state.open_inline();
        }
        Event::End(TagEnd::Link) => {
            let url = state.link_urls.pop().unwrap_or_default();
            state.close_inline(|content| Span::Link { url, content });
        }

        Event::Start(Tag::CodeBlock(kind)) => {
            state.in_code_block = true;
            state.code_language = match kind {
                CodeBlockKind::Fenced(lang) => {
                    // Only the first word of the info string names the language
                    lang.split_whitespace().next().map(str::to_string)
                }
                CodeBlockKind::Indented => None,
            };
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let language = state.code_language.take();
            state.emit(blocks, Block::CodeBlock { language, content });
        }

        Event::Start(Tag::BlockQuote(_)) => {
            state.quote_stack.push(Vec::new());
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            if let Some(inner) = state.quote_stack.pop() {
                state.emit(blocks, Block::Quote { blocks: inner });
            }
        }

        Event::Start(Tag::List(first_item)) => {
            // Text of the enclosing item precedes its nested list
            let leading = std::mem::take(&mut state.spans);
            if let Some(parent) = state.innermost_list() {
                parent.current_item_spans.extend(leading);
            }
            state.list_stack.push(ListBuilder {
                ordered: first_item.is_some(),
                items: Vec::new(),
                current_item_spans: Vec::new(),
                current_item_checked: None,
                current_item_nested: None,
                current_item_blocks: Vec::new(),
                quote_depth: state.quote_stack.len(),
            });
        }
        Event::End(TagEnd::List(_)) => {
            if let Some(builder) = state.list_stack.pop() {
                let list = List {
                    ordered: builder.ordered,
                    items: builder.items,
                };
                if let Some(parent) = state.innermost_list() {
                    parent.current_item_nested = Some(Box::new(list));
                } else {
                    state.emit(blocks, Block::List(list));
                }
            }
        }

        Event::Start(Tag::Item) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_spans.clear();
                list.current_item_checked = None;
                list.current_item_nested = None;
                list.current_item_blocks.clear();
            }
        }
        Event::End(TagEnd::Item) => {
            let remaining = std::mem::take(&mut state.spans);
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_spans.extend(remaining);
                let item = ListItem {
                    content: std::mem::take(&mut list.current_item_spans),
                    nested: list.current_item_nested.take(),
                    checked: list.current_item_checked.take(),
                    blocks: std::mem::take(&mut list.current_item_blocks),
                };
                list.items.push(item);
            }
        }

        Event::TaskListMarker(checked) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.current_item_checked = Some(checked);
            }
        }

        Event::Start(Tag::Table(_)) => {
            state.in_table = true;
            state.table_headers.clear();
            state.table_rows.clear();
        }
        Event::End(TagEnd::Table) => {
            state.in_table = false;
            let headers = std::mem::take(&mut state.table_headers);
            let rows = std::mem::take(&mut state.table_rows);
            state.emit(blocks, Block::Table { headers, rows });
        }

        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.current_row.clear();
        }
        Event::End(TagEnd::TableHead) => {
            state.in_table_head = false;
            state.table_headers = std::mem::take(&mut state.current_row);
        }

        Event::Start(Tag::TableRow) => {
            state.current_row.clear();
        }
        Event::End(TagEnd::TableRow) => {
            if !state.in_table_head {
                let row = std::mem::take(&mut state.current_row);
                state.table_rows.push(row);
            }
        }

        Event::Start(Tag::TableCell) => {
            state.spans.clear();
        }
        Event::End(TagEnd::TableCell) => {
            let cell = std::mem::take(&mut state.spans);
            state.current_row.push(cell);
        }

        Event::Rule => {
            state.emit(blocks, Block::Rule);
        }

        Event::SoftBreak => {
            state.spans.push(Span::Text(" ".to_string()));
        }
        Event::HardBreak => {
            state.spans.push(Span::LineBreak);
        }

        // Raw HTML, footnotes and images carry no layout of their own here
        _ => {}
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn frontmatter_is_stripped() {
        let blocks = parse("---\ntitle: Booklet\n---\n\nHello");
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                content: vec![text("Hello")]
            }]
        );
    }

    #[test]
    fn leading_rule_without_closing_delimiter_is_kept() {
        let blocks = parse("---\n\nHello");
        assert_eq!(blocks[0], Block::Rule);
    }

    #[test]
    fn leading_rule_pair_around_prose_is_kept() {
        let blocks = parse("---\n\nIntro\n\n---\n\nMore");
        assert_eq!(
            blocks,
            vec![
                Block::Rule,
                Block::Paragraph {
                    content: vec![text("Intro")]
                },
                Block::Rule,
                Block::Paragraph {
                    content: vec![text("More")]
                },
            ]
        );
    }

    #[test]
    fn page_break_marker() {
        let blocks = parse("One\n\n---pagebreak---\n\nTwo");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::PageBreak);
    }

    #[test]
    fn nested_list_attaches_to_parent_item() {
        let blocks = parse("- a\n  - b\n- c");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list, got {:?}", blocks[0]);
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].content, vec![text("a")]);
        let nested = list.items[0].nested.as_ref().expect("nested list");
        assert_eq!(nested.items[0].content, vec![text("b")]);
        assert_eq!(list.items[1].content, vec![text("c")]);
        assert_eq!(list.total_items(), 3);
    }

    #[test]
    fn code_block_inside_list_item_stays_in_item() {
        let blocks = parse("Intro\n\n- item\n\n  ```\n  code\n  ```\n- next\n");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], Block::Paragraph { .. }));
        let Block::List(list) = &blocks[1] else {
            panic!("expected a list, got {:?}", blocks[1]);
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].content, vec![text("item")]);
        assert_eq!(
            list.items[0].blocks,
            vec![Block::CodeBlock {
                language: None,
                content: "code\n".to_string(),
            }]
        );
        assert_eq!(list.items[1].content, vec![text("next")]);
        assert!(list.items[1].blocks.is_empty());
    }

    #[test]
    fn quote_inside_list_item_keeps_its_paragraph() {
        let blocks = parse("- item\n\n  > quoted\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list, got {:?}", blocks[0]);
        };
        assert_eq!(list.items[0].content, vec![text("item")]);
        assert_eq!(
            list.items[0].blocks,
            vec![Block::Quote {
                blocks: vec![Block::Paragraph {
                    content: vec![text("quoted")]
                }]
            }]
        );
    }

    #[test]
    fn list_inside_quote_is_quoted() {
        let blocks = parse("> - a\n> - b");
        let Block::Quote { blocks: inner } = &blocks[0] else {
            panic!("expected a quote, got {:?}", blocks[0]);
        };
        assert!(matches!(&inner[0], Block::List(list) if list.items.len() == 2));
    }

    #[test]
    fn task_list_items() {
        let blocks = parse("- [x] done\n- [ ] todo");
        let Block::List(list) = &blocks[0] else {
            panic!("expected a list");
        };
        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
    }

    #[test]
    fn block_quote_collects_inner_blocks() {
        let blocks = parse("> # Quoted\n>\n> text");
        let Block::Quote { blocks: inner } = &blocks[0] else {
            panic!("expected a quote");
        };
        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[0], Block::Heading { level: 1, .. }));
    }

    #[test]
    fn inline_formatting() {
        let blocks = parse("~~old~~ [site](https://example.com)");
        let Block::Paragraph { content } = &blocks[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(content[0], Span::Strikethrough(vec![text("old")]));
        assert_eq!(
            content[2],
            Span::Link {
                url: "https://example.com".to_string(),
                content: vec![text("site")],
            }
        );
    }

    #[test]
    fn code_block_language_is_first_word() {
        let blocks = parse("```rust ignore\nfn main() {}\n```");
        assert_eq!(
            blocks[0],
            Block::CodeBlock {
                language: Some("rust".to_string()),
                content: "fn main() {}\n".to_string(),
            }
        );
    }
}
