/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Strikethrough(Vec<Span>),
    Code(String),
    Link { url: String, content: Vec<Span> },
    LineBreak,
}

/// A single list item, which can contain a nested list
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Span>,
    pub nested: Option<Box<List>>,
    /// Task list marker: None = plain item, Some(checked) otherwise
    pub checked: Option<bool>,
    /// Code blocks, quotes and later paragraphs of a loose item
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

impl List {
    /// Number of items including every nested list.
    pub fn total_items(&self) -> usize {
        self.items
            .iter()
            .map(|item| 1 + item.nested.as_ref().map_or(0, |n| n.total_items()))
            .sum()
    }
}

/// Block-level elements of a booklet
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Span>,
    },
    Paragraph {
        content: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Quote {
        blocks: Vec<Block>,
    },
    Rule,
    PageBreak,
}
