//! CSS stylesheet support.
//!
//! Booklets are styled with a plain CSS file. Only a small, print-relevant
//! subset maps onto Typst: text color, font family/size/weight/style,
//! alignment and line height on the document body, headings, links, code and
//! block quotes. Everything else is read, reported at debug level, and
//! ignored.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result, StylesheetError};
use crate::length::{Length, Unit};

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// A parsed stylesheet, rules kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

/// Typst element a CSS selector styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Document,
    Heading(u8),
    Link,
    Raw,
    Quote,
}

impl Target {
    fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "html" | "body" | "p" | "*" => Some(Target::Document),
            "a" | "a:link" | "a:visited" => Some(Target::Link),
            "code" | "pre" | "pre code" | "tt" => Some(Target::Raw),
            "blockquote" => Some(Target::Quote),
            _ => {
                let level = selector.strip_prefix('h')?.parse::<u8>().ok()?;
                (1..=6).contains(&level).then_some(Target::Heading(level))
            }
        }
    }

    /// Prefix that scopes a `set` rule to this target.
    fn show_prefix(self) -> String {
        match self {
            Target::Document => String::new(),
            Target::Heading(level) => format!("#show heading.where(level: {level}): "),
            Target::Link => "#show link: ".to_string(),
            Target::Raw => "#show raw: ".to_string(),
            Target::Quote => "#show quote: ".to_string(),
        }
    }
}

impl Stylesheet {
    /// Read and parse a stylesheet from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let css = fs::read_to_string(path)
            .map_err(|e| Error::read(path, e, |path| Error::StylesheetNotFound { path }))?;
        let sheet = Self::parse(&css).map_err(|source| Error::Stylesheet {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Loaded {} rule(s) from stylesheet {}",
            sheet.rules.len(),
            path.display()
        );
        Ok(sheet)
    }

    pub fn parse(css: &str) -> Result<Self, StylesheetError> {
        let css = strip_comments(css)?;
        let mut rules = Vec::new();
        let mut pos = 0;

        while let Some(offset) = css[pos..].find(|c: char| !c.is_whitespace()) {
            let start = pos + offset;
            let rest = &css[start..];

            if rest.starts_with('@') {
                pos = skip_at_rule(&css, start)?;
                continue;
            }
            if rest.starts_with('}') {
                return Err(StylesheetError::UnexpectedBrace {
                    brace: '}',
                    line: line_of(&css, start),
                });
            }

            let open = match rest.find(['{', '}']) {
                Some(i) if rest.as_bytes()[i] == b'{' => start + i,
                Some(i) => {
                    return Err(StylesheetError::UnexpectedBrace {
                        brace: '}',
                        line: line_of(&css, start + i),
                    });
                }
                // Trailing text without a block declares nothing
                None => break,
            };
            let close = match css[open + 1..].find(['{', '}']) {
                Some(i) if css.as_bytes()[open + 1 + i] == b'}' => open + 1 + i,
                Some(i) => {
                    return Err(StylesheetError::UnexpectedBrace {
                        brace: '{',
                        line: line_of(&css, open + 1 + i),
                    });
                }
                None => {
                    return Err(StylesheetError::UnclosedBlock {
                        line: line_of(&css, open),
                    });
                }
            };

            rules.push(Rule {
                selectors: parse_selectors(&css[start..open]),
                declarations: parse_declarations(&css[open + 1..close]),
            });
            pos = close + 1;
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Translate the supported subset into Typst set/show rules, in source
    /// order so later rules win as they do in CSS.
    pub fn to_typst(&self) -> String {
        let mut out = String::new();
        for rule in &self.rules {
            let style = Style::from_declarations(&rule.declarations);
            for selector in &rule.selectors {
                match Target::from_selector(selector) {
                    Some(target) => style.emit(target, &mut out),
                    None => log::debug!("Ignoring unsupported selector '{selector}'"),
                }
            }
        }
        out
    }
}

/// Replace comments with whitespace, keeping line breaks so line numbers hold.
fn strip_comments(css: &str) -> Result<String, StylesheetError> {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start + 2..].find("*/") else {
            let line = line_of(css, css.len() - rest.len() + start);
            return Err(StylesheetError::UnclosedComment { line });
        };
        let comment = &rest[start..start + 2 + len + 2];
        out.extend(comment.chars().filter(|&c| c == '\n'));
        out.push(' ');
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Skip `@import ...;` statements and `@media ... { ... }` blocks.
fn skip_at_rule(css: &str, start: usize) -> Result<usize, StylesheetError> {
    let rest = &css[start..];
    match rest.find([';', '{']) {
        Some(i) if rest.as_bytes()[i] == b';' => Ok(start + i + 1),
        Some(i) => {
            let mut depth = 0usize;
            for (j, c) in rest[i..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(start + i + j + 1);
                        }
                    }
                    _ => {}
                }
            }
            Err(StylesheetError::UnclosedBlock {
                line: line_of(css, start + i),
            })
        }
        None => Ok(css.len()),
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

fn parse_selectors(text: &str) -> Vec<String> {
    text.split(',')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .map(|s| s.to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    body.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(property, value)| {
            let value = value.trim();
            let value = value
                .strip_suffix("!important")
                .map(str::trim_end)
                .unwrap_or(value);
            Declaration {
                property: property.trim().to_ascii_lowercase(),
                value: value.to_string(),
            }
        })
        .filter(|d| !d.property.is_empty() && !d.value.is_empty())
        .collect()
}

/// Typst-ready values collected from one rule's declarations.
#[derive(Debug, Default)]
struct Style {
    fill: Option<String>,
    font: Option<String>,
    size: Option<String>,
    weight: Option<String>,
    font_style: Option<&'static str>,
    align: Option<&'static str>,
    justify: Option<bool>,
    leading: Option<String>,
    underline: bool,
}

impl Style {
    fn from_declarations(declarations: &[Declaration]) -> Self {
        let mut style = Style::default();
        for Declaration { property, value } in declarations {
            if !style.apply(property, value) {
                log::warn!("Ignoring unrecognized value '{value}' for '{property}'");
            }
        }
        style
    }

    /// Returns false when the property is supported but the value is not.
    fn apply(&mut self, property: &str, value: &str) -> bool {
        match property {
            "color" => set(&mut self.fill, parse_color(value)),
            "font-family" => set(&mut self.font, parse_font_family(value)),
            "font-size" => set(&mut self.size, parse_font_size(value)),
            "font-weight" => set(&mut self.weight, parse_font_weight(value)),
            "font-style" => set(&mut self.font_style, parse_font_style(value)),
            "line-height" => set(&mut self.leading, parse_line_height(value)),
            "text-align" => {
                let value = value.to_ascii_lowercase();
                if value == "justify" {
                    self.justify = Some(true);
                    return true;
                }
                let ok = set(&mut self.align, parse_align(&value));
                if ok {
                    self.justify = Some(false);
                }
                ok
            }
            "text-decoration" | "text-decoration-line" => {
                self.underline = value.split_whitespace().any(|v| v == "underline");
                true
            }
            _ => {
                log::debug!("Ignoring unsupported property '{property}'");
                true
            }
        }
    }

    fn text_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(font) = &self.font {
            args.push(format!("font: {font}"));
        }
        if let Some(size) = &self.size {
            args.push(format!("size: {size}"));
        }
        if let Some(weight) = &self.weight {
            args.push(format!("weight: {weight}"));
        }
        if let Some(font_style) = self.font_style {
            args.push(format!("style: \"{font_style}\""));
        }
        if let Some(fill) = &self.fill {
            args.push(format!("fill: {fill}"));
        }
        args
    }

    fn emit(&self, target: Target, out: &mut String) {
        let prefix = target.show_prefix();
        let keyword = if prefix.is_empty() { "#set" } else { "set" };

        let text_args = self.text_args();
        if !text_args.is_empty() {
            out.push_str(&format!("{prefix}{keyword} text({})\n", text_args.join(", ")));
        }

        let mut par_args = Vec::new();
        if let Some(justify) = self.justify {
            par_args.push(format!("justify: {justify}"));
        }
        if let Some(leading) = &self.leading {
            par_args.push(format!("leading: {leading}"));
        }
        if !par_args.is_empty() && matches!(target, Target::Document | Target::Quote) {
            out.push_str(&format!("{prefix}{keyword} par({})\n", par_args.join(", ")));
        }

        if let Some(align) = self.align {
            out.push_str(&format!("{prefix}{keyword} align({align})\n"));
        }
        if self.underline && target == Target::Link {
            out.push_str("#show link: underline\n");
        }
    }
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *slot = Some(value);
            true
        }
        None => false,
    }
}

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("silver", "#c0c0c0"),
    ("red", "#ff0000"),
    ("maroon", "#800000"),
    ("orange", "#ffa500"),
    ("yellow", "#ffff00"),
    ("olive", "#808000"),
    ("lime", "#00ff00"),
    ("green", "#008000"),
    ("teal", "#008080"),
    ("aqua", "#00ffff"),
    ("blue", "#0000ff"),
    ("navy", "#000080"),
    ("purple", "#800080"),
    ("fuchsia", "#ff00ff"),
];

fn parse_color(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        let valid = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return valid.then(|| format!("rgb(\"#{hex}\")"));
    }
    if let Some(args) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|v| v.strip_suffix(')'))
    {
        let parts: Vec<&str> = args
            .split([',', ' ', '/'])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let channel = |p: &str| -> Option<String> {
            match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f64>().ok().map(|v| format!("{v}%")),
                None => p.parse::<u8>().ok().map(|v| v.to_string()),
            }
        };
        let mut channels = parts.iter().take(3).map(|p| channel(*p)).collect::<Option<Vec<_>>>()?;
        if channels.len() != 3 {
            return None;
        }
        if parts.len() > 4 {
            return None;
        }
        match parts.get(3) {
            Some(alpha) => {
                let alpha = match alpha.strip_suffix('%') {
                    Some(pct) => pct.parse::<f64>().ok()?,
                    None => alpha.parse::<f64>().ok()? * 100.0,
                };
                channels.push(format!("{}%", alpha.clamp(0.0, 100.0)));
            }
            None => {}
        }
        return Some(format!("rgb({})", channels.join(", ")));
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, hex)| format!("rgb(\"{hex}\")"))
}

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
];

fn parse_font_family(value: &str) -> Option<String> {
    let families: Vec<String> = value
        .split(',')
        .map(|f| f.trim().trim_matches(['"', '\'']).trim())
        .filter(|f| !f.is_empty() && !GENERIC_FAMILIES.contains(&f.to_ascii_lowercase().as_str()))
        .map(|f| format!("\"{}\"", f.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    match families.len() {
        0 => None,
        1 => families.into_iter().next(),
        _ => Some(format!("({})", families.join(", "))),
    }
}

fn parse_font_size(value: &str) -> Option<String> {
    if let Some(pct) = value.trim().strip_suffix('%') {
        let pct: f64 = pct.trim().parse().ok()?;
        return Some(Length::new(pct / 100.0, Unit::Em).to_typst());
    }
    value.parse::<Length>().ok().map(|len| len.to_typst())
}

fn parse_font_weight(value: &str) -> Option<String> {
    match value.to_ascii_lowercase().as_str() {
        "normal" => Some("\"regular\"".to_string()),
        "bold" | "bolder" => Some("\"bold\"".to_string()),
        "lighter" => Some("\"light\"".to_string()),
        numeric => numeric
            .parse::<u16>()
            .ok()
            .filter(|w| (100..=900).contains(w))
            .map(|w| w.to_string()),
    }
}

fn parse_font_style(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().as_str() {
        "normal" => Some("normal"),
        "italic" => Some("italic"),
        "oblique" => Some("oblique"),
        _ => None,
    }
}

fn parse_align(value: &str) -> Option<&'static str> {
    match value {
        "left" => Some("left"),
        "right" => Some("right"),
        "center" => Some("center"),
        "start" => Some("start"),
        "end" => Some("end"),
        _ => None,
    }
}

/// CSS line height is the full line box; Typst leading is the gap between
/// lines, so a unitless factor `n` becomes `(n - 1)em`.
fn parse_line_height(value: &str) -> Option<String> {
    let value = value.trim();
    let factor = match value.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok()? / 100.0,
        None if value.eq_ignore_ascii_case("normal") => return Some("0.65em".to_string()),
        None => value.parse::<f64>().ok()?,
    };
    if !factor.is_finite() || factor < 0.0 {
        return None;
    }
    Some(Length::new((factor - 1.0).max(0.0), Unit::Em).to_typst())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_and_declarations() {
        let sheet = Stylesheet::parse(
            "/* booklet */\nbody, P { color: #333; font-size: 11pt !important; }\n\nh1{color:navy}",
        )
        .unwrap();
        assert_eq!(sheet.rules().len(), 2);
        assert_eq!(sheet.rules()[0].selectors, vec!["body", "p"]);
        assert_eq!(
            sheet.rules()[0].declarations[1],
            Declaration {
                property: "font-size".to_string(),
                value: "11pt".to_string(),
            }
        );
        assert_eq!(sheet.rules()[1].declarations.len(), 1);
    }

    #[test]
    fn skips_at_rules() {
        let sheet = Stylesheet::parse(
            "@import url(fonts.css);\n@media print { body { color: red; } }\nh2 { color: blue; }",
        )
        .unwrap();
        assert_eq!(sheet.rules().len(), 1);
        assert_eq!(sheet.rules()[0].selectors, vec!["h2"]);
    }

    #[test]
    fn reports_syntax_errors_with_lines() {
        assert_eq!(
            Stylesheet::parse("body {\n color: red;\n"),
            Err(StylesheetError::UnclosedBlock { line: 1 })
        );
        assert_eq!(
            Stylesheet::parse("body { color: red; }\n}"),
            Err(StylesheetError::UnexpectedBrace { brace: '}', line: 2 })
        );
        assert_eq!(
            Stylesheet::parse("\n/* never closed"),
            Err(StylesheetError::UnclosedComment { line: 2 })
        );
    }

    #[test]
    fn body_rules_become_document_set_rules() {
        let sheet = Stylesheet::parse(
            "body { font-family: 'Libertinus Serif', Georgia, serif; font-size: 16px; color: #333333; text-align: justify; line-height: 1.5 }",
        )
        .unwrap();
        assert_eq!(
            sheet.to_typst(),
            "#set text(font: (\"Libertinus Serif\", \"Georgia\"), size: 12pt, fill: rgb(\"#333333\"))\n\
             #set par(justify: true, leading: 0.5em)\n"
        );
    }

    #[test]
    fn heading_and_link_rules_become_show_rules() {
        let sheet = Stylesheet::parse(
            "h1, h2 { color: rgb(26, 79, 139); text-align: center; font-weight: 600 }\n\
             a { color: gray; text-decoration: underline }",
        )
        .unwrap();
        assert_eq!(
            sheet.to_typst(),
            "#show heading.where(level: 1): set text(weight: 600, fill: rgb(26, 79, 139))\n\
             #show heading.where(level: 1): set align(center)\n\
             #show heading.where(level: 2): set text(weight: 600, fill: rgb(26, 79, 139))\n\
             #show heading.where(level: 2): set align(center)\n\
             #show link: set text(fill: rgb(\"#808080\"))\n\
             #show link: underline\n"
        );
    }

    #[test]
    fn unsupported_selectors_and_values_are_skipped() {
        let sheet = Stylesheet::parse(
            ".note { color: red }\ndiv > p { color: red }\nbody { color: chartreuse; margin: 0 }",
        )
        .unwrap();
        assert_eq!(sheet.to_typst(), "");
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#ABC").as_deref(), Some("rgb(\"#abc\")"));
        assert_eq!(
            parse_color("rgba(0, 0, 0, 0.5)").as_deref(),
            Some("rgb(0, 0, 0, 50%)")
        );
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("rgb(300, 0, 0)"), None);
    }

    #[test]
    fn font_sizes() {
        assert_eq!(parse_font_size("120%").as_deref(), Some("1.2em"));
        assert_eq!(parse_font_size("1.5rem").as_deref(), Some("1.5em"));
        assert_eq!(parse_font_size("large"), None);
    }
}
