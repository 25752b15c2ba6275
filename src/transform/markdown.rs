//! Sanitized HTML → Markdown.

use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Elements rendered as their own block, separated from surrounding text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "nav", "figure", "figcaption", "address",
    "details", "summary", "center", "body",
];

/// Elements that never contribute body text.
const SKIPPED_ELEMENTS: &[&str] = &["head", "template", "script", "style", "title", "meta", "link"];

/// Element nesting rendered structurally. Anything deeper is flattened to
/// its text so hostile pages cannot exhaust the worker's stack.
const MAX_DEPTH: usize = 256;

/// Convert cleaned HTML into normalized Markdown.
pub fn convert(cleaned_html: &str) -> String {
    let doc = Html::parse_document(cleaned_html);
    let mut w = Writer::default();
    w.element(doc.root_element());
    normalize(&w.out)
}

/// Trim every line and drop the empty ones. Paragraph breaks collapse into
/// single newlines.
pub fn normalize(markdown: &str) -> String {
    markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    /// Inline text with whitespace runs collapsed to one space.
    fn text(&mut self, raw: &str) {
        if raw.starts_with(char::is_whitespace) {
            self.space();
        }
        let mut words = raw.split_whitespace().peekable();
        let had_words = words.peek().is_some();
        while let Some(word) = words.next() {
            escape_into(&mut self.out, word);
            if words.peek().is_some() {
                self.space();
            }
        }
        if had_words && raw.ends_with(char::is_whitespace) {
            self.space();
        }
    }

    /// Leading spaces are kept so callers can tell an inline fragment began
    /// with whitespace; line trimming removes them later.
    fn space(&mut self) {
        if !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn block_break(&mut self) {
        if !self.out.is_empty() {
            self.out.push_str("\n\n");
        }
    }

    /// Render an element's children as a standalone fragment, at the
    /// current depth.
    fn fragment(&self, el: ElementRef) -> String {
        let mut w = Writer {
            out: String::new(),
            depth: self.depth,
        };
        w.children(el);
        w.out
    }

    fn children(&mut self, el: ElementRef) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef) {
        let tag = el.value().name();
        if SKIPPED_ELEMENTS.contains(&tag) {
            return;
        }
        if self.depth >= MAX_DEPTH {
            let flat: String = el.text().collect();
            self.text(&flat);
            return;
        }
        self.depth += 1;
        self.render_element(el, tag);
        self.depth -= 1;
    }

    fn render_element(&mut self, el: ElementRef, tag: &str) {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level: usize = tag[1..].parse().unwrap_or(1);
                let text = single_line(&self.fragment(el));
                if !text.is_empty() {
                    self.block_break();
                    self.raw(&"#".repeat(level));
                    self.raw(" ");
                    self.raw(&text);
                    self.block_break();
                }
            }
            "br" => self.newline(),
            "hr" => {
                self.block_break();
                self.raw("---");
                self.block_break();
            }
            "strong" | "b" => self.wrap_inline(el, "**"),
            "em" | "i" => self.wrap_inline(el, "*"),
            "del" | "s" | "strike" => self.wrap_inline(el, "~~"),
            "code" | "kbd" | "samp" | "tt" => {
                let code: String = el.text().collect();
                let code = code.split_whitespace().collect::<Vec<_>>().join(" ");
                if !code.is_empty() {
                    let fence = "`".repeat(longest_run(&code, '`') + 1);
                    self.raw(&fence);
                    self.raw(&code);
                    self.raw(&fence);
                }
            }
            "pre" => {
                let code: String = el.text().collect();
                let code = code.trim_matches('\n');
                if !code.trim().is_empty() {
                    let fence = "`".repeat(longest_run(code, '`').max(2) + 1);
                    self.block_break();
                    self.raw(&fence);
                    self.newline();
                    self.raw(code);
                    self.newline();
                    self.raw(&fence);
                    self.block_break();
                }
            }
            "a" => {
                let href = el.value().attr("href").unwrap_or("").trim();
                let text = single_line(&self.fragment(el));
                if text.is_empty() {
                    return;
                }
                if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                    self.raw(&text);
                } else {
                    self.raw(&format!("[{}]({})", text, href.replace(' ', "%20")));
                }
            }
            "img" => {
                let src = el.value().attr("src").unwrap_or("").trim();
                if !src.is_empty() {
                    let alt = el.value().attr("alt").unwrap_or("").trim();
                    self.raw(&format!("![{}]({})", alt, src.replace(' ', "%20")));
                }
            }
            "ul" | "ol" => {
                self.block_break();
                self.list(el, tag == "ol");
                self.block_break();
            }
            "li" => {
                // Stray <li> outside a list.
                self.block_break();
                self.raw("- ");
                self.raw(&single_line(&self.fragment(el)));
                self.block_break();
            }
            "blockquote" => {
                let inner = self.fragment(el);
                self.block_break();
                for line in inner.lines().filter(|l| !l.trim().is_empty()) {
                    self.raw("> ");
                    self.raw(line.trim());
                    self.newline();
                }
                self.block_break();
            }
            "table" => {
                self.block_break();
                self.table(el);
                self.block_break();
            }
            "dl" => {
                self.block_break();
                self.definition_list(el);
                self.block_break();
            }
            _ if BLOCK_ELEMENTS.contains(&tag) => {
                self.block_break();
                self.children(el);
                self.block_break();
            }
            _ => self.children(el),
        }
    }

    /// `<em> hi </em>` becomes ` *hi* ` so the markers hug the text.
    fn wrap_inline(&mut self, el: ElementRef, marker: &str) {
        let inner = self.fragment(el);
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            self.text(&inner);
            return;
        }
        if inner.starts_with(char::is_whitespace) {
            self.space();
        }
        self.raw(marker);
        self.raw(trimmed);
        self.raw(marker);
        if inner.ends_with(char::is_whitespace) {
            self.space();
        }
    }

    fn list(&mut self, list: ElementRef, ordered: bool) {
        let start: usize = list
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let items = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li");
        for (i, item) in items.enumerate() {
            let marker = if ordered {
                format!("{}. ", start.saturating_add(i))
            } else {
                "- ".to_string()
            };
            let indent = " ".repeat(marker.len());
            let body = self.fragment(item);
            let mut lines = body.lines().filter(|l| !l.trim().is_empty());
            self.raw(&marker);
            if let Some(first) = lines.next() {
                self.raw(first.trim());
            }
            self.newline();
            for line in lines {
                self.raw(&indent);
                self.raw(line);
                self.newline();
            }
        }
    }

    fn table(&mut self, table: ElementRef) {
        let rows: Vec<Vec<String>> = table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "th" | "td"))
                    .map(|cell| single_line(&self.fragment(cell)).replace('|', "\\|"))
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();
        if rows.is_empty() {
            return;
        }

        let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            self.raw("|");
            for j in 0..max_cols {
                let cell = row.get(j).map(String::as_str).unwrap_or("");
                self.raw(&format!(" {} |", cell));
            }
            self.newline();
            if i == 0 {
                self.raw("|");
                for _ in 0..max_cols {
                    self.raw(" --- |");
                }
                self.newline();
            }
        }
    }

    fn definition_list(&mut self, dl: ElementRef) {
        for child in dl.children().filter_map(ElementRef::wrap) {
            let text = single_line(&self.fragment(child));
            if text.is_empty() {
                continue;
            }
            match child.value().name() {
                "dt" => self.raw(&format!("**{}**", text)),
                "dd" => self.raw(&format!(": {}", text)),
                _ => self.raw(&text),
            }
            self.newline();
        }
    }
}


fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn longest_run(s: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn escape_into(out: &mut String, word: &str) {
    for c in word.chars() {
        if matches!(c, '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
}
