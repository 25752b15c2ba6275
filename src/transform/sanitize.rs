//! Strip non-content markup from raw HTML.
//!
//! Output is serialized HTML, parsed back by the Markdown converter. The
//! serializer follows the HTML fragment serialization rules closely enough
//! that re-sanitizing its own output yields the same string.

use ego_tree::iter::Edge;
use ego_tree::NodeId;
use scraper::node::Node;
use scraper::Html;

/// Elements removed together with everything inside them.
pub const REMOVED_ELEMENTS: &[&str] = &[
    "script", "style", "header", "footer", "noscript", "form", "input", "textarea", "select",
    "option", "button", "svg", "iframe", "object", "embed", "applet",
];

/// Presentation-only attributes dropped from every element.
pub const STRIPPED_ATTRIBUTES: &[&str] = &["class", "id", "style"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// `<plaintext>` has no end tag once parsed, so it is written out as `<pre>`.
fn serialized_name(name: &str) -> &str {
    if name == "plaintext" { "pre" } else { name }
}

/// Elements whose first newline is swallowed by the parser.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// Parsed HTML with the handful of edits sanitization needs.
pub struct HtmlDocument {
    html: Html,
    stripped_attributes: Vec<String>,
}

impl HtmlDocument {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
            stripped_attributes: Vec::new(),
        }
    }

    /// Ids of every element whose tag name is in `names`.
    pub fn elements_named(&self, names: &[&str]) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|n| {
                n.value()
                    .as_element()
                    .is_some_and(|el| names.contains(&el.name()))
            })
            .map(|n| n.id())
            .collect()
    }

    pub fn comments(&self) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|n| n.value().is_comment())
            .map(|n| n.id())
            .collect()
    }

    /// Detach each node (and its subtree) from the document.
    pub fn remove(&mut self, ids: &[NodeId]) {
        for &id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
            }
        }
    }

    /// Drop the attribute from every element. Applied when serializing.
    pub fn strip_attribute(&mut self, name: &str) {
        if !self.stripped_attributes.iter().any(|a| a == name) {
            self.stripped_attributes.push(name.to_string());
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for edge in self.html.tree.root().traverse() {
            match edge {
                Edge::Open(node) => match node.value() {
                    Node::Doctype(doctype) => {
                        out.push_str("<!DOCTYPE ");
                        out.push_str(doctype.name());
                        match (doctype.public_id(), doctype.system_id()) {
                            ("", "") => {}
                            ("", system) => {
                                out.push_str(&format!(" SYSTEM \"{}\"", system));
                            }
                            (public, "") => {
                                out.push_str(&format!(" PUBLIC \"{}\"", public));
                            }
                            (public, system) => {
                                out.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public, system));
                            }
                        }
                        out.push('>');
                    }
                    Node::Element(el) => {
                        out.push('<');
                        out.push_str(serialized_name(el.name()));
                        for (name, value) in el.attrs() {
                            if self.stripped_attributes.iter().any(|a| a == name) {
                                continue;
                            }
                            out.push(' ');
                            out.push_str(name);
                            out.push_str("=\"");
                            escape_into(&mut out, value, true);
                            out.push('"');
                        }
                        out.push('>');
                    }
                    Node::Text(text) => {
                        let parent = node
                            .parent()
                            .and_then(|p| p.value().as_element())
                            .map(|el| serialized_name(el.name()));
                        match parent {
                            Some(name) if RAW_TEXT_ELEMENTS.contains(&name) => out.push_str(text),
                            Some(name) => {
                                if LEADING_NEWLINE_ELEMENTS.contains(&name)
                                    && node.prev_sibling().is_none()
                                    && text.starts_with('\n')
                                {
                                    out.push('\n');
                                }
                                escape_into(&mut out, text, false);
                            }
                            None => escape_into(&mut out, text, false),
                        }
                    }
                    // Comments are removed before serializing; anything else
                    // (processing instructions, fragments) has no HTML form.
                    _ => {}
                },
                Edge::Close(node) => {
                    if let Some(el) = node.value().as_element() {
                        if !VOID_ELEMENTS.contains(&el.name()) {
                            out.push_str("</");
                            out.push_str(serialized_name(el.name()));
                            out.push('>');
                        }
                    }
                }
            }
        }
        out
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Remove non-content subtrees, presentation attributes and comments.
pub fn sanitize(raw: &str) -> String {
    let mut doc = HtmlDocument::parse(raw);
    let noise = doc.elements_named(REMOVED_ELEMENTS);
    doc.remove(&noise);
    for attr in STRIPPED_ATTRIBUTES {
        doc.strip_attribute(attr);
    }
    let comments = doc.comments();
    doc.remove(&comments);
    doc.to_html()
}
