//! A small typed DOM over html5ever's reference-counted tree.
//!
//! html5ever recovers from malformed markup the way browsers do, so every
//! input parses into *some* tree: unclosed tags are closed, stray text is
//! wrapped, and `<html>`, `<head>` and `<body>` always exist.
//!
//! [`HtmlDocument`] exposes only the capabilities the transformer needs:
//! predicate-based element search, attribute access, element creation and
//! tree surgery, and serialisation. Handles are `Rc`-based and therefore not
//! `Send`; a document must be built, edited and serialised without crossing
//! an `.await`.

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::rc::Rc;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Borrowed view of an element handed to search predicates.
pub struct ElementRef<'a> {
    tag: &'a str,
    attrs: &'a RefCell<Vec<Attribute>>,
}

impl<'a> ElementRef<'a> {
    /// Lower-case local tag name.
    pub fn tag(&self) -> &str {
        self.tag
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        find_attr(&self.attrs.borrow(), name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }
}

/// A parsed, mutable HTML document.
pub struct HtmlDocument {
    dom: RcDom,
}

impl HtmlDocument {
    /// Parse a full HTML document. Never fails: errors are recovered.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        Self { dom }
    }

    pub fn root(&self) -> Handle {
        Rc::clone(&self.dom.document)
    }

    /// Every element (document order) for which `pred` is true.
    pub fn find_elements<F>(&self, pred: F) -> Vec<Handle>
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        collect_elements(&self.dom.document, &pred)
    }

    /// Every element with the given tag name.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<Handle> {
        self.find_elements(|el| el.tag() == tag)
    }

    /// The first element for which `pred` is true.
    pub fn find_first<F>(&self, pred: F) -> Option<Handle>
    where
        F: Fn(&ElementRef<'_>) -> bool,
    {
        self.find_elements(pred).into_iter().next()
    }

    /// The `<head>` element, created under `<html>` if the parser did not
    /// produce one.
    pub fn ensure_head(&self) -> Handle {
        if let Some(head) = self.find_first(|el| el.tag() == "head") {
            return head;
        }
        let head = create_element("head", &[]);
        match self.find_first(|el| el.tag() == "html") {
            Some(html) => prepend_child(&html, head.clone()),
            None => prepend_child(&self.dom.document, head.clone()),
        }
        head
    }

    /// Serialise the whole document, including its doctype.
    pub fn to_html(&self) -> std::io::Result<String> {
        let mut out = Vec::new();
        let handle: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut out, &handle, SerializeOpts::default())?;
        String::from_utf8(out).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

// Walks use an explicit stack: page nesting depth is unbounded.
fn collect_elements<F>(root: &Handle, pred: &F) -> Vec<Handle>
where
    F: Fn(&ElementRef<'_>) -> bool,
{
    let mut found = Vec::new();
    let mut stack = vec![Rc::clone(root)];
    while let Some(node) = stack.pop() {
        if let NodeData::Element { name, attrs, .. } = &node.data {
            let view = ElementRef {
                tag: &*name.local,
                attrs,
            };
            if pred(&view) {
                found.push(Rc::clone(&node));
            }
        }
        // Reversed so children pop in document order.
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    found
}

fn find_attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

// ── Node-level operations ───────────────────────────────────────────────────

/// Lower-case tag name, or `None` for non-element nodes.
pub fn tag_name(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn get_attr(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => find_attr(&attrs.borrow(), name),
        _ => None,
    }
}

/// Set (or add) an attribute on an element. No-op on other nodes.
pub fn set_attr(node: &Handle, name: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| &*a.name.local == name) {
            Some(existing) => existing.value = StrTendril::from(value),
            None => attrs.push(Attribute {
                name: attr_name(name),
                value: StrTendril::from(value),
            }),
        }
    }
}

/// Remove an attribute; returns whether it was present.
pub fn remove_attr(node: &Handle, name: &str) -> bool {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        let before = attrs.len();
        attrs.retain(|a| &*a.name.local != name);
        return attrs.len() != before;
    }
    false
}

/// Build a detached HTML element.
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(HTML_NS), LocalName::from(tag)),
        attrs: RefCell::new(
            attrs
                .iter()
                .map(|(k, v)| Attribute {
                    name: attr_name(k),
                    value: StrTendril::from(*v),
                })
                .collect(),
        ),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Build a detached text node.
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

pub fn append_child(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

pub fn prepend_child(parent: &Handle, child: Handle) {
    detach(&child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}

fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

/// Remove a node from its parent. The node (and its subtree) stays usable.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

/// Put `replacement` where `node` is and detach `node`.
pub fn replace_with(node: &Handle, replacement: Handle) {
    let Some(parent) = parent_of(node) else {
        return;
    };
    detach(&replacement);
    {
        let mut children = parent.children.borrow_mut();
        if let Some(pos) = children.iter().position(|c| Rc::ptr_eq(c, node)) {
            replacement.parent.set(Some(Rc::downgrade(&parent)));
            children[pos] = replacement;
        }
    }
    node.parent.set(None);
}

/// Concatenated text of a subtree.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![Rc::clone(node)];
    while let Some(node) = stack.pop() {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    out
}

/// Nearest ancestor (excluding `node`) for which `pred` holds.
pub fn has_ancestor<F>(node: &Handle, pred: F) -> bool
where
    F: Fn(&Handle) -> bool,
{
    let mut current = parent_of(node);
    while let Some(n) = current {
        if pred(&n) {
            return true;
        }
        current = parent_of(&n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_finds_by_tag() {
        let doc = HtmlDocument::parse("<p>a<img src=x.png><img src=y.webp></p>");
        let imgs = doc.elements_by_tag("img");
        assert_eq!(imgs.len(), 2);
        assert_eq!(get_attr(&imgs[1], "src").as_deref(), Some("y.webp"));
    }

    #[test]
    fn malformed_html_is_recovered() {
        let doc = HtmlDocument::parse("<div><p>unclosed <b>bold<img src=a.png");
        assert_eq!(doc.elements_by_tag("img").len(), 1);
        assert_eq!(doc.elements_by_tag("head").len(), 1);
        assert!(doc.to_html().unwrap().contains("unclosed"));
    }

    #[test]
    fn predicate_sees_attributes_and_classes() {
        let doc = HtmlDocument::parse(
            r#"<span class="katex big">k</span><span class="other">o</span>"#,
        );
        let found = doc.find_elements(|el| el.tag() == "span" && el.has_class("katex"));
        assert_eq!(found.len(), 1);
        assert_eq!(text_content(&found[0]), "k");
    }

    #[test]
    fn set_and_remove_attributes() {
        let doc = HtmlDocument::parse("<img src=a.png srcset='a.webp 2x'>");
        let img = &doc.elements_by_tag("img")[0];
        set_attr(img, "src", "data:image/jpeg;base64,AAAA");
        assert!(remove_attr(img, "srcset"));
        assert!(!remove_attr(img, "srcset"));
        set_attr(img, "alt", "new");
        let html = doc.to_html().unwrap();
        assert!(html.contains(r#"src="data:image/jpeg;base64,AAAA""#));
        assert!(html.contains(r#"alt="new""#));
        assert!(!html.contains("srcset"));
    }

    #[test]
    fn detach_and_replace() {
        let doc = HtmlDocument::parse("<div><i>drop</i><b>swap</b></div>");
        detach(&doc.elements_by_tag("i")[0]);
        let b = doc.elements_by_tag("b")[0].clone();
        let em = create_element("em", &[]);
        append_child(&em, create_text("swapped"));
        replace_with(&b, em);
        let html = doc.to_html().unwrap();
        assert!(!html.contains("drop"));
        assert!(html.contains("<div><em>swapped</em></div>"), "got {html}");
    }

    #[test]
    fn ensure_head_prepends_and_serialises() {
        let doc = HtmlDocument::parse("<!DOCTYPE html><title>t</title><p>x</p>");
        let head = doc.ensure_head();
        prepend_child(&head, create_element("base", &[("href", "http://a.example/")]));
        let html = doc.to_html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(
            html.contains(r#"<head><base href="http://a.example/"><title>t</title>"#),
            "got {html}"
        );
    }

    #[test]
    fn ancestor_lookup() {
        let doc = HtmlDocument::parse(r#"<span class="katex-display"><span id="in">x</span></span>"#);
        let inner = doc.find_first(|el| el.attr("id").as_deref() == Some("in")).unwrap();
        assert!(has_ancestor(&inner, |n| get_attr(n, "class").as_deref()
            == Some("katex-display")));
        assert!(!has_ancestor(&inner, |n| tag_name(n).as_deref() == Some("table")));
    }

    #[test]
    fn deeply_nested_markup_is_walked_without_recursion() {
        const DEPTH: usize = 50_000;
        // Fixed stack size so the outcome does not depend on the harness.
        let walker = std::thread::Builder::new()
            .stack_size(8 * 1024 * 1024)
            .spawn(|| {
                let html = format!(
                    "{}<img src=deep.webp>deep text{}",
                    "<div>".repeat(DEPTH),
                    "</div>".repeat(DEPTH)
                );
                let doc = HtmlDocument::parse(&html);
                let imgs = doc.elements_by_tag("img");
                assert_eq!(imgs.len(), 1);
                assert_eq!(get_attr(&imgs[0], "src").as_deref(), Some("deep.webp"));
                assert_eq!(doc.elements_by_tag("div").len(), DEPTH);
                assert_eq!(text_content(&doc.root()), "deep text");
            })
            .unwrap();
        walker.join().unwrap();
    }

    #[test]
    fn walks_follow_document_order() {
        let doc = HtmlDocument::parse("<p id=a>one<b id=b>two</b></p><p id=c>three</p>");
        let ids: Vec<_> = doc
            .find_elements(|el| el.attr("id").is_some())
            .iter()
            .filter_map(|n| get_attr(n, "id"))
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(text_content(&doc.root()), "onetwothree");
    }
}
