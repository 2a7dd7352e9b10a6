//! HTML serialization of document subtrees.

use std::fmt::Write;

use super::{Document, NodeData, NodeId};

/// Serialize a node and its subtree.
#[must_use]
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serialize the children of a node.
#[must_use]
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Pending serialization work.
enum Step {
    Open(NodeId),
    Close(NodeId),
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let mut stack = vec![Step::Open(id)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Open(id) => match doc.data(id) {
                Some(NodeData::Text(text)) => escape_text(text, out),
                Some(NodeData::Element(el)) => {
                    let _ = write!(out, "<{}", el.tag());
                    for (name, value) in el.attributes() {
                        let _ = write!(out, " {name}=\"");
                        escape_attribute(value, out);
                        out.push('"');
                    }
                    out.push('>');
                    stack.push(Step::Close(id));
                    stack.extend(doc.children(id).iter().rev().map(|&c| Step::Open(c)));
                }
                Some(NodeData::Document) => {
                    stack.extend(doc.children(id).iter().rev().map(|&c| Step::Open(c)));
                }
                None => {}
            },
            Step::Close(id) => {
                if let Some(NodeData::Element(el)) = doc.data(id) {
                    let _ = write!(out, "</{}>", el.tag());
                }
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_escapes() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let a = doc.create_element("a");
        doc.set_attribute(a, "title", "\"x\" & <y>").unwrap();
        let t = doc.create_text("1 < 2 & 3 > 2");
        doc.append_child(a, t).unwrap();
        doc.append_child(body, a).unwrap();

        insta::assert_snapshot!(
            inner_html(&doc, body),
            @r#"<a title="&quot;x&quot; &amp; &lt;y&gt;">1 &lt; 2 &amp; 3 &gt; 2</a>"#
        );
    }

    #[test]
    fn test_deeply_nested_document() {
        const DEPTH: usize = 100_000;
        let mut doc = Document::with_body();
        // Built bottom-up so each insertion only walks a detached chain.
        let mut top = doc.create_text("1234 AB");
        for _ in 0..DEPTH {
            let div = doc.create_element("div");
            doc.append_child(div, top).unwrap();
            top = div;
        }
        let body = doc.body().unwrap();
        doc.append_child(body, top).unwrap();

        let html = inner_html(&doc, doc.body().unwrap());
        assert!(html.starts_with("<div><div>"));
        assert!(html.contains("<div>1234 AB</div>"));
        assert!(html.ends_with("</div></div>"));
        assert_eq!(html.matches("<div>").count(), DEPTH);
        assert_eq!(html.matches("</div>").count(), DEPTH);
    }

    #[test]
    fn test_siblings_keep_document_order() {
        let mut doc = Document::with_body();
        let body = doc.body().unwrap();
        let p = doc.create_element("p");
        let a = doc.create_text("a");
        let b = doc.create_element("b");
        let inner = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append_child(b, inner).unwrap();
        for node in [a, b, c] {
            doc.append_child(p, node).unwrap();
        }
        doc.append_child(body, p).unwrap();

        assert_eq!(outer_html(&doc, p), "<p>a<b>b</b>c</p>");
    }

    #[test]
    fn test_outer_html_of_document() {
        let doc = Document::with_body();
        assert_eq!(
            outer_html(&doc, doc.root()),
            "<html><head></head><body></body></html>"
        );
    }
}
