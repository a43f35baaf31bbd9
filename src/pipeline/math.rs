//! Formula handling: normalise rendered math and inject a MathJax loader.
//!
//! The renderer has no native formula support. Pages either ship TeX that a
//! client-side library typesets at load time, or markup that was already
//! typeset by KaTeX and depends on KaTeX's CSS and fonts. Both end up as
//! TeX handed to MathJax 2, which runs inside the renderer during its
//! JavaScript delay.

use super::dom::{self, HtmlDocument};
use crate::config::MathJaxMode;
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_TEX_DELIMITERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\\(|\\\[|\$\$|\\begin\{(equation|align|gather)\*?\}").unwrap());

/// Replace KaTeX output with `<script type="math/tex">` carrying its TeX.
///
/// KaTeX keeps the source in `<annotation encoding="application/x-tex">`.
/// Spans without that annotation are left untouched. Returns the number of
/// formulas rewritten.
pub fn normalise_katex(doc: &HtmlDocument) -> usize {
    let katex = doc.find_elements(|el| el.tag() == "span" && el.has_class("katex"));
    let mut rewritten = 0;

    for span in katex {
        let Some(tex) = katex_source(&span) else {
            continue;
        };
        let display = dom::has_ancestor(&span, |n| {
            dom::get_attr(n, "class")
                .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == "katex-display"))
        });
        let script_type = if display {
            "math/tex; mode=display"
        } else {
            "math/tex"
        };

        let script = dom::create_element("script", &[("type", script_type)]);
        dom::append_child(&script, dom::create_text(tex.trim()));
        dom::replace_with(&span, script);
        rewritten += 1;
    }

    if rewritten > 0 {
        debug!("Normalised {} KaTeX formulas", rewritten);
    }
    rewritten
}

fn katex_source(span: &Handle) -> Option<String> {
    let mut stack = vec![span.clone()];
    while let Some(node) = stack.pop() {
        if dom::tag_name(&node).as_deref() == Some("annotation")
            && dom::get_attr(&node, "encoding").as_deref() == Some("application/x-tex")
        {
            return Some(dom::text_content(&node));
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }
    None
}

/// True when the document carries formula markup MathJax could typeset.
pub fn has_math(doc: &HtmlDocument) -> bool {
    let markup = doc
        .find_first(|el| match el.tag() {
            "math" => true,
            "script" => el
                .attr("type")
                .is_some_and(|t| t.trim_start().starts_with("math/")),
            "span" | "div" => {
                el.has_class("katex") || el.has_class("MathJax") || el.has_class("math")
            }
            _ => false,
        })
        .is_some();

    markup || RE_TEX_DELIMITERS.is_match(&dom::text_content(&doc.root()))
}

/// Insert `<base href>` first in `<head>` so relative links resolve against
/// the page URL rather than the temporary file.
pub fn inject_base(doc: &HtmlDocument, page_url: &str) {
    let head = doc.ensure_head();
    for existing in doc.elements_by_tag("base") {
        dom::detach(&existing);
    }
    dom::prepend_child(&head, dom::create_element("base", &[("href", page_url)]));
}

/// Whether `mode` calls for a MathJax loader on this document.
///
/// KaTeX normalisation is only worth doing when this holds: the TeX scripts
/// it leaves behind are invisible until MathJax typesets them.
pub fn wants_mathjax(doc: &HtmlDocument, mode: MathJaxMode) -> bool {
    match mode {
        MathJaxMode::Always => true,
        MathJaxMode::Detect => has_math(doc),
        MathJaxMode::Never => false,
    }
}

/// Append the MathJax loader script to `<head>`.
pub fn inject_mathjax(doc: &HtmlDocument, script_url: &str) {
    let head = doc.ensure_head();
    let script = dom::create_element("script", &[("src", script_url), ("async", "")]);
    dom::append_child(&head, script);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MATHJAX_URL;

    const KATEX_INLINE: &str = r#"<p>Energy <span class="katex"><span class="katex-mathml"><math><semantics><mrow><mi>E</mi></mrow><annotation encoding="application/x-tex">E = mc^2</annotation></semantics></math></span><span class="katex-html" aria-hidden="true">E=mc2</span></span> holds.</p>"#;

    #[test]
    fn katex_inline_becomes_tex_script() {
        let doc = HtmlDocument::parse(KATEX_INLINE);
        assert_eq!(normalise_katex(&doc), 1);
        let html = doc.to_html().unwrap();
        assert!(
            html.contains(r#"<script type="math/tex">E = mc^2</script>"#),
            "got {html}"
        );
        assert!(!html.contains("katex-html"));
        assert!(html.contains("holds."));
    }

    #[test]
    fn katex_display_gets_display_mode() {
        let html = format!(
            r#"<span class="katex-display">{}</span>"#,
            r#"<span class="katex"><annotation encoding="application/x-tex">\sum_i x_i</annotation></span>"#
        );
        let doc = HtmlDocument::parse(&html);
        assert_eq!(normalise_katex(&doc), 1);
        let out = doc.to_html().unwrap();
        assert!(
            out.contains(r#"<script type="math/tex; mode=display">\sum_i x_i</script>"#),
            "got {out}"
        );
    }

    #[test]
    fn unrecognised_spans_pass_through() {
        let doc = HtmlDocument::parse(r#"<span class="katex">no annotation</span>"#);
        assert_eq!(normalise_katex(&doc), 0);
        assert!(doc.to_html().unwrap().contains("no annotation"));
    }

    #[test]
    fn detects_math() {
        assert!(has_math(&HtmlDocument::parse("<p>$$x^2$$</p>")));
        assert!(has_math(&HtmlDocument::parse(r"<p>inline \(a+b\)</p>")));
        assert!(has_math(&HtmlDocument::parse(
            r#"<script type="math/tex">x</script>"#
        )));
        assert!(has_math(&HtmlDocument::parse("<math><mi>x</mi></math>")));
        assert!(!has_math(&HtmlDocument::parse("<p>costs $5 and $6</p>")));
    }

    #[test]
    fn base_is_first_in_head_and_replaces_existing() {
        let doc = HtmlDocument::parse(
            r#"<html><head><title>t</title><base href="/old/"></head><body></body></html>"#,
        );
        inject_base(&doc, "http://a.example/page1");
        let html = doc.to_html().unwrap();
        assert!(html.contains(r#"<head><base href="http://a.example/page1"><title>"#));
        assert!(!html.contains("/old/"));
    }

    #[test]
    fn mathjax_modes() {
        let plain = HtmlDocument::parse("<p>no formulas</p>");
        assert!(wants_mathjax(&plain, MathJaxMode::Always));
        assert!(!wants_mathjax(&plain, MathJaxMode::Detect));
        assert!(!wants_mathjax(&plain, MathJaxMode::Never));

        let tex = HtmlDocument::parse("<p>$$x$$</p>");
        assert!(wants_mathjax(&tex, MathJaxMode::Detect));
        assert!(!wants_mathjax(&tex, MathJaxMode::Never));

        let katex = HtmlDocument::parse(KATEX_INLINE);
        assert!(wants_mathjax(&katex, MathJaxMode::Detect));
    }

    #[test]
    fn loader_is_appended_to_head() {
        let doc = HtmlDocument::parse("<p>x</p>");
        inject_mathjax(&doc, DEFAULT_MATHJAX_URL);
        let html = doc.to_html().unwrap();
        assert!(html.contains("MathJax.js?config=TeX-MML-AM_CHTML"), "got {html}");
        assert!(html.contains(r#"async=""></script></head>"#), "got {html}");
    }
}
