// encode.rs — Indented XML output for policy documents.
//
// Every policy-tree node writes itself through an `Indenter`, which
// tracks nesting depth and escapes text and attribute values. The
// indentation width is configurable; a width of zero produces one element
// per line with no leading whitespace.

/// Namespace of XACML 1.x policy documents.
pub const XACML1_POLICY_NS: &str = "urn:oasis:names:tc:xacml:1.0:policy";
/// Namespace of XACML 2.0 policy documents.
pub const XACML2_POLICY_NS: &str = "urn:oasis:names:tc:xacml:2.0:policy:schema:os";

/// Accumulates an XML document line by line.
#[derive(Debug, Clone)]
pub struct Indenter {
    out: String,
    width: usize,
    depth: usize,
}

impl Indenter {
    pub fn new(width: usize) -> Self {
        Self {
            out: String::new(),
            width,
            depth: 0,
        }
    }

    fn pad(&mut self) {
        for _ in 0..self.depth * self.width {
            self.out.push(' ');
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.pad();
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value));
            self.out.push('"');
        }
    }

    /// Write `<name attrs>` and indent what follows.
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.start_tag(name, attrs);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    /// Write `</name>` one level out.
    pub fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.pad();
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    /// Write `<name attrs/>`.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.start_tag(name, attrs);
        self.out.push_str("/>\n");
    }

    /// Write `<name attrs>text</name>` on one line.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.start_tag(name, attrs);
        self.out.push('>');
        self.out.push_str(&escape(text));
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Escape the five XML special characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_elements_are_indented() {
        let mut w = Indenter::new(2);
        w.open("Policy", &[("PolicyId", "p")]);
        w.empty("Target", &[]);
        w.text_element("Description", &[], "a < b");
        w.close("Policy");
        assert_eq!(
            w.finish(),
            "<Policy PolicyId=\"p\">\n  <Target/>\n  <Description>a &lt; b</Description>\n</Policy>\n"
        );
    }

    #[test]
    fn zero_width_has_no_padding() {
        let mut w = Indenter::new(0);
        w.open("A", &[]);
        w.empty("B", &[("x", "\"q\"")]);
        w.close("A");
        assert_eq!(w.finish(), "<A>\n<B x=\"&quot;q&quot;\"/>\n</A>\n");
    }
}
