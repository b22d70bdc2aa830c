//! Tolerant HTML reader.
//!
//! The statehouse pages are old, hand-written markup: unclosed `<p>`, `<td>` and
//! `<option>` tags, entity-laden text and the occasional stray end tag. This
//! module builds a plain element tree from that markup and exposes the few
//! queries the parsers need. It is not a conforming HTML5 parser.

use crate::error::Result;
use url::Url;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Opening one of these closes an open `<p>`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "blockquote", "div", "dl", "fieldset", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "hr", "ol", "p", "pre", "table", "ul",
];

#[derive(Debug)]
enum NodeKind {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// A parsed page
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let mut doc = Document {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    name: "#document".to_string(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
        };
        let mut stack: Vec<usize> = vec![0];
        let mut pos = 0usize;

        while pos < html.len() {
            let lt = match html[pos..].find('<') {
                Some(i) => pos + i,
                None => {
                    doc.push_text(&stack, &html[pos..]);
                    break;
                }
            };
            if lt > pos {
                doc.push_text(&stack, &html[pos..lt]);
            }
            let rest = &html[lt..];

            if rest.starts_with("<!--") {
                pos = rest.find("-->").map(|i| lt + i + 3).unwrap_or(html.len());
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                pos = rest.find('>').map(|i| lt + i + 1).unwrap_or(html.len());
                continue;
            }
            if let Some(after) = rest.strip_prefix("</") {
                let name = read_tag_name(after);
                if name.is_empty() {
                    doc.push_text(&stack, "<");
                    pos = lt + 1;
                    continue;
                }
                pos = rest.find('>').map(|i| lt + i + 1).unwrap_or(html.len());
                doc.close_element(&mut stack, &name);
                continue;
            }

            let Some((tag, consumed)) = parse_start_tag(rest) else {
                doc.push_text(&stack, "<");
                pos = lt + 1;
                continue;
            };
            pos = lt + consumed;

            doc.close_implied(&mut stack, &tag.name);
            let is_void = tag.self_closing || VOID_ELEMENTS.contains(&tag.name.as_str());
            let is_raw = RAW_TEXT_ELEMENTS.contains(&tag.name.as_str());
            let closing = format!("</{}", tag.name);
            let id = doc.push_element(&stack, tag.name, tag.attrs);

            if is_raw {
                // Script and style bodies are skipped wholesale
                let lowered = html[pos..].to_ascii_lowercase();
                pos = match lowered.find(&closing) {
                    Some(i) => {
                        let start = pos + i;
                        html[start..]
                            .find('>')
                            .map(|j| start + j + 1)
                            .unwrap_or(html.len())
                    }
                    None => html.len(),
                };
            } else if !is_void {
                stack.push(id);
            }
        }

        doc
    }

    pub fn root(&self) -> ElementRef<'_> {
        ElementRef { doc: self, id: 0 }
    }

    /// All elements with the given tag name, in document order
    pub fn find_all(&self, name: &str) -> Vec<ElementRef<'_>> {
        self.root().find_all(name)
    }

    fn element_name(&self, id: usize) -> &str {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => name,
            NodeKind::Text(_) => "",
        }
    }

    fn push_element(&mut self, stack: &[usize], name: String, attrs: Vec<(String, String)>) -> usize {
        let parent = *stack.last().unwrap_or(&0);
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Element { name, attrs },
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn push_text(&mut self, stack: &[usize], raw: &str) {
        if raw.is_empty() {
            return;
        }
        let text = decode_entities(raw);
        let parent = *stack.last().unwrap_or(&0);

        // Adjacent text (split by a skipped comment) is merged
        if let Some(&last) = self.nodes[parent].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last].kind {
                existing.push_str(&text);
                return;
            }
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Text(text),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
    }

    /// Pop the stack back past the innermost open element called `name`.
    /// An end tag with no matching open element is ignored.
    fn close_element(&self, stack: &mut Vec<usize>, name: &str) {
        if let Some(i) = (1..stack.len())
            .rev()
            .find(|&i| self.element_name(stack[i]) == name)
        {
            stack.truncate(i);
        }
    }

    /// Close elements whose end tag is optional when a new `name` opens
    fn close_implied(&self, stack: &mut Vec<usize>, name: &str) {
        match name {
            "td" | "th" => self.close_within(stack, &["td", "th"], &["tr", "table"]),
            "tr" => self.close_within(stack, &["tr"], &["table", "tbody", "thead", "tfoot"]),
            "dd" | "dt" => self.close_within(stack, &["dd", "dt"], &["dl"]),
            "li" => self.close_within(stack, &["li"], &["ul", "ol"]),
            "option" => self.close_within(stack, &["option"], &["select", "datalist"]),
            _ => {}
        }
        if CLOSES_PARAGRAPH.contains(&name) {
            self.close_within(
                stack,
                &["p"],
                &["td", "th", "table", "li", "dd", "dt", "button"],
            );
        }
    }

    fn close_within(&self, stack: &mut Vec<usize>, targets: &[&str], boundaries: &[&str]) {
        for i in (1..stack.len()).rev() {
            let open = self.element_name(stack[i]);
            if targets.contains(&open) {
                stack.truncate(i);
                return;
            }
            if boundaries.contains(&open) {
                return;
            }
        }
    }
}

/// Borrowed handle to one element of a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: usize,
}

impl<'a> ElementRef<'a> {
    pub fn name(&self) -> &'a str {
        self.doc.element_name(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match &self.doc.nodes[self.id].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.doc.nodes[self.id]
            .parent
            .map(|id| ElementRef { doc: self.doc, id })
    }

    /// Direct child elements
    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        doc.nodes[self.id]
            .children
            .iter()
            .filter(move |&&id| matches!(doc.nodes[id].kind, NodeKind::Element { .. }))
            .map(move |&id| ElementRef { doc, id })
    }

    /// Direct child elements with the given tag name
    pub fn children_named(&self, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.children().filter(move |child| child.name() == name)
    }

    /// Descendant elements with the given tag name, in document order
    pub fn find_all(&self, name: &str) -> Vec<ElementRef<'a>> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants(&self, name: &str, found: &mut Vec<ElementRef<'a>>) {
        for child in self.children() {
            if child.name() == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Rows belonging to this table, including rows under tbody/thead but not
    /// rows of nested tables
    pub fn rows(&self) -> Vec<ElementRef<'a>> {
        self.find_all("tr")
            .into_iter()
            .filter(|row| row.nearest_ancestor("table").map(|t| t.id) == Some(self.id))
            .collect()
    }

    fn nearest_ancestor(&self, name: &str) -> Option<ElementRef<'a>> {
        let mut current = self.parent();
        while let Some(element) = current {
            if element.name() == name {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }

    /// Text nodes that are direct children of this element
    pub fn own_texts(&self) -> Vec<&'a str> {
        let doc = self.doc;
        doc.nodes[self.id]
            .children
            .iter()
            .filter_map(|&id| match &doc.nodes[id].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }

    /// All descendant text, concatenated
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for &id in &self.doc.nodes[self.id].children {
            match &self.doc.nodes[id].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element { .. } => ElementRef { doc: self.doc, id }.collect_text(out),
            }
        }
    }
}

fn read_tag_name(s: &str) -> String {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(s.len());
    s[..end].to_ascii_lowercase()
}

/// Parse `<name attr=value ...>` at the start of `s`, returning the tag and the
/// number of bytes consumed
fn parse_start_tag(s: &str) -> Option<(StartTag, usize)> {
    let body = s.strip_prefix('<')?;
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name = read_tag_name(body);
    let bytes = s.as_bytes();
    let mut i = 1 + name.len();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let key_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let key = s[key_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = i + 1;
                    let value_end = s[value_start..]
                        .find(quote as char)
                        .map(|j| value_start + j)
                        .unwrap_or(s.len());
                    value = decode_entities(&s[value_start..value_end]);
                    i = (value_end + 1).min(s.len());
                }
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&s[value_start..i]);
                }
            }
        }
        if !key.is_empty() {
            attrs.push((key, value));
        }
    }

    Some((
        StartTag {
            name,
            attrs,
            self_closing,
        },
        i,
    ))
}

/// Decode character references. Unknown entities are left as written.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    let c = match entity {
        "nbsp" => '\u{a0}',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "sect" => '\u{a7}',
        "hellip" => '\u{2026}',
        _ => return None,
    };
    Some(c)
}

/// Resolve a link found on `base` to an absolute URL
pub fn absolute_url(base: &str, href: &str) -> Result<String> {
    Ok(Url::parse(base)?.join(href.trim())?.to_string())
}
