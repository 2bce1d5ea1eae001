//! Owned XML element tree for feed documents.
//!
//! The tree keeps everything needed to write a feed back out: declaration,
//! doctype, comments, processing instructions, CDATA sections and escaped
//! attribute values. Input must be UTF-8.

use quick_xml::escape::partial_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{
    BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event,
};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::XmlError;

/// Position of an element as child indices from the root element. The root
/// itself is the empty path.
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Escaped text whose entities could not be resolved (`&nbsp;` and
    /// friends). Written back verbatim.
    RawText(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl Node {
    fn is_character_data(&self) -> bool {
        matches!(self, Node::Text(_) | Node::RawText(_) | Node::CData(_))
    }

    fn is_blank_text(&self) -> bool {
        match self {
            Node::Text(text) | Node::RawText(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_start(start: &BytesStart) -> Result<Self, XmlError> {
        let mut element = Element::new(utf8(start.name().as_ref())?);
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            element
                .attributes
                .push((utf8(attr.key.as_ref())?, utf8(&attr.value)?));
        }
        Ok(element)
    }

    /// Unescaped value of the attribute `name`.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, raw)| unescape_known(raw))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Node::Element(element) => Some((index, element)),
                _ => None,
            })
    }

    /// Character data immediately following the opening tag, up to the first
    /// child element. Comments inside that run are skipped. Entities that
    /// cannot be resolved are kept as written.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                Node::RawText(raw) => text.push_str(&unescape_known(raw)),
                Node::Element(_) => break,
                _ => {}
            }
        }
        text
    }

    /// Replaces the leading character data with a CDATA section holding
    /// `content`. Child elements are kept.
    pub fn set_cdata(&mut self, content: &str) {
        let end = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(_)))
            .unwrap_or(self.children.len());
        let tail = self.children.split_off(end);
        self.children.retain(|node| !node.is_character_data());

        // "]]>" cannot appear inside a CDATA section, so split across two.
        let mut sections = Vec::new();
        let mut rest = content;
        while let Some(pos) = rest.find("]]>") {
            sections.push(Node::CData(rest[..pos + 2].to_string()));
            rest = &rest[pos + 2..];
        }
        sections.push(Node::CData(rest.to_string()));

        self.children.splice(0..0, sections);
        self.children.extend(tail);
    }

    fn element_at(&self, path: &[usize]) -> Option<&Element> {
        match path.split_first() {
            None => Some(self),
            Some((index, rest)) => match self.children.get(*index)? {
                Node::Element(child) => child.element_at(rest),
                _ => None,
            },
        }
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        match path.split_first() {
            None => Some(self),
            Some((index, rest)) => match self.children.get_mut(*index)? {
                Node::Element(child) => child.element_at_mut(rest),
                _ => None,
            },
        }
    }

    fn collect_descendants(&self, base: &NodePath, out: &mut Vec<NodePath>) {
        for (index, child) in self.child_elements() {
            let mut path = base.clone();
            path.push(index);
            out.push(path.clone());
            child.collect_descendants(&path, out);
        }
    }

    fn is_block(&self) -> bool {
        self.children.iter().all(|node| match node {
            Node::Text(_) | Node::RawText(_) => node.is_blank_text(),
            Node::CData(_) => false,
            _ => true,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

impl Declaration {
    fn from_event(decl: &BytesDecl) -> Result<Self, XmlError> {
        let version = decl.version().map_err(quick_xml::Error::from)?;
        let encoding = decl
            .encoding()
            .transpose()
            .map_err(quick_xml::Error::from)?
            .map(|v| utf8(&v))
            .transpose()?;
        let standalone = decl
            .standalone()
            .transpose()
            .map_err(quick_xml::Error::from)?
            .map(|v| utf8(&v))
            .transpose()?;

        // The tree holds UTF-8 and is written back as UTF-8, so any other
        // declared encoding would mislabel the output.
        if let Some(encoding) = &encoding {
            if !matches!(
                encoding.to_ascii_lowercase().as_str(),
                "utf-8" | "utf8" | "us-ascii" | "ascii"
            ) {
                return Err(XmlError::Encoding(format!(
                    "unsupported document encoding {encoding}"
                )));
            }
        }

        Ok(Self {
            version: utf8(&version)?,
            encoding,
            standalone,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    declaration: Option<Declaration>,
    prolog: Vec<Node>,
    pub root: Element,
    epilog: Vec<Node>,
}

impl Document {
    pub fn parse(xml: &[u8]) -> Result<Self, XmlError> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<Element> = None;
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let node = match reader.read_event_into(&mut buf)? {
                Event::Decl(e) => {
                    declaration = Some(Declaration::from_event(&e)?);
                    None
                }
                Event::Start(e) => {
                    stack.push(Element::from_start(&e)?);
                    None
                }
                Event::Empty(e) => Some(Node::Element(Element::from_start(&e)?)),
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| XmlError::Structure("unexpected closing tag".into()))?;
                    Some(Node::Element(element))
                }
                Event::Text(e) => {
                    let raw = utf8(&e)?;
                    Some(match quick_xml::escape::unescape(&raw) {
                        Ok(text) => Node::Text(text.into_owned()),
                        Err(_) => Node::RawText(raw),
                    })
                }
                Event::CData(e) => Some(Node::CData(utf8(&e)?)),
                Event::Comment(e) => Some(Node::Comment(utf8(&e)?)),
                Event::PI(e) => Some(Node::ProcessingInstruction(utf8(&e)?)),
                Event::DocType(e) => Some(Node::DocType(utf8(&e)?)),
                Event::Eof => break,
            };
            buf.clear();

            let Some(node) = node else { continue };
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }
            match node {
                Node::Element(element) => {
                    if root.is_some() {
                        return Err(XmlError::Structure("multiple root elements".into()));
                    }
                    root = Some(element);
                }
                Node::Text(text) | Node::RawText(text) => {
                    if !text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}').is_empty() {
                        return Err(XmlError::Structure("text outside the root element".into()));
                    }
                }
                other if root.is_none() => prolog.push(other),
                other => epilog.push(other),
            }
        }

        if let Some(open) = stack.last() {
            return Err(XmlError::Structure(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| XmlError::Structure("document has no root element".into()))?;

        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    /// Elements matching `path`, in document order.
    pub fn select(&self, path: &str) -> Result<Vec<NodePath>, XmlError> {
        let path = ElementPath::parse(path)?;
        Ok(path.evaluate(&self.root, Context::Document))
    }

    /// First element matching `path` relative to the element at `from`.
    pub fn select_first_in(&self, from: &[usize], path: &str) -> Result<Option<NodePath>, XmlError> {
        let path = ElementPath::parse(path)?;
        if self.root.element_at(from).is_none() {
            return Ok(None);
        }
        Ok(path
            .evaluate(&self.root, Context::Element(from.to_vec()))
            .into_iter()
            .next())
    }

    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        self.root.element_at(path)
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        self.root.element_at_mut(path)
    }

    /// Serializes the document, indenting element-only content by `indent`
    /// spaces per level.
    pub fn to_string_indented(&self, indent: usize) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        let mut first = true;

        if let Some(decl) = &self.declaration {
            emit(
                &mut writer,
                Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )),
            )?;
            first = false;
        }

        for node in &self.prolog {
            if !first {
                writer.get_mut().push(b'\n');
            }
            first = false;
            write_node(&mut writer, node, 0, Some(indent))?;
        }
        if !first {
            writer.get_mut().push(b'\n');
        }
        write_element(&mut writer, &self.root, 0, Some(indent))?;
        for node in &self.epilog {
            writer.get_mut().push(b'\n');
            write_node(&mut writer, node, 0, Some(indent))?;
        }
        writer.get_mut().push(b'\n');

        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Structure(e.to_string()))
    }
}

fn utf8(bytes: &[u8]) -> Result<String, XmlError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| XmlError::Encoding(e.to_string()))
}

/// Resolves the predefined and numeric entities in `raw` and leaves any
/// other `&name;` reference as written.
fn unescape_known(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else { break };
        let reference = &rest[..=semi];
        match quick_xml::escape::unescape(reference) {
            Ok(resolved) => out.push_str(&resolved),
            Err(_) => out.push_str(reference),
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    out
}

/// Checks that `path` is a selector [`Document::select`] understands.
pub fn validate_path(path: &str) -> Result<(), XmlError> {
    ElementPath::parse(path).map(|_| ())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer.write_event(event)?;
    Ok(())
}

fn line_break(writer: &mut Writer<Vec<u8>>, depth: usize, indent: usize) {
    let out = writer.get_mut();
    out.push(b'\n');
    out.extend(std::iter::repeat(b' ').take(depth * indent));
}

/// `indent` of `None` writes the node exactly as stored, with no formatting.
fn write_node(
    writer: &mut Writer<Vec<u8>>,
    node: &Node,
    depth: usize,
    indent: Option<usize>,
) -> Result<(), XmlError> {
    match node {
        Node::Element(element) => write_element(writer, element, depth, indent),
        Node::Text(text) => emit(writer, Event::Text(BytesText::from_escaped(partial_escape(text)))),
        Node::RawText(raw) => emit(writer, Event::Text(BytesText::from_escaped(raw.as_str()))),
        Node::CData(data) => emit(writer, Event::CData(BytesCData::new(data.as_str()))),
        Node::Comment(comment) => {
            emit(writer, Event::Comment(BytesText::from_escaped(comment.as_str())))
        }
        Node::ProcessingInstruction(pi) => emit(writer, Event::PI(BytesPI::new(pi.as_str()))),
        Node::DocType(doctype) => {
            emit(writer, Event::DocType(BytesText::from_escaped(doctype.as_str())))
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    depth: usize,
    indent: Option<usize>,
) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        // Values may come from single-quoted source attributes.
        let value = value.replace('"', "&quot;");
        start.push_attribute(Attribute::from((key.as_bytes(), value.as_bytes())));
    }

    let block_indent = indent.filter(|_| element.is_block());
    let is_empty = match block_indent {
        Some(_) => element.children.iter().all(Node::is_blank_text),
        None => element.children.is_empty(),
    };
    if is_empty {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    match block_indent {
        Some(width) => {
            for child in element.children.iter().filter(|node| !node.is_blank_text()) {
                line_break(writer, depth + 1, width);
                write_node(writer, child, depth + 1, indent)?;
            }
            line_break(writer, depth, width);
        }
        None => {
            for child in &element.children {
                write_node(writer, child, depth + 1, None)?;
            }
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

#[derive(Debug, Clone, PartialEq)]
enum Context {
    Document,
    Element(NodePath),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum NameTest {
    Current,
    Any,
    Name { prefix: Option<String>, local: String },
}

impl NameTest {
    fn parse(raw: &str) -> Self {
        match raw {
            "." => NameTest::Current,
            "*" => NameTest::Any,
            _ => match raw.split_once(':') {
                Some((prefix, local)) => NameTest::Name {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                },
                None => NameTest::Name {
                    prefix: None,
                    local: raw.to_string(),
                },
            },
        }
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            NameTest::Current | NameTest::Any => true,
            NameTest::Name { prefix, local } => {
                let (element_prefix, element_local) = match element.name.split_once(':') {
                    Some((p, l)) => (Some(p), l),
                    None => (None, element.name.as_str()),
                };
                element_local == local
                    && prefix.as_deref().map_or(true, |p| element_prefix == Some(p))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
    HasChild(NameTest),
}

impl Predicate {
    fn parse(raw: &str, path: &str) -> Result<Self, XmlError> {
        let raw = raw.trim();
        if let Some(attr) = raw.strip_prefix('@') {
            return match attr.split_once('=') {
                None => Ok(Predicate::HasAttribute(attr.trim().to_string())),
                Some((name, value)) => {
                    let value = value.trim();
                    let unquoted = value
                        .strip_prefix('\'')
                        .and_then(|v| v.strip_suffix('\''))
                        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                        .ok_or_else(|| XmlError::Path(path.to_string()))?;
                    Ok(Predicate::AttributeEquals(
                        name.trim().to_string(),
                        unquoted.to_string(),
                    ))
                }
            };
        }
        if raw.is_empty() || raw.chars().all(|c| c.is_ascii_digit()) || raw.contains(['(', '=']) {
            return Err(XmlError::Path(path.to_string()));
        }
        Ok(Predicate::HasChild(NameTest::parse(raw)))
    }

    fn matches(&self, element: &Element) -> bool {
        match self {
            Predicate::HasAttribute(name) => element.attribute(name).is_some(),
            Predicate::AttributeEquals(name, value) => {
                element.attribute(name).as_deref() == Some(value.as_str())
            }
            Predicate::HasChild(test) => element.child_elements().any(|(_, c)| test.matches(c)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicate: Option<Predicate>,
}

/// Compiled form of the etree-style selectors used in feed configs:
/// `//item`, `/rss/channel/item`, `channel/item`, `.`, `*`, `media:title`,
/// `item[@type='x']`, `item[title]`.
#[derive(Debug, Clone, PartialEq)]
struct ElementPath {
    absolute: bool,
    steps: Vec<Step>,
}

impl ElementPath {
    fn parse(path: &str) -> Result<Self, XmlError> {
        let invalid = || XmlError::Path(path.to_string());
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let (absolute, body, mut axis) = if let Some(rest) = trimmed.strip_prefix("//") {
            (true, rest, Axis::Descendant)
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            (true, rest, Axis::Child)
        } else {
            (false, trimmed, Axis::Child)
        };

        let mut steps = Vec::new();
        for segment in split_segments(body).ok_or_else(invalid)? {
            if segment.is_empty() {
                if axis == Axis::Descendant {
                    return Err(invalid());
                }
                axis = Axis::Descendant;
                continue;
            }

            let (name, predicate) = match segment.find('[') {
                Some(open) => {
                    let inner = segment[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
                    (&segment[..open], Some(Predicate::parse(inner, path)?))
                }
                None => (segment, None),
            };
            if name.is_empty() || name == ".." || name.contains(['(', '@', ']']) {
                return Err(invalid());
            }

            steps.push(Step {
                axis,
                test: NameTest::parse(name),
                predicate,
            });
            axis = Axis::Child;
        }

        if steps.is_empty() || axis == Axis::Descendant {
            return Err(invalid());
        }
        Ok(Self { absolute, steps })
    }

    fn evaluate(&self, root: &Element, start: Context) -> Vec<NodePath> {
        let mut contexts = vec![if self.absolute { Context::Document } else { start }];

        for step in &self.steps {
            let mut next: Vec<Context> = Vec::new();
            for context in &contexts {
                let candidates = match (&step.test, step.axis) {
                    (NameTest::Current, Axis::Child) => vec![context.clone()],
                    (NameTest::Current, Axis::Descendant) => {
                        let mut all = vec![context.clone()];
                        all.extend(descendants(root, context).into_iter().map(Context::Element));
                        all
                    }
                    (_, Axis::Child) => children(root, context)
                        .into_iter()
                        .map(Context::Element)
                        .collect(),
                    (_, Axis::Descendant) => descendants(root, context)
                        .into_iter()
                        .map(Context::Element)
                        .collect(),
                };

                for candidate in candidates {
                    let keep = match &candidate {
                        Context::Document => step.predicate.is_none(),
                        Context::Element(path) => root.element_at(path).is_some_and(|element| {
                            step.test.matches(element)
                                && step.predicate.as_ref().map_or(true, |p| p.matches(element))
                        }),
                    };
                    if keep && !next.contains(&candidate) {
                        next.push(candidate);
                    }
                }
            }
            contexts = next;
        }

        let mut matches: Vec<NodePath> = contexts
            .into_iter()
            .filter_map(|context| match context {
                Context::Element(path) => Some(path),
                Context::Document => None,
            })
            .collect();
        matches.sort();
        matches.dedup();
        matches
    }
}

fn children(root: &Element, context: &Context) -> Vec<NodePath> {
    match context {
        Context::Document => vec![Vec::new()],
        Context::Element(path) => root
            .element_at(path)
            .map(|element| {
                element
                    .child_elements()
                    .map(|(index, _)| {
                        let mut child = path.clone();
                        child.push(index);
                        child
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn descendants(root: &Element, context: &Context) -> Vec<NodePath> {
    let mut out = Vec::new();
    match context {
        Context::Document => {
            out.push(Vec::new());
            root.collect_descendants(&Vec::new(), &mut out);
        }
        Context::Element(path) => {
            if let Some(element) = root.element_at(path) {
                element.collect_descendants(path, &mut out);
            }
        }
    }
    out
}

/// Splits on `/` outside of predicates and quotes. `None` on unbalanced input.
fn split_segments(body: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, '/') if depth == 0 => {
                segments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    segments.push(&body[start..]);
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated -->
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Example</title>
    <item>
      <title>Hello</title>
      <link>http://x/1</link>
    </item>
    <item type="video">
      <title><![CDATA[World]]></title>
      <media:title>Media</media:title>
    </item>
  </channel>
</rss>
"#;

    fn titles(doc: &Document, item_path: &str) -> Vec<String> {
        doc.select(item_path)
            .unwrap()
            .iter()
            .map(|item| {
                let title = doc.select_first_in(item, "title").unwrap().unwrap();
                doc.element(&title).unwrap().text()
            })
            .collect()
    }

    #[test]
    fn selects_items_with_descendant_path() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        assert_eq!(titles(&doc, "//item"), vec!["Hello", "World"]);
    }

    #[test]
    fn selects_items_with_absolute_and_relative_paths() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        assert_eq!(titles(&doc, "/rss/channel/item"), vec!["Hello", "World"]);
        assert_eq!(titles(&doc, "rss/channel/item"), vec!["Hello", "World"]);
        assert_eq!(titles(&doc, "./rss/*/item"), vec!["Hello", "World"]);
        assert!(doc.select("channel/item").unwrap().is_empty());
    }

    #[test]
    fn predicates_filter_items() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        assert_eq!(titles(&doc, "//item[@type='video']"), vec!["World"]);
        assert_eq!(titles(&doc, "//item[@type]"), vec!["World"]);
        assert_eq!(titles(&doc, "//item[link]"), vec!["Hello"]);
    }

    #[test]
    fn unprefixed_names_match_any_namespace() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        let media = doc.select("//media:title").unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(doc.element(&media[0]).unwrap().text(), "Media");
        // channel title, two item titles and media:title
        assert_eq!(doc.select("//title").unwrap().len(), 4);
    }

    #[test]
    fn rejects_unsupported_paths() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        for path in ["", "//", "item/", "item[1]", "../item", "item[@a='x]", "count(item)"] {
            assert!(
                matches!(doc.select(path), Err(XmlError::Path(_))),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn set_cdata_replaces_leading_text_only() {
        let mut element = Element::new("title");
        element.children.push(Node::Text("Hello".into()));
        element.children.push(Node::Element(Element::new("span")));
        element.children.push(Node::Text("tail".into()));

        element.set_cdata("你好<br/>Hello");

        assert_eq!(element.text(), "你好<br/>Hello");
        assert_eq!(element.children.len(), 3);
        assert_eq!(element.children[0], Node::CData("你好<br/>Hello".into()));
        assert_eq!(element.children[2], Node::Text("tail".into()));
    }

    #[test]
    fn set_cdata_splits_section_terminator() {
        let mut element = Element::new("title");
        element.set_cdata("a]]>b");
        assert_eq!(element.text(), "a]]>b");

        let mut doc = Document::parse(b"<r/>").unwrap();
        doc.root.children.push(Node::Element(element));
        let out = doc.to_string_indented(2).unwrap();
        assert!(out.contains("<![CDATA[a]]]]><![CDATA[>b]]>"), "{out}");
    }

    #[test]
    fn writes_indented_document() {
        let mut doc = Document::parse(FEED.as_bytes()).unwrap();
        let first = doc.select("//item").unwrap().remove(0);
        let title = doc.select_first_in(&first, "title").unwrap().unwrap();
        doc.element_mut(&title).unwrap().set_cdata("你好<br/>Hello");

        let out = doc.to_string_indented(2).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- generated -->\n<rss"));
        assert!(out.contains("\n    <item>\n      <title><![CDATA[你好<br/>Hello]]></title>\n"));
        assert!(out.contains("<media:title>Media</media:title>"));
        assert!(out.contains("xmlns:media=\"http://search.yahoo.com/mrss/\""));
        assert!(out.ends_with("</rss>\n"));
    }

    #[test]
    fn serialization_is_stable() {
        let doc = Document::parse(FEED.as_bytes()).unwrap();
        let once = doc.to_string_indented(2).unwrap();
        let twice = Document::parse(once.as_bytes())
            .unwrap()
            .to_string_indented(2)
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_escaping_and_unknown_entities() {
        let doc = Document::parse(
            b"<rss><item a=\"x &amp; y\"><title>Tom &amp; Jerry&nbsp;</title></item></rss>",
        )
        .unwrap();
        let item = doc.select("//item").unwrap().remove(0);
        assert_eq!(doc.element(&item).unwrap().attribute("a").as_deref(), Some("x & y"));

        let out = doc.to_string_indented(2).unwrap();
        assert!(out.contains("<item a=\"x &amp; y\">"), "{out}");
        assert!(out.contains("<title>Tom &amp; Jerry&nbsp;</title>"), "{out}");
    }

    #[test]
    fn title_text_resolves_known_entities() {
        let doc =
            Document::parse(b"<rss><item><title>Tom &amp; Jerry&nbsp;Show &#x41;</title></item></rss>")
                .unwrap();
        let title = doc.select("//title").unwrap().remove(0);
        assert_eq!(doc.element(&title).unwrap().text(), "Tom & Jerry&nbsp;Show A");
    }

    #[test]
    fn single_quoted_attributes_survive_round_trip() {
        let doc = Document::parse(
            br#"<rss><enclosure url='http://x/a"b.mp3' title='say "hi" &amp; go' type="audio/mpeg"/></rss>"#,
        )
        .unwrap();
        let out = doc.to_string_indented(2).unwrap();
        assert!(out.contains(r#"url="http://x/a&quot;b.mp3""#), "{out}");

        let reparsed = Document::parse(out.as_bytes()).unwrap();
        let enclosure = reparsed.select("//enclosure").unwrap().remove(0);
        let enclosure = reparsed.element(&enclosure).unwrap();
        assert_eq!(enclosure.attribute("url").as_deref(), Some(r#"http://x/a"b.mp3"#));
        assert_eq!(enclosure.attribute("title").as_deref(), Some(r#"say "hi" & go"#));
        assert_eq!(enclosure.attribute("type").as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn rejects_documents_that_are_not_utf8() {
        // "Привет" in windows-1251
        let title: &[u8] = &[0xcf, 0xf0, 0xe8, 0xe2, 0xe5, 0xf2];

        let mut declared = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><rss><item><title>".to_vec();
        declared.extend_from_slice(title);
        declared.extend_from_slice(b"</title></item></rss>");
        assert!(matches!(Document::parse(&declared), Err(XmlError::Encoding(_))));

        let mut undeclared = b"<rss><item><title>".to_vec();
        undeclared.extend_from_slice(title);
        undeclared.extend_from_slice(b"</title></item></rss>");
        assert!(matches!(Document::parse(&undeclared), Err(XmlError::Encoding(_))));

        let ascii = b"<?xml version=\"1.0\" encoding=\"US-ASCII\"?><rss/>";
        assert!(Document::parse(ascii).is_ok());
    }

    #[test]
    fn empty_elements_are_self_closing() {
        let doc = Document::parse(b"<rss><channel>\n  </channel><x></x></rss>").unwrap();
        let out = doc.to_string_indented(2).unwrap();
        assert_eq!(out, "<rss>\n  <channel/>\n  <x/>\n</rss>\n");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(Document::parse(b"").is_err());
        assert!(Document::parse(b"<rss><item></rss>").is_err());
        assert!(Document::parse(b"<rss>").is_err());
        assert!(Document::parse(b"<a/><b/>").is_err());
        assert!(Document::parse(b"not xml").is_err());
    }
}
