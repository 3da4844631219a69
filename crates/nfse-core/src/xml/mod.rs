//! Namespace-aware XML reader with ElementTree-style path lookups.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use tracing::{debug, warn};

use crate::error::ReaderError;

/// One element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Resolved namespace URI, if the element is in one.
    pub namespace: Option<String>,
    /// Local name.
    pub name: String,
    /// Text content, `None` when the element holds no text.
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn matches(&self, test: &NameTest) -> bool {
        match test {
            NameTest::Any => true,
            NameTest::Name { namespace, local } => {
                self.name == *local && self.namespace.as_deref() == namespace.as_deref()
            }
        }
    }

    fn collect_descendants<'a>(&'a self, test: &NameTest, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.matches(test) {
                out.push(child);
            }
            child.collect_descendants(test, out);
        }
    }
}

/// Prefix to namespace URI bindings used when resolving paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    bindings: Vec<(String, String)>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.bindings.push((prefix.into(), uri.into()));
        self
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name {
        namespace: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

/// Parse `.//a:X/a:Y` style paths into steps. `None` on an unknown prefix.
fn parse_path(path: &str, namespaces: &Namespaces) -> Option<Vec<(Axis, NameTest)>> {
    let mut rest = path.strip_prefix('.').unwrap_or(path);
    let mut steps = Vec::new();
    let mut axis = Axis::Child;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("//") {
            axis = Axis::Descendant;
            rest = stripped;
            continue;
        }
        if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
            continue;
        }

        let end = rest.find('/').unwrap_or(rest.len());
        let token = &rest[..end];
        rest = &rest[end..];

        let test = if token == "*" {
            NameTest::Any
        } else if let Some((prefix, local)) = token.split_once(':') {
            let Some(uri) = namespaces.resolve(prefix) else {
                warn!(prefix, path, "unknown namespace prefix in path");
                return None;
            };
            NameTest::Name {
                namespace: Some(uri.to_string()),
                local: local.to_string(),
            }
        } else {
            NameTest::Name {
                namespace: None,
                local: token.to_string(),
            }
        };

        steps.push((axis, test));
        axis = Axis::Child;
    }

    Some(steps)
}

/// A parsed XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    /// Root element; `None` for an empty document.
    pub root: Option<XmlElement>,
}

impl XmlDocument {
    pub fn parse(content: &str) -> Result<Self, ReaderError> {
        let mut reader = NsReader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            let (resolved, event) = reader
                .read_resolved_event()
                .map_err(|e| ReaderError::InvalidFormat(e.to_string()))?;

            match event {
                Event::Start(start) => {
                    stack.push(XmlElement {
                        namespace: namespace_uri(&resolved),
                        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                        ..XmlElement::default()
                    });
                }
                Event::Empty(empty) => {
                    let element = XmlElement {
                        namespace: namespace_uri(&resolved),
                        name: String::from_utf8_lossy(empty.local_name().as_ref()).into_owned(),
                        ..XmlElement::default()
                    };
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        ReaderError::InvalidFormat("unbalanced closing tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| ReaderError::InvalidFormat(e.to_string()))?;
                    append_text(&mut stack, &text);
                }
                Event::CData(cdata) => {
                    append_text(&mut stack, &String::from_utf8_lossy(&cdata));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ReaderError::InvalidFormat(format!(
                "unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        Ok(Self { root })
    }

    /// First element matching `path`, in document order.
    pub fn find(&self, path: &str, namespaces: &Namespaces) -> Option<&XmlElement> {
        let root = self.root.as_ref()?;
        let steps = parse_path(path, namespaces)?;

        let mut context = vec![root];
        for (axis, test) in &steps {
            let mut next = Vec::new();
            for element in context {
                match axis {
                    Axis::Child => next.extend(element.children.iter().filter(|c| c.matches(test))),
                    Axis::Descendant => element.collect_descendants(test, &mut next),
                }
            }
            if next.is_empty() {
                return None;
            }
            context = next;
        }

        context.into_iter().next()
    }

    /// Text of the first element matching `path`.
    pub fn find_text(&self, path: &str, namespaces: &Namespaces) -> Option<String> {
        self.find(path, namespaces).and_then(|e| e.text.clone())
    }
}

fn namespace_uri(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn append_text(stack: &mut [XmlElement], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}

/// Parse the XML file at `path`.
pub fn parse_xml(path: &Path) -> Result<XmlDocument, ReaderError> {
    let content = std::fs::read_to_string(path).map_err(|e| ReaderError::from_io(path, e))?;
    let document = XmlDocument::parse(&content)
        .map_err(|e| match e {
            ReaderError::InvalidFormat(msg) => {
                ReaderError::InvalidFormat(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
    debug!(path = %path.display(), "parsed XML document");
    Ok(document)
}

/// An XML document parsed on first access and cached.
#[derive(Debug)]
pub struct XmlSource {
    path: Option<PathBuf>,
    document: OnceCell<Result<XmlDocument, ReaderError>>,
}

impl XmlSource {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            document: OnceCell::new(),
        }
    }

    pub fn from_document(document: XmlDocument) -> Self {
        Self {
            path: None,
            document: OnceCell::from(Ok(document)),
        }
    }

    pub fn document(&self) -> Result<&XmlDocument, ReaderError> {
        let result = self.document.get_or_init(|| match &self.path {
            Some(path) => parse_xml(path),
            None => Ok(XmlDocument::default()),
        });
        match result {
            Ok(document) => Ok(document),
            Err(err) => Err(err.clone()),
        }
    }

    pub fn find_text(&self, path: &str, namespaces: &Namespaces) -> Result<Option<String>, ReaderError> {
        Ok(self.document()?.find_text(path, namespaces))
    }
}
