//! Parsed intermediate representation for platform metadata XML.
//!
//! Metadata files use a small XML dialect: UTF-8, one declaration, elements
//! with optional attributes, nested elements or text content, no DTDs or
//! processing instructions beyond the declaration. The parser materializes
//! the whole document into [`XmlElement`] values; accessors fail loudly on
//! shape mismatch instead of returning defaults.

/// One parsed element: tag name, attributes in document order, child
/// elements in document order, and accumulated text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    /// All direct children with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child with the given tag name.
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First direct child with the given tag name, or a shape error.
    pub fn child(&self, name: &str) -> Result<&XmlElement, String> {
        self.find_child(name)
            .ok_or_else(|| format!("expected <{}> inside <{}>", name, self.name))
    }

    /// Trimmed text content, or a shape error when absent/empty.
    pub fn text_content(&self) -> Result<&str, String> {
        match self.text.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(format!("expected text content inside <{}>", self.name)),
        }
    }

    /// Text of a required child, e.g. the `fullName` of a child member.
    pub fn child_text(&self, name: &str) -> Result<&str, String> {
        self.child(name)?.text_content()
    }

    /// Serialize this element (and subtree) as a standalone fragment.
    ///
    /// Deterministic: same tree, same bytes. Used to hash child fragments
    /// independently of their siblings.
    pub fn to_fragment(&self) -> String {
        let mut out = String::new();
        self.write_fragment(&mut out);
        out
    }

    fn write_fragment(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v));
            out.push('"');
        }
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text.trim()));
        }
        for child in &self.children {
            child.write_fragment(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Escape text for element content or attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
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

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let (replacement, consumed) = if rest.starts_with("&amp;") {
            ('&', 5)
        } else if rest.starts_with("&lt;") {
            ('<', 4)
        } else if rest.starts_with("&gt;") {
            ('>', 4)
        } else if rest.starts_with("&quot;") {
            ('"', 6)
        } else if rest.starts_with("&apos;") {
            ('\'', 6)
        } else {
            ('&', 1)
        };
        out.push(replacement);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Parse a metadata document, returning its root element.
pub fn parse_document(input: &str) -> Result<XmlElement, String> {
    let mut cursor = Cursor {
        bytes: input.as_bytes(),
        pos: 0,
    };
    cursor.skip_prolog();
    let root = cursor.parse_element()?;
    cursor.skip_misc();
    if cursor.pos < cursor.bytes.len() {
        return Err(format!(
            "trailing content after document root at byte {}",
            cursor.pos
        ));
    }
    Ok(root)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn skip_prolog(&mut self) {
        self.skip_misc();
        if self.starts_with("<?") {
            if let Some(end) = find_from(self.bytes, self.pos, b"?>") {
                self.pos = end + 2;
            }
        }
        self.skip_misc();
    }

    /// Skip whitespace and comments between markup.
    fn skip_misc(&mut self) {
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                match find_from(self.bytes, self.pos + 4, b"-->") {
                    Some(end) => self.pos = end + 3,
                    None => {
                        self.pos = self.bytes.len();
                        return;
                    }
                }
            } else {
                return;
            }
        }
    }

    fn parse_element(&mut self) -> Result<XmlElement, String> {
        if self.peek() != Some(b'<') {
            return Err(format!("expected '<' at byte {}", self.pos));
        }
        self.pos += 1;
        let name = self.parse_name()?;
        let mut element = XmlElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        };

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    if !self.starts_with("/>") {
                        return Err(format!("malformed tag close at byte {}", self.pos));
                    }
                    self.pos += 2;
                    return Ok(element);
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let (key, value) = self.parse_attribute()?;
                    element.attributes.push((key, value));
                }
                None => return Err("unexpected end of input inside tag".to_string()),
            }
        }

        // Content: interleaved text, comments, and child elements until the
        // matching close tag.
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(format!("unclosed element <{}>", element.name)),
                Some(b'<') => {
                    if self.starts_with("<!--") {
                        self.skip_misc();
                    } else if self.starts_with("</") {
                        self.pos += 2;
                        let close = self.parse_name()?;
                        if close != element.name {
                            return Err(format!(
                                "mismatched close tag </{}> for <{}>",
                                close, element.name
                            ));
                        }
                        self.skip_whitespace();
                        if self.peek() != Some(b'>') {
                            return Err(format!("malformed close tag at byte {}", self.pos));
                        }
                        self.pos += 1;
                        break;
                    } else {
                        element.children.push(self.parse_element()?);
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while self.peek().is_some_and(|b| b != b'<') {
                        self.pos += 1;
                    }
                    let raw = std::str::from_utf8(&self.bytes[start..self.pos])
                        .map_err(|_| "invalid UTF-8 in text content".to_string())?;
                    text.push_str(&unescape(raw));
                }
            }
        }

        if !text.trim().is_empty() {
            element.text = Some(text);
        }
        Ok(element)
    }

    fn parse_name(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(format!("expected name at byte {}", start));
        }
        Ok(std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| "invalid UTF-8 in name".to_string())?
            .to_string())
    }

    fn parse_attribute(&mut self) -> Result<(String, String), String> {
        let key = self.parse_name()?;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Err(format!("expected '=' after attribute {}", key));
        }
        self.pos += 1;
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(format!("expected quoted value for attribute {}", key)),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|b| b != quote) {
            self.pos += 1;
        }
        if self.peek() != Some(quote) {
            return Err(format!("unterminated value for attribute {}", key));
        }
        let raw = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| "invalid UTF-8 in attribute value".to_string())?;
        self.pos += 1;
        Ok((key, unescape(raw)))
    }
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}
