//! Indented XML output shared by the MSBuild, MonoDevelop and NAnt emitters.
//!
//! Every element goes through [`quick_xml::Writer`], so attribute values and
//! text taken from the build description are escaped on the way out.

use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Attribute list as written, in order.
pub type Attrs<'a> = &'a [(&'a str, &'a str)];

pub struct XmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    /// Nested elements are indented by `size` copies of `indent`.
    pub fn new(inner: W, indent: u8, size: usize) -> Self {
        Self { writer: Writer::new_with_indent(inner, indent, size) }
    }

    /// `<?xml version="1.0" ...?>`
    pub fn declaration(&mut self, encoding: Option<&str>) -> io::Result<&mut Self> {
        self.writer.write_event(Event::Decl(BytesDecl::new("1.0", encoding, None)))?;
        Ok(self)
    }

    pub fn start(&mut self, name: &str, attrs: Attrs) -> io::Result<&mut Self> {
        self.writer.write_event(Event::Start(tag(name, attrs)))?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> io::Result<&mut Self> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Self-closing element.
    pub fn empty(&mut self, name: &str, attrs: Attrs) -> io::Result<&mut Self> {
        self.writer.write_event(Event::Empty(tag(name, attrs)))?;
        Ok(self)
    }

    /// `<name>text</name>` on one line, also when `text` is empty.
    pub fn text(&mut self, name: &str, text: &str) -> io::Result<&mut Self> {
        self.text_with(name, &[], text)
    }

    pub fn text_with(&mut self, name: &str, attrs: Attrs, text: &str) -> io::Result<&mut Self> {
        self.writer.write_event(Event::Start(tag(name, attrs)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Open `name`, let `body` write the children, close it again.
    pub fn element<F>(&mut self, name: &str, attrs: Attrs, body: F) -> io::Result<&mut Self>
    where
        F: FnOnce(&mut Self) -> io::Result<()>,
    {
        self.start(name, attrs)?;
        body(self)?;
        self.end(name)
    }

    /// Terminate the document with a newline.
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.get_mut().write_all(b"\n")
    }
}

fn tag<'a>(name: &'a str, attrs: Attrs<'a>) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter().copied())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
