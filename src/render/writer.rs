use std::borrow::Cow;
use std::io::{self, Write};

use serde_json::{Number, Value};

use super::width::display_width;

/// One list-table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Plain text, with trailing underscores escaped on output.
    Text(String),
    /// Markup written verbatim, e.g. hyperlinks.
    Markup(String),
    Bool(bool),
    Number(Number),
    Empty,
}

impl Cell {
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            Cell::Text(text) => escape_trailing_underscores(text),
            Cell::Markup(markup) => Cow::Borrowed(markup),
            Cell::Bool(true) => Cow::Borrowed("True"),
            Cell::Bool(false) => Cow::Borrowed("False"),
            Cell::Number(n) => Cow::Owned(n.to_string()),
            Cell::Empty => Cow::Borrowed(""),
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(b),
            Value::Number(n) => Cell::Number(n),
            Value::String(s) => Cell::Text(s),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

/// A trailing underscore marks a hyperlink reference in reStructuredText;
/// prefix the run of trailing underscores with a backslash.
pub fn escape_trailing_underscores(text: &str) -> Cow<'_, str> {
    let stem = text.trim_end_matches('_');
    if stem.len() == text.len() {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\\{}", stem, &text[stem.len()..]))
    }
}

/// reStructuredText writer over an explicit output sink.
pub struct RstWriter<W: Write> {
    sink: W,
}

impl<W: Write> RstWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    fn println(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.sink, "{}", line)
    }

    fn underline(&mut self, text: &str, rule: char) -> io::Result<()> {
        let line: String = std::iter::repeat(rule).take(display_width(text)).collect();
        self.println(&line)
    }

    pub fn title(&mut self, title: &str, rule: char) -> io::Result<()> {
        self.println("")?;
        self.println(title)?;
        self.underline(title, rule)?;
        self.println("")
    }

    /// Section header for a table, preceded by a `schema.table` anchor.
    pub fn header(
        &mut self,
        schema: &str,
        table: &str,
        comment: &str,
        rule: char,
    ) -> io::Result<()> {
        let title = escape_trailing_underscores(table);

        self.println("")?;
        self.println(&format!(".. _{}.{}:", schema, table))?;
        self.println("")?;
        self.println(&title)?;
        // Sized to the escaped title; docutils rejects an underline shorter than its text.
        self.underline(&title, rule)?;
        self.println("")?;

        if !comment.is_empty() {
            self.println(comment)?;
            self.println("")?;
        }
        Ok(())
    }

    pub fn listtable(&mut self, header: &[Cell]) -> io::Result<()> {
        self.println(".. list-table::")?;
        if !header.is_empty() {
            self.println("   :header-rows: 1")?;
        }
        self.println("")?;

        if !header.is_empty() {
            self.listtable_column(header)?;
        }
        Ok(())
    }

    pub fn listtable_column(&mut self, columns: &[Cell]) -> io::Result<()> {
        for (i, column) in columns.iter().enumerate() {
            let prefix = if i == 0 { "   * - " } else { "     - " };
            self.println(&format!("{}{}", prefix, column.render()))?;
        }
        Ok(())
    }

    pub fn list_item(&mut self, item: &str) -> io::Result<()> {
        self.println(&format!("* {}", item))
    }

    pub fn toctree(&mut self, items: &[String], options: &[&str]) -> io::Result<()> {
        self.println(".. toctree::")?;
        for option in options {
            self.println(&format!("   {}", option))?;
        }
        self.println("")?;
        for item in items {
            self.println(&format!("   {}", item))?;
        }
        Ok(())
    }
}
