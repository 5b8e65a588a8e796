//! The editor surface the dialog writes into.

/// What the dialog needs from a host editor.
pub trait EditorAdapter {
    /// Insert `html` at the current cursor position.
    fn insert_fragment(&mut self, html: &str);

    /// The full current content as HTML.
    fn current_content(&self) -> String;

    /// The currently selected HTML, if anything is selected.
    fn current_selection(&self) -> Option<String>;
}

/// An HTML document held in memory with a byte-offset cursor.
///
/// The cursor always sits on a char boundary. Inserting moves it past the
/// inserted text, like typing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    html: String,
    cursor: usize,
    selection: Option<(usize, usize)>,
}

impl HtmlDocument {
    /// A document with the cursor at the end.
    pub fn new(html: impl Into<String>) -> Self {
        let html = html.into();
        let cursor = html.len();
        Self {
            html,
            cursor,
            selection: None,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the document and snapped back to a char
    /// boundary. Clears any selection.
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = self.snap(offset);
        self.selection = None;
    }

    /// Select `start..end`; the cursor moves to `start`.
    pub fn select(&mut self, start: usize, end: usize) {
        let (start, end) = (self.snap(start.min(end)), self.snap(start.max(end)));
        self.cursor = start;
        self.selection = (start < end).then_some((start, end));
    }

    fn snap(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.html.len());
        while !self.html.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

impl EditorAdapter for HtmlDocument {
    /// Replaces the selection, if any, like an editor paste.
    fn insert_fragment(&mut self, html: &str) {
        if let Some((start, end)) = self.selection.take() {
            self.html.replace_range(start..end, "");
            self.cursor = start;
        }
        self.html.insert_str(self.cursor, html);
        self.cursor += html.len();
    }

    fn current_content(&self) -> String {
        self.html.clone()
    }

    fn current_selection(&self) -> Option<String> {
        self.selection
            .map(|(start, end)| self.html[start..end].to_string())
    }
}
