//! Intermediate content model shared by every converter, plus the readers and
//! writers for each on-disk format.

pub mod docx;
pub mod odf;
pub mod pdf;
pub mod pptx;
pub mod raster;
pub mod sheet;
pub mod text;
pub mod xlsx;
mod xml;

use image::DynamicImage;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextDocument {
    pub blocks: Vec<Block>,
}

impl TextDocument {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push_heading(&mut self, level: u8, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.blocks.push(Block::Heading { level: level.clamp(1, 6), text });
        }
    }

    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() {
            self.blocks.push(Block::Paragraph(text));
        }
    }

    pub fn push_table(&mut self, table: Table) {
        if !table.is_empty() {
            self.blocks.push(Block::Table(table));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn from_table(table: Table) -> Self {
        let mut doc = Self::new();
        doc.push_table(table);
        doc
    }

    /// Flattens the document into display lines. Table cells are joined with
    /// `separator`; a blank line follows every block.
    pub fn to_lines(&self, separator: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. } => lines.push(text.clone()),
                Block::Paragraph(text) => lines.extend(text.lines().map(str::to_string)),
                Block::Table(table) => {
                    lines.extend(table.rows.iter().map(|row| row.join(separator)));
                }
            }
            lines.push(String::new());
        }
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Pads every row to the same width and drops trailing empty rows.
    pub fn normalized(mut self) -> Self {
        while self.rows.last().is_some_and(|row| row.iter().all(String::is_empty)) {
            self.rows.pop();
        }
        let width = self.width();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        self
    }

    /// Header names taken from the first row. Blank or repeated names become
    /// `column_N` (1-based), suffixed `_2`, `_3`... while that is taken too.
    /// The result never repeats a name.
    pub fn header(&self) -> Vec<String> {
        let width = self.width();
        let first = self.rows.first().cloned().unwrap_or_default();
        let mut seen = std::collections::HashSet::new();
        (0..width)
            .map(|idx| {
                let name = first.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();
                if !name.is_empty() && seen.insert(name.clone()) {
                    return name;
                }
                let base = format!("column_{}", idx + 1);
                let mut candidate = base.clone();
                let mut n = 2;
                while !seen.insert(candidate.clone()) {
                    candidate = format!("{base}_{n}");
                    n += 1;
                }
                candidate
            })
            .collect()
    }

    /// The first table in `doc`, or one row per heading/paragraph under a
    /// single `text` column.
    pub fn from_document(doc: &TextDocument) -> Self {
        for block in &doc.blocks {
            if let Block::Table(table) = block {
                return table.clone();
            }
        }
        let mut rows = vec![vec!["text".to_string()]];
        for block in &doc.blocks {
            match block {
                Block::Heading { text, .. } | Block::Paragraph(text) => rows.push(vec![text.clone()]),
                Block::Table(_) => {}
            }
        }
        Self { rows }
    }
}

/// What the cross converter carries between categories.
pub enum Content {
    Text(TextDocument),
    Table(Table),
    Raster(DynamicImage),
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Table(_) => "table",
            Content::Raster(_) => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect())
    }

    #[test]
    fn header_fills_blank_and_duplicate_names() {
        let t = table(&[&["id", "", "id"], &["1", "2", "3", "4"]]);
        assert_eq!(t.header(), vec!["id", "column_2", "column_3", "column_4"]);
    }

    #[test]
    fn generated_names_do_not_collide_with_real_ones() {
        let t = table(&[&["column_2", ""], &["a", "b"]]);
        assert_eq!(t.header(), vec!["column_2", "column_2_2"]);

        let t = table(&[&["", "column_1", "column_1"]]);
        assert_eq!(t.header(), vec!["column_1", "column_1_2", "column_3"]);
    }

    #[test]
    fn normalized_pads_rows_and_trims_trailing_blanks() {
        let t = table(&[&["a", "b"], &["c"], &["", ""]]).normalized();
        assert_eq!(t.rows, vec![vec!["a", "b"], vec!["c", ""]]);
    }

    #[test]
    fn document_without_table_becomes_single_column() {
        let mut doc = TextDocument::new();
        doc.push_heading(1, "Title");
        doc.push_paragraph("Body");
        doc.push_paragraph("   ");
        let t = Table::from_document(&doc);
        assert_eq!(t.rows, vec![vec!["text"], vec!["Title"], vec!["Body"]]);
    }

    #[test]
    fn lines_separate_blocks() {
        let mut doc = TextDocument::new();
        doc.push_heading(2, "Head");
        doc.push_table(table(&[&["a", "b"]]));
        assert_eq!(doc.to_lines(" | "), vec!["Head", "", "a | b"]);
    }
}
