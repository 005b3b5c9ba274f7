use crate::model::Loc;

/// Byte offset -> (line, UTF-16 column) lookup for one document.
pub struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    pub fn loc(&self, text: &str, offset: usize) -> Loc {
        let offset = offset.min(text.len());
        match self.line_starts.binary_search(&offset) {
            Ok(line) => Loc {
                line,
                col: 0,
                offset,
            },
            Err(next_line_idx) => {
                let line = next_line_idx - 1;
                let line_start = self.line_starts[line];
                let col = text
                    .get(line_start..offset)
                    .map(|s| s.encode_utf16().count())
                    .unwrap_or(0);
                Loc { line, col, offset }
            }
        }
    }
}
