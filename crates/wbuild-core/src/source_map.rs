use std::fmt;

/// One-based line and column of a byte offset. Columns count characters,
/// so a tag after `Übersicht ` is still reported where an editor shows it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line starts of a markup document, for turning error spans into
/// `LINE:COL` locations.
#[derive(Clone, Debug)]
pub struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// Offsets past the end, or inside a multi-byte character, snap back
    /// to the nearest character boundary.
    pub fn locate(&self, offset: usize) -> Location {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let column = self.source[self.line_starts[line]..offset].chars().count();
        Location {
            line: line + 1,
            column: column + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, SourceMap};

    #[test]
    fn locations_follow_newlines() {
        let source = "[section]\n[text]\nbody";
        let map = SourceMap::new(source);

        assert_eq!(map.locate(0), Location { line: 1, column: 1 });
        assert_eq!(map.locate(10), Location { line: 2, column: 1 });
        assert_eq!(map.locate(19), Location { line: 3, column: 3 });
        assert_eq!(map.locate(9).to_string(), "1:10");
    }

    #[test]
    fn columns_count_characters() {
        let source = "[text]Übersicht [bg=x]";
        let map = SourceMap::new(source);
        let offset = source.find("[bg").unwrap();
        assert_eq!(map.locate(offset), Location { line: 1, column: 17 });
        // Inside the two-byte `Ü`.
        assert_eq!(map.locate(7), Location { line: 1, column: 7 });
    }

    #[test]
    fn offsets_past_the_end_are_clamped() {
        let map = SourceMap::new("ab\n");
        assert_eq!(map.locate(99), Location { line: 2, column: 1 });
    }
}
