/// 1-based line/column, matching what editors display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    // Seed for a union; any real range absorbed replaces both endpoints.
    pub fn empty() -> Self {
        Self {
            start: Position::new(usize::MAX, usize::MAX),
            end: Position::new(0, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn add(&mut self, other: SourceRange) {
        if other.is_empty() {
            return;
        }
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }

    pub fn union(mut self, other: SourceRange) -> SourceRange {
        self.add(other);
        self
    }

    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && position < self.end
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_takes_min_start_and_max_end() {
        let a = SourceRange::new(Position::new(1, 5), Position::new(1, 9));
        let b = SourceRange::new(Position::new(1, 2), Position::new(1, 7));
        let union = a.union(b);
        assert_eq!(union.start, Position::new(1, 2));
        assert_eq!(union.end, Position::new(1, 9));
    }

    #[test]
    fn empty_range_is_identity_for_union() {
        let a = SourceRange::new(Position::new(2, 1), Position::new(2, 4));
        assert_eq!(SourceRange::empty().union(a), a);
        assert_eq!(a.union(SourceRange::empty()), a);
    }

    #[test]
    fn contains_is_half_open() {
        let range = SourceRange::new(Position::new(1, 3), Position::new(1, 6));
        assert!(range.contains(Position::new(1, 3)));
        assert!(range.contains(Position::new(1, 5)));
        assert!(!range.contains(Position::new(1, 6)));
    }
}
