use std::fmt::Display;

/// A byte range into the parsed input. All CST node texts are spans into the
/// root's full text, no substrings are copied during parsing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span {
            start: start.try_into().unwrap(),
            end: end.try_into().unwrap(),
        }
    }
    pub fn empty() -> Span {
        Span { start: 0, end: 0 }
    }
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }
    #[track_caller]
    pub fn as_str(self, src: &str) -> &str {
        &src[self.start as usize..self.end as usize]
    }
    /// Checks whether another span is fully covered by this one, empty spans
    /// are never covered.
    pub fn contains_span(self, span: Span) -> bool {
        (span.start < span.end) && (span.start >= self.start) && (span.end <= self.end)
    }
    pub fn start(self) -> usize {
        self.start as usize
    }
    pub fn end(self) -> usize {
        self.end as usize
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
