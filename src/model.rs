use serde::{Deserialize, Serialize};

/// Unix milliseconds. The only time type.
pub type Ms = i64;

/// Caller-assigned interval identifier.
pub type IntervalId = u64;

/// Lower is freer. Exactly `0.0` marks a free interval.
pub type Priority = f64;

/// Priority of a free (unoccupied) interval.
pub const FREE_PRIORITY: Priority = 0.0;

/// Half-open interval `[start, end)`. An empty span (`start >= end`) is representable so that
/// query windows and candidates can be checked instead of asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A prioritized time interval with an opaque payload.
///
/// Equality looks at `id` and `span` only; callers compare `priority` and `payload` themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interval {
    pub id: IntervalId,
    pub span: Span,
    pub priority: Priority,
    pub payload: Vec<u8>,
    /// Generated by gap filling, never stored.
    #[serde(skip)]
    pub synthetic: bool,
}

impl Interval {
    pub fn new(id: IntervalId, span: Span, priority: Priority, payload: Vec<u8>) -> Self {
        Self {
            id,
            span,
            priority,
            payload,
            synthetic: false,
        }
    }

    /// Synthetic free interval covering an unoccupied gap.
    pub fn free(span: Span) -> Self {
        Self {
            id: 0,
            span,
            priority: FREE_PRIORITY,
            payload: Vec::new(),
            synthetic: true,
        }
    }

    pub fn is_free(&self) -> bool {
        self.priority == FREE_PRIORITY
    }

    pub fn duration_ms(&self) -> Ms {
        self.span.duration_ms()
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.span == other.span
    }
}

impl Eq for Interval {}

/// WAL record format. One record per committed transaction, so a torn write loses the whole
/// transaction instead of part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Committed { intervals: Vec<Interval> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(!s.is_empty());
        assert!(Span::new(200, 200).is_empty());
        assert!(Span::new(300, 200).is_empty());
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn span_single_ms_overlap() {
        assert!(Span::new(100, 201).overlaps(&Span::new(200, 300)));
    }

    #[test]
    fn equality_ignores_priority_and_payload() {
        let a = Interval::new(7, Span::new(0, 10), 1.0, b"a".to_vec());
        let b = Interval::new(7, Span::new(0, 10), 5.0, b"b".to_vec());
        let c = Interval::new(8, Span::new(0, 10), 1.0, b"a".to_vec());
        let d = Interval::new(7, Span::new(0, 11), 1.0, b"a".to_vec());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn free_interval_helpers() {
        let f = Interval::free(Span::new(0, 60));
        assert!(f.is_free());
        assert!(f.synthetic);
        assert_eq!(f.duration_ms(), 60);

        let busy = Interval::new(1, Span::new(0, 60), 0.5, Vec::new());
        assert!(!busy.is_free());
        assert!(!busy.synthetic);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::Committed {
            intervals: vec![
                Interval::new(1, Span::new(1000, 2000), 2.5, b"payload".to_vec()),
                Interval::new(2, Span::new(2000, 3000), 0.0, Vec::new()),
            ],
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);

        let Event::Committed { intervals } = decoded;
        assert_eq!(intervals[0].priority, 2.5);
        assert_eq!(intervals[0].payload, b"payload");
        assert!(!intervals[0].synthetic);
    }
}
