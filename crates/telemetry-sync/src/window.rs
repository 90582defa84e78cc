use std::collections::VecDeque;

/// One plotted sample: `x` is the poll-cycle sequence number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: u64,
    pub y: f64,
}

/// FIFO of points bounded by a capacity supplied on every append.
///
/// Appends go to the tail, evictions come off the head. The capacity is not
/// stored: shrinking it has no effect until the next [`WindowedBuffer::push`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowedBuffer {
    points: VecDeque<Point>,
}

impl WindowedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `point` and evicts from the head until `len() <= capacity`.
    /// Returns the number of evicted points.
    pub fn push(&mut self, point: Point, capacity: usize) -> usize {
        self.points.push_back(point);

        let mut evicted = 0;
        while self.points.len() > capacity {
            self.points.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.front()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.back()
    }

    pub fn to_vec(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }
}
