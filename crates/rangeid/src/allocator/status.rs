/// Outcome of a single fast-path claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Claim {
    /// A value from the current window now belongs to the caller.
    Ready { value: u64 },
    /// The window is used up; someone has to lease a new range.
    Exhausted,
}

/// A snapshot of an allocator's leased window.
///
/// `next` may run past `end` while the window is exhausted, since callers keep
/// advancing the cursor until a refill publishes a new window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    /// The next value the fast path would hand out.
    pub next: u64,
    /// First value not covered by the current lease.
    pub end: u64,
}

impl Window {
    /// Number of values still available without a refill.
    pub const fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }

    pub const fn is_exhausted(&self) -> bool {
        self.next >= self.end
    }
}
