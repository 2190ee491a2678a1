// src/token_store.rs

// bounded token balance

/// Current token balance bounded by a fixed capacity.
///
/// Holds `0 <= tokens <= capacity` after every operation. The store does no
/// locking or blocking of its own; the limiter keeps it behind the same
/// critical section as the admission queue so every balance mutation is
/// totally ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenStore {
    tokens: u32,
    capacity: u32,
}

impl TokenStore {
    pub(crate) fn new(capacity: u32, initial: u32) -> Self {
        Self {
            tokens: initial.min(capacity),
            capacity,
        }
    }

    /// Take `n` tokens if at least `n` are available, otherwise leave the
    /// balance untouched.
    pub(crate) fn try_debit(&mut self, n: u32) -> bool {
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Add up to `n` tokens, discarding whatever would overflow capacity.
    /// Returns how many tokens were actually credited.
    pub(crate) fn credit(&mut self, n: u32) -> u32 {
        let credited = n.min(self.capacity - self.tokens);
        self.tokens += credited;
        credited
    }

    pub(crate) fn tokens(&self) -> u32 {
        self.tokens
    }
}
