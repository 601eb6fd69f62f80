//! FIFO queue of citation-keys awaiting resolution.

use crate::identity::CitationKey;

/// Append-only queue with a forward-only cursor.
///
/// Keys are appended at node-creation time and handed out strictly in arrival
/// order. The cursor never moves backwards, so a key is handed out at most
/// once per run.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: Vec<CitationKey>,
    cursor: usize,
}

impl Frontier {
    /// Creates an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key after all currently queued work.
    pub fn push(&mut self, key: CitationKey) {
        self.queue.push(key);
    }

    /// Returns the next key in arrival order and advances the cursor.
    pub fn next_key(&mut self) -> Option<CitationKey> {
        let key = self.queue.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(key)
    }

    /// Returns true when every queued key has been handed out.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    /// Returns the number of keys not yet handed out.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len() - self.cursor
    }

    /// Returns the total number of keys ever queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing was ever queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
