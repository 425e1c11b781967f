use onmeet_shared::chat::{ChatEntry, SystemNotice, UserMessage};

/// Append-only chat history. Insertion order is display order.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its index.
    pub fn append(&mut self, entry: impl Into<ChatEntry>) -> usize {
        self.entries.push(entry.into());
        self.entries.len() - 1
    }

    pub fn all(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ChatEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_messages(&self) -> impl Iterator<Item = &UserMessage> {
        self.entries.iter().filter_map(|e| match e {
            ChatEntry::User(m) => Some(m),
            ChatEntry::System(_) => None,
        })
    }

    pub fn system_notices(&self) -> impl Iterator<Item = &SystemNotice> {
        self.entries.iter().filter_map(|e| match e {
            ChatEntry::System(n) => Some(n),
            ChatEntry::User(_) => None,
        })
    }
}
