//! Host boundary for the current location's query string.

/// Read/replace access to the host's address bar.
///
/// Implementations replace the current entry in place. Pushing a history
/// entry per keystroke or filter change is never correct here.
pub trait AddressBar: Send {
    /// Query string of the current location, with or without a leading `?`.
    fn current_query(&self) -> String;

    /// Replaces the current location's query string.
    fn replace_query(&mut self, query: &str);
}

/// Address bar held in memory, for hosts without one and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryAddressBar {
    query: String,
    replacements: usize,
}

impl InMemoryAddressBar {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            replacements: 0,
        }
    }

    /// How many times the query was replaced.
    #[must_use]
    pub const fn replacements(&self) -> usize {
        self.replacements
    }
}

impl AddressBar for InMemoryAddressBar {
    fn current_query(&self) -> String {
        self.query.clone()
    }

    fn replace_query(&mut self, query: &str) {
        if self.query != query {
            tracing::trace!(from = %self.query, to = %query, "replacing address bar query");
            self.query = query.to_string();
            self.replacements += 1;
        }
    }
}
