//! Canonical query construction.
//!
//! The query string doubles as the cache key, so its form must be stable:
//! parameters appear in the fixed order each filter declares them, unset
//! fields are omitted entirely, and numeric fields equal to the gateway's
//! no-op default (`0`) are omitted even when explicitly set. Reordering or
//! re-encoding parameters would silently invalidate every cached entry.

/// Upper bound the gateway accepts for the `limit` parameter.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Builder for the canonical `{path}?{params}` form of one page request.
///
/// An empty filter yields `"{path}?"`: fetch everything, default order.
#[derive(Debug)]
pub struct QueryBuilder {
    buf: String,
}

impl QueryBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            buf: format!("{path}?"),
        }
    }

    /// Append a text parameter; `None` is omitted entirely.
    ///
    /// Values are percent-encoded, and the encoded form is part of the
    /// canonical string.
    pub fn text(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.sep();
            self.buf.push_str(name);
            self.buf.push('=');
            self.buf.push_str(&url_escape::encode_component(value));
        }
    }

    /// Append a numeric parameter; `None` and the no-op value `0` are
    /// omitted.
    pub fn num(&mut self, name: &str, value: Option<u64>) {
        if let Some(value) = value {
            if value != 0 {
                self.sep();
                self.buf.push_str(name);
                self.buf.push('=');
                self.buf.push_str(&value.to_string());
            }
        }
    }

    /// Append the page size, clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn limit(&mut self, limit: u32) {
        self.num("limit", Some(u64::from(limit.clamp(1, MAX_PAGE_SIZE))));
    }

    /// Append the page start. Offset zero is omitted, matching the numeric
    /// default rule; the first page's key never carries an offset.
    pub fn offset(&mut self, offset: u64) {
        self.num("offset", Some(offset));
    }

    pub fn finish(self) -> String {
        self.buf
    }

    fn sep(&mut self) {
        if !self.buf.ends_with('?') {
            self.buf.push('&');
        }
    }
}

/// Join a canonical query with a further parameter run (the auth suffix).
pub(crate) fn join_params(query: &str, params: &str) -> String {
    if query.ends_with('?') {
        format!("{query}{params}")
    } else {
        format!("{query}&{params}")
    }
}
