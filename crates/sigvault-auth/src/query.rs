//! Decoded view of a request's query string.

/// Query parameters in request order, percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    ///
    /// # Examples
    ///
    /// ```
    /// use sigvault_auth::QueryParams;
    ///
    /// let query = QueryParams::parse("Signature=abc%2B&Expires=10");
    /// assert_eq!(query.get("Signature"), Some("abc+"));
    /// assert!(query.contains("Expires"));
    /// ```
    #[must_use]
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Parse the query of a request URI; an absent query yields no parameters.
    #[must_use]
    pub fn from_uri(uri: &http::Uri) -> Self {
        uri.query().map(Self::parse).unwrap_or_default()
    }

    /// First value for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether `name` appears at all.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Iterate over `(name, value)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
