use crate::RequestMetadata;

/// Information about an active request.
///
/// Request-scoped providers read the metadata of the request being handled
/// from here. Requests made outside of any transport (for example during
/// startup) carry no metadata.
#[derive(Clone, Debug, Default)]
pub struct RequestInfo {
    metadata: Option<RequestMetadata>,
}

impl RequestInfo {
    /// Creates a new, empty instance of [`RequestInfo`].
    #[must_use]
    pub fn new() -> Self {
        RequestInfo { metadata: None }
    }

    /// Creates a [`RequestInfo`] for a request carrying the given metadata.
    ///
    /// ```
    /// use http::{HeaderMap, HeaderValue};
    /// use tenant_injector::{RequestInfo, RequestType};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-tenant-id", HeaderValue::from_static("acme"));
    ///
    /// let info = RequestInfo::new().with_metadata(headers);
    /// let metadata = info.metadata().unwrap();
    /// assert_eq!(RequestType::Http, metadata.request_type());
    /// ```
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<RequestMetadata>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Gets the metadata of the active request, if there is one.
    #[must_use]
    pub fn metadata(&self) -> Option<&RequestMetadata> {
        self.metadata.as_ref()
    }
}
