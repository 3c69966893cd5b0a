use http::HeaderMap;
use std::fmt::{Display, Formatter};
use tonic::metadata::MetadataMap;

/// The transport an incoming request arrived on.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RequestType {
    /// A plain HTTP request. Values are read from its headers.
    Http,
    /// A gRPC call. Values are read from its ASCII metadata entries.
    Grpc,
}

impl Display for RequestType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Http => write!(f, "HTTP"),
            RequestType::Grpc => write!(f, "gRPC"),
        }
    }
}

/// Metadata of the request being handled.
///
/// The variant records which transport the request came from, which in turn
/// decides how values are looked up.
///
/// ```
/// use http::{HeaderMap, HeaderValue};
/// use tenant_injector::{RequestMetadata, RequestType};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-tenant-id", HeaderValue::from_static("acme"));
///
/// let metadata = RequestMetadata::from(headers);
/// assert_eq!(RequestType::Http, metadata.request_type());
/// assert_eq!(Some("acme"), metadata.get("x-tenant-id"));
/// ```
#[derive(Clone, Debug)]
pub enum RequestMetadata {
    /// Headers of an HTTP request.
    Http(HeaderMap),
    /// Metadata of a gRPC call.
    Grpc(MetadataMap),
}

impl RequestMetadata {
    /// The transport this metadata came from.
    #[must_use]
    pub fn request_type(&self) -> RequestType {
        match self {
            RequestMetadata::Http(_) => RequestType::Http,
            RequestMetadata::Grpc(_) => RequestType::Grpc,
        }
    }

    /// Gets the first value stored under `key`. Header names are matched
    /// case-insensitively. Values which are not valid visible ASCII, as well
    /// as binary (`-bin`) gRPC entries, are treated as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            RequestMetadata::Http(headers) => {
                headers.get(key).and_then(|value| value.to_str().ok())
            }
            RequestMetadata::Grpc(metadata) => {
                metadata.get(key).and_then(|value| value.to_str().ok())
            }
        }
    }
}

impl From<HeaderMap> for RequestMetadata {
    fn from(headers: HeaderMap) -> Self {
        RequestMetadata::Http(headers)
    }
}

impl From<MetadataMap> for RequestMetadata {
    fn from(metadata: MetadataMap) -> Self {
        RequestMetadata::Grpc(metadata)
    }
}

impl<T> From<&tonic::Request<T>> for RequestMetadata {
    fn from(request: &tonic::Request<T>) -> Self {
        RequestMetadata::Grpc(request.metadata().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use tonic::metadata::{AsciiMetadataValue, BinaryMetadataValue};

    #[test]
    fn http_headers_are_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Tenant-Id", HeaderValue::from_static("acme"));

        let metadata = RequestMetadata::from(headers);
        assert_eq!(RequestType::Http, metadata.request_type());
        assert_eq!(Some("acme"), metadata.get("x-tenant-id"));
        assert_eq!(Some("acme"), metadata.get("X-TENANT-ID"));
        assert_eq!(None, metadata.get("x-other"));
    }

    #[test]
    fn http_uses_first_value() {
        let mut headers = HeaderMap::new();
        headers.append("x-tenant-id", HeaderValue::from_static("first"));
        headers.append("x-tenant-id", HeaderValue::from_static("second"));

        let metadata = RequestMetadata::from(headers);
        assert_eq!(Some("first"), metadata.get("x-tenant-id"));
    }

    #[test]
    fn http_opaque_values_are_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-tenant-id",
            HeaderValue::from_bytes(b"caf\xe9").unwrap(),
        );

        let metadata = RequestMetadata::from(headers);
        assert_eq!(None, metadata.get("x-tenant-id"));
    }

    #[test]
    fn grpc_metadata_is_read() {
        let mut map = MetadataMap::new();
        map.insert("x-tenant-id", AsciiMetadataValue::from_static("acme"));

        let metadata = RequestMetadata::from(map);
        assert_eq!(RequestType::Grpc, metadata.request_type());
        assert_eq!(Some("acme"), metadata.get("x-tenant-id"));
    }

    #[test]
    fn grpc_binary_entries_are_absent() {
        let mut map = MetadataMap::new();
        map.insert_bin(
            "x-tenant-id-bin",
            BinaryMetadataValue::from_bytes(b"acme"),
        );

        let metadata = RequestMetadata::from(map);
        assert_eq!(None, metadata.get("x-tenant-id-bin"));
    }

    #[test]
    fn grpc_request_metadata_is_cloned() {
        let mut request = tonic::Request::new(());
        request
            .metadata_mut()
            .insert("x-tenant-id", AsciiMetadataValue::from_static("acme"));

        let metadata = RequestMetadata::from(&request);
        assert_eq!(RequestType::Grpc, metadata.request_type());
        assert_eq!(Some("acme"), metadata.get("x-tenant-id"));
    }
}
