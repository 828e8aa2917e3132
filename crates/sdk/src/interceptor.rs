//! Request interceptors applied to every outgoing request header.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Common header carried by every service request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestHeader {
    pub client_name: Option<String>,
    pub request_timestamp: Option<DateTime<Utc>>,
    /// Free-form fields set by custom interceptors.
    pub fields: BTreeMap<String, String>,
}

/// Mutates a request header before it is sent.
///
/// Interceptors run in the order they were appended to the SDK context.
pub trait RequestInterceptor: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn intercept(&self, header: &mut RequestHeader);
}

/// Run every interceptor in `chain`, in order, over `header`.
pub fn apply_interceptors(chain: &[Arc<dyn RequestInterceptor>], header: &mut RequestHeader) {
    for interceptor in chain {
        interceptor.intercept(header);
    }
}

/// Stamps the client name and request time onto each header.
pub struct AddRequestHeader {
    client_name: Box<dyn Fn() -> String + Send + Sync>,
}

impl AddRequestHeader {
    /// Compute the client name per request.
    pub fn new(client_name: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            client_name: Box::new(client_name),
        }
    }

    /// Always use the same client name.
    pub fn fixed(client_name: impl Into<String>) -> Self {
        let name = client_name.into();
        Self::new(move || name.clone())
    }
}

impl RequestInterceptor for AddRequestHeader {
    fn name(&self) -> &str {
        "add_request_header"
    }

    fn intercept(&self, header: &mut RequestHeader) {
        header.client_name = Some((self.client_name)());
        header.request_timestamp = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str);

    impl RequestInterceptor for Tag {
        fn name(&self) -> &str {
            self.0
        }
        fn intercept(&self, header: &mut RequestHeader) {
            let seen = header.fields.entry("order".into()).or_default();
            if !seen.is_empty() {
                seen.push(',');
            }
            seen.push_str(self.0);
        }
    }

    #[test]
    fn add_request_header_sets_name_and_time() {
        let mut header = RequestHeader::default();
        AddRequestHeader::fixed("ops-host:tool-42").intercept(&mut header);
        assert_eq!(header.client_name.as_deref(), Some("ops-host:tool-42"));
        assert!(header.request_timestamp.is_some());
    }

    #[test]
    fn chain_runs_in_registration_order() {
        let chain: Vec<Arc<dyn RequestInterceptor>> =
            vec![Arc::new(Tag("a")), Arc::new(Tag("b")), Arc::new(Tag("c"))];
        let mut header = RequestHeader::default();
        apply_interceptors(&chain, &mut header);
        assert_eq!(header.fields["order"], "a,b,c");
    }

    #[test]
    fn later_interceptor_overrides_client_name() {
        let chain: Vec<Arc<dyn RequestInterceptor>> = vec![
            Arc::new(AddRequestHeader::fixed("first")),
            Arc::new(AddRequestHeader::new(|| "second".to_string())),
        ];
        let mut header = RequestHeader::default();
        apply_interceptors(&chain, &mut header);
        assert_eq!(header.client_name.as_deref(), Some("second"));
    }
}
