//! Master-key request signing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use reqwest::Method;
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Kind of resource a request addresses, as named in the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceType {
    Database,
    Container,
    Document,
}

impl ResourceType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Database => "dbs",
            Self::Container => "colls",
            Self::Document => "docs",
        }
    }
}

/// Account master key, ready to sign requests.
#[derive(Clone)]
pub(crate) struct MasterKey {
    mac: HmacSha256,
}

impl MasterKey {
    /// Creates a signer from the decoded account key.
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Returns the URL-encoded `authorization` header value for a request.
    ///
    /// `date` must be the exact value sent as `x-ms-date`.
    pub(crate) fn authorization(
        &self,
        method: &Method,
        resource_type: ResourceType,
        resource_link: &str,
        date: &str,
    ) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            method.as_str().to_lowercase(),
            resource_type.as_str(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={signature}");
        url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(***)")
    }
}

/// Formats a timestamp as an RFC 1123 date, e.g. `Tue, 01 Nov 1994 08:12:31 GMT`.
pub(crate) fn rfc1123(timestamp: Timestamp) -> String {
    timestamp.strftime("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ZG9ja2V0LXRlc3QtbWFzdGVyLWtleS0wMTIzNDU2Nzg5";

    #[test]
    fn test_rfc1123() {
        let timestamp = Timestamp::from_second(783_677_551).unwrap();
        assert_eq!(rfc1123(timestamp), "Tue, 01 Nov 1994 08:12:31 GMT");
    }

    #[test]
    fn test_authorization_signature() {
        let key = MasterKey::new(&STANDARD.decode(KEY).unwrap()).unwrap();
        let header = key.authorization(
            &Method::GET,
            ResourceType::Document,
            "dbs/testdb/colls/container/docs/item-1",
            "Tue, 01 Nov 1994 08:12:31 GMT",
        );

        assert_eq!(
            header,
            "type%3Dmaster%26ver%3D1.0%26sig%3DDeqaKHtpxUH0ZK7VFQwtq3nmW9izPsYvhgzD%2BWy18Jk%3D"
        );
    }

    #[test]
    fn test_signature_depends_on_link() {
        let key = MasterKey::new(b"secret").unwrap();
        let date = "Tue, 01 Nov 1994 08:12:31 GMT";
        let a = key.authorization(&Method::POST, ResourceType::Container, "dbs/a", date);
        let b = key.authorization(&Method::POST, ResourceType::Container, "dbs/b", date);
        assert_ne!(a, b);
    }
}
