//! Client certificate identity and gateway endpoints.
//!
//! A [`Certificate`] is deliberately opaque: it carries the PKCS#12
//! material and passphrase for the TLS layer to consume, plus the two
//! things the connection machinery needs: a stable fingerprint to pool
//! connections by, and the endpoint its environment points at. Parsing and
//! validating the material is the TLS stack's problem.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The APNS environment a certificate is issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// The production gateways.
    Production,
    /// The sandbox gateways used during development.
    Sandbox,
}

/// Which endpoint to reach within an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// The push gateway accepting notification frames.
    Gateway,
    /// The feedback service reporting dead tokens.
    Feedback,
}

/// A host/port pair for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name.
    pub host: &'static str,
    /// TCP port.
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

const PRODUCTION_GATEWAY: Endpoint = Endpoint {
    host: "gateway.push.apple.com",
    port: 2195,
};
const SANDBOX_GATEWAY: Endpoint = Endpoint {
    host: "gateway.sandbox.push.apple.com",
    port: 2195,
};
const PRODUCTION_FEEDBACK: Endpoint = Endpoint {
    host: "feedback.push.apple.com",
    port: 2196,
};
const SANDBOX_FEEDBACK: Endpoint = Endpoint {
    host: "feedback.sandbox.push.apple.com",
    port: 2196,
};

impl Environment {
    /// Look up the endpoint of the given kind for this environment.
    #[must_use]
    pub const fn endpoint(self, kind: EndpointKind) -> Endpoint {
        match (self, kind) {
            (Self::Production, EndpointKind::Gateway) => PRODUCTION_GATEWAY,
            (Self::Sandbox, EndpointKind::Gateway) => SANDBOX_GATEWAY,
            (Self::Production, EndpointKind::Feedback) => PRODUCTION_FEEDBACK,
            (Self::Sandbox, EndpointKind::Feedback) => SANDBOX_FEEDBACK,
        }
    }
}

struct CertificateInner {
    identity: Vec<u8>,
    passphrase: Option<String>,
    environment: Environment,
    fingerprint: String,
}

/// An APNS client certificate identity.
///
/// Cheap to clone; all clones share the underlying material. Two
/// certificates built from the same material and environment compare equal
/// by fingerprint, which is the identity connections are pooled under.
#[derive(Clone)]
pub struct Certificate {
    inner: Arc<CertificateInner>,
}

impl fmt::Debug for Certificate {
    // Keeps the material and passphrase out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.inner.fingerprint)
            .field("environment", &self.inner.environment)
            .field("has_passphrase", &self.has_passphrase())
            .finish()
    }
}

impl Certificate {
    /// Create a certificate from PKCS#12 DER bytes.
    #[must_use]
    pub fn from_pkcs12(
        identity: Vec<u8>,
        passphrase: Option<String>,
        environment: Environment,
    ) -> Self {
        let fingerprint = compute_fingerprint(&identity, environment);
        Self {
            inner: Arc::new(CertificateInner {
                identity,
                passphrase,
                environment,
                fingerprint,
            }),
        }
    }

    /// Load a certificate from a PKCS#12 file.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the file cannot be read. The
    /// material itself is not inspected here.
    pub fn from_pkcs12_file(
        path: impl AsRef<Path>,
        passphrase: Option<String>,
        environment: Environment,
    ) -> std::io::Result<Self> {
        let identity = std::fs::read(path)?;
        Ok(Self::from_pkcs12(identity, passphrase, environment))
    }

    /// Stable identity of this certificate.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.inner.fingerprint
    }

    /// The environment the certificate is issued for.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    /// The endpoint of the given kind for this certificate's environment.
    #[must_use]
    pub fn endpoint(&self, kind: EndpointKind) -> Endpoint {
        self.inner.environment.endpoint(kind)
    }

    /// Raw PKCS#12 DER bytes.
    #[must_use]
    pub fn identity_der(&self) -> &[u8] {
        &self.inner.identity
    }

    /// Passphrase protecting the material, if any.
    #[must_use]
    pub fn passphrase(&self) -> Option<&str> {
        self.inner.passphrase.as_deref()
    }

    /// Whether the material is passphrase protected.
    #[must_use]
    pub fn has_passphrase(&self) -> bool {
        self.inner.passphrase.is_some()
    }
}

fn compute_fingerprint(identity: &[u8], environment: Environment) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity);
    hasher.update(match environment {
        Environment::Production => b"production".as_slice(),
        Environment::Sandbox => b"sandbox".as_slice(),
    });
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable() {
        let a = Certificate::from_pkcs12(b"material".to_vec(), None, Environment::Sandbox);
        let b = Certificate::from_pkcs12(b"material".to_vec(), None, Environment::Sandbox);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_depends_on_environment() {
        let sandbox = Certificate::from_pkcs12(b"material".to_vec(), None, Environment::Sandbox);
        let production =
            Certificate::from_pkcs12(b"material".to_vec(), None, Environment::Production);
        assert_ne!(sandbox.fingerprint(), production.fingerprint());
    }

    #[test]
    fn fingerprint_depends_on_material() {
        let a = Certificate::from_pkcs12(b"one".to_vec(), None, Environment::Sandbox);
        let b = Certificate::from_pkcs12(b"two".to_vec(), None, Environment::Sandbox);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn endpoint_table() {
        assert_eq!(
            Environment::Production
                .endpoint(EndpointKind::Gateway)
                .to_string(),
            "gateway.push.apple.com:2195"
        );
        assert_eq!(
            Environment::Sandbox
                .endpoint(EndpointKind::Gateway)
                .to_string(),
            "gateway.sandbox.push.apple.com:2195"
        );
        assert_eq!(
            Environment::Production
                .endpoint(EndpointKind::Feedback)
                .to_string(),
            "feedback.push.apple.com:2196"
        );
    }

    #[test]
    fn debug_redacts_the_material() {
        let certificate = Certificate::from_pkcs12(
            b"m".to_vec(),
            Some("secret".to_owned()),
            Environment::Sandbox,
        );
        let rendered = format!("{certificate:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("fingerprint"));
    }

    #[test]
    fn passphrase_visibility() {
        let with = Certificate::from_pkcs12(
            b"m".to_vec(),
            Some("secret".to_owned()),
            Environment::Sandbox,
        );
        let without = Certificate::from_pkcs12(b"m".to_vec(), None, Environment::Sandbox);
        assert!(with.has_passphrase());
        assert_eq!(with.passphrase(), Some("secret"));
        assert!(!without.has_passphrase());
    }
}
