//! Request authentication collaborators.
//!
//! The gateway authenticates each call with a `ts`/`apikey`/`hash` parameter
//! triple where the hash covers `(timestamp, private key, public key)`. The
//! digest itself is not this crate's concern; [`KeyedSigner`] takes the hash
//! function as an injected collaborator.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the auth query-string suffix appended to every request.
pub trait RequestSigner: fmt::Debug + Send + Sync {
    /// Auth parameters for one request, without a leading separator.
    ///
    /// Called fresh per request: the signature embeds the current timestamp.
    fn auth_params(&self) -> String;
}

/// Digest collaborator: message in, lowercase hex digest out.
pub type DigestFn = fn(&str) -> String;

/// Signer producing the gateway's `ts`/`apikey`/`hash` triple.
pub struct KeyedSigner {
    public_key: String,
    private_key: String,
    digest: DigestFn,
}

impl KeyedSigner {
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        digest: DigestFn,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            digest,
        }
    }
}

impl fmt::Debug for KeyedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl RequestSigner for KeyedSigner {
    fn auth_params(&self) -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let hash = (self.digest)(&format!("{ts}{}{}", self.private_key, self.public_key));
        format!("ts={ts}&apikey={}&hash={hash}", self.public_key)
    }
}

/// Fixed auth suffix, for tests and keyless gateways.
#[derive(Debug, Clone)]
pub struct StaticSigner(String);

impl StaticSigner {
    pub fn new(params: impl Into<String>) -> Self {
        Self(params.into())
    }
}

impl RequestSigner for StaticSigner {
    fn auth_params(&self) -> String {
        self.0.clone()
    }
}
