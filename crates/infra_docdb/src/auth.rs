//! Master-key request signing
//!
//! Every request carries an `authorization` header holding an HMAC-SHA256
//! signature over the verb, resource type, resource link and request date,
//! keyed with the base64-decoded account key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::fmt;

use docdb_kernel::{StoreError, StoreResult};

use crate::resources::ResourceType;

type HmacSha256 = Hmac<Sha256>;

/// Characters left unescaped in the token, matching `encodeURIComponent`
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Decoded account key used to sign requests
#[derive(Clone)]
pub struct MasterKeyCredential {
    key: Vec<u8>,
}

impl MasterKeyCredential {
    /// Decodes a base64 account key
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` if the key is not valid base64
    pub fn from_base64(key: &str) -> StoreResult<Self> {
        let key = STANDARD
            .decode(key.trim())
            .map_err(|e| StoreError::configuration(format!("access key is not valid base64: {}", e)))?;
        Ok(Self { key })
    }

    /// Builds the percent-encoded authorization token for one request
    ///
    /// # Arguments
    ///
    /// * `verb` - HTTP method, e.g. "GET"
    /// * `resource_type` - The kind of resource targeted
    /// * `resource_link` - Unencoded link such as `dbs/shop/colls/orders`
    /// * `date` - The exact value sent in the `x-ms-date` header
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: ResourceType,
        resource_link: &str,
        date: &str,
    ) -> StoreResult<String> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.as_str(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StoreError::configuration(format!("access key rejected: {}", e)))?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let token = format!("type=master&ver=1.0&sig={}", signature);
        Ok(utf8_percent_encode(&token, TOKEN_ENCODE_SET).to_string())
    }
}

impl fmt::Debug for MasterKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKeyCredential(<redacted>)")
    }
}
