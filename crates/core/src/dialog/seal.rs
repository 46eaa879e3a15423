//! Tamper seal for the client-carried conversation state.
//!
//! The carrier rides in client-visible payloads, so a hostile caller could
//! rewrite `ticket_price` or `quantity` between turns. When a
//! `carrier_secret` is configured, every emitted carrier gains a `_seal`
//! field holding an HMAC-SHA256 tag over the remaining fields, and inbound
//! carriers whose tag is missing or wrong are treated as absent state.
//! Commit-time prices always come from the store, never the carrier, so the
//! seal is defense in depth for the dialog texts and the flow routing.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use sha2::Sha256;

pub const SEAL_FIELD: &str = "_seal";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CarrierSealer {
    key: SecretString,
}

impl CarrierSealer {
    pub fn new(key: SecretString) -> Self {
        Self { key }
    }

    /// Attaches the `_seal` field, replacing any stale one.
    pub fn seal(&self, fields: &mut Map<String, Value>) {
        fields.remove(SEAL_FIELD);
        let tag = self.tag(fields).finalize().into_bytes();
        fields.insert(SEAL_FIELD.to_string(), Value::String(hex_encode(&tag)));
    }

    /// Constant-time verification of the embedded tag.
    pub fn verify(&self, fields: &Map<String, Value>) -> bool {
        let Some(expected) = fields.get(SEAL_FIELD).and_then(Value::as_str) else {
            return false;
        };
        let Some(expected) = hex_decode(expected) else {
            return false;
        };

        self.tag(fields).verify_slice(&expected).is_ok()
    }

    fn tag(&self, fields: &Map<String, Value>) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .expect("hmac accepts keys of any length");

        // serde_json's map iterates in sorted key order, so the digest input
        // is canonical without an extra sort.
        for (key, value) in fields {
            if key == SEAL_FIELD {
                continue;
            }
            mac.update(key.as_bytes());
            mac.update(&[0]);
            mac.update(value.to_string().as_bytes());
            mac.update(&[0]);
        }

        mac
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
        out
    })
}

fn hex_decode(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(input.get(i..i + 2)?, 16).ok())
        .collect()
}
