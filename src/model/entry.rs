//! Credential entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::model::tags::Tags;
use crate::model::times::AuditTimes;
use crate::secret::SecretBuffer;

// Standard field names.
pub const FIELD_TITLE: &str = "Title";
pub const FIELD_USERNAME: &str = "UserName";
pub const FIELD_PASSWORD: &str = "Password";
pub const FIELD_URL: &str = "URL";
pub const FIELD_NOTES: &str = "Notes";

/// A single named value in an entry's field map.
///
/// Password-like fields are always `Protected`; a plain string never
/// holds a secret, even internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Plain(String),
    Protected(SecretBuffer),
}

/// A credential entry: field map, attachments, tags and history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub uuid: Uuid,
    pub icon_id: Option<u32>,
    pub times: AuditTimes,
    /// UUID of the owning group, `None` while detached.
    pub(crate) parent: Option<Uuid>,
    fields: BTreeMap<String, FieldValue>,
    /// File attachments keyed by name, base64 inside the payload.
    #[serde(with = "attachment_serde", default)]
    attachments: BTreeMap<String, Vec<u8>>,
    pub tags: Tags,
    /// Prior snapshots, oldest first.  Append-only; snapshots are
    /// immutable once pushed.
    #[serde(default)]
    history: Vec<Entry>,
}

impl Entry {
    pub fn new(title: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_TITLE.to_string(), FieldValue::Plain(title.to_string()));

        Self {
            uuid: Uuid::new_v4(),
            icon_id: None,
            times: AuditTimes::new(),
            parent: None,
            fields,
            attachments: BTreeMap::new(),
            tags: Tags::new(),
            history: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    pub fn title(&self) -> &str {
        self.field(FIELD_TITLE).unwrap_or("")
    }

    pub fn set_title(&mut self, title: &str) {
        self.set_field(FIELD_TITLE, title);
    }

    /// Plain value of a field, or `None` if absent or protected.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Plain(value)) => Some(value),
            _ => None,
        }
    }

    /// Set a plain field value.
    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields
            .insert(name.to_string(), FieldValue::Plain(value.to_string()));
        self.times.mark_modified();
    }

    /// Set a protected field value.
    pub fn set_protected(&mut self, name: &str, value: SecretBuffer) {
        self.fields
            .insert(name.to_string(), FieldValue::Protected(value));
        self.times.mark_modified();
    }

    /// Protected value of a field, still masked.
    pub fn protected(&self, name: &str) -> Option<&SecretBuffer> {
        match self.fields.get(name) {
            Some(FieldValue::Protected(secret)) => Some(secret),
            _ => None,
        }
    }

    /// Store the password.  Always lands in a [`SecretBuffer`].
    pub fn set_password(&mut self, password: &str) {
        self.set_protected(FIELD_PASSWORD, SecretBuffer::from_str(password));
    }

    /// Decode the password into a short-lived view.
    ///
    /// `None` if no password is set or it is not valid UTF-8.
    pub fn password(&self) -> Option<Zeroizing<String>> {
        self.protected(FIELD_PASSWORD)
            .and_then(|secret| secret.read_str().ok())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Attachments
    // ------------------------------------------------------------------

    pub fn add_attachment(&mut self, name: &str, data: Vec<u8>) {
        self.attachments.insert(name.to_string(), data);
        self.times.mark_modified();
    }

    pub fn attachment(&self, name: &str) -> Option<&[u8]> {
        self.attachments.get(name).map(Vec::as_slice)
    }

    /// Remove an attachment.  Returns whether anything was removed.
    pub fn remove_attachment(&mut self, name: &str) -> bool {
        let removed = self.attachments.remove(name).is_some();
        if removed {
            self.times.mark_modified();
        }
        removed
    }

    pub fn attachment_names(&self) -> impl Iterator<Item = &str> {
        self.attachments.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Append the current state as an immutable snapshot.
    ///
    /// Mutation never snapshots implicitly; callers push before
    /// overwriting fields they want to keep.
    pub fn push_history(&mut self) {
        let mut snapshot = self.clone();
        snapshot.history = Vec::new();
        self.history.push(snapshot);
    }

    pub fn history(&self) -> &[Entry] {
        &self.history
    }

    pub fn is_expired(&self) -> bool {
        self.times.is_expired()
    }
}

/// Base64 map encoding for attachments, mirroring how other byte fields
/// travel in the payload.
mod attachment_serde {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(
        attachments: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<&str, String> = attachments
            .iter()
            .map(|(name, data)| (name.as_str(), BASE64.encode(data)))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(name, data)| {
                BASE64
                    .decode(&data)
                    .map(|bytes| (name, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
