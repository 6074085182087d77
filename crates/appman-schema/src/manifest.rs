//! Decrypted manifest payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version summary of one application, as issued by the server.
///
/// A `Summary` is immutable; every fetch produces a new value. The embedded
/// secret keys the packages request and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    id: String,
    name: String,
    version: String,
    secret: String,
}

impl Summary {
    /// Create a summary from its four wire fields.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            secret: secret.into(),
        }
    }

    /// Application identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque version string. Compared exactly, never ordered.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Session secret used to key the packages request.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summary")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One installable package.
///
/// Package fields belong to the installer, so the object is kept as-is.
/// Only a JSON object is accepted as a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package(Map<String, Value>);

impl Package {
    /// Wrap a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Look up a raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a field that holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// All fields, in server order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Decrypted body of the packages endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagesPayload {
    /// Packages in the order the server listed them.
    pub packages: Vec<Package>,
}
