//! Payloads of long (ephemeral) provenance nodes.

use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

use crate::taxonomy::{agent, entity, ProvType};

/// Maximum path length, in bytes.
pub const PATH_MAX: usize = 4096;

/// Maximum stored length of any string payload.
pub const MAX_PAYLOAD_LEN: usize = PATH_MAX;

/// A byte string holding at most [`MAX_PAYLOAD_LEN`] bytes.
///
/// Longer sources are cut at the limit and marked as truncated; the stored
/// length is then exactly the limit.
#[derive(Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "BoundedStrRepr")]
pub struct BoundedStr {
    value: Vec<u8>,
    truncated: bool,
}

impl BoundedStr {
    /// Copy at most [`MAX_PAYLOAD_LEN`] bytes of `source`.
    pub fn new(source: impl AsRef<[u8]>) -> Self {
        let source = source.as_ref();
        let truncated = source.len() > MAX_PAYLOAD_LEN;
        let kept = source.len().min(MAX_PAYLOAD_LEN);
        Self {
            value: source[..kept].to_vec(),
            truncated,
        }
    }

    /// Stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Stored bytes as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Stored length.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the source was longer than the limit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Debug for BoundedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStr")
            .field("value", &self.to_string_lossy())
            .field("length", &self.len())
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl fmt::Display for BoundedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Serialize for BoundedStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Text that is not valid UTF-8 also travels as raw bytes.
        let bytes = match std::str::from_utf8(&self.value) {
            Ok(_) => None,
            Err(_) => Some(self.value.clone()),
        };
        BoundedStrRepr {
            value: self.to_string_lossy().into_owned(),
            bytes,
            length: self.len(),
            truncated: self.truncated,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize, Deserialize)]
struct BoundedStrRepr {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bytes: Option<Vec<u8>>,
    length: usize,
    truncated: bool,
}

impl From<BoundedStrRepr> for BoundedStr {
    fn from(repr: BoundedStrRepr) -> Self {
        let mut bounded = match repr.bytes {
            Some(bytes) => BoundedStr::new(bytes),
            None => BoundedStr::new(repr.value),
        };
        bounded.truncated |= repr.truncated;
        bounded
    }
}

/// Machine description carried by the machine agent node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Operating system name.
    pub sysname: String,
    /// Host name.
    pub nodename: String,
    /// Kernel release.
    pub release: String,
    /// Kernel version.
    pub version: String,
    /// Hardware name.
    pub machine: String,
    /// Capture engine version.
    pub engine_version: String,
}

impl MachineInfo {
    /// Describe the host this process runs on.
    pub fn current() -> Self {
        Self {
            sysname: std::env::consts::OS.to_string(),
            nodename: std::env::var("HOSTNAME").unwrap_or_default(),
            release: String::new(),
            version: String::new(),
            machine: std::env::consts::ARCH.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Payload of a long node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum LongPayload {
    /// Free-form string.
    Str {
        /// Content.
        value: BoundedStr,
    },
    /// File path.
    Path {
        /// Content.
        value: BoundedStr,
        /// The path names a symbolic link.
        is_link: bool,
    },
    /// One exec argument.
    Arg {
        /// Content.
        value: BoundedStr,
    },
    /// One exec environment string.
    Env {
        /// Content.
        value: BoundedStr,
    },
    /// Extended attribute.
    Xattr {
        /// Attribute name.
        name: BoundedStr,
        /// Attribute value.
        value: BoundedStr,
        /// setxattr/removexattr flags.
        flags: u32,
    },
    /// Socket address.
    Address {
        /// Raw address bytes.
        value: BoundedStr,
    },
    /// Host description.
    Machine(MachineInfo),
    /// No payload set yet.
    Empty,
}

impl LongPayload {
    /// Empty payload for a freshly allocated entry.
    pub fn for_type(prov_type: ProvType) -> Self {
        match prov_type {
            entity::STR => Self::Str {
                value: BoundedStr::default(),
            },
            entity::PATH => Self::Path {
                value: BoundedStr::default(),
                is_link: false,
            },
            entity::ARG => Self::Arg {
                value: BoundedStr::default(),
            },
            entity::ENV => Self::Env {
                value: BoundedStr::default(),
            },
            entity::XATTR => Self::Xattr {
                name: BoundedStr::default(),
                value: BoundedStr::default(),
                flags: 0,
            },
            entity::ADDRESS => Self::Address {
                value: BoundedStr::default(),
            },
            agent::MACHINE => Self::Machine(MachineInfo::default()),
            _ => Self::Empty,
        }
    }

    /// Main string content, if the payload has one.
    pub fn value(&self) -> Option<&BoundedStr> {
        match self {
            Self::Str { value }
            | Self::Path { value, .. }
            | Self::Arg { value }
            | Self::Env { value }
            | Self::Xattr { value, .. }
            | Self::Address { value } => Some(value),
            Self::Machine(_) | Self::Empty => None,
        }
    }

    /// Whether any string content was truncated.
    pub fn is_truncated(&self) -> bool {
        match self {
            Self::Xattr { name, value, .. } => name.is_truncated() || value.is_truncated(),
            other => other.value().is_some_and(BoundedStr::is_truncated),
        }
    }
}
