//! Slot references
//!
//! A slot is the string form widgets use to bind to a channel without
//! holding a live object reference: `source:id` for a single topic, or
//! `source:id/*` for a composite subtree. Slots are resolved back to a
//! channel key at read time.
//!
//! Round-trip invariant: for any well-formed slot string `s`,
//! `Slot::from_ref(&Slot::to_channel(&s).unwrap()) == s`.

use crate::types::{DataType, StructuredType};

/// Typical protobuf type-name prefix, stripped for compatibility checks
const PROTOBUF_PREFIX: &str = "wpi.proto.Protobuf";

/// Channel kinds a widget slot accepts.
///
/// `None` for a category means "no channels of this kind"; a slot with no
/// acceptance rules at all means "anything goes", which callers express by
/// not consulting this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAcceptance {
    /// Accepted primitive data types
    pub primitive: Option<Vec<DataType>>,
    /// Accepted structured type names for `json` channels
    pub json: Option<Vec<String>>,
    /// Accepted sendable type names for `composite` channels
    pub composite: Option<Vec<String>>,
}

impl SlotAcceptance {
    /// Determines whether a channel of the given type is compatible with
    /// this slot.
    pub fn accepts(&self, data_type: DataType, structured: Option<&StructuredType>) -> bool {
        match data_type {
            DataType::Json => {
                let Some(structured) = structured else {
                    return false;
                };
                let type_name = structured
                    .name
                    .strip_prefix(PROTOBUF_PREFIX)
                    .unwrap_or(&structured.name);
                self.json
                    .as_ref()
                    .is_some_and(|names| names.iter().any(|n| n == type_name))
            }
            DataType::Composite => match (&self.composite, structured) {
                (Some(names), Some(structured)) => names.iter().any(|n| *n == structured.name),
                _ => false,
            },
            primitive => self
                .primitive
                .as_ref()
                .is_some_and(|types| types.contains(&primitive)),
        }
    }
}

/// Parsed form of a slot string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    /// Supplier identifier, e.g. `nt`
    pub source: String,
    /// Channel identifier (topic path)
    pub id: String,
    /// Whether the slot addresses a composite subtree
    pub composite: bool,
}

/// Slot string encoding and display formatting.
pub struct Slot;

impl Slot {
    /// Constructs a slot reference from channel identity.
    pub fn from_channel(source: &str, id: &str, data_type: DataType) -> String {
        let slot = format!("{}:{}", source, id);
        if data_type == DataType::Composite {
            format!("{}/*", slot)
        } else {
            slot
        }
    }

    /// Constructs a slot reference from a parsed [`ChannelRef`].
    pub fn from_ref(channel: &ChannelRef) -> String {
        if channel.composite {
            format!("{}:{}/*", channel.source, channel.id)
        } else {
            format!("{}:{}", channel.source, channel.id)
        }
    }

    /// Constructs channel source and identifier from the slot reference.
    pub fn to_channel(slot: &str) -> Option<ChannelRef> {
        let (source, id) = slot.split_once(':')?;
        if source.is_empty() {
            return None;
        }

        let composite = id.ends_with("/*");
        let id = if composite { &id[..id.len() - 2] } else { id };
        Some(ChannelRef {
            source: source.to_string(),
            id: id.to_string(),
            composite,
        })
    }

    /// Formats a channel source for display purposes.
    pub fn format_source(value: &str) -> &str {
        match value {
            "nt" => "NT",
            "wpilog" => "LOG",
            other => other,
        }
    }

    /// Formats a slot reference for display purposes.
    pub fn format_as_ref(slot: Option<&str>) -> String {
        let Some(slot) = slot else {
            return String::new();
        };

        match slot.split_once(':') {
            Some((source, name)) if !source.is_empty() && !name.is_empty() => {
                let name = name.strip_suffix("/*").unwrap_or(name);
                format!("{}:{}", Slot::format_source(source), name)
            }
            _ => slot.to_string(),
        }
    }

    /// Formats a slot reference to be used as a title by dropping
    /// ornamental details.
    pub fn format_as_title(slot: Option<&str>) -> Option<String> {
        let slot = slot?;
        let v = slot.trim();

        let mut name = match slot.split_once(':') {
            Some((_, name)) => name,
            None => v,
        };

        if let Some(stripped) = name.strip_prefix("/SmartDashboard") {
            name = stripped;
        }

        name = name.trim_start_matches('/');
        name = name.strip_suffix("/*").unwrap_or(name);

        Some(name.to_string())
    }
}
