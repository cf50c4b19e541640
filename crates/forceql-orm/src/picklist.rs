//! Single- and multi-select picklist value types.
//!
//! A picklist field holds one (or, for the multi-select variant, an ordered
//! set of) labels from a closed set. Membership is validated at
//! construction/parse time, not at use.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator used in the wire encoding of multi-select values.
pub const MULTI_VALUE_SEPARATOR: char = ';';

/// A single-select picklist type.
///
/// Usually implemented via the [`picklist!`](crate::picklist!) macro, which
/// also derives wire (de)serialization by label.
pub trait Picklist: Copy + PartialEq + Send + Sync + 'static {
    /// All members of the picklist.
    const MEMBERS: &'static [Self];

    /// The remote label of this member.
    fn label(&self) -> &'static str;

    /// Find the member with the given remote label.
    fn from_label(label: &str) -> Option<Self> {
        Self::MEMBERS.iter().copied().find(|m| m.label() == label)
    }
}

/// Error produced when a wire value carries a label outside the picklist.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown picklist label `{0}`")]
pub struct UnknownLabel(pub String);

/// An ordered set of picklist members, serialized on the wire as a
/// `;`-joined label string.
///
/// Duplicates are dropped on construction; equality is order-insensitive
/// (set semantics).
#[derive(Debug, Clone)]
pub struct MultiPicklist<P: Picklist> {
    values: Vec<P>,
}

impl<P: Picklist> Default for MultiPicklist<P> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<P: Picklist> MultiPicklist<P> {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from the given members, dropping duplicates while
    /// preserving first-seen order.
    pub fn from_members(members: impl IntoIterator<Item = P>) -> Self {
        let mut selection = Self::new();
        for member in members {
            selection.insert(member);
        }
        selection
    }

    /// Add a member. Returns false if it was already selected.
    pub fn insert(&mut self, member: P) -> bool {
        if self.contains(member) {
            false
        } else {
            self.values.push(member);
            true
        }
    }

    /// Remove a member. Returns true if it was selected.
    pub fn remove(&mut self, member: P) -> bool {
        let before = self.values.len();
        self.values.retain(|m| *m != member);
        self.values.len() != before
    }

    /// Whether the member is selected.
    pub fn contains(&self, member: P) -> bool {
        self.values.contains(&member)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate the selected members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = P> + '_ {
        self.values.iter().copied()
    }

    /// Wire encoding: labels joined with [`MULTI_VALUE_SEPARATOR`].
    pub fn to_wire(&self) -> String {
        let labels: Vec<&str> = self.values.iter().map(|m| m.label()).collect();
        labels.join(&MULTI_VALUE_SEPARATOR.to_string())
    }

    /// Parse a wire encoding, validating every label.
    pub fn parse(wire: &str) -> Result<Self, UnknownLabel> {
        let mut selection = Self::new();
        for part in wire.split(MULTI_VALUE_SEPARATOR) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let member =
                P::from_label(part).ok_or_else(|| UnknownLabel(part.to_string()))?;
            selection.insert(member);
        }
        Ok(selection)
    }
}

impl<P: Picklist> PartialEq for MultiPicklist<P> {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self.values.iter().all(|m| other.contains(*m))
    }
}

impl<P: Picklist> std::fmt::Display for MultiPicklist<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl<P: Picklist> Serialize for MultiPicklist<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de, P: Picklist> Deserialize<'de> for MultiPicklist<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = String::deserialize(deserializer)?;
        Self::parse(&wire).map_err(D::Error::custom)
    }
}

/// Declare a single-select picklist enum with per-member remote labels.
///
/// ```rust
/// forceql_orm::picklist! {
///     pub enum Industry {
///         Banking => "Banking",
///         Biotechnology => "Biotechnology",
///     }
/// }
/// ```
///
/// The generated enum implements [`Picklist`], `Display`, and serializes
/// to/from its remote label; deserializing an unknown label fails instead
/// of silently mapping to a member.
#[macro_export]
macro_rules! picklist {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $member:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis enum $name {
            $( $(#[$vmeta])* $member ),+
        }

        impl $crate::Picklist for $name {
            const MEMBERS: &'static [Self] = &[ $( Self::$member ),+ ];

            fn label(&self) -> &'static str {
                match self {
                    $( Self::$member => $label ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::Picklist::label(self))
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::Picklist::label(self))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(
                deserializer: D,
            ) -> ::std::result::Result<Self, D::Error> {
                let label = <::std::string::String as ::serde::Deserialize>::deserialize(
                    deserializer,
                )?;
                <$name as $crate::Picklist>::from_label(&label).ok_or_else(|| {
                    <D::Error as ::serde::de::Error>::custom(::std::format!(
                        "unknown picklist label `{}` for {}",
                        label,
                        ::std::stringify!($name),
                    ))
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::picklist! {
        pub enum ActivityType {
            Buyer => "Buyer",
            Manufacturer => "Manufacturer",
            Reseller => "Value Added Reseller",
        }
    }

    #[test]
    fn test_picklist_labels() {
        assert_eq!(ActivityType::Buyer.label(), "Buyer");
        assert_eq!(ActivityType::Reseller.label(), "Value Added Reseller");
        assert_eq!(
            ActivityType::from_label("Value Added Reseller"),
            Some(ActivityType::Reseller)
        );
        assert_eq!(ActivityType::from_label("bogus"), None);
    }

    #[test]
    fn test_picklist_serde_by_label() {
        let json = serde_json::to_string(&ActivityType::Reseller).unwrap();
        assert_eq!(json, "\"Value Added Reseller\"");

        let parsed: ActivityType = serde_json::from_str("\"Buyer\"").unwrap();
        assert_eq!(parsed, ActivityType::Buyer);

        let err = serde_json::from_str::<ActivityType>("\"Nope\"").unwrap_err();
        assert!(err.to_string().contains("unknown picklist label"));
    }

    #[test]
    fn test_multi_picklist_round_trip() {
        let selection = MultiPicklist::from_members([
            ActivityType::Manufacturer,
            ActivityType::Buyer,
            ActivityType::Manufacturer, // duplicate dropped
        ]);

        assert_eq!(selection.len(), 2);
        assert_eq!(selection.to_wire(), "Manufacturer;Buyer");

        let decoded = MultiPicklist::<ActivityType>::parse(&selection.to_wire()).unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded.contains(ActivityType::Buyer));
        assert!(decoded.contains(ActivityType::Manufacturer));
        // order-insensitive equality
        assert_eq!(
            decoded,
            MultiPicklist::from_members([ActivityType::Buyer, ActivityType::Manufacturer])
        );
    }

    #[test]
    fn test_multi_picklist_parse_rejects_unknown_label() {
        let err = MultiPicklist::<ActivityType>::parse("Buyer;Nope").unwrap_err();
        assert_eq!(err.0, "Nope");
    }

    #[test]
    fn test_multi_picklist_empty_wire() {
        let empty = MultiPicklist::<ActivityType>::parse("").unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_wire(), "");
    }

    #[test]
    fn test_multi_picklist_serde() {
        let selection = MultiPicklist::from_members([ActivityType::Buyer]);
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(json, "\"Buyer\"");

        let decoded: MultiPicklist<ActivityType> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, selection);
    }

    #[test]
    fn test_insert_remove() {
        let mut selection = MultiPicklist::new();
        assert!(selection.insert(ActivityType::Buyer));
        assert!(!selection.insert(ActivityType::Buyer));
        assert!(selection.remove(ActivityType::Buyer));
        assert!(!selection.remove(ActivityType::Buyer));
    }
}
