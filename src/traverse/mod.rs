//! Marker-driven property traversal over settings object graphs.
//!
//! Rust has no runtime reflection, so every settings type describes its
//! own fields once through [`Traverse`]. Each field is exposed as a
//! [`Property`]: a name, a set of [`Marker`]s and a [`Slot`] that carries
//! both the declared shape of the field and a mutable borrow of it.
//!
//! The [`traversable!`](crate::traversable) macro writes the accessor
//! table for plain structs:
//!
//! ```
//! use settings_vault::traversable;
//!
//! #[derive(Default)]
//! struct Credentials {
//!     user: String,
//!     password: String,
//! }
//!
//! traversable!(Credentials {
//!     user,
//!     #[encrypt]
//!     password,
//! });
//! ```
//!
//! [`walk`] then enumerates every encryption candidate as a
//! [`PropertyDescriptor`].

mod field;
mod walker;

pub use walker::{DEFAULT_MAX_DEPTH, PropertyDescriptor, PropertyWalker, walk, walk_with_depth};

use crate::error::PropertyError;

/// Metadata attached to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// The property is an encryption candidate.
    Encrypt,
    /// Never descend into this property.
    DoNotFollow,
    /// Descend into this property even if its shape looks like a leaf.
    ForceFollow,
    /// Splice the embedded struct's properties into the parent at the same depth.
    Flatten,
}

/// How a non-traversable leaf value is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// Numbers, booleans, chars.
    Primitive,
    /// Library types such as paths, durations and addresses.
    BuiltIn,
    /// Dictionaries are never treated as collections.
    Map,
}

/// Declared shape of a field together with a mutable borrow of its value.
pub enum Slot<'a> {
    /// A string field.
    Text(&'a mut String),
    /// An optional string field.
    OptText(&'a mut Option<String>),
    /// An untyped slot; supported while it holds a string.
    Dynamic(&'a mut serde_json::Value),
    /// A nested settings object.
    Object(&'a mut dyn Traverse),
    /// A traversable object the nesting heuristic treats as a leaf.
    Opaque(&'a mut dyn Traverse),
    /// A collection, one slot per element.
    List(Vec<Slot<'a>>),
    /// An absent optional value.
    Null,
    /// A value that never contains candidates.
    Leaf(LeafKind),
}

impl Slot<'_> {
    /// Whether this slot can hold a string value for a descriptor.
    pub fn is_text(&self) -> bool {
        match self {
            Slot::Text(_) | Slot::OptText(_) => true,
            Slot::Dynamic(value) => value.is_string(),
            _ => false,
        }
    }

    /// Whether the nesting heuristic considers this slot a nested object.
    pub fn is_nested(&self) -> bool {
        matches!(self, Slot::Object(_) | Slot::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Slot::List(_))
    }
}

impl std::fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Slot::OptText(s) => f.debug_tuple("OptText").field(s).finish(),
            Slot::Dynamic(v) => f.debug_tuple("Dynamic").field(v).finish(),
            Slot::Object(_) => f.write_str("Object(..)"),
            Slot::Opaque(_) => f.write_str("Opaque(..)"),
            Slot::List(items) => f.debug_tuple("List").field(&items.len()).finish(),
            Slot::Null => f.write_str("Null"),
            Slot::Leaf(kind) => f.debug_tuple("Leaf").field(kind).finish(),
        }
    }
}

/// One field of a traversable object.
#[derive(Debug)]
pub struct Property<'a> {
    name: &'static str,
    markers: &'static [Marker],
    value: Result<Slot<'a>, PropertyError>,
}

impl<'a> Property<'a> {
    pub fn new(name: &'static str, markers: &'static [Marker], slot: Slot<'a>) -> Self {
        Self {
            name,
            markers,
            value: Ok(slot),
        }
    }

    /// A property whose value could not be produced (for example a failing
    /// computed accessor). Traversal skips it.
    pub fn failed(name: &'static str, markers: &'static [Marker], error: PropertyError) -> Self {
        Self {
            name,
            markers,
            value: Err(error),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    pub(crate) fn into_parts(self) -> (&'static str, &'static [Marker], Result<Slot<'a>, PropertyError>) {
        (self.name, self.markers, self.value)
    }
}

/// An object that can enumerate its own properties.
///
/// The default implementation exposes nothing, which suits settings
/// types without encrypted fields.
pub trait Traverse {
    fn properties(&mut self) -> Vec<Property<'_>> {
        Vec::new()
    }
}

/// Maps a field's Rust type to a [`Slot`].
pub trait Field {
    fn slot(&mut self) -> Slot<'_>;

    /// Slot for an `Option<Self>` field. Strings override this so an empty
    /// optional string stays a writable text slot.
    fn option_slot(option: &mut Option<Self>) -> Slot<'_>
    where
        Self: Sized,
    {
        match option {
            Some(value) => value.slot(),
            None => Slot::Null,
        }
    }
}

/// Implements [`Traverse`] and [`Field`] for a struct from a field list.
///
/// Fields may carry the markers `#[encrypt]`, `#[do_not_follow]`,
/// `#[force_follow]` and `#[flatten]`. Prefix the type with `opaque` to
/// expose it as [`Slot::Opaque`] instead of [`Slot::Object`].
#[macro_export]
macro_rules! traversable {
    (opaque $ty:ty { $( $(#[$marker:ident])* $field:ident ),* $(,)? }) => {
        $crate::traversable!(@properties $ty { $( $(#[$marker])* $field ),* });

        impl $crate::traverse::Field for $ty {
            fn slot(&mut self) -> $crate::traverse::Slot<'_> {
                $crate::traverse::Slot::Opaque(self)
            }
        }
    };
    (@properties $ty:ty { $( $(#[$marker:ident])* $field:ident ),* $(,)? }) => {
        impl $crate::traverse::Traverse for $ty {
            fn properties(&mut self) -> ::std::vec::Vec<$crate::traverse::Property<'_>> {
                ::std::vec![
                    $(
                        $crate::traverse::Property::new(
                            ::std::stringify!($field),
                            &[$($crate::__marker!($marker)),*],
                            $crate::traverse::Field::slot(&mut self.$field),
                        )
                    ),*
                ]
            }
        }
    };
    ($ty:ty { $( $(#[$marker:ident])* $field:ident ),* $(,)? }) => {
        $crate::traversable!(@properties $ty { $( $(#[$marker])* $field ),* });

        impl $crate::traverse::Field for $ty {
            fn slot(&mut self) -> $crate::traverse::Slot<'_> {
                $crate::traverse::Slot::Object(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __marker {
    (encrypt) => {
        $crate::traverse::Marker::Encrypt
    };
    (do_not_follow) => {
        $crate::traverse::Marker::DoNotFollow
    };
    (force_follow) => {
        $crate::traverse::Marker::ForceFollow
    };
    (flatten) => {
        $crate::traverse::Marker::Flatten
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Marked {
        plain: String,
        secret: String,
        count: u32,
    }

    crate::traversable!(Marked {
        plain,
        #[encrypt]
        secret,
        #[encrypt]
        #[do_not_follow]
        count,
    });

    #[test]
    fn test_macro_lists_fields_in_order() {
        let mut marked = Marked::default();
        let props = marked.properties();
        let names: Vec<_> = props.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["plain", "secret", "count"]);
    }

    #[test]
    fn test_macro_markers() {
        let mut marked = Marked::default();
        let props = marked.properties();
        assert!(!props[0].has(Marker::Encrypt));
        assert!(props[1].has(Marker::Encrypt));
        assert!(props[2].has(Marker::Encrypt));
        assert!(props[2].has(Marker::DoNotFollow));
    }

    #[test]
    fn test_slot_shapes() {
        let mut text = String::from("x");
        assert!(Slot::Text(&mut text).is_text());

        let mut dynamic = serde_json::json!(42);
        assert!(!Slot::Dynamic(&mut dynamic).is_text());

        let mut marked = Marked::default();
        assert!(marked.slot().is_nested());
        assert!(Slot::Null.is_nested());
        assert!(!Slot::Leaf(LeafKind::Map).is_nested());
    }

    #[test]
    fn test_default_traverse_is_empty() {
        struct Nothing;
        impl Traverse for Nothing {}
        assert!(Nothing.properties().is_empty());
    }
}
