//! Depth-first enumeration of encryption candidates.

use super::{Marker, Property, Slot, Traverse};
use serde_json::Value;
use tracing::{debug, trace};

/// Depth at which traversal stops descending.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Walk `root` with [`DEFAULT_MAX_DEPTH`].
pub fn walk<'a>(root: &'a mut dyn Traverse) -> PropertyWalker<'a> {
    PropertyWalker::new(root, DEFAULT_MAX_DEPTH)
}

/// Walk `root`, never descending to `max_depth` or beyond.
pub fn walk_with_depth<'a>(root: &'a mut dyn Traverse, max_depth: usize) -> PropertyWalker<'a> {
    PropertyWalker::new(root, max_depth)
}

#[derive(Debug)]
enum Target<'a> {
    Text(&'a mut String),
    OptText(&'a mut Option<String>),
    Dynamic(&'a mut Value),
}

/// A string-valued encryption candidate found by [`PropertyWalker`].
///
/// The descriptor holds the mutable borrow it was read from, so
/// [`set`](Self::set) always writes back to that exact slot.
#[derive(Debug)]
pub struct PropertyDescriptor<'a> {
    name: &'static str,
    index: Option<usize>,
    target: Target<'a>,
}

impl<'a> PropertyDescriptor<'a> {
    fn from_slot(name: &'static str, index: Option<usize>, slot: Slot<'a>) -> Option<Self> {
        let target = match slot {
            Slot::Text(text) => Target::Text(text),
            Slot::OptText(text) => Target::OptText(text),
            Slot::Dynamic(value) if value.is_string() => Target::Dynamic(value),
            _ => return None,
        };
        Some(Self {
            name,
            index,
            target,
        })
    }

    /// Name of the declaring property. Elements of a list share it.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Position inside the innermost attributed list, if any.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        match &self.target {
            Target::Text(text) => Some(text.as_str()),
            Target::OptText(text) => text.as_deref(),
            Target::Dynamic(value) => value.as_str(),
        }
    }

    /// Write a new value. `None` clears a plain string field.
    pub fn set(&mut self, value: Option<String>) {
        match &mut self.target {
            Target::Text(text) => **text = value.unwrap_or_default(),
            Target::OptText(text) => **text = value,
            Target::Dynamic(slot) => **slot = value.map_or(Value::Null, Value::String),
        }
    }
}

enum Frame<'a> {
    Properties {
        props: std::vec::IntoIter<Property<'a>>,
        depth: usize,
    },
    Elements {
        name: &'static str,
        items: std::iter::Enumerate<std::vec::IntoIter<Slot<'a>>>,
        depth: usize,
        attributed: bool,
    },
}

enum Step<'a> {
    Property(Property<'a>, usize),
    Element {
        name: &'static str,
        index: usize,
        slot: Slot<'a>,
        depth: usize,
        attributed: bool,
    },
}

/// Lazy iterator over the encryption candidates of an object graph.
///
/// Traversal is depth-first and marker-first:
/// - properties that fail to read are skipped;
/// - unmarked properties are descended into when nested (or force-followed)
///   and collections are walked element by element, unless marked
///   do-not-follow;
/// - marked string properties yield a descriptor, marked lists yield one
///   descriptor per string element (stacked lists are descended, keeping
///   the property name), anything else marked is skipped.
///
/// Any branch reaching the depth bound ends silently.
pub struct PropertyWalker<'a> {
    stack: Vec<Frame<'a>>,
    max_depth: usize,
}

impl<'a> PropertyWalker<'a> {
    pub fn new(root: &'a mut dyn Traverse, max_depth: usize) -> Self {
        let mut walker = Self {
            stack: Vec::new(),
            max_depth,
        };
        walker.enter_object(root, 0);
        walker
    }

    fn enter_object(&mut self, object: &'a mut dyn Traverse, depth: usize) {
        if depth >= self.max_depth {
            trace!(depth, "depth bound reached, not descending");
            return;
        }
        let props = object.properties();
        self.stack.push(Frame::Properties {
            props: props.into_iter(),
            depth,
        });
    }

    fn enter_elements(&mut self, name: &'static str, items: Vec<Slot<'a>>, depth: usize, attributed: bool) {
        if depth >= self.max_depth {
            trace!(property = name, depth, "depth bound reached, not descending");
            return;
        }
        self.stack.push(Frame::Elements {
            name,
            items: items.into_iter().enumerate(),
            depth,
            attributed,
        });
    }

    fn visit_property(&mut self, property: Property<'a>, depth: usize) -> Option<PropertyDescriptor<'a>> {
        let (name, markers, value) = property.into_parts();
        let has = |marker: Marker| markers.contains(&marker);

        let slot = match value {
            Ok(slot) => slot,
            Err(error) => {
                debug!(property = name, %error, "skipping unreadable property");
                return None;
            }
        };

        let slot = match slot {
            Slot::Object(object) | Slot::Opaque(object) if has(Marker::Flatten) => {
                self.enter_object(object, depth);
                return None;
            }
            slot => slot,
        };

        if !has(Marker::Encrypt) {
            if has(Marker::DoNotFollow) {
                return None;
            }
            match slot {
                Slot::Object(object) => self.enter_object(object, depth + 1),
                Slot::Opaque(object) if has(Marker::ForceFollow) => self.enter_object(object, depth + 1),
                Slot::List(items) => self.enter_elements(name, items, depth + 1, false),
                _ => {}
            }
            return None;
        }

        match slot {
            Slot::List(items) => {
                self.enter_elements(name, items, depth + 1, true);
                None
            }
            slot => {
                let found = PropertyDescriptor::from_slot(name, None, slot);
                if found.is_none() {
                    trace!(property = name, "marked property has an unsupported type");
                }
                found
            }
        }
    }

    fn visit_element(
        &mut self,
        name: &'static str,
        index: usize,
        slot: Slot<'a>,
        depth: usize,
        attributed: bool,
    ) -> Option<PropertyDescriptor<'a>> {
        if attributed {
            return match slot {
                Slot::List(items) => {
                    self.enter_elements(name, items, depth + 1, true);
                    None
                }
                slot => PropertyDescriptor::from_slot(name, Some(index), slot),
            };
        }

        match slot {
            Slot::Object(object) => self.enter_object(object, depth),
            Slot::List(items) => self.enter_elements(name, items, depth + 1, false),
            _ => {}
        }
        None
    }
}

impl<'a> Iterator for PropertyWalker<'a> {
    type Item = PropertyDescriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.last_mut() {
            let step = match frame {
                Frame::Properties { props, depth } => props.next().map(|p| Step::Property(p, *depth)),
                Frame::Elements {
                    name,
                    items,
                    depth,
                    attributed,
                } => items.next().map(|(index, slot)| Step::Element {
                    name: *name,
                    index,
                    slot,
                    depth: *depth,
                    attributed: *attributed,
                }),
            };

            let found = match step {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Step::Property(property, depth)) => self.visit_property(property, depth),
                Some(Step::Element {
                    name,
                    index,
                    slot,
                    depth,
                    attributed,
                }) => self.visit_element(name, index, slot, depth, attributed),
            };

            if found.is_some() {
                return found;
            }
        }
        None
    }
}
