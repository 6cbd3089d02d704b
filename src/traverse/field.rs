//! [`Field`] implementations for standard library types.

use super::{Field, LeafKind, Slot};
use std::collections::{BTreeMap, HashMap, VecDeque};

impl Field for String {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Text(self)
    }

    fn option_slot(option: &mut Option<Self>) -> Slot<'_> {
        Slot::OptText(option)
    }
}

impl Field for serde_json::Value {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Dynamic(self)
    }
}

impl<T: Field> Field for Option<T> {
    fn slot(&mut self) -> Slot<'_> {
        T::option_slot(self)
    }
}

impl<T: Field + ?Sized> Field for Box<T> {
    fn slot(&mut self) -> Slot<'_> {
        (**self).slot()
    }
}

impl<T: Field> Field for Vec<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::List(self.iter_mut().map(|item| item.slot()).collect())
    }
}

impl<T: Field> Field for VecDeque<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::List(self.iter_mut().map(|item| item.slot()).collect())
    }
}

impl<T: Field, const N: usize> Field for [T; N] {
    fn slot(&mut self) -> Slot<'_> {
        Slot::List(self.iter_mut().map(|item| item.slot()).collect())
    }
}

impl<K, V> Field for HashMap<K, V> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Leaf(LeafKind::Map)
    }
}

impl<K, V> Field for BTreeMap<K, V> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Leaf(LeafKind::Map)
    }
}

macro_rules! leaf_fields {
    ($kind:expr => $($ty:ty),* $(,)?) => {
        $(
            impl Field for $ty {
                fn slot(&mut self) -> Slot<'_> {
                    Slot::Leaf($kind)
                }
            }
        )*
    };
}

leaf_fields!(LeafKind::Primitive => bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64);

leaf_fields!(LeafKind::BuiltIn =>
    std::path::PathBuf,
    std::time::Duration,
    std::net::IpAddr,
    std::net::Ipv4Addr,
    std::net::Ipv6Addr,
    std::net::SocketAddr,
);
