//! Runtime payload type tags and the compatibility rule used for dispatch.
//!
//! Rust has no subtyping between structs, so "is-a" relationships between
//! payloads are declared explicitly: a payload lists its supertypes and lends
//! out the embedded supertype value when asked. A handler registered for a
//! supertype then receives that embedded value.
//!
//! ```rust
//! use std::any::{Any, TypeId};
//! use stagepipe::core::{Payload, PayloadLineage, PayloadType, PayloadView};
//!
//! struct Entity { id: u32 }
//! impl Payload for Entity {}
//!
//! struct Circle { entity: Entity, radius: u32 }
//! impl Payload for Circle {
//!     fn supertypes() -> Vec<PayloadType> {
//!         PayloadLineage::of::<Entity>().into_types()
//!     }
//!     fn supertype_mut(&mut self, ty: TypeId) -> Option<&mut dyn Any> {
//!         self.entity.view_mut(ty)
//!     }
//! }
//!
//! let lineage = PayloadLineage::of::<Circle>();
//! assert!(lineage.accepts(PayloadType::of::<Entity>()));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A runtime tag identifying one payload type.
#[derive(Debug, Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    /// Returns the tag for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl Hash for PayloadType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A value that can be passed through a pipeline as a command payload.
///
/// Leaf types implement this with an empty `impl`. Types that "extend"
/// another payload list it in [`Payload::supertypes`] and return the
/// embedded value from [`Payload::supertype_mut`].
pub trait Payload: Any {
    /// Supertypes this payload can stand in for, nearest first, including
    /// the supertypes of those supertypes.
    fn supertypes() -> Vec<PayloadType>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Borrows the embedded value of supertype `ty`, if this payload has one.
    fn supertype_mut(&mut self, ty: TypeId) -> Option<&mut dyn Any> {
        let _ = ty;
        None
    }
}

/// Object-safe access to a payload viewed as any of its types.
pub trait PayloadView {
    /// The concrete payload type.
    fn payload_type(&self) -> PayloadType;

    /// Borrows the payload as `ty`: itself when `ty` is its own type,
    /// otherwise the embedded supertype value.
    fn view_mut(&mut self, ty: TypeId) -> Option<&mut dyn Any>;
}

impl<P: Payload> PayloadView for P {
    fn payload_type(&self) -> PayloadType {
        PayloadType::of::<P>()
    }

    fn view_mut(&mut self, ty: TypeId) -> Option<&mut dyn Any> {
        if ty == TypeId::of::<P>() {
            Some(self as &mut dyn Any)
        } else {
            self.supertype_mut(ty)
        }
    }
}

/// The requested payload type of a call followed by all its supertypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLineage {
    types: Vec<PayloadType>,
}

impl PayloadLineage {
    /// Builds the lineage of `P`.
    #[must_use]
    pub fn of<P: Payload>() -> Self {
        let mut types = vec![PayloadType::of::<P>()];
        for ty in P::supertypes() {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        Self { types }
    }

    /// The requested type itself.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        self.types[0]
    }

    /// Every type in the lineage, most specific first.
    #[must_use]
    pub fn types(&self) -> &[PayloadType] {
        &self.types
    }

    /// Consumes the lineage, returning its types.
    #[must_use]
    pub fn into_types(self) -> Vec<PayloadType> {
        self.types
    }

    /// Returns true if a handler declared for `declared` applies.
    #[must_use]
    pub fn accepts(&self, declared: PayloadType) -> bool {
        is_assignable(self, declared)
    }
}

/// The dispatch compatibility rule: a handler declared for `declared`
/// applies when `declared` is the requested type or one of its supertypes.
#[must_use]
pub fn is_assignable(requested: &PayloadLineage, declared: PayloadType) -> bool {
    requested.types.iter().any(|ty| *ty == declared)
}

macro_rules! impl_leaf_payload {
    ($($ty:ty),* $(,)?) => {
        $(impl Payload for $ty {})*
    };
}

impl_leaf_payload!(
    String,
    &'static str,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    (),
);

impl<T: 'static> Payload for Vec<T> {}
