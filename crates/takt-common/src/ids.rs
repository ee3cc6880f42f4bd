//! Dense entity identifiers.
//!
//! String codes from the request are interned once at problem build; the
//! engine then works exclusively with these `u32` newtypes, which double as
//! indexes into the problem's flat arrays.

/// Identity of an item (material / SKU). Index into per-item arrays.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u32);

/// Identity of a router (production process).
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouterId(pub(crate) u32);

/// Identity of a production line.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct LineId(pub(crate) u32);

/// Index of a time slot on the horizon, 0..N. Slots are totally ordered
/// by this index.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotId(pub(crate) u32);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            #[inline]
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub fn as_index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_id!(ItemId);
impl_id!(RouterId);
impl_id!(LineId);
impl_id!(SlotId);

impl SlotId {
    /// The slot immediately before this one, if any.
    #[inline]
    pub fn prev(self) -> Option<SlotId> {
        self.0.checked_sub(1).map(SlotId)
    }

    /// The slot immediately after this one, unchecked against the horizon.
    #[inline]
    pub fn next(self) -> SlotId {
        SlotId(self.0 + 1)
    }
}
