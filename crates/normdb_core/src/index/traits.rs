//! Index definition traits.

use crate::schema::{Schema, StoredIn};

/// Names an ordered index of one schema.
///
/// Implemented by marker types; the marker keys the index in the backing
/// storage, so one member type can have several ordered indices. A marker
/// may also implement [`GroupedIndexDef`]; the two indices are kept apart.
pub trait OrderedIndexDef: 'static {
    /// Schema the index belongs to.
    type Schema: Schema;
    /// Entity type whose identities the index holds.
    type Member: StoredIn<Self::Schema>;

    /// Returns the index name used in logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Names a grouped index of one schema.
///
/// Groups are keyed by identities of `Group`; each group holds an ordered
/// index of `Member` identities.
pub trait GroupedIndexDef: 'static {
    /// Schema the index belongs to.
    type Schema: Schema;
    /// Entity type whose identities key the groups.
    type Group: StoredIn<Self::Schema>;
    /// Entity type whose identities the groups hold.
    type Member: StoredIn<Self::Schema>;

    /// Returns the index name used in logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
