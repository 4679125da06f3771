//! Enum-like group members: a named constant drawn from an IR-declared
//! [`Group`](https://docs.rs/protoscript-ir) descriptor.
//!
//! `protoscript-core` cannot name `protoscript-ir::model::Group` directly
//! (the dependency runs the other way: the IR crate's `Literal::to_value`
//! already returns `protoscript_core::value::Value`). Instead of a live
//! pointer into the IR module, a `PsGroup` copies the member's declared
//! scalar payload at the point a `const` instruction resolves it — the
//! group descriptor itself never needs re-visiting after that, so the copy
//! is observably identical to a pointer for every operation spec.md
//! describes (equality, `member_get`-free value use, display). See
//! `DESIGN.md`'s Open Question on this.

use ordered_float::OrderedFloat;

/// The primitive payload a group member carries, per its declared base type.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Byte(u8),
    Glyph(char),
    String(Box<str>),
}

/// One resolved `Group.Member` constant.
#[derive(Debug, Clone)]
pub struct PsGroup {
    pub group_name: Box<str>,
    pub member_name: Box<str>,
    pub scalar: GroupScalar,
}

impl PsGroup {
    pub fn new(group_name: impl Into<Box<str>>, member_name: impl Into<Box<str>>, scalar: GroupScalar) -> Self {
        PsGroup {
            group_name: group_name.into(),
            member_name: member_name.into(),
            scalar,
        }
    }

    /// Two group values are equal iff they name the same member of the same
    /// group; the scalar payload is derived, not independently compared
    /// (two members of the same group never share a name with different
    /// payloads, by construction of the IR loader).
    pub fn same_member(&self, other: &PsGroup) -> bool {
        self.group_name == other.group_name && self.member_name == other.member_name
    }

    pub fn hash_key(&self) -> (&str, &str) {
        (&self.group_name, &self.member_name)
    }
}

impl GroupScalar {
    pub fn ordered_key(&self) -> Option<OrderedFloat<f64>> {
        match self {
            GroupScalar::Int(i) => Some(OrderedFloat(*i as f64)),
            GroupScalar::Float(f) => Some(OrderedFloat(*f)),
            GroupScalar::Byte(b) => Some(OrderedFloat(*b as f64)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_member_requires_matching_group_and_member_names() {
        let a = PsGroup::new("Color", "Red", GroupScalar::Int(0));
        let b = PsGroup::new("Color", "Red", GroupScalar::Int(0));
        let c = PsGroup::new("Color", "Blue", GroupScalar::Int(2));
        assert!(a.same_member(&b));
        assert!(!a.same_member(&c));
    }
}
