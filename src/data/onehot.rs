use serde::Serialize;

use super::model::Listing;

// ---------------------------------------------------------------------------
// Group kinds
// ---------------------------------------------------------------------------

/// The categorical variables stored one-hot in the listings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupKind {
    State,
    City,
    Source,
    Pets,
    Photo,
}

impl GroupKind {
    pub fn all() -> &'static [GroupKind] {
        &[
            GroupKind::State,
            GroupKind::City,
            GroupKind::Source,
            GroupKind::Pets,
            GroupKind::Photo,
        ]
    }

    /// Column-name prefix shared by every indicator column of the group.
    pub fn prefix(&self) -> &'static str {
        match self {
            GroupKind::State => "state_",
            GroupKind::City => "cityname_",
            GroupKind::Source => "source_",
            GroupKind::Pets => "pets_allowed_",
            GroupKind::Photo => "has_photo_",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::State => "state",
            GroupKind::City => "city",
            GroupKind::Source => "source",
            GroupKind::Pets => "pets allowed",
            GroupKind::Photo => "has photo",
        }
    }

    pub(crate) fn from_header(header: &str) -> Option<GroupKind> {
        GroupKind::all()
            .iter()
            .copied()
            .find(|k| header.len() > k.prefix().len() && header.starts_with(k.prefix()))
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Decode error
// ---------------------------------------------------------------------------

/// A listing whose indicator columns for one group do not sum to exactly 1.
///
/// This means the prepared data is corrupt, so it is surfaced rather than
/// mapped to some default category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "listing {row}: {group} group expects exactly one active column, found {} ({})",
    .active_columns.len(),
    .active_columns.join(", ")
)]
pub struct DecodeError {
    pub group: GroupKind,
    pub row: usize,
    pub active_columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// OneHotGroup
// ---------------------------------------------------------------------------

/// One indicator column of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Full column name, e.g. `has_photo_Thumbnail`.
    pub column: String,
    /// Column name without the group prefix, e.g. `Thumbnail`.
    pub label: String,
    /// Position in `Listing::indicators`.
    pub indicator: usize,
}

/// A family of mutually-exclusive indicator columns, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotGroup {
    pub kind: GroupKind,
    pub members: Vec<GroupMember>,
}

impl OneHotGroup {
    pub fn new(kind: GroupKind) -> Self {
        Self {
            kind,
            members: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, member: GroupMember) {
        self.members.push(member);
    }

    pub fn prefix(&self) -> &'static str {
        self.kind.prefix()
    }

    /// Member labels in group order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.label.as_str())
    }

    /// Find a member by full column name or by label.
    pub fn member(&self, name: &str) -> Option<&GroupMember> {
        self.members
            .iter()
            .find(|m| m.column == name)
            .or_else(|| self.members.iter().find(|m| m.label == name))
    }

    /// Position in `members` of the single active column of `listing`.
    pub fn decode_position(&self, listing: &Listing) -> Result<usize, DecodeError> {
        let mut found = None;
        let mut active = 0usize;
        for (pos, member) in self.members.iter().enumerate() {
            if listing.indicator(member.indicator) {
                active += 1;
                found.get_or_insert(pos);
            }
        }
        match found {
            Some(pos) if active == 1 => Ok(pos),
            _ => Err(DecodeError {
                group: self.kind,
                row: listing.id,
                active_columns: self
                    .members
                    .iter()
                    .filter(|m| listing.indicator(m.indicator))
                    .map(|m| m.column.clone())
                    .collect(),
            }),
        }
    }

    /// Label of the single active column of `listing`.
    pub fn decode<'g>(&'g self, listing: &Listing) -> Result<&'g str, DecodeError> {
        let pos = self.decode_position(listing)?;
        Ok(self.members[pos].label.as_str())
    }
}
