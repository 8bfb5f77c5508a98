//! Combining struct selections.
//!
//! Merging is a join: it is commutative, associative and idempotent, and
//! [`StructSelection::EntireValue`] absorbs everything it is merged with.
use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use indexmap::map::Entry;

use super::FieldSelections;
use super::StructSelection;
use super::StructSelectionSet;
use super::UnionSelections;
use crate::bail;
use crate::error::StructError;

impl StructSelection {
    /// Merges `others` into this selection.
    ///
    /// # Errors
    /// Returns an internal error when two narrowed selections are not scoped to the same type.
    /// Selections of the same field always share a scope in a validated document.
    pub fn merge_into<'op>(
        &mut self,
        others: impl Iterator<Item = &'op StructSelection>,
    ) -> Result<(), StructError> {
        for other in others {
            match (&mut *self, other) {
                (StructSelection::EntireValue, _) => return Ok(()),
                (this, StructSelection::EntireValue) => {
                    *this = StructSelection::EntireValue;
                    return Ok(());
                }
                (StructSelection::Narrowed(this), StructSelection::Narrowed(other)) => {
                    this.merge_into(other)?;
                }
            }
        }
        Ok(())
    }

    /// Owned form of [`StructSelection::merge_into`].
    pub fn merge(mut self, other: &StructSelection) -> Result<Self, StructError> {
        self.merge_into(std::iter::once(other))?;
        Ok(self)
    }
}

impl StructSelectionSet {
    pub(crate) fn merge_into(&mut self, other: &StructSelectionSet) -> Result<(), StructError> {
        match (self, other) {
            (StructSelectionSet::Struct(this), StructSelectionSet::Struct(other)) => {
                this.merge_into(other)
            }
            (StructSelectionSet::Union(this), StructSelectionSet::Union(other)) => {
                this.merge_into(other)
            }
            (this, other) => bail!(
                "Cannot merge selections scoped to \"{}\" and \"{}\"",
                this.type_name(),
                other.type_name()
            ),
        }
    }
}

impl FieldSelections {
    pub(crate) fn merge_into(&mut self, other: &FieldSelections) -> Result<(), StructError> {
        if self.type_name != other.type_name {
            bail!(
                "Cannot merge field selections of \"{}\" and \"{}\"",
                self.type_name,
                other.type_name
            );
        }
        merge_field_maps(&mut self.fields, &other.fields)
    }
}

impl UnionSelections {
    pub(crate) fn merge_into(&mut self, other: &UnionSelections) -> Result<(), StructError> {
        if self.union_name != other.union_name {
            bail!(
                "Cannot merge selections of struct unions \"{}\" and \"{}\"",
                self.union_name,
                other.union_name
            );
        }
        for (member, fields) in &other.members {
            match self.members.entry(member.clone()) {
                Entry::Occupied(mut existing) => existing.get_mut().merge_into(fields)?,
                Entry::Vacant(vacant) => {
                    vacant.insert(fields.clone());
                }
            }
        }
        Ok(())
    }
}

fn merge_field_maps(
    target: &mut IndexMap<Name, StructSelection>,
    source: &IndexMap<Name, StructSelection>,
) -> Result<(), StructError> {
    for (name, selection) in source {
        match target.entry(name.clone()) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge_into(std::iter::once(selection))?
            }
            Entry::Vacant(vacant) => {
                vacant.insert(selection.clone());
            }
        }
    }
    Ok(())
}
