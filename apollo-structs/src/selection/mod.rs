//! Selections scoped to struct and struct union types.
//!
//! A struct-typed field is either selected as a whole (a bare field reference) or narrowed to
//! a subset of its fields. Every occurrence of the same field across a document, directly or
//! through fragments, merges into one [`StructSelection`].
use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::collections::IndexMap;
use itertools::Itertools;

mod collect;
mod flatten;
mod merging;
mod response;

pub use collect::MergedOperation;
pub use collect::SelectionMerger;
pub use collect::StructEntry;
pub use collect::Variables;
pub use collect::merge_struct_selections;

/// The effective selection of a struct-typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructSelection {
    /// The field was referenced without a sub-selection somewhere: the value is an atom.
    EntireValue,
    /// Only the listed fields are selected. The set is empty when conditions exclude every
    /// selection of an included occurrence; the value then resolves to an empty object and
    /// renders as `{}`.
    Narrowed(StructSelectionSet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructSelectionSet {
    Struct(FieldSelections),
    Union(UnionSelections),
}

/// Selected fields of one concrete struct. Leaf fields map to [`StructSelection::EntireValue`].
///
/// Equality ignores field order, so merging in any order gives equal results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelections {
    pub type_name: Name,
    pub fields: IndexMap<Name, StructSelection>,
}

/// Per-member selections of a struct union. Every member of the union has an entry (possibly
/// empty); fields selected on the union itself are present in each member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionSelections {
    pub union_name: Name,
    pub members: IndexMap<Name, FieldSelections>,
}

impl StructSelection {
    pub fn is_entire_value(&self) -> bool {
        matches!(self, Self::EntireValue)
    }

    pub fn as_selection_set(&self) -> Option<&StructSelectionSet> {
        match self {
            Self::EntireValue => None,
            Self::Narrowed(selection_set) => Some(selection_set),
        }
    }
}

impl StructSelectionSet {
    pub fn type_name(&self) -> &Name {
        match self {
            Self::Struct(fields) => &fields.type_name,
            Self::Union(union) => &union.union_name,
        }
    }

    /// No field is selected, on any member.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Struct(fields) => fields.fields.is_empty(),
            Self::Union(union) => union.members.values().all(|fields| fields.fields.is_empty()),
        }
    }
}

impl FieldSelections {
    pub fn new(type_name: Name) -> Self {
        Self {
            type_name,
            fields: IndexMap::default(),
        }
    }
}

// Rendering: `{ title socials { twitter } }`, or indented over several lines with `{:#}`.

fn write_indent(f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
    write!(f, "{:width$}", "", width = depth * 2)
}

impl FieldSelections {
    fn write_fields(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        for (name, selection) in &self.fields {
            if f.alternate() {
                write_indent(f, depth)?;
            } else {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            if let StructSelection::Narrowed(selection_set) = selection {
                f.write_str(" ")?;
                selection_set.write_block(f, depth)?;
            }
            if f.alternate() {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

impl StructSelectionSet {
    fn write_block(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{")?;
        if f.alternate() {
            f.write_str("\n")?;
        }
        match self {
            Self::Struct(fields) => fields.write_fields(f, depth + 1)?,
            Self::Union(union) => {
                let selected = union.members.iter().filter(|(_, s)| !s.fields.is_empty());
                for (member, fields) in selected {
                    if f.alternate() {
                        write_indent(f, depth + 1)?;
                    } else {
                        f.write_str(" ")?;
                    }
                    write!(f, "... on {member} {{")?;
                    if f.alternate() {
                        f.write_str("\n")?;
                    }
                    fields.write_fields(f, depth + 2)?;
                    if f.alternate() {
                        write_indent(f, depth + 1)?;
                        f.write_str("}\n")?;
                    } else {
                        f.write_str(" }")?;
                    }
                }
            }
        }
        if f.alternate() {
            write_indent(f, depth)?;
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

impl Display for StructSelectionSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_block(f, 0)
    }
}

impl Display for StructSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntireValue => f.write_str("<entire value>"),
            Self::Narrowed(selection_set) => selection_set.fmt(f),
        }
    }
}

impl Display for StructEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.iter().join("."))?;
        match &self.selection {
            StructSelection::EntireValue => Ok(()),
            StructSelection::Narrowed(selection_set) => {
                f.write_str(" ")?;
                selection_set.fmt(f)
            }
        }
    }
}

impl Display for MergedOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "{} {name}", self.operation_type.name())?,
            None => writeln!(f, "{}", self.operation_type.name())?,
        }
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}
