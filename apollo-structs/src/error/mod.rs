use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use apollo_compiler::Name;

use crate::schema::TypeKind;

/// Create an internal error.
///
/// # Example
/// ```rust
/// use apollo_structs::internal_error;
/// use apollo_structs::error::StructError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), StructError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::StructError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

/// Which pass an error belongs to, and so who it should be reported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorCategory {
    /// Fatal to schema construction, reported to the schema author.
    SchemaShape,
    /// Fatal to query validation, reported to the query author before execution.
    QueryShape,
    /// Reported per offending input path.
    InputCoercion,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Internal,
    InvalidGraphql,
    // schema shape
    Cycle,
    ForbiddenMember,
    EmptyUnion,
    DuplicateMember,
    UnknownType,
    InvalidUnionMember,
    StructFieldArguments,
    EmptyStruct,
    DuplicateTypeDefinition,
    DuplicateFieldDefinition,
    // query shape
    AliasNotAllowed,
    DirectiveNotAllowed,
    ArgumentsNotAllowed,
    UnknownField,
    UnknownFragment,
    FragmentCycle,
    UnknownMemberFieldOnUnion,
    SubselectionOnLeaf,
    InvalidFragmentTarget,
    // input coercion
    MissingDiscriminator,
    UnknownDiscriminator,
    TypeMismatch,
    InvalidInputValue,
    MissingRequiredField,
    UnknownInputField,
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Internal => ErrorCategory::Internal,
            Self::InvalidGraphql
            | Self::Cycle
            | Self::ForbiddenMember
            | Self::EmptyUnion
            | Self::DuplicateMember
            | Self::UnknownType
            | Self::InvalidUnionMember
            | Self::StructFieldArguments
            | Self::EmptyStruct
            | Self::DuplicateTypeDefinition
            | Self::DuplicateFieldDefinition => ErrorCategory::SchemaShape,
            Self::AliasNotAllowed
            | Self::DirectiveNotAllowed
            | Self::ArgumentsNotAllowed
            | Self::UnknownField
            | Self::UnknownFragment
            | Self::FragmentCycle
            | Self::UnknownMemberFieldOnUnion
            | Self::SubselectionOnLeaf
            | Self::InvalidFragmentTarget => ErrorCategory::QueryShape,
            Self::MissingDiscriminator
            | Self::UnknownDiscriminator
            | Self::TypeMismatch
            | Self::InvalidInputValue
            | Self::MissingRequiredField
            | Self::UnknownInputField => ErrorCategory::InputCoercion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SingleStructError {
    #[error(
        "An internal error has occurred, please report this bug to Apollo.\n\nDetails: {message}"
    )]
    Internal { message: String },
    /// The schema or the executable document could not be read.
    #[error("{message}")]
    InvalidGraphQL { message: String },

    #[error("Struct \"{type_name}\" can never be instantiated: unbreakable cycle {path}")]
    Cycle { type_name: Name, path: String },
    #[error(
        "Field \"{struct_name}.{field_name}\" has type \"{member_type}\" which is {member_kind}; struct fields may only reference scalars, enums, structs and struct unions"
    )]
    ForbiddenMember {
        struct_name: Name,
        field_name: Name,
        member_type: Name,
        member_kind: TypeKind,
    },
    #[error("Struct union \"{union_name}\" must have at least one member")]
    EmptyUnion { union_name: Name },
    #[error("Struct union \"{union_name}\" includes member \"{member}\" more than once")]
    DuplicateMember { union_name: Name, member: Name },
    #[error("{referenced_by} references unknown type \"{type_name}\"")]
    UnknownType {
        referenced_by: String,
        type_name: Name,
    },
    #[error(
        "Struct union \"{union_name}\" member \"{member}\" is {member_kind}; struct union members must be structs"
    )]
    InvalidUnionMember {
        union_name: Name,
        member: Name,
        member_kind: TypeKind,
    },
    #[error("Field \"{struct_name}.{field_name}\" cannot declare arguments: struct fields are plain data")]
    StructFieldArguments { struct_name: Name, field_name: Name },
    #[error("Struct \"{struct_name}\" must define at least one field")]
    EmptyStruct { struct_name: Name },
    #[error("There can be only one type named \"{type_name}\"")]
    DuplicateTypeDefinition { type_name: Name },
    #[error("Field \"{type_name}.{field_name}\" can only be defined once")]
    DuplicateFieldDefinition { type_name: Name, field_name: Name },

    #[error("Alias \"{alias}\" is not allowed on struct field \"{type_name}.{field_name}\"")]
    AliasNotAllowed {
        type_name: Name,
        field_name: Name,
        alias: Name,
    },
    #[error(
        "Directive \"@{directive_name}\" is not allowed on struct field \"{type_name}.{field_name}\""
    )]
    DirectiveNotAllowed {
        type_name: Name,
        field_name: Name,
        directive_name: Name,
    },
    #[error("Struct field \"{type_name}.{field_name}\" does not accept arguments")]
    ArgumentsNotAllowed { type_name: Name, field_name: Name },
    #[error("Cannot query field \"{field_name}\" on type \"{type_name}\"")]
    UnknownField { type_name: Name, field_name: Name },
    #[error("Unknown fragment \"{fragment_name}\"")]
    UnknownFragment { fragment_name: Name },
    #[error("Cannot spread fragment \"{fragment_name}\" within itself via {path}")]
    FragmentCycle { fragment_name: Name, path: String },
    #[error(
        "Field \"{field_name}\" is not defined by every member of struct union \"{union_name}\"; use an inline fragment on a concrete member to select it"
    )]
    UnknownMemberFieldOnUnion { union_name: Name, field_name: Name },
    #[error(
        "Field \"{type_name}.{field_name}\" of leaf type \"{field_type}\" must not have a selection"
    )]
    SubselectionOnLeaf {
        type_name: Name,
        field_name: Name,
        field_type: Name,
    },
    #[error("Fragment on \"{type_condition}\" can never apply within \"{scope}\"")]
    InvalidFragmentTarget { type_condition: Name, scope: Name },

    #[error(
        "Input value at \"{path}\" for struct union \"{union_name}\" must specify its concrete struct with \"__typename\""
    )]
    MissingDiscriminator { path: String, union_name: Name },
    #[error(
        "Input value at \"{path}\" has \"__typename\" \"{discriminator}\" which is not a member of struct union \"{union_name}\""
    )]
    UnknownDiscriminator {
        path: String,
        union_name: Name,
        discriminator: String,
    },
    #[error("Input value at \"{path}\" declares \"__typename\" \"{found}\" but \"{expected}\" was expected")]
    TypeMismatch {
        path: String,
        expected: Name,
        found: String,
    },
    #[error("Invalid input value at \"{path}\": {message}")]
    InvalidInputValue { path: String, message: String },
    #[error("Input value at \"{path}\" is missing required field \"{type_name}.{field_name}\"")]
    MissingRequiredField {
        path: String,
        type_name: Name,
        field_name: Name,
    },
    #[error("Input value at \"{path}\" has field \"{field_name}\" which is not defined by \"{type_name}\"")]
    UnknownInputField {
        path: String,
        type_name: Name,
        field_name: String,
    },
}

impl SingleStructError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidGraphQL { .. } => ErrorCode::InvalidGraphql,
            Self::Cycle { .. } => ErrorCode::Cycle,
            Self::ForbiddenMember { .. } => ErrorCode::ForbiddenMember,
            Self::EmptyUnion { .. } => ErrorCode::EmptyUnion,
            Self::DuplicateMember { .. } => ErrorCode::DuplicateMember,
            Self::UnknownType { .. } => ErrorCode::UnknownType,
            Self::InvalidUnionMember { .. } => ErrorCode::InvalidUnionMember,
            Self::StructFieldArguments { .. } => ErrorCode::StructFieldArguments,
            Self::EmptyStruct { .. } => ErrorCode::EmptyStruct,
            Self::DuplicateTypeDefinition { .. } => ErrorCode::DuplicateTypeDefinition,
            Self::DuplicateFieldDefinition { .. } => ErrorCode::DuplicateFieldDefinition,
            Self::AliasNotAllowed { .. } => ErrorCode::AliasNotAllowed,
            Self::DirectiveNotAllowed { .. } => ErrorCode::DirectiveNotAllowed,
            Self::ArgumentsNotAllowed { .. } => ErrorCode::ArgumentsNotAllowed,
            Self::UnknownField { .. } => ErrorCode::UnknownField,
            Self::UnknownFragment { .. } => ErrorCode::UnknownFragment,
            Self::FragmentCycle { .. } => ErrorCode::FragmentCycle,
            Self::UnknownMemberFieldOnUnion { .. } => ErrorCode::UnknownMemberFieldOnUnion,
            Self::SubselectionOnLeaf { .. } => ErrorCode::SubselectionOnLeaf,
            Self::InvalidFragmentTarget { .. } => ErrorCode::InvalidFragmentTarget,
            Self::MissingDiscriminator { .. } => ErrorCode::MissingDiscriminator,
            Self::UnknownDiscriminator { .. } => ErrorCode::UnknownDiscriminator,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::InvalidInputValue { .. } => ErrorCode::InvalidInputValue,
            Self::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            Self::UnknownInputField { .. } => ErrorCode::UnknownInputField,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

/// Errors collected over a whole pass. Pushing an error that was already recorded is a no-op,
/// so a problem reached through several fragment spreads is reported once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipleStructErrors {
    pub errors: Vec<SingleStructError>,
}

impl MultipleStructErrors {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    pub fn push(&mut self, error: SingleStructError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn extend(&mut self, other: Self) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub(crate) fn into_result(mut self) -> Result<(), StructError> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0).into()),
            _ => Err(self.into()),
        }
    }
}

impl Display for MultipleStructErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "The following errors occurred:")?;
        for error in &self.errors {
            let message = error.to_string();
            let mut lines = message.lines();
            if let Some(first) = lines.next() {
                write!(f, "\n  - {first}")?;
            }
            for line in lines {
                write!(f, "\n    {line}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MultipleStructErrors {}

impl FromIterator<SingleStructError> for MultipleStructErrors {
    fn from_iter<T: IntoIterator<Item = SingleStructError>>(iter: T) -> Self {
        let mut errors = Self::new();
        for error in iter {
            errors.push(error);
        }
        errors
    }
}

impl From<SingleStructError> for MultipleStructErrors {
    fn from(error: SingleStructError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructError {
    #[error(transparent)]
    SingleStructError(#[from] SingleStructError),
    #[error(transparent)]
    MultipleStructErrors(#[from] MultipleStructErrors),
}

impl StructError {
    pub fn internal(message: impl Into<String>) -> Self {
        SingleStructError::Internal {
            message: message.into(),
        }
        .into()
    }

    /// Every individual error, in the order they were found.
    pub fn errors(&self) -> Vec<&SingleStructError> {
        match self {
            Self::SingleStructError(error) => vec![error],
            Self::MultipleStructErrors(errors) => errors.errors.iter().collect(),
        }
    }

    pub fn into_errors(self) -> Vec<SingleStructError> {
        match self {
            Self::SingleStructError(error) => vec![error],
            Self::MultipleStructErrors(errors) => errors.errors,
        }
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors().into_iter().map(SingleStructError::code).collect()
    }

    /// Renders every message on its own line, for logs and snapshots.
    pub fn messages(&self) -> String {
        let mut out = String::new();
        for error in self.errors() {
            let _ = writeln!(out, "[{}] {error}", error.code());
        }
        out
    }
}

impl From<StructError> for MultipleStructErrors {
    fn from(value: StructError) -> Self {
        value.into_errors().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn duplicate_errors_are_recorded_once() {
        let mut errors = MultipleStructErrors::new();
        let unknown = SingleStructError::UnknownFragment {
            fragment_name: name!("Missing"),
        };
        errors.push(unknown.clone());
        errors.push(unknown);
        errors.push(SingleStructError::EmptyUnion {
            union_name: name!("Empty"),
        });
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn single_error_is_not_wrapped() {
        let errors: MultipleStructErrors = [SingleStructError::EmptyUnion {
            union_name: name!("Empty"),
        }]
        .into_iter()
        .collect();
        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, StructError::SingleStructError(_)));
        assert_eq!(
            err.to_string(),
            "Struct union \"Empty\" must have at least one member"
        );
    }

    #[test]
    fn multiple_errors_render_as_a_list() {
        let errors: MultipleStructErrors = [
            SingleStructError::UnknownFragment {
                fragment_name: name!("A"),
            },
            SingleStructError::UnknownFragment {
                fragment_name: name!("B"),
            },
        ]
        .into_iter()
        .collect();
        let err = errors.into_result().unwrap_err();
        insta::assert_snapshot!(err, @r###"
        The following errors occurred:
          - Unknown fragment "A"
          - Unknown fragment "B"
        "###);
        insta::assert_snapshot!(err.messages(), @r###"
        [UNKNOWN_FRAGMENT] Unknown fragment "A"
        [UNKNOWN_FRAGMENT] Unknown fragment "B"
        "###);
    }

    #[test]
    fn every_code_has_a_category() {
        for code in ErrorCode::iter() {
            let category = code.category();
            if code == ErrorCode::Internal {
                assert_eq!(category, ErrorCategory::Internal);
            } else {
                assert_ne!(category, ErrorCategory::Internal, "{code}");
            }
        }
        assert_eq!(ErrorCode::MissingDiscriminator.to_string(), "MISSING_DISCRIMINATOR");
        assert_eq!(ErrorCategory::QueryShape.to_string(), "query-shape");
    }
}
