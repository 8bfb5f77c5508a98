use tracing::debug;
use tracing::instrument;

use crate::error::MultipleStructErrors;
use crate::error::StructError;
use crate::schema::StructSchema;

pub(crate) mod cycles;
pub(crate) mod members;

/// Runs every struct and struct union check, collecting all errors before failing.
#[instrument(level = "trace", skip_all, name = "validate_struct_types")]
pub(crate) fn validate_struct_types(schema: &StructSchema) -> Result<(), StructError> {
    let mut errors = MultipleStructErrors::new();
    members::validate_struct_fields(schema, &mut errors);
    members::validate_struct_unions(schema, &mut errors);
    cycles::validate_no_unbreakable_cycles(schema, &mut errors);
    debug!(
        structs = schema.structs().count(),
        struct_unions = schema.struct_unions().count(),
        errors = errors.len(),
        "validated struct types"
    );
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn collects_errors_from_every_check() {
        let schema = StructSchema::parse(
            r#"
            type User { id: ID! }
            struct A { b: B!, owner: User }
            struct B { a: A! }
            structUnion Empty =
            "#,
        )
        .expect("parses");
        let err = validate_struct_types(&schema).expect_err("invalid schema");
        assert_eq!(
            err.codes(),
            [
                ErrorCode::ForbiddenMember,
                ErrorCode::EmptyUnion,
                ErrorCode::Cycle,
                ErrorCode::Cycle,
            ]
        );
    }
}
