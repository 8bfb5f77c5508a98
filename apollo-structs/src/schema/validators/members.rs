use apollo_compiler::Name;
use apollo_compiler::collections::IndexSet;

use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::schema::StructSchema;
use crate::schema::StructType;
use crate::schema::TypeKind;

/// Struct fields are argument-free and only reference scalars, enums, structs and struct unions.
pub(crate) fn validate_struct_fields(schema: &StructSchema, errors: &mut MultipleStructErrors) {
    for struct_type in schema.structs() {
        if struct_type.fields.is_empty() {
            errors.push(SingleStructError::EmptyStruct {
                struct_name: struct_type.name.clone(),
            });
        }
        validate_fields_of(schema, struct_type, errors);
    }
}

fn validate_fields_of(
    schema: &StructSchema,
    struct_type: &StructType,
    errors: &mut MultipleStructErrors,
) {
    for field in struct_type.fields.values() {
        if !field.arguments.is_empty() {
            errors.push(SingleStructError::StructFieldArguments {
                struct_name: struct_type.name.clone(),
                field_name: field.name.clone(),
            });
        }

        let member_type = field.ty.inner_named_type();
        match schema.kind_of(member_type) {
            None => errors.push(SingleStructError::UnknownType {
                referenced_by: format!("Field \"{}.{}\"", struct_type.name, field.name),
                type_name: member_type.clone(),
            }),
            Some(kind) if !kind.is_allowed_in_struct() => {
                errors.push(SingleStructError::ForbiddenMember {
                    struct_name: struct_type.name.clone(),
                    field_name: field.name.clone(),
                    member_type: member_type.clone(),
                    member_kind: kind,
                })
            }
            Some(_) => {}
        }
    }
}

/// Struct unions have at least one member, each a distinct struct.
pub(crate) fn validate_struct_unions(schema: &StructSchema, errors: &mut MultipleStructErrors) {
    for union_type in schema.struct_unions() {
        if union_type.members.is_empty() {
            errors.push(SingleStructError::EmptyUnion {
                union_name: union_type.name.clone(),
            });
            continue;
        }

        let mut seen: IndexSet<&Name> = IndexSet::default();
        for member in &union_type.members {
            if !seen.insert(member) {
                errors.push(SingleStructError::DuplicateMember {
                    union_name: union_type.name.clone(),
                    member: member.clone(),
                });
                continue;
            }
            match schema.kind_of(member) {
                None => errors.push(SingleStructError::UnknownType {
                    referenced_by: format!("Struct union \"{}\"", union_type.name),
                    type_name: member.clone(),
                }),
                Some(TypeKind::Struct) => {}
                Some(kind) => errors.push(SingleStructError::InvalidUnionMember {
                    union_name: union_type.name.clone(),
                    member: member.clone(),
                    member_kind: kind,
                }),
            }
        }
    }
}
