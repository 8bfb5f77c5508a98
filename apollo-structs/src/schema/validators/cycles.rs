use tracing::trace;

use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::schema::StructSchema;
use crate::schema::field_graph::FieldTypeGraph;

/// A struct is impossible to instantiate when its reachable field graph contains a cycle made
/// only of non-null, non-list references. Such a cycle is reported for every struct that reaches
/// it. Cycles through a nullable field or a list are valid recursion, and so are cycles through
/// a struct union with a member that can be built without them.
pub(crate) fn validate_no_unbreakable_cycles(
    schema: &StructSchema,
    errors: &mut MultipleStructErrors,
) {
    let graph = FieldTypeGraph::new(schema);
    for struct_type in schema.structs() {
        let Some(root) = graph.node(&struct_type.name) else {
            continue;
        };
        if let Some(cycle) = graph.find_unbreakable_cycle(root) {
            let path = graph.describe_cycle(&cycle);
            trace!(struct_name = %struct_type.name, %path, "found unbreakable cycle");
            errors.push(SingleStructError::Cycle {
                type_name: struct_type.name.clone(),
                path,
            });
        }
    }
}
