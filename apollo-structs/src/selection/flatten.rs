//! Fragment expansion.
//!
//! Selections are flattened into the list of field nodes they contribute, each tagged with the
//! type it was selected on. Spreads and inline fragments disappear, and fragments whose type
//! condition cannot apply in their scope are reported. Nodes excluded by `@skip`/`@include` stay
//! in the list, marked as excluded, so that they are still validated.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use itertools::Itertools;
use serde_json_bytes::Value;

use super::collect::Variables;
use crate::config::ConditionPolicy;
use crate::config::StructConfig;
use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::schema::StructSchema;
use crate::schema::TypeDefinition;

/// A field node together with the type it is selected on: the enclosing scope, or the type
/// condition of the innermost fragment around it.
#[derive(Debug, Clone)]
pub(crate) struct FlatField<'doc> {
    pub(crate) parent_type: Name,
    pub(crate) field: &'doc Node<ast::Field>,
    /// False when a condition on the field or on an enclosing fragment excludes it.
    pub(crate) included: bool,
}

/// Everything needed to expand the selections of one operation.
pub(crate) struct FlattenContext<'doc> {
    pub(crate) schema: &'doc StructSchema,
    pub(crate) fragments: &'doc IndexMap<Name, Node<ast::FragmentDefinition>>,
    pub(crate) variables: &'doc Variables,
    /// Boolean default values of the operation's variable definitions.
    pub(crate) variable_defaults: IndexMap<Name, bool>,
    pub(crate) config: &'doc StructConfig,
}

impl<'doc> FlattenContext<'doc> {
    /// Expands `selections`, selected in `scope`. `included` is false when the selections are
    /// already excluded by an enclosing condition.
    pub(crate) fn flatten(
        &self,
        scope: &Name,
        selections: &'doc [ast::Selection],
        included: bool,
        errors: &mut MultipleStructErrors,
    ) -> Vec<FlatField<'doc>> {
        let mut out = Vec::new();
        let mut spread_stack = Vec::new();
        self.flatten_into(scope, selections, included, &mut out, &mut spread_stack, errors);
        out
    }

    fn flatten_into(
        &self,
        scope: &Name,
        selections: &'doc [ast::Selection],
        included: bool,
        out: &mut Vec<FlatField<'doc>>,
        spread_stack: &mut Vec<Name>,
        errors: &mut MultipleStructErrors,
    ) {
        for selection in selections {
            match selection {
                ast::Selection::Field(field) => {
                    out.push(FlatField {
                        parent_type: scope.clone(),
                        field,
                        included: included && self.is_included(&field.directives),
                    });
                }
                ast::Selection::InlineFragment(fragment) => {
                    let included = included && self.is_included(&fragment.directives);
                    let target = fragment.type_condition.as_ref().unwrap_or(scope);
                    if !self.check_fragment_target(scope, target, errors) {
                        continue;
                    }
                    self.flatten_into(
                        target,
                        &fragment.selection_set,
                        included,
                        out,
                        spread_stack,
                        errors,
                    );
                }
                ast::Selection::FragmentSpread(spread) => {
                    let included = included && self.is_included(&spread.directives);
                    let Some(fragment) = self.fragments.get(&spread.fragment_name) else {
                        errors.push(SingleStructError::UnknownFragment {
                            fragment_name: spread.fragment_name.clone(),
                        });
                        continue;
                    };
                    // Cycles are reported once per document by `detect_fragment_cycles`.
                    if spread_stack.contains(&fragment.name) {
                        continue;
                    }
                    let target = &fragment.type_condition;
                    if !self.check_fragment_target(scope, target, errors) {
                        continue;
                    }
                    spread_stack.push(fragment.name.clone());
                    self.flatten_into(
                        target,
                        &fragment.selection_set,
                        included,
                        out,
                        spread_stack,
                        errors,
                    );
                    spread_stack.pop();
                }
            }
        }
    }

    fn check_fragment_target(
        &self,
        scope: &Name,
        target: &Name,
        errors: &mut MultipleStructErrors,
    ) -> bool {
        let applies = if scope == target {
            true
        } else if self.schema.get_type(target).is_none() {
            false
        } else {
            let in_scope = possible_types(self.schema, scope);
            possible_types(self.schema, target)
                .iter()
                .any(|ty| in_scope.contains(ty))
        };
        if !applies {
            errors.push(SingleStructError::InvalidFragmentTarget {
                type_condition: target.clone(),
                scope: scope.clone(),
            });
        }
        applies
    }

    /// Whether `@skip`/`@include` keep a node, under the configured condition policy.
    ///
    /// A condition that cannot be decided statically keeps the node.
    pub(crate) fn is_included(&self, directives: &ast::DirectiveList) -> bool {
        if self.config.condition_policy == ConditionPolicy::MergeAll {
            return true;
        }
        directives.iter().all(|directive| {
            let condition = directive
                .specified_argument_by_name("if")
                .and_then(|value| self.evaluate_condition(value));
            match (directive.name.as_str(), condition) {
                ("skip", Some(true)) | ("include", Some(false)) => false,
                _ => true,
            }
        })
    }

    fn evaluate_condition(&self, value: &ast::Value) -> Option<bool> {
        match value {
            ast::Value::Boolean(value) => Some(*value),
            ast::Value::Variable(name) => match self.variables.get(name.as_str()) {
                Some(Value::Bool(value)) => Some(*value),
                Some(_) => None,
                None => self.variable_defaults.get(name).copied(),
            },
            _ => None,
        }
    }
}

/// The concrete types a value of `type_name` can have at runtime.
pub(crate) fn possible_types(schema: &StructSchema, type_name: &Name) -> IndexSet<Name> {
    match schema.get_type(type_name) {
        Some(TypeDefinition::StructUnion(union_type)) => {
            union_type.members.iter().cloned().collect()
        }
        Some(TypeDefinition::Union(union_type)) => union_type.members.iter().cloned().collect(),
        Some(TypeDefinition::Interface(_)) => schema
            .types
            .values()
            .filter_map(|ty| match ty {
                TypeDefinition::Object(object) if object.implements.contains(type_name) => {
                    Some(object.name.clone())
                }
                _ => None,
            })
            .collect(),
        _ => std::iter::once(type_name.clone()).collect(),
    }
}

/// Reports every cycle of fragment spreads once, naming the fragment it returns to.
pub(crate) fn detect_fragment_cycles(
    fragments: &IndexMap<Name, Node<ast::FragmentDefinition>>,
    errors: &mut MultipleStructErrors,
) {
    let mut visited = IndexSet::default();
    for name in fragments.keys() {
        let mut path = Vec::new();
        visit_fragment(fragments, name, &mut path, &mut visited, errors);
    }
}

fn visit_fragment<'doc>(
    fragments: &'doc IndexMap<Name, Node<ast::FragmentDefinition>>,
    name: &'doc Name,
    path: &mut Vec<&'doc Name>,
    visited: &mut IndexSet<&'doc Name>,
    errors: &mut MultipleStructErrors,
) {
    if !visited.insert(name) {
        return;
    }
    let Some(fragment) = fragments.get(name) else {
        return;
    };
    path.push(name);
    for spread in spreads_in(&fragment.selection_set) {
        if let Some(start) = path.iter().position(|on_path| *on_path == spread) {
            let cycle = path[start..].iter().chain(std::iter::once(&spread)).join(" -> ");
            errors.push(SingleStructError::FragmentCycle {
                fragment_name: spread.clone(),
                path: cycle,
            });
        } else {
            visit_fragment(fragments, spread, path, visited, errors);
        }
    }
    path.pop();
}

fn spreads_in(selections: &[ast::Selection]) -> Vec<&Name> {
    let mut spreads = Vec::new();
    let mut stack: Vec<&[ast::Selection]> = vec![selections];
    while let Some(selections) = stack.pop() {
        for selection in selections {
            match selection {
                ast::Selection::Field(field) => stack.push(&field.selection_set),
                ast::Selection::InlineFragment(fragment) => stack.push(&fragment.selection_set),
                ast::Selection::FragmentSpread(spread) => spreads.push(&spread.fragment_name),
            }
        }
    }
    spreads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::collect::fragment_table;

    const SCHEMA: &str = r#"
        type Query { bio: Biography, node: Node }
        interface Node { id: ID! }
        type User implements Node { id: ID!, bio: Biography }
        struct Biography { title: String!, body: String }
        struct TextParagraph { text: String! }
        struct ImageParagraph { url: String! }
        structUnion Paragraph = TextParagraph | ImageParagraph
    "#;

    fn flattened(query: &str, variables: &str, policy: ConditionPolicy) -> (Vec<String>, String) {
        let schema = StructSchema::parse(SCHEMA).expect("parses");
        let document = ast::Document::parse(query, "query.graphql").expect("parses");
        let fragments = fragment_table(&document);
        let variables: Variables = serde_json::from_str(variables).unwrap();
        let config = StructConfig {
            condition_policy: policy,
            ..Default::default()
        };
        let context = FlattenContext {
            schema: &schema,
            fragments: &fragments,
            variables: &variables,
            variable_defaults: IndexMap::default(),
            config: &config,
        };
        let operation = document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                ast::Definition::OperationDefinition(operation) => Some(operation),
                _ => None,
            })
            .expect("has an operation");
        let mut errors = MultipleStructErrors::new();
        let fields = context
            .flatten(&name("Query"), &operation.selection_set, true, &mut errors)
            .into_iter()
            .map(|flat| {
                let marker = if flat.included { "" } else { " (excluded)" };
                format!("{}.{}{marker}", flat.parent_type, flat.field.name)
            })
            .collect();
        let messages = errors.errors.iter().map(|e| format!("{e}\n")).collect();
        (fields, messages)
    }

    fn name(value: &str) -> Name {
        Name::new(value).unwrap()
    }

    #[test]
    fn expands_spreads_and_inline_fragments() {
        let (fields, errors) = flattened(
            r#"
            query { bio { title } ...Bio ... on Query { node { id } } }
            fragment Bio on Query { bio { body } }
            "#,
            "{}",
            ConditionPolicy::EvaluateThenMerge,
        );
        assert_eq!(fields, ["Query.bio", "Query.bio", "Query.node"]);
        assert_eq!(errors, "");
    }

    #[test]
    fn known_conditions_exclude_selections() {
        let (fields, _) = flattened(
            r#"
            query($skipped: Boolean, $unknown: Boolean) {
              a: bio @skip(if: true) { title }
              b: bio @include(if: $skipped) { title }
              c: bio @include(if: $unknown) { title }
              d: bio @skip(if: false) { title }
            }
            "#,
            r#"{ "skipped": false }"#,
            ConditionPolicy::EvaluateThenMerge,
        );
        assert_eq!(
            fields,
            [
                "Query.bio (excluded)",
                "Query.bio (excluded)",
                "Query.bio",
                "Query.bio",
            ]
        );
    }

    #[test]
    fn excluded_fragments_are_still_expanded() {
        let (fields, errors) = flattened(
            r#"query { ...Bio @include(if: false) ... @skip(if: true) { ...Missing } }
            fragment Bio on Query { bio { title } }"#,
            "{}",
            ConditionPolicy::EvaluateThenMerge,
        );
        assert_eq!(fields, ["Query.bio (excluded)"]);
        assert_eq!(errors, "Unknown fragment \"Missing\"\n");
    }

    #[test]
    fn merge_all_ignores_conditions() {
        let (fields, _) = flattened(
            r#"query { bio @skip(if: true) { title } ... @include(if: false) { node { id } } }"#,
            "{}",
            ConditionPolicy::MergeAll,
        );
        assert_eq!(fields, ["Query.bio", "Query.node"]);
    }

    #[test]
    fn reports_unknown_fragments_and_impossible_targets() {
        let (fields, errors) = flattened(
            r#"query { ...Missing ... on TextParagraph { text } bio { title } }"#,
            "{}",
            ConditionPolicy::EvaluateThenMerge,
        );
        assert_eq!(fields, ["Query.bio"]);
        insta::assert_snapshot!(errors, @r###"
        Unknown fragment "Missing"
        Fragment on "TextParagraph" can never apply within "Query"
        "###);
    }

    #[test]
    fn fragment_cycles_are_reported_once() {
        let document = ast::Document::parse(
            r#"
            query { ...A }
            fragment A on Query { ...B }
            fragment B on Query { bio { title } ...A }
            fragment C on Query { ...C }
            "#,
            "query.graphql",
        )
        .expect("parses");
        let fragments = fragment_table(&document);
        let mut errors = MultipleStructErrors::new();
        detect_fragment_cycles(&fragments, &mut errors);
        insta::assert_snapshot!(
            errors.errors.iter().map(|e| format!("{e}\n")).collect::<String>(),
            @r###"
        Cannot spread fragment "A" within itself via A -> B -> A
        Cannot spread fragment "C" within itself via C -> C
        "###
        );
    }

    #[test]
    fn interfaces_cover_their_implementations() {
        let schema = StructSchema::parse(SCHEMA).expect("parses");
        assert_eq!(
            possible_types(&schema, &name("Node")).into_iter().collect::<Vec<_>>(),
            [name("User")]
        );
        assert_eq!(possible_types(&schema, &name("Paragraph")).len(), 2);
        assert_eq!(
            possible_types(&schema, &name("Biography")).into_iter().collect::<Vec<_>>(),
            [name("Biography")]
        );
    }
}
