//! Walking an executable document to find every struct-typed field and its merged selection.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use itertools::Itertools;
use serde_json_bytes::ByteString;
use serde_json_bytes::Value;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use super::FieldSelections;
use super::StructSelection;
use super::StructSelectionSet;
use super::UnionSelections;
use super::flatten::FlatField;
use super::flatten::FlattenContext;
use super::flatten::detect_fragment_cycles;
use super::flatten::possible_types;
use crate::config::StructConfig;
use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::error::StructError;
use crate::schema::DirectiveLocation;
use crate::schema::StructSchema;
use crate::schema::StructUnionType;
use crate::schema::TYPENAME_FIELD;
use crate::schema::TypeDefinition;
use crate::schema::TypeKind;
use crate::schema::ValidStructSchema;

/// Operation variables, as received in a request.
pub type Variables = serde_json_bytes::Map<ByteString, Value>;

const STRING_TYPE: Name = apollo_compiler::name!("String");

/// A struct-typed field reached from an operation root, with the merged selection of all its
/// occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructEntry {
    /// Response keys from the operation root down to the field.
    pub path: Vec<Name>,
    /// The concrete object type the field resolves on. A field selected through an interface or
    /// a union has one entry per possible object type, each merging the occurrences that apply
    /// to that type.
    pub parent_type: Name,
    pub field_name: Name,
    /// The declared type of the field, list and non-null wrappers included.
    pub field_type: ast::Type,
    pub selection: StructSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedOperation {
    pub operation_type: ast::OperationType,
    pub name: Option<Name>,
    pub entries: Vec<StructEntry>,
}

impl MergedOperation {
    /// Every entry at `path`, one per object type the field resolves on.
    pub fn entries_at<'s, 'p>(&'s self, path: &'p [&'p str]) -> impl Iterator<Item = &'s StructEntry> {
        self.entries.iter().filter(move |entry| {
            entry.path.len() == path.len()
                && entry
                    .path
                    .iter()
                    .zip(path)
                    .all(|(key, expected)| key.as_str() == *expected)
        })
    }

    /// The entry at `path`, when a single object type resolves it.
    pub fn entry(&self, path: &[&str]) -> Option<&StructEntry> {
        self.entries_at(path).exactly_one().ok()
    }
}

/// Validates struct-scoped selections of a document and merges them.
///
/// ```rust
/// use apollo_compiler::ast;
/// use apollo_structs::schema::ValidStructSchema;
/// use apollo_structs::selection::SelectionMerger;
///
/// let schema = ValidStructSchema::parse_and_validate(
///     "type Query { bio: Biography } struct Biography { title: String!, body: String }",
/// )
/// .unwrap();
/// let document = ast::Document::parse("{ bio { title } bio { body } }", "query.graphql").unwrap();
/// let operations = SelectionMerger::new(&schema, &document).merge_operations().unwrap();
/// assert_eq!(operations[0].entries[0].to_string(), "bio { title body }");
/// ```
pub struct SelectionMerger<'doc> {
    schema: &'doc ValidStructSchema,
    document: &'doc ast::Document,
    fragments: IndexMap<Name, Node<ast::FragmentDefinition>>,
    variables: Variables,
    config: StructConfig,
}

impl<'doc> SelectionMerger<'doc> {
    pub fn new(schema: &'doc ValidStructSchema, document: &'doc ast::Document) -> Self {
        Self {
            schema,
            document,
            fragments: fragment_table(document),
            variables: Variables::new(),
            config: StructConfig::default(),
        }
    }

    /// Variable values used to evaluate `@include`/`@skip` conditions.
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_config(mut self, config: StructConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates every operation of the document and returns its struct entries.
    ///
    /// # Errors
    /// Every query-shape problem found in the document, at once.
    #[instrument(level = "trace", skip_all, name = "merge_struct_selections")]
    pub fn merge_operations(&self) -> Result<Vec<MergedOperation>, StructError> {
        let mut errors = MultipleStructErrors::new();
        detect_fragment_cycles(&self.fragments, &mut errors);

        let mut operations = Vec::new();
        for definition in &self.document.definitions {
            let ast::Definition::OperationDefinition(operation) = definition else {
                continue;
            };
            let roots = &self.schema.root_operations;
            let root = match operation.operation_type {
                ast::OperationType::Query => Some(&roots.query),
                ast::OperationType::Mutation => roots.mutation.as_ref(),
                ast::OperationType::Subscription => roots.subscription.as_ref(),
            };
            let Some(root) = root else {
                errors.push(SingleStructError::InvalidGraphQL {
                    message: format!(
                        "The schema does not define a {} root type",
                        operation.operation_type.name()
                    ),
                });
                continue;
            };

            let mut collector = Collector {
                context: self.context(variable_defaults(operation)),
                errors: MultipleStructErrors::new(),
                entries: Vec::new(),
            };
            let flat = collector.flatten(root, &operation.selection_set, true);
            collector.collect_object_fields(root, flat, &[]);
            trace!(
                operation = ?operation.name,
                entries = collector.entries.len(),
                "collected struct entries"
            );
            errors.extend(collector.errors);
            operations.push(MergedOperation {
                operation_type: operation.operation_type,
                name: operation.name.clone(),
                entries: collector.entries,
            });
        }

        debug!(
            operations = operations.len(),
            errors = errors.len(),
            "merged struct selections"
        );
        errors.into_result()?;
        Ok(operations)
    }

    /// Validates and merges the selection sets of several occurrences of a field whose type is
    /// `scope`, a struct or struct union. An empty selection set is a bare field reference.
    pub fn merge_scope(
        &self,
        scope: &Name,
        occurrences: &[&'doc [ast::Selection]],
    ) -> Result<StructSelection, StructError> {
        match self.schema.kind_of(scope) {
            Some(kind) if kind.is_struct_like() => {}
            _ => {
                return Err(SingleStructError::InvalidGraphQL {
                    message: format!("\"{scope}\" is not a struct or struct union"),
                }
                .into());
            }
        }
        let mut collector = Collector {
            context: self.context(IndexMap::default()),
            errors: MultipleStructErrors::new(),
            entries: Vec::new(),
        };
        let selection = collector.collect_struct_selection(
            scope,
            occurrences.iter().map(|selections| (*selections, true)),
        );
        collector.errors.into_result()?;
        selection.ok_or_else(|| {
            crate::internal_error!("No occurrence of a \"{scope}\" field to merge")
        })
    }

    fn context(&self, variable_defaults: IndexMap<Name, bool>) -> FlattenContext<'_> {
        FlattenContext {
            schema: self.schema,
            fragments: &self.fragments,
            variables: &self.variables,
            variable_defaults,
            config: &self.config,
        }
    }
}

/// Parses `source` and merges the struct selections of every operation in it.
pub fn merge_struct_selections(
    schema: &ValidStructSchema,
    source: &str,
    variables: Variables,
    config: StructConfig,
) -> Result<Vec<MergedOperation>, StructError> {
    let document = ast::Document::parse(source, "query.graphql").map_err(|e| {
        SingleStructError::InvalidGraphQL {
            message: e.errors.iter().join("\n"),
        }
    })?;
    SelectionMerger::new(schema, &document)
        .with_variables(variables)
        .with_config(config)
        .merge_operations()
}

/// Fragment definitions by name. The first definition of a name wins.
pub(crate) fn fragment_table(
    document: &ast::Document,
) -> IndexMap<Name, Node<ast::FragmentDefinition>> {
    let mut fragments = IndexMap::default();
    for definition in &document.definitions {
        if let ast::Definition::FragmentDefinition(fragment) = definition {
            fragments
                .entry(fragment.name.clone())
                .or_insert_with(|| fragment.clone());
        }
    }
    fragments
}

fn variable_defaults(operation: &ast::OperationDefinition) -> IndexMap<Name, bool> {
    operation
        .variables
        .iter()
        .filter_map(|variable| match variable.default_value.as_deref() {
            Some(ast::Value::Boolean(value)) => Some((variable.name.clone(), *value)),
            _ => None,
        })
        .collect()
}

struct Collector<'a> {
    context: FlattenContext<'a>,
    errors: MultipleStructErrors,
    entries: Vec<StructEntry>,
}

impl<'a> Collector<'a> {
    fn flatten(
        &mut self,
        scope: &Name,
        selections: &'a [ast::Selection],
        included: bool,
    ) -> Vec<FlatField<'a>> {
        self.context.flatten(scope, selections, included, &mut self.errors)
    }

    /// Object-level selections: aliases and arguments are ordinary here. Fields are grouped by
    /// the object type they resolve on and by response key, so that occurrences selected
    /// through an interface and through a fragment on one of its implementations merge.
    fn collect_object_fields(&mut self, scope: &Name, flat: Vec<FlatField<'a>>, path: &[Name]) {
        let schema = self.context.schema;
        let in_scope = possible_types(schema, scope);
        let mut groups: IndexMap<(Name, Name, Name), Vec<FlatField<'a>>> = IndexMap::default();
        for flat_field in flat {
            let field = flat_field.field;
            if field.name == TYPENAME_FIELD {
                continue;
            }
            let response_key = field.alias.clone().unwrap_or_else(|| field.name.clone());
            let declared = schema
                .field_definition(&flat_field.parent_type, &field.name)
                .is_some();
            let mut runtime_types: Vec<Name> = if declared {
                possible_types(schema, &flat_field.parent_type)
                    .into_iter()
                    .filter(|runtime_type| in_scope.contains(runtime_type))
                    .collect()
            } else {
                Vec::new()
            };
            // Unknown fields, and fields of an interface without implementations, stay on the
            // declared parent so that they are still reported and validated.
            if runtime_types.is_empty() {
                runtime_types.push(flat_field.parent_type.clone());
            }
            for runtime_type in runtime_types {
                groups
                    .entry((runtime_type, response_key.clone(), field.name.clone()))
                    .or_default()
                    .push(flat_field.clone());
            }
        }

        for ((parent_type, response_key, field_name), fields) in groups {
            let Some(definition) = schema.field_definition(&parent_type, &field_name) else {
                self.errors.push(SingleStructError::UnknownField {
                    type_name: parent_type,
                    field_name,
                });
                continue;
            };
            let field_type = definition.ty.inner_named_type();
            let mut field_path = path.to_vec();
            field_path.push(response_key);

            match schema.kind_of(field_type) {
                Some(kind) if kind.is_struct_like() => {
                    let selection = self.collect_struct_selection(
                        field_type,
                        fields.iter().map(|flat_field| {
                            (
                                flat_field.field.selection_set.as_slice(),
                                flat_field.included,
                            )
                        }),
                    );
                    if let Some(selection) = selection {
                        self.entries.push(StructEntry {
                            path: field_path,
                            parent_type,
                            field_name,
                            field_type: definition.ty.clone(),
                            selection,
                        });
                    }
                }
                Some(TypeKind::Object | TypeKind::Interface | TypeKind::Union) => {
                    let mut nested = Vec::new();
                    for flat_field in &fields {
                        nested.extend(self.flatten(
                            field_type,
                            &flat_field.field.selection_set,
                            flat_field.included,
                        ));
                    }
                    self.collect_object_fields(field_type, nested, &field_path);
                }
                _ => {}
            }
        }
    }

    /// Merges the occurrences of a struct-typed field. Every occurrence is validated, but only
    /// the included ones contribute, and there is no selection when none is included. An
    /// included bare occurrence selects the entire value.
    fn collect_struct_selection(
        &mut self,
        scope: &Name,
        occurrences: impl Iterator<Item = (&'a [ast::Selection], bool)>,
    ) -> Option<StructSelection> {
        let mut any_included = false;
        let mut entire_value = false;
        let mut flat = Vec::new();
        for (selections, included) in occurrences {
            any_included |= included;
            if selections.is_empty() {
                entire_value |= included;
            } else {
                flat.extend(self.flatten(scope, selections, included));
            }
        }
        let selection_set = self.collect_struct_scope(scope, flat);
        any_included.then(|| {
            if entire_value {
                StructSelection::EntireValue
            } else {
                StructSelection::Narrowed(selection_set)
            }
        })
    }

    fn collect_struct_scope(
        &mut self,
        scope: &Name,
        flat: Vec<FlatField<'a>>,
    ) -> StructSelectionSet {
        let schema = self.context.schema;
        let Some(union_type) = schema.get_struct_union(scope) else {
            return StructSelectionSet::Struct(self.collect_struct_fields(scope, flat));
        };

        // Fields selected on the union itself go to every member, fragment fields to the
        // members their type condition covers.
        let mut per_member: IndexMap<Name, Vec<FlatField<'a>>> = union_type
            .members
            .iter()
            .map(|member| (member.clone(), Vec::new()))
            .collect();
        for flat_field in flat {
            let targets = possible_types(schema, &flat_field.parent_type);
            for (member, fields) in per_member.iter_mut() {
                if targets.contains(member) {
                    fields.push(flat_field.clone());
                }
            }
        }
        let members = per_member
            .into_iter()
            .map(|(member, flat)| {
                let fields = self.collect_struct_fields(&member, flat);
                (member, fields)
            })
            .collect();
        StructSelectionSet::Union(UnionSelections {
            union_name: scope.clone(),
            members,
        })
    }

    fn collect_struct_fields(
        &mut self,
        type_name: &Name,
        flat: Vec<FlatField<'a>>,
    ) -> FieldSelections {
        let schema = self.context.schema;
        let mut groups: IndexMap<Name, Vec<FlatField<'a>>> = IndexMap::default();
        for flat_field in flat {
            self.check_struct_field_node(&flat_field);
            groups
                .entry(flat_field.field.name.clone())
                .or_default()
                .push(flat_field);
        }

        let mut selections = FieldSelections::new(type_name.clone());
        for (field_name, mut occurrences) in groups {
            if field_name == TYPENAME_FIELD {
                self.check_leaf_occurrences(&field_name, &STRING_TYPE, &occurrences);
                if occurrences.iter().any(|occurrence| occurrence.included) {
                    selections
                        .fields
                        .insert(field_name, StructSelection::EntireValue);
                }
                continue;
            }

            occurrences.retain(|occurrence| {
                self.check_field_exists(&occurrence.parent_type, &field_name)
            });
            if occurrences.is_empty() {
                continue;
            }
            let Some(definition) = schema.field_definition(type_name, &field_name) else {
                continue;
            };
            let field_type = definition.ty.inner_named_type();
            let selection = match schema.kind_of(field_type) {
                Some(kind) if kind.is_struct_like() => self.collect_struct_selection(
                    field_type,
                    occurrences.iter().map(|occurrence| {
                        (
                            occurrence.field.selection_set.as_slice(),
                            occurrence.included,
                        )
                    }),
                ),
                _ => {
                    self.check_leaf_occurrences(&field_name, field_type, &occurrences);
                    occurrences
                        .iter()
                        .any(|occurrence| occurrence.included)
                        .then_some(StructSelection::EntireValue)
                }
            };
            if let Some(selection) = selection {
                selections.fields.insert(field_name, selection);
            }
        }
        selections
    }

    /// Struct field selections carry no alias, no arguments and no directives other than
    /// `@include`/`@skip`.
    fn check_struct_field_node(&mut self, flat_field: &FlatField<'a>) {
        let field = flat_field.field;
        let type_name = &flat_field.parent_type;
        if let Some(alias) = &field.alias {
            self.errors.push(SingleStructError::AliasNotAllowed {
                type_name: type_name.clone(),
                field_name: field.name.clone(),
                alias: alias.clone(),
            });
        }
        if !field.arguments.is_empty() {
            self.errors.push(SingleStructError::ArgumentsNotAllowed {
                type_name: type_name.clone(),
                field_name: field.name.clone(),
            });
        }
        for directive in field.directives.iter() {
            if !self.directive_allowed(&directive.name) {
                self.errors.push(SingleStructError::DirectiveNotAllowed {
                    type_name: type_name.clone(),
                    field_name: field.name.clone(),
                    directive_name: directive.name.clone(),
                });
            }
        }
    }

    fn directive_allowed(&self, name: &Name) -> bool {
        if *name == "include" || *name == "skip" {
            return true;
        }
        if !self.context.config.allow_custom_field_directives {
            return false;
        }
        // Directives declared for struct field definitions never apply to selections.
        self.context
            .schema
            .directives
            .get(name)
            .is_none_or(|definition| {
                !definition
                    .locations
                    .contains(&DirectiveLocation::StructField)
            })
    }

    fn check_field_exists(&mut self, parent_type: &Name, field_name: &Name) -> bool {
        let schema = self.context.schema;
        match schema.get_type(parent_type) {
            Some(TypeDefinition::Struct(struct_type))
                if struct_type.fields.contains_key(field_name) =>
            {
                true
            }
            Some(TypeDefinition::StructUnion(union_type)) => {
                let common = is_common_field(schema, union_type, field_name);
                if !common {
                    self.errors.push(SingleStructError::UnknownMemberFieldOnUnion {
                        union_name: parent_type.clone(),
                        field_name: field_name.clone(),
                    });
                }
                common
            }
            _ => {
                self.errors.push(SingleStructError::UnknownField {
                    type_name: parent_type.clone(),
                    field_name: field_name.clone(),
                });
                false
            }
        }
    }

    fn check_leaf_occurrences(
        &mut self,
        field_name: &Name,
        field_type: &Name,
        occurrences: &[FlatField<'a>],
    ) {
        for occurrence in occurrences {
            if !occurrence.field.selection_set.is_empty() {
                self.errors.push(SingleStructError::SubselectionOnLeaf {
                    type_name: occurrence.parent_type.clone(),
                    field_name: field_name.clone(),
                    field_type: field_type.clone(),
                });
            }
        }
    }
}

/// A field every member of the union declares with the same type.
fn is_common_field(
    schema: &StructSchema,
    union_type: &StructUnionType,
    field_name: &Name,
) -> bool {
    let mut types = IndexSet::default();
    for member in &union_type.members {
        let Some(field) = schema
            .get_struct(member)
            .and_then(|member| member.fields.get(field_name))
        else {
            return false;
        };
        types.insert(&field.ty);
    }
    types.len() == 1
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ConditionPolicy;

    const SCHEMA: &str = r#"
        directive @redact on STRUCT_FIELD | FIELD_DEFINITION
        directive @trace on FIELD

        type Query {
          bio: Biography
          user(id: ID!): User
          node(id: ID!): Node
          content: [Paragraph!]!
        }
        interface Node { id: ID!, bio: Biography }
        type User implements Node { id: ID!, name: String, bio: Biography! }
        type Bot implements Node { id: ID!, bio: Biography }

        enum Network { TWITTER MASTODON }
        struct Socials { twitter: String, mastodon: String, network: Network }
        struct Biography { title: String!, body: String, socials: Socials }
        struct TextParagraph { text: String!, style: String }
        struct ImageParagraph { url: String!, style: String }
        structUnion Paragraph = TextParagraph | ImageParagraph
    "#;

    fn schema() -> ValidStructSchema {
        ValidStructSchema::parse_and_validate(SCHEMA).expect("valid schema")
    }

    fn merge(query: &str) -> Result<Vec<MergedOperation>, StructError> {
        merge_struct_selections(&schema(), query, Variables::new(), StructConfig::default())
    }

    fn rendered(query: &str) -> String {
        merge(query)
            .expect("valid query")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn merges_direct_and_fragment_occurrences() {
        assert_snapshot!(rendered(r#"
            query Bio {
              bio { title }
              ...Socials
            }
            fragment Socials on Query { bio { socials { twitter } } }
        "#), @r###"
        query Bio
          bio { title socials { twitter } }
        "###);
    }

    #[test]
    fn bare_reference_selects_the_entire_value() {
        assert_snapshot!(rendered(r#"
            { ...A ...B ...C }
            fragment A on Query { bio { title } }
            fragment B on Query { bio }
            fragment C on Query { bio { socials { twitter } } }
        "#), @r###"
        query
          bio
        "###);
    }

    #[test]
    fn entries_follow_object_paths_and_aliases() {
        let operations = merge(r#"
            {
              me: user(id: "1") { name bio { title } }
              other: user(id: "2") { bio }
            }
        "#)
        .expect("valid query");
        let me = operations[0].entry(&["me", "bio"]).expect("entry");
        assert_eq!(me.parent_type, "User");
        assert_eq!(me.field_type.to_string(), "Biography!");
        assert_eq!(me.selection.to_string(), "{ title }");
        let other = operations[0].entry(&["other", "bio"]).expect("entry");
        assert!(other.selection.is_entire_value());
    }

    #[test]
    fn union_fields_are_distributed_to_members() {
        assert_snapshot!(rendered(r#"
            {
              content {
                __typename
                style
                ... on TextParagraph { text }
                ...Image
              }
            }
            fragment Image on ImageParagraph { url }
        "#), @r###"
        query
          content { ... on TextParagraph { __typename style text } ... on ImageParagraph { __typename style url } }
        "###);
    }

    #[test]
    fn rejects_restricted_grammar() {
        let err = merge(r#"
            {
              bio {
                t: title
                socials @redact { twitter @trace }
                body(format: HTML)
              }
            }
        "#)
        .expect_err("invalid query");
        assert_snapshot!(err.messages(), @r###"
        [ALIAS_NOT_ALLOWED] Alias "t" is not allowed on struct field "Biography.title"
        [DIRECTIVE_NOT_ALLOWED] Directive "@redact" is not allowed on struct field "Biography.socials"
        [ARGUMENTS_NOT_ALLOWED] Struct field "Biography.body" does not accept arguments
        [DIRECTIVE_NOT_ALLOWED] Directive "@trace" is not allowed on struct field "Socials.twitter"
        "###);
    }

    #[test]
    fn custom_directives_can_be_allowed() {
        let config = StructConfig {
            allow_custom_field_directives: true,
            ..Default::default()
        };
        let err = merge_struct_selections(
            &schema(),
            "{ bio { socials @redact { twitter @trace } } }",
            Variables::new(),
            config,
        )
        .expect_err("@redact is a struct field definition directive");
        assert_snapshot!(err.messages(), @r###"
        [DIRECTIVE_NOT_ALLOWED] Directive "@redact" is not allowed on struct field "Biography.socials"
        "###);
    }

    #[test]
    fn rejects_unknown_fields_and_leaf_subselections() {
        let err = merge(r#"
            {
              bio { subtitle title { length } socials { network { name } } }
              content { text }
              missing
            }
        "#)
        .expect_err("invalid query");
        assert_snapshot!(err.messages(), @r###"
        [UNKNOWN_FIELD] Cannot query field "subtitle" on type "Biography"
        [SUBSELECTION_ON_LEAF] Field "Biography.title" of leaf type "String" must not have a selection
        [SUBSELECTION_ON_LEAF] Field "Socials.network" of leaf type "Network" must not have a selection
        [UNKNOWN_MEMBER_FIELD_ON_UNION] Field "text" is not defined by every member of struct union "Paragraph"; use an inline fragment on a concrete member to select it
        [UNKNOWN_FIELD] Cannot query field "missing" on type "Query"
        "###);
    }

    #[test]
    fn rejects_fragment_problems() {
        let err = merge(r#"
            {
              bio { ...Missing ... on Socials { twitter } }
              ...Loop
            }
            fragment Loop on Query { bio { title } ...Loop }
        "#)
        .expect_err("invalid query");
        assert_snapshot!(err.messages(), @r###"
        [FRAGMENT_CYCLE] Cannot spread fragment "Loop" within itself via Loop -> Loop
        [UNKNOWN_FRAGMENT] Unknown fragment "Missing"
        [INVALID_FRAGMENT_TARGET] Fragment on "Socials" can never apply within "Biography"
        "###);
    }

    #[test]
    fn conditions_follow_the_configured_policy() {
        let query = r#"
            query($withSocials: Boolean = false) {
              bio { title }
              bio @include(if: $withSocials) { socials { twitter } }
            }
        "#;
        let merged = |config: StructConfig| {
            merge_struct_selections(&schema(), query, Variables::new(), config)
                .expect("valid query")[0]
                .entries[0]
                .selection
                .to_string()
        };
        assert_eq!(merged(StructConfig::default()), "{ title }");
        assert_eq!(
            merged(StructConfig {
                condition_policy: ConditionPolicy::MergeAll,
                ..Default::default()
            }),
            "{ title socials { twitter } }"
        );
    }

    #[test]
    fn interface_and_implementation_occurrences_merge_per_object_type() {
        let operations = merge(r#"
            {
              node(id: "1") {
                bio { title }
                ... on User { bio { body } }
              }
            }
        "#)
        .expect("valid query");
        let entries = operations[0]
            .entries_at(&["node", "bio"])
            .map(|entry| format!("{} {}", entry.parent_type, entry.selection))
            .collect::<Vec<_>>();
        assert_eq!(entries, ["User { title body }", "Bot { title }"]);
        assert!(operations[0].entry(&["node", "bio"]).is_none());
    }

    #[test]
    fn excluded_selections_are_still_validated() {
        let err = merge(r#"
            {
              bio {
                t: title @skip(if: true)
                nope @skip(if: true)
                title
                ...Missing @include(if: false)
              }
              bio @skip(if: true) { body(format: HTML) }
            }
        "#)
        .expect_err("invalid query");
        assert_snapshot!(err.messages(), @r###"
        [UNKNOWN_FRAGMENT] Unknown fragment "Missing"
        [ALIAS_NOT_ALLOWED] Alias "t" is not allowed on struct field "Biography.title"
        [ARGUMENTS_NOT_ALLOWED] Struct field "Biography.body" does not accept arguments
        [UNKNOWN_FIELD] Cannot query field "nope" on type "Biography"
        "###);
    }

    #[test]
    fn excluded_occurrences_do_not_produce_entries() {
        assert_snapshot!(rendered(r#"
            {
              bio @skip(if: true) { title }
              me: user(id: "1") @include(if: false) { bio }
              other: user(id: "2") { bio { title @skip(if: true) } }
            }
        "#), @r###"
        query
          other.bio {}
        "###);
    }

    #[test]
    fn merge_scope_accepts_bare_occurrences() {
        let schema = schema();
        let document =
            ast::Document::parse("{ bio { title } }", "query.graphql").expect("parses");
        let ast::Definition::OperationDefinition(operation) = &document.definitions[0] else {
            panic!("expected an operation");
        };
        let ast::Selection::Field(bio) = &operation.selection_set[0] else {
            panic!("expected a field");
        };
        let merger = SelectionMerger::new(&schema, &document);
        let biography = Name::new("Biography").unwrap();
        let bare: &[ast::Selection] = &[];
        assert_eq!(
            merger
                .merge_scope(&biography, &[bio.selection_set.as_slice()])
                .unwrap()
                .to_string(),
            "{ title }"
        );
        assert!(
            merger
                .merge_scope(&biography, &[bio.selection_set.as_slice(), bare])
                .unwrap()
                .is_entire_value()
        );
        assert!(merger.merge_scope(&Name::new("User").unwrap(), &[]).is_err());
    }

    #[test]
    fn reports_syntax_errors() {
        let err = merge("{ bio { title }").expect_err("unterminated");
        assert_eq!(err.codes(), [crate::error::ErrorCode::InvalidGraphql]);
    }
}
