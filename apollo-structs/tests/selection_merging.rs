use apollo_compiler::ast;
use apollo_structs::StructConfig;
use apollo_structs::StructSelection;
use apollo_structs::config::ConditionPolicy;
use apollo_structs::error::ErrorCode;
use apollo_structs::selection::MergedOperation;
use apollo_structs::selection::SelectionMerger;
use apollo_structs::selection::Variables;
use apollo_structs::selection::merge_struct_selections;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;

use super::*;

fn merge(query: &str) -> Result<Vec<MergedOperation>, apollo_structs::StructError> {
    merge_struct_selections(&blog_schema(), query, Variables::new(), StructConfig::default())
}

fn bio_selection(query: &str) -> StructSelection {
    let operations = merge(query).expect("valid query");
    operations[0]
        .entry(&["bio"])
        .expect("bio entry")
        .selection
        .clone()
}

#[test]
fn repeated_fields_merge_their_selections() {
    let selection = bio_selection("{ bio { title } bio { socials { twitter } } }");
    assert_eq!(selection.to_string(), "{ title socials { twitter } }");
}

#[test]
fn any_bare_occurrence_selects_the_entire_value() {
    let selection = bio_selection(
        r#"
        { ...A ...B ...C }
        fragment A on Query { bio { title } }
        fragment B on Query { bio { socials { twitter } } }
        fragment C on Query { bio }
        "#,
    );
    assert_eq!(selection, StructSelection::EntireValue);
}

#[test]
fn fragment_order_does_not_change_the_result() {
    let fragments = r#"
        fragment A on Query { bio { title } }
        fragment B on Query { bio { socials { twitter } body } }
        fragment C on Query { bio { socials { mastodon } } }
    "#;
    let orders = ["...A ...B ...C", "...C ...A ...B", "...B ...C ...A"];
    let selections: Vec<_> = orders
        .iter()
        .map(|order| bio_selection(&format!("{{ {order} }} {fragments}")))
        .collect();
    assert_eq!(selections[0], selections[1]);
    assert_eq!(selections[1], selections[2]);
}

#[test]
fn struct_fields_reject_aliases() {
    let err = merge("{ bio { t: title } }").expect_err("alias");
    assert_eq!(err.codes(), [ErrorCode::AliasNotAllowed]);
    assert_snapshot!(err, @r###"Alias "t" is not allowed on struct field "Biography.title""###);
}

#[test]
fn object_fields_keep_aliases() {
    let operations = merge(
        r#"
        query Authors {
          first: author(id: "1") { bio { title } }
          second: author(id: "2") { id bio { body } }
        }
        "#,
    )
    .expect("valid query");
    assert_snapshot!(operations[0], @r###"
    query Authors
      first.bio { title }
      second.bio { body }
    "###);
}

#[test]
fn union_selections_are_kept_per_member() {
    let operations = merge(
        r#"
        {
          page(slug: "home") {
            content {
              __typename
              ... on TextParagraph { text socials { twitter } }
              ... on ImageParagraph { url }
            }
            content { ... on TextParagraph { socials { mastodon } } }
          }
        }
        "#,
    )
    .expect("valid query");
    let content = operations[0].entry(&["page", "content"]).expect("content entry");
    assert_eq!(content.field_type.to_string(), "[Paragraph!]!");
    assert_snapshot!(format!("{:#}", content.selection), @r###"
    {
      ... on TextParagraph {
        __typename
        text
        socials {
          twitter
          mastodon
        }
      }
      ... on ImageParagraph {
        __typename
        url
      }
    }
    "###);
}

#[test]
fn interface_selections_merge_into_each_implementation() {
    let operations = merge(
        r#"
        {
          person(id: "1") {
            bio { title }
            ... on Author { bio { body } }
            ...ReaderSocials
          }
        }
        fragment ReaderSocials on Reader { bio { socials { twitter } } }
        "#,
    )
    .expect("valid query");
    assert_snapshot!(operations[0], @r###"
    query
      person.bio { title body }
      person.bio { title socials { twitter } }
    "###);
    let parents: Vec<_> = operations[0]
        .entries_at(&["person", "bio"])
        .map(|entry| (entry.parent_type.as_str(), entry.field_type.to_string()))
        .collect();
    assert_eq!(
        parents,
        [
            ("Author", "Biography!".to_string()),
            ("Reader", "Biography".to_string()),
        ]
    );
}

#[test]
fn known_false_conditions_do_not_hide_query_problems() {
    let codes = |query: &str| merge(query).expect_err("invalid query").codes();
    assert_eq!(
        codes("{ bio { t: title @skip(if: true) } }"),
        [ErrorCode::AliasNotAllowed]
    );
    assert_eq!(
        codes("{ bio { nope @skip(if: true) title } }"),
        [ErrorCode::UnknownField]
    );
    assert_eq!(
        codes("{ bio { title ...Missing @include(if: false) } }"),
        [ErrorCode::UnknownFragment]
    );
    assert_eq!(
        codes(r#"{ author(id: "1") @skip(if: true) { bio { title(length: 3) } } }"#),
        [ErrorCode::ArgumentsNotAllowed]
    );
}

#[test]
fn fully_excluded_selections_merge_to_an_empty_object() {
    let operations = merge(
        r#"
        {
          bio { title @skip(if: true) }
          author(id: "1") @include(if: false) { bio { title } }
        }
        "#,
    )
    .expect("valid query");
    assert_eq!(operations[0].entries.len(), 1);
    let bio = operations[0].entry(&["bio"]).expect("bio entry");
    assert!(bio.selection.as_selection_set().expect("narrowed").is_empty());
    assert_eq!(bio.to_string(), "bio {}");
}

#[test]
fn every_query_problem_is_reported() {
    let err = merge(
        r#"
        {
          bio { title @redact subtitle ...Socials ...Nowhere }
          page(slug: "home") { content { text } }
        }
        fragment Socials on Socials { twitter }
        fragment Loop on Query { ...Loop }
        "#,
    )
    .expect_err("invalid query");
    assert_snapshot!(err.messages(), @r###"
    [FRAGMENT_CYCLE] Cannot spread fragment "Loop" within itself via Loop -> Loop
    [INVALID_FRAGMENT_TARGET] Fragment on "Socials" can never apply within "Biography"
    [UNKNOWN_FRAGMENT] Unknown fragment "Nowhere"
    [DIRECTIVE_NOT_ALLOWED] Directive "@redact" is not allowed on struct field "Biography.title"
    [UNKNOWN_FIELD] Cannot query field "subtitle" on type "Biography"
    [UNKNOWN_MEMBER_FIELD_ON_UNION] Field "text" is not defined by every member of struct union "Paragraph"; use an inline fragment on a concrete member to select it
    "###);
}

#[test]
fn include_and_skip_stay_legal_in_struct_scopes() {
    let query = r#"
        query($full: Boolean!) {
          bio { title body @include(if: $full) socials @skip(if: true) { twitter } }
        }
    "#;
    let schema = blog_schema();
    let merged = |variables: Variables, condition_policy: ConditionPolicy| {
        let config = StructConfig {
            condition_policy,
            ..Default::default()
        };
        merge_struct_selections(&schema, query, variables, config).expect("valid query")[0]
            .entries[0]
            .selection
            .to_string()
    };
    let full = |value: bool| {
        json!({ "full": value })
            .as_object()
            .cloned()
            .expect("an object")
    };

    assert_eq!(
        merged(full(false), ConditionPolicy::EvaluateThenMerge),
        "{ title }"
    );
    assert_eq!(
        merged(full(true), ConditionPolicy::EvaluateThenMerge),
        "{ title body }"
    );
    assert_eq!(
        merged(Variables::new(), ConditionPolicy::EvaluateThenMerge),
        "{ title body }"
    );
    assert_eq!(
        merged(full(false), ConditionPolicy::MergeAll),
        "{ title body socials { twitter } }"
    );
}

#[test]
fn merger_works_on_a_parsed_document() {
    let schema = blog_schema();
    let document = ast::Document::parse(
        r#"
        query One { bio { title } }
        query Two { author(id: "1") { bio } }
        "#,
        "query.graphql",
    )
    .expect("parses");
    let operations = SelectionMerger::new(&schema, &document)
        .merge_operations()
        .expect("valid document");
    let rendered: String = operations.iter().map(ToString::to_string).collect();
    assert_snapshot!(rendered, @r###"
    query One
      bio { title }
    query Two
      author.bio
    "###);
}
