//! Reads schema definition documents extended with `struct` and `structUnion` definitions.
//!
//! Only the type system subset the struct validator needs is understood: `schema`, `scalar`,
//! `type`, `interface`, `union`, `enum`, `input`, `directive`, `struct` and `structUnion`
//! definitions. Descriptions and applied directives are accepted and discarded.
use std::str::FromStr;

use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::bytes::complete::take_until;
use nom::bytes::complete::take_while;
use nom::character::complete::anychar;
use nom::character::complete::char;
use nom::character::complete::multispace1;
use nom::character::complete::none_of;
use nom::character::complete::satisfy;
use nom::combinator::cut;
use nom::combinator::map;
use nom::combinator::map_res;
use nom::combinator::not;
use nom::combinator::opt;
use nom::combinator::recognize;
use nom::combinator::value;
use nom::combinator::verify;
use nom::multi::many0;
use nom::multi::many1;
use nom::multi::separated_list0;
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::sequence::pair;
use nom::sequence::preceded;
use nom::sequence::terminated;
use nom::sequence::tuple;
use nom_locate::LocatedSpan;
use tracing::debug;

use super::DirectiveDefinition;
use super::DirectiveLocation;
use super::EnumType;
use super::FieldDefinition;
use super::FieldsType;
use super::InputValueDefinition;
use super::RootOperations;
use super::ScalarType;
use super::StructSchema;
use super::StructType;
use super::StructUnionType;
use super::TypeDefinition;
use super::UnionType;
use crate::error::MultipleStructErrors;
use crate::error::SingleStructError;
use crate::error::StructError;

type Span<'a> = LocatedSpan<&'a str>;
type ParseResult<'a, T> = IResult<Span<'a>, T>;

const DEFINITION_KEYWORDS: [&str; 11] = [
    "schema",
    "scalar",
    "type",
    "interface",
    "union",
    "enum",
    "input",
    "directive",
    "structUnion",
    "struct",
    "extend",
];

/// A definition as written, before duplicate names are resolved.
enum Definition {
    Schema(Vec<(Name, Name)>),
    Scalar(Name),
    Object(ParsedFields),
    Interface(ParsedFields),
    Union(Name, Vec<Name>),
    Enum(Name, Vec<Name>),
    InputObject(ParsedFields),
    Struct(ParsedFields),
    StructUnion(Name, Vec<Name>),
    Directive(DirectiveDefinition),
}

struct ParsedFields {
    name: Name,
    implements: Vec<Name>,
    fields: Vec<FieldDefinition>,
}

pub(super) fn parse_schema(source: &str) -> Result<StructSchema, StructError> {
    let input = Span::new(source);
    let (rest, definitions) = match many0(definition)(input) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => {
            return Err(syntax_error(error.input).into());
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(StructError::internal("complete parsers reported incomplete input"));
        }
    };
    let rest = match ignored(rest) {
        Ok((rest, _)) => rest,
        Err(_) => rest,
    };
    if !rest.fragment().is_empty() {
        return Err(syntax_error(rest).into());
    }
    debug!(definitions = definitions.len(), "read schema definitions");
    build_schema(definitions)
}

fn syntax_error(at: Span) -> SingleStructError {
    let found = at
        .fragment()
        .split_whitespace()
        .next()
        .unwrap_or("end of input");
    SingleStructError::InvalidGraphQL {
        message: format!(
            "Syntax error at {}:{}: unexpected \"{found}\"",
            at.location_line(),
            at.get_utf8_column()
        ),
    }
}

struct SchemaBuilder {
    schema: StructSchema,
    errors: MultipleStructErrors,
    defined: IndexSet<Name>,
    // Reported after the type-level errors.
    field_errors: Vec<SingleStructError>,
}

impl SchemaBuilder {
    fn add_type(&mut self, definition: TypeDefinition) {
        let name = definition.name().clone();
        if !self.defined.insert(name.clone()) {
            self.errors
                .push(SingleStructError::DuplicateTypeDefinition { type_name: name });
            return;
        }
        // User definitions of the built-in scalars replace the defaults.
        self.schema.types.insert(name, definition);
    }

    fn fields(
        &mut self,
        type_name: &Name,
        fields: Vec<FieldDefinition>,
    ) -> IndexMap<Name, FieldDefinition> {
        let mut map = IndexMap::default();
        for field in fields {
            if map.contains_key(&field.name) {
                self.field_errors
                    .push(SingleStructError::DuplicateFieldDefinition {
                        type_name: type_name.clone(),
                        field_name: field.name,
                    });
                continue;
            }
            map.insert(field.name.clone(), field);
        }
        map
    }

    fn fields_type(&mut self, parsed: ParsedFields) -> FieldsType {
        FieldsType {
            fields: self.fields(&parsed.name, parsed.fields),
            name: parsed.name,
            implements: parsed.implements,
        }
    }

    fn add_definition(&mut self, definition: Definition) {
        match definition {
            Definition::Schema(operations) => {
                let mut roots = RootOperations::default();
                for (operation, type_name) in operations {
                    match operation.as_str() {
                        "query" => roots.query = type_name,
                        "mutation" => roots.mutation = Some(type_name),
                        "subscription" => roots.subscription = Some(type_name),
                        _ => self.errors.push(SingleStructError::InvalidGraphQL {
                            message: format!("Unknown root operation type \"{operation}\""),
                        }),
                    }
                }
                self.schema.root_operations = roots;
            }
            Definition::Scalar(name) => self.add_type(TypeDefinition::Scalar(ScalarType { name })),
            Definition::Object(parsed) => {
                let ty = self.fields_type(parsed);
                self.add_type(TypeDefinition::Object(ty))
            }
            Definition::Interface(parsed) => {
                let ty = self.fields_type(parsed);
                self.add_type(TypeDefinition::Interface(ty))
            }
            Definition::InputObject(parsed) => {
                let ty = self.fields_type(parsed);
                self.add_type(TypeDefinition::InputObject(ty))
            }
            Definition::Union(name, members) => {
                self.add_type(TypeDefinition::Union(UnionType { name, members }))
            }
            Definition::Enum(name, values) => self.add_type(TypeDefinition::Enum(EnumType {
                name,
                values: values.into_iter().collect(),
            })),
            Definition::Struct(parsed) => {
                let FieldsType { name, fields, .. } = self.fields_type(parsed);
                self.add_type(TypeDefinition::Struct(StructType { name, fields }))
            }
            Definition::StructUnion(name, members) => {
                self.add_type(TypeDefinition::StructUnion(StructUnionType { name, members }))
            }
            Definition::Directive(directive) => {
                if self.schema.directives.contains_key(&directive.name) {
                    self.errors.push(SingleStructError::InvalidGraphQL {
                        message: format!(
                            "There can be only one directive named \"@{}\"",
                            directive.name
                        ),
                    });
                } else {
                    self.schema
                        .directives
                        .insert(directive.name.clone(), directive);
                }
            }
        }
    }

    fn build(mut self) -> Result<StructSchema, StructError> {
        for error in std::mem::take(&mut self.field_errors) {
            self.errors.push(error);
        }
        self.errors.into_result()?;
        Ok(self.schema)
    }
}

fn build_schema(definitions: Vec<Definition>) -> Result<StructSchema, StructError> {
    let mut builder = SchemaBuilder {
        schema: StructSchema::default(),
        errors: MultipleStructErrors::new(),
        defined: IndexSet::default(),
        field_errors: vec![],
    };
    for definition in definitions {
        builder.add_definition(definition);
    }
    builder.build()
}

// Whitespace, commas and `#` comments are insignificant between tokens.
fn ignored(input: Span) -> ParseResult<()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), char(',')),
            value((), pair(char('#'), take_while(|c: char| c != '\n'))),
        ))),
    )(input)
}

fn token<'a, O, F>(mut parser: F) -> impl FnMut(Span<'a>) -> ParseResult<'a, O>
where
    F: FnMut(Span<'a>) -> ParseResult<'a, O>,
{
    move |input| {
        let (input, _) = ignored(input)?;
        parser(input)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(Span<'a>) -> ParseResult<'a, Span<'a>> {
    token(terminated(tag(kw), not(satisfy(is_name_continue))))
}

fn name(input: Span) -> ParseResult<Name> {
    token(map_res(
        recognize(pair(satisfy(is_name_start), take_while(is_name_continue))),
        |span: Span| Name::new(span.fragment()),
    ))(input)
}

fn punct<'a>(c: char) -> impl FnMut(Span<'a>) -> ParseResult<'a, char> {
    token(char(c))
}

fn string_value(input: Span) -> ParseResult<Span> {
    token(alt((
        recognize(delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\""))),
        recognize(delimited(
            char('"'),
            many0(alt((
                recognize(preceded(char('\\'), anychar)),
                recognize(none_of("\\\"\n")),
            ))),
            char('"'),
        )),
    )))(input)
}

fn description(input: Span) -> ParseResult<Option<Span>> {
    opt(string_value)(input)
}

// Values only appear in directive applications and default values, which are discarded, so
// they are recognized rather than built.
fn const_value(input: Span) -> ParseResult<()> {
    alt((
        value((), string_value),
        value(
            (),
            token(recognize(pair(
                opt(char('-')),
                take_while1_number,
            ))),
        ),
        value((), name),
        value(
            (),
            delimited(punct('['), many0(const_value), punct(']')),
        ),
        value(
            (),
            delimited(
                punct('{'),
                many0(tuple((name, punct(':'), const_value))),
                punct('}'),
            ),
        ),
    ))(input)
}

fn take_while1_number(input: Span) -> ParseResult<Span> {
    nom::bytes::complete::take_while1(|c: char| {
        c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-'
    })(input)
}

fn applied_directives(input: Span) -> ParseResult<()> {
    value(
        (),
        many0(tuple((
            punct('@'),
            name,
            opt(delimited(
                punct('('),
                many0(tuple((name, punct(':'), const_value))),
                punct(')'),
            )),
        ))),
    )(input)
}

fn type_reference(input: Span) -> ParseResult<Type> {
    let (input, ty) = alt((
        map(
            delimited(punct('['), type_reference, punct(']')),
            |item| Type::List(Box::new(item)),
        ),
        map(name, Type::Named),
    ))(input)?;
    let (input, non_null) = opt(punct('!'))(input)?;
    let ty = match (ty, non_null) {
        (Type::Named(name), Some(_)) => Type::NonNullNamed(name),
        (Type::List(item), Some(_)) => Type::NonNullList(item),
        (ty, _) => ty,
    };
    Ok((input, ty))
}

fn input_value_definition(input: Span) -> ParseResult<InputValueDefinition> {
    map(
        tuple((
            description,
            name,
            punct(':'),
            type_reference,
            opt(preceded(punct('='), const_value)),
            applied_directives,
        )),
        |(_, name, _, ty, _, _)| InputValueDefinition { name, ty },
    )(input)
}

fn arguments_definition(input: Span) -> ParseResult<Vec<InputValueDefinition>> {
    delimited(punct('('), many0(input_value_definition), cut(punct(')')))(input)
}

fn field_definition(input: Span) -> ParseResult<FieldDefinition> {
    map(
        tuple((
            description,
            name,
            opt(arguments_definition),
            cut(punct(':')),
            cut(type_reference),
            applied_directives,
        )),
        |(_, name, arguments, _, ty, _)| FieldDefinition {
            name,
            ty,
            arguments: arguments.unwrap_or_default(),
        },
    )(input)
}

fn fields_definition(input: Span) -> ParseResult<Vec<FieldDefinition>> {
    delimited(punct('{'), many0(field_definition), cut(punct('}')))(input)
}

fn input_fields_definition(input: Span) -> ParseResult<Vec<FieldDefinition>> {
    map(
        delimited(punct('{'), many0(input_value_definition), cut(punct('}'))),
        |values| {
            values
                .into_iter()
                .map(|value| FieldDefinition {
                    name: value.name,
                    ty: value.ty,
                    arguments: vec![],
                })
                .collect()
        },
    )(input)
}

fn implements_interfaces(input: Span) -> ParseResult<Vec<Name>> {
    map(
        opt(preceded(
            keyword("implements"),
            preceded(opt(punct('&')), separated_list1(punct('&'), name)),
        )),
        Option::unwrap_or_default,
    )(input)
}

// Guards member lists against swallowing the keyword of the next definition, which matters for
// an empty `structUnion Empty =`.
fn member_name(input: Span) -> ParseResult<Name> {
    verify(name, |name: &Name| !DEFINITION_KEYWORDS.contains(&name.as_str()))(input)
}

fn union_members(input: Span) -> ParseResult<Vec<Name>> {
    preceded(opt(punct('|')), separated_list0(punct('|'), member_name))(input)
}

fn definition(input: Span) -> ParseResult<Definition> {
    let (input, _) = description(input)?;
    alt((
        schema_definition,
        scalar_definition,
        object_definition,
        interface_definition,
        union_definition,
        enum_definition,
        input_object_definition,
        directive_definition,
        // `structUnion` must be tried before `struct`.
        struct_union_definition,
        struct_definition,
    ))(input)
}

fn schema_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(
            keyword("schema"),
            cut(preceded(
                applied_directives,
                delimited(
                    punct('{'),
                    many1(map(tuple((name, punct(':'), name)), |(op, _, ty)| (op, ty))),
                    punct('}'),
                ),
            )),
        ),
        Definition::Schema,
    )(input)
}

fn scalar_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(keyword("scalar"), cut(terminated(name, applied_directives))),
        Definition::Scalar,
    )(input)
}

fn fields_type_definition<'a>(
    kw: &'static str,
    fields: fn(Span<'a>) -> ParseResult<'a, Vec<FieldDefinition>>,
) -> impl FnMut(Span<'a>) -> ParseResult<'a, ParsedFields> {
    map(
        preceded(
            keyword(kw),
            cut(tuple((
                name,
                implements_interfaces,
                applied_directives,
                opt(fields),
            ))),
        ),
        |(name, implements, _, fields)| ParsedFields {
            name,
            implements,
            fields: fields.unwrap_or_default(),
        },
    )
}

fn object_definition(input: Span) -> ParseResult<Definition> {
    map(
        fields_type_definition("type", fields_definition),
        Definition::Object,
    )(input)
}

fn interface_definition(input: Span) -> ParseResult<Definition> {
    map(
        fields_type_definition("interface", fields_definition),
        Definition::Interface,
    )(input)
}

fn input_object_definition(input: Span) -> ParseResult<Definition> {
    map(
        fields_type_definition("input", input_fields_definition),
        Definition::InputObject,
    )(input)
}

fn struct_definition(input: Span) -> ParseResult<Definition> {
    map(
        fields_type_definition("struct", fields_definition),
        Definition::Struct,
    )(input)
}

fn union_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(
            keyword("union"),
            cut(tuple((
                name,
                applied_directives,
                opt(preceded(punct('='), union_members)),
            ))),
        ),
        |(name, _, members)| Definition::Union(name, members.unwrap_or_default()),
    )(input)
}

fn struct_union_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(
            keyword("structUnion"),
            cut(tuple((
                name,
                applied_directives,
                opt(preceded(punct('='), union_members)),
            ))),
        ),
        |(name, _, members)| Definition::StructUnion(name, members.unwrap_or_default()),
    )(input)
}

fn enum_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(
            keyword("enum"),
            cut(tuple((
                name,
                applied_directives,
                opt(delimited(
                    punct('{'),
                    many0(map(
                        tuple((description, name, applied_directives)),
                        |(_, value, _)| value,
                    )),
                    punct('}'),
                )),
            ))),
        ),
        |(name, _, values)| Definition::Enum(name, values.unwrap_or_default()),
    )(input)
}

fn directive_location(input: Span) -> ParseResult<DirectiveLocation> {
    map_res(name, |name| DirectiveLocation::from_str(name.as_str()))(input)
}

fn directive_definition(input: Span) -> ParseResult<Definition> {
    map(
        preceded(
            keyword("directive"),
            cut(tuple((
                punct('@'),
                name,
                opt(arguments_definition),
                opt(keyword("repeatable")),
                keyword("on"),
                preceded(
                    opt(punct('|')),
                    separated_list1(punct('|'), directive_location),
                ),
            ))),
        ),
        |(_, name, arguments, repeatable, _, locations)| {
            Definition::Directive(DirectiveDefinition {
                name,
                arguments: arguments.unwrap_or_default(),
                repeatable: repeatable.is_some(),
                locations,
            })
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::schema::TypeKind;

    const EXAMPLE: &str = r#"
        # Content model
        schema { query: Root }

        type Root {
          bio: Biography
          page(id: ID!): Page
        }

        type Page { paragraphs: [Paragraph!]! }

        """
        A person's life, as data.
        """
        struct Biography {
          title: String!
          socials: Socials
          tags: [String!] @deprecated(reason: "use socials")
        }

        struct Socials { twitter: String, mastodon: String }

        struct TextParagraph { text: String! }
        struct ImageParagraph { url: String!, alt: String }
        structUnion Paragraph = TextParagraph | ImageParagraph

        enum Visibility { PUBLIC PRIVATE }
        directive @redact(mode: String = "full") repeatable on STRUCT_FIELD | FIELD
    "#;

    #[test]
    fn reads_struct_definitions() {
        let schema = StructSchema::parse(EXAMPLE).expect("parses");
        assert_eq!(schema.root_operations.query, "Root");

        let biography = schema.get_struct("Biography").expect("struct exists");
        let fields: Vec<_> = biography
            .fields
            .values()
            .map(|field| format!("{}: {}", field.name, field.ty))
            .collect();
        assert_eq!(
            fields,
            ["title: String!", "socials: Socials", "tags: [String!]"]
        );

        let paragraph = schema.get_struct_union("Paragraph").expect("union exists");
        assert_eq!(paragraph.members, ["TextParagraph", "ImageParagraph"]);

        let page = schema.field_definition("Root", "page").expect("field");
        assert_eq!(page.arguments.len(), 1);
        assert_eq!(schema.kind_of("Visibility"), Some(TypeKind::Enum));

        let redact = schema.directives.get("redact").expect("directive");
        assert!(redact.repeatable);
        assert_eq!(
            redact.locations,
            [DirectiveLocation::StructField, DirectiveLocation::Field]
        );
    }

    #[test]
    fn keeps_duplicate_members_for_validation() {
        let schema = StructSchema::parse(
            r#"
            struct TextParagraph { text: String! }
            structUnion Paragraph = TextParagraph | TextParagraph
            "#,
        )
        .expect("parses");
        let paragraph = schema.get_struct_union("Paragraph").expect("union exists");
        assert_eq!(paragraph.members.len(), 2);
    }

    #[test]
    fn empty_struct_union_does_not_swallow_next_definition() {
        let schema = StructSchema::parse(
            r#"
            structUnion Empty =
            struct Next { value: Int }
            "#,
        )
        .expect("parses");
        assert!(schema.get_struct_union("Empty").expect("union").members.is_empty());
        assert!(schema.get_struct("Next").is_some());
    }

    #[test]
    fn reports_duplicate_definitions_together() {
        let err = StructSchema::parse(
            r#"
            struct A { x: Int, x: String }
            struct A { y: Int }
            "#,
        )
        .expect_err("duplicates");
        insta::assert_snapshot!(err.messages(), @r###"
        [DUPLICATE_TYPE_DEFINITION] There can be only one type named "A"
        [DUPLICATE_FIELD_DEFINITION] Field "A.x" can only be defined once
        "###);
    }

    #[test]
    fn reports_syntax_error_position() {
        let err = StructSchema::parse("struct A {\n  x Int\n}").expect_err("missing colon");
        assert_eq!(err.to_string(), "Syntax error at 2:5: unexpected \"Int\"");
    }
}
