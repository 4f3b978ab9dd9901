use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{eof, verify};
use nom::multi::separated_list1;
use nom::sequence::terminated;
use nom::{IResult, Parser};
use nom_locate::LocatedSpan;

use crate::error::Error;
use crate::key::{FieldRef, FormKey, InputSlot, Position, FIELD_CHOICE_SEPARATOR};

type Span<'a> = LocatedSpan<&'a str>;

impl<'a> From<Span<'a>> for Position {
    fn from(span: Span<'a>) -> Position {
        Position {
            offset: span.location_offset(),
            line: span.location_line(),
            column: span.get_utf8_column(),
        }
    }
}

fn identifier(text: Span) -> IResult<Span, String> {
    let (text, id) = digit1(text)?;
    Ok((text, id.fragment().to_string()))
}

fn field_ref(text: Span) -> IResult<Span, FieldRef> {
    let (text, ids) = separated_list1(tag(FIELD_CHOICE_SEPARATOR), identifier).parse(text)?;
    Ok((text, FieldRef::choices(ids)))
}

/// Concept prefix including the trailing underscore.
/// Plain and operator keys tolerate an empty concept id.
fn optional_concept_prefix(text: Span) -> IResult<Span, String> {
    let (text, concept) = digit0(text)?;
    let (text, _) = tag("_")(text)?;
    Ok((text, concept.fragment().to_string()))
}

fn concept_prefix(text: Span) -> IResult<Span, String> {
    let (text, concept) = identifier(text)?;
    let (text, _) = tag("_")(text)?;
    Ok((text, concept))
}

fn input_slot(text: Span) -> IResult<Span, InputSlot> {
    let (text, _) = tag("_input")(text)?;
    let (text, digit) = one_of("01")(text)?;
    let slot = if digit == '0' {
        InputSlot::First
    } else {
        InputSlot::Second
    };
    Ok((text, slot))
}

fn binary_key(text: Span) -> IResult<Span, FormKey> {
    let (text, concept) = concept_prefix(text)?;
    let (text, field) = field_ref(text)?;
    let (text, slot) = input_slot(text)?;
    Ok((
        text,
        FormKey::Binary {
            concept,
            field,
            slot,
        },
    ))
}

fn plain_key(text: Span) -> IResult<Span, FormKey> {
    let (text, concept) = optional_concept_prefix(text)?;
    let (text, field) = field_ref(text)?;
    Ok((text, FormKey::Plain { concept, field }))
}

fn operator_key(text: Span) -> IResult<Span, FormKey> {
    let (text, concept) = optional_concept_prefix(text)?;
    let (text, field) = field_ref(text)?;
    let (text, _) = tag("_operator")(text)?;
    Ok((text, FormKey::Operator { concept, field }))
}

fn field_choice_key(text: Span) -> IResult<Span, FormKey> {
    let (text, field) = verify(field_ref, |field: &FieldRef| field.is_choice()).parse(text)?;
    Ok((text, FormKey::FieldChoice(field)))
}

/// Field-choice keys carry no concept prefix and are tried last,
/// so that a prefixed key is never read as a list of alternatives.
fn form_key(text: Span) -> IResult<Span, FormKey> {
    alt((
        terminated(binary_key, eof),
        terminated(plain_key, eof),
        terminated(operator_key, eof),
        terminated(field_choice_key, eof),
    ))
    .parse(text)
}

fn error_position(error: &nom::Err<nom::error::Error<Span>>) -> Position {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input.into(),
        nom::Err::Incomplete(_) => Position::unknown(),
    }
}

pub fn parse_form_key<S: AsRef<str>>(key: S) -> Result<FormKey, Error> {
    let key = key.as_ref();
    let (_remainder, form_key) = form_key(Span::new(key)).map_err(|e| {
        Error::key_parse_error(
            key,
            "does not match any form key shape",
            &error_position(&e),
        )
    })?;
    Ok(form_key)
}

/// Parse a bare field reference, e.g. `12` or `3OR5`.
pub fn parse_field_ref<S: AsRef<str>>(text: S) -> Result<FieldRef, Error> {
    let text = text.as_ref();
    let (_remainder, field) = terminated(field_ref, eof)
        .parse(Span::new(text))
        .map_err(|e| {
            Error::key_parse_error(text, "is not a field reference", &error_position(&e))
        })?;
    Ok(field)
}

/// True if the text is a non-empty numeric identifier.
pub fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

impl TryFrom<&str> for FormKey {
    type Error = Error;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        parse_form_key(s)
    }
}

impl TryFrom<String> for FormKey {
    type Error = Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_form_key(s)
    }
}

impl std::str::FromStr for FormKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_form_key(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn parse_plain_key() -> Result<(), Box<dyn std::error::Error>> {
        let key = parse_form_key("7_12")?;
        assert_eq!(
            key,
            FormKey::Plain {
                concept: "7".to_owned(),
                field: FieldRef::single("12")
            }
        );
        assert_eq!(key.concept(), Some("7"));
        Ok(())
    }

    #[test]
    fn parse_plain_key_without_concept() -> Result<(), Box<dyn std::error::Error>> {
        let key = parse_form_key("_12")?;
        assert_eq!(key.concept(), Some(""));
        assert_eq!(key.field(), &FieldRef::single("12"));
        Ok(())
    }

    #[test]
    fn parse_binary_key() -> Result<(), Box<dyn std::error::Error>> {
        let key = parse_form_key("7_12_input1")?;
        assert_eq!(
            key,
            FormKey::Binary {
                concept: "7".to_owned(),
                field: FieldRef::single("12"),
                slot: InputSlot::Second
            }
        );
        let key = parse_form_key("7_3OR5_input0")?;
        assert_eq!(key.field(), &FieldRef::choices(["3", "5"]));
        Ok(())
    }

    #[test]
    fn binary_key_needs_concept() {
        assert!(parse_form_key("_12_input0").is_err());
        assert!(parse_form_key("7_12_input2").is_err());
    }

    #[test]
    fn parse_operator_key() -> Result<(), Box<dyn std::error::Error>> {
        let key = parse_form_key("7_12_operator")?;
        assert!(key.is_operator());
        assert_eq!(key.field(), &FieldRef::single("12"));
        let key = parse_form_key("_3OR5_operator")?;
        assert_eq!(key.field(), &FieldRef::choices(["3", "5"]));
        Ok(())
    }

    #[test]
    fn parse_field_choice_key() -> Result<(), Box<dyn std::error::Error>> {
        let key = parse_form_key("3OR5")?;
        assert_eq!(key, FormKey::FieldChoice(FieldRef::choices(["3", "5"])));
        assert_eq!(key.concept(), None);
        let key = parse_form_key("1OR2OR3")?;
        assert_eq!(key.field().ids().len(), 3);
        Ok(())
    }

    #[test]
    fn single_field_is_not_a_choice() {
        let error = parse_form_key("12").unwrap_err();
        assert_eq!(error.error_type, ErrorType::KeyParseError);
        assert_eq!(error.key.as_deref(), Some("12"));
    }

    #[test]
    fn reject_foreign_keys() {
        for key in ["", "csrf_token", "7_", "7_12_", "7_12_op", "3OR", "OR5", "7_12 "] {
            assert!(parse_form_key(key).is_err(), "key '{}' should not parse", key);
        }
    }

    #[test]
    fn encode_parse_identity() -> Result<(), Box<dyn std::error::Error>> {
        for key in ["7_12", "7_12_input0", "7_12_operator", "3OR5", "7_3OR5_input1"] {
            assert_eq!(parse_form_key(key)?.encode(), key);
        }
        Ok(())
    }

    #[test]
    fn parse_field_reference() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(parse_field_ref("12")?, FieldRef::single("12"));
        assert!(parse_field_ref("3OR5")?.is_choice());
        assert!(parse_field_ref("x").is_err());
        assert!(is_identifier("42"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("4a"));
        Ok(())
    }
}
