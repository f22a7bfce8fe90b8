//! Parsing of serialized .NET type names.
//!
//! Reader type names are stored as assembly qualified, possibly generic, names:
//!
//! ```text
//! Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib],[System.Int32, mscorlib]]
//! ```
//!
//! The part before the first `` ` `` or `,` is the main type. A generic name
//! carries a single arity digit after the backtick followed by one bracketed
//! group per type argument.

use std::fmt;

use winnow::combinator::{preceded, terminated};
use winnow::prelude::*;
use winnow::token::{one_of, take_till};

use crate::error::{Error, Result};

/// A type name split into its main type and its type arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub main_type: String,
    pub type_args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// Parse a type name, recursing into its type arguments.
    pub fn parse(name: &str) -> Result<TypeDescriptor> {
        let type_args = parse_subtypes(name)?
            .into_iter()
            .map(TypeDescriptor::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(TypeDescriptor {
            main_type: parse_main_type(name).to_owned(),
            type_args,
        })
    }

    /// A descriptor without type arguments
    pub fn simple(main_type: impl Into<String>) -> TypeDescriptor {
        TypeDescriptor {
            main_type: main_type.into(),
            type_args: Vec::new(),
        }
    }

    /// Get a type argument, failing if the name declared fewer.
    pub fn argument(&self, index: usize) -> Result<&TypeDescriptor> {
        self.type_args
            .get(index)
            .ok_or_else(|| Error::TypeDescriptor {
                name: self.to_string(),
                reason: format!("expected at least {} type arguments", index + 1),
            })
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.main_type)?;
        if !self.type_args.is_empty() {
            write!(f, "`{}[", self.type_args.len())?;
            for (i, arg) in self.type_args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "[{}]", arg)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

fn main_type<'s>(input: &mut &'s str) -> PResult<&'s str> {
    take_till(0.., ['`', ',']).parse_next(input)
}

fn arity(input: &mut &str) -> PResult<usize> {
    preceded("`", terminated(one_of(|c: char| c.is_ascii_digit()), "["))
        .map(|digit: char| digit as usize - '0' as usize)
        .parse_next(input)
}

/// Strip the generic arity and assembly qualification from a type name.
pub fn parse_main_type(name: &str) -> &str {
    let mut input = name;
    main_type(&mut input).unwrap_or(name)
}

/// Split the bracketed type arguments of a generic type name.
///
/// Returns an empty list for non generic names. Fails when the number of
/// argument groups differs from the declared arity.
pub fn parse_subtypes(name: &str) -> Result<Vec<&str>> {
    let mut input = &name[parse_main_type(name).len()..];
    if !input.starts_with('`') {
        return Ok(Vec::new());
    }

    let declared = arity(&mut input).map_err(|e| Error::TypeDescriptor {
        name: name.to_owned(),
        reason: format!("malformed arity: {e}"),
    })?;

    let mut subtypes = Vec::with_capacity(declared);
    let mut level = 0usize;
    let mut start = 0usize;
    let mut closed = false;

    for (i, c) in input.char_indices() {
        match c {
            '[' => {
                if level == 0 {
                    start = i + 1;
                }
                level += 1;
            }
            ']' if level == 0 => {
                closed = true;
                break;
            }
            ']' => {
                level -= 1;
                if level == 0 {
                    subtypes.push(&input[start..i]);
                }
            }
            _ => {}
        }
    }

    if !closed {
        return Err(Error::TypeDescriptor {
            name: name.to_owned(),
            reason: "unterminated type argument list".into(),
        });
    }

    if subtypes.len() != declared {
        return Err(Error::TypeDescriptor {
            name: name.to_owned(),
            reason: format!(
                "declared {} type arguments but found {}",
                declared,
                subtypes.len()
            ),
        });
    }

    Ok(subtypes)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::descriptor::{parse_main_type, parse_subtypes, TypeDescriptor};
    use crate::error::{Error, Result};

    const DICTIONARY: &str = "Microsoft.Xna.Framework.Content.DictionaryReader`2[[System.String, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089],[System.Int32, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089]]";

    #[test]
    fn main_type_of_simple_name() {
        assert_eq!(
            parse_main_type("Microsoft.Xna.Framework.Content.StringReader"),
            "Microsoft.Xna.Framework.Content.StringReader"
        );
    }

    #[test]
    fn main_type_strips_generics_and_assembly() {
        assert_eq!(
            parse_main_type(DICTIONARY),
            "Microsoft.Xna.Framework.Content.DictionaryReader"
        );
        assert_eq!(
            parse_main_type("System.Int32[], mscorlib"),
            "System.Int32[]"
        );
    }

    #[test]
    fn subtypes_of_two_arguments() -> Result<()> {
        assert_eq!(parse_subtypes("Foo`2[[A],[B]]")?, vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn subtypes_of_assembly_qualified_arguments() -> Result<()> {
        assert_eq!(
            parse_subtypes(DICTIONARY)?,
            vec![
                "System.String, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
                "System.Int32, mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
            ]
        );
        Ok(())
    }

    #[test]
    fn subtypes_keep_nested_generics_whole() -> Result<()> {
        assert_eq!(
            parse_subtypes("Foo`2[[Bar`1[[A]]],[B]]")?,
            vec!["Bar`1[[A]]", "B"]
        );
        Ok(())
    }

    #[test]
    fn subtypes_of_non_generic_name() -> Result<()> {
        assert!(parse_subtypes("System.String, mscorlib")?.is_empty());
        Ok(())
    }

    #[test]
    fn too_few_arguments_fail() {
        assert!(matches!(
            parse_subtypes("Foo`2[[A]]"),
            Err(Error::TypeDescriptor { .. })
        ));
    }

    #[test]
    fn too_many_arguments_fail() {
        assert!(matches!(
            parse_subtypes("Foo`2[[A],[B],[C]]"),
            Err(Error::TypeDescriptor { .. })
        ));
    }

    #[test]
    fn missing_arity_digit_fails() {
        assert!(matches!(
            parse_subtypes("Foo`[[A]]"),
            Err(Error::TypeDescriptor { .. })
        ));
    }

    #[test]
    fn unterminated_list_fails() {
        assert!(matches!(
            parse_subtypes("Foo`1[[A]"),
            Err(Error::TypeDescriptor { .. })
        ));
    }

    #[test]
    fn parse_nested_descriptor() -> Result<()> {
        let descriptor = TypeDescriptor::parse(
            "Microsoft.Xna.Framework.Content.ArrayReader`1[[Microsoft.Xna.Framework.Content.ArrayReader`1[[System.String, mscorlib]], mscorlib]]",
        )?;

        assert_eq!(
            descriptor,
            TypeDescriptor {
                main_type: "Microsoft.Xna.Framework.Content.ArrayReader".into(),
                type_args: vec![TypeDescriptor {
                    main_type: "Microsoft.Xna.Framework.Content.ArrayReader".into(),
                    type_args: vec![TypeDescriptor::simple("System.String")],
                }],
            }
        );
        assert_eq!(
            descriptor.to_string(),
            "Microsoft.Xna.Framework.Content.ArrayReader`1[[Microsoft.Xna.Framework.Content.ArrayReader`1[[System.String]]]]"
        );

        Ok(())
    }
}
