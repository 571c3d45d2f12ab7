//! Typed predicates over JSON values
//!
//! A small closed set of shapes composed with [`Shape::union`] and
//! [`Shape::tuple`], resolved once where they are declared instead of being
//! parsed from type strings at every check.

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    String,
    Number,
    Boolean,
    Null,
    /// A JSON object (arrays excluded)
    Object,
    Array,
    /// Matches when any member matches
    Union(Vec<Shape>),
    /// An array whose elements match position by position, same length
    Tuple(Vec<Shape>),
}

impl Shape {
    pub fn union(shapes: impl IntoIterator<Item = Shape>) -> Self {
        Shape::Union(shapes.into_iter().collect())
    }

    pub fn tuple(shapes: impl IntoIterator<Item = Shape>) -> Self {
        Shape::Tuple(shapes.into_iter().collect())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Shape::String => value.is_string(),
            Shape::Number => value.is_number(),
            Shape::Boolean => value.is_boolean(),
            Shape::Null => value.is_null(),
            Shape::Object => value.is_object(),
            Shape::Array => value.is_array(),
            Shape::Union(members) => members.iter().any(|shape| shape.matches(value)),
            Shape::Tuple(members) => match value.as_array() {
                Some(items) => {
                    items.len() == members.len()
                        && items.iter().zip(members).all(|(item, shape)| shape.matches(item))
                }
                None => false,
            },
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::String => f.write_str("string"),
            Shape::Number => f.write_str("number"),
            Shape::Boolean => f.write_str("boolean"),
            Shape::Null => f.write_str("null"),
            Shape::Object => f.write_str("object"),
            Shape::Array => f.write_str("array"),
            Shape::Union(members) => {
                for (i, shape) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{shape}")?;
                }
                Ok(())
            }
            Shape::Tuple(members) => {
                f.write_str("an array of [")?;
                for (i, shape) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{shape}")?;
                }
                f.write_str("]")
            }
        }
    }
}
