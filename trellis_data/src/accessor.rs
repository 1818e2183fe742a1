// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::rc::Rc;

use crate::{Dataset, Value};

/// The normalized form of an [`Accessor`]: `(datum, index, dataset) -> value`.
pub type AccessorFn = Rc<dyn Fn(&Value, usize, &Dataset) -> Value>;

/// How a projection reads a value for one datum.
#[derive(Clone)]
pub enum Accessor {
    /// The same value for every datum.
    Constant(Value),
    /// A field looked up on each record; missing fields read as [`Value::Null`].
    Field(String),
    /// An arbitrary function of the datum, its index, and its dataset.
    Function(AccessorFn),
}

impl Accessor {
    /// A constant accessor.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    /// A field-name accessor.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// A function accessor.
    pub fn func(f: impl Fn(&Value, usize, &Dataset) -> Value + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    /// Normalize into a single callable form.
    pub fn bind(self) -> AccessorFn {
        match self {
            Self::Constant(v) => Rc::new(move |_, _, _| v.clone()),
            Self::Field(name) => {
                Rc::new(move |d, _, _| d.get(&name).cloned().unwrap_or_default())
            }
            Self::Function(f) => f,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl From<String> for Accessor {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl From<f64> for Accessor {
    fn from(v: f64) -> Self {
        Self::Constant(Value::Number(v))
    }
}

impl From<Value> for Accessor {
    fn from(v: Value) -> Self {
        Self::Constant(v)
    }
}

impl From<AccessorFn> for Accessor {
    fn from(f: AccessorFn) -> Self {
        Self::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn all_forms_normalize() {
        let ds = Dataset::default();
        let datum = record! { "v" => 4.0 };

        let c = Accessor::from(2.0).bind();
        assert_eq!(c(&datum, 0, &ds), Value::Number(2.0));

        let field = Accessor::from("v").bind();
        assert_eq!(field(&datum, 0, &ds), Value::Number(4.0));

        let missing = Accessor::field("nope").bind();
        assert_eq!(missing(&datum, 0, &ds), Value::Null);

        let f = Accessor::func(|d, i, _| {
            #[allow(clippy::cast_precision_loss, reason = "test indices are tiny")]
            let i = i as f64;
            Value::Number(d.get("v").and_then(Value::as_number).unwrap_or(0.0) + i)
        })
        .bind();
        assert_eq!(f(&datum, 3, &ds), Value::Number(7.0));
    }

    #[test]
    fn function_accessor_sees_dataset_metadata() {
        let ds = Dataset::with_metadata(
            Vec::new(),
            crate::Metadata::from([("color".to_owned(), Value::from("red"))]),
        );
        let f = Accessor::func(|_, _, ds| ds.metadata().get("color").cloned().unwrap_or_default())
            .bind();
        assert_eq!(f(&Value::Null, 0, &ds), Value::from("red"));
    }
}
