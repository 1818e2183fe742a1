// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::Value;

/// The minimal domain covering a set of observed values.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Extent {
    /// No values were observed.
    #[default]
    Empty,
    /// Quantitative values, as `[min, max]`.
    Numeric {
        /// Smallest observed value.
        min: f64,
        /// Largest observed value.
        max: f64,
    },
    /// Categorical values, unique, in first-seen order.
    Categorical(Vec<String>),
}

impl Extent {
    /// Compute the extent of `values`.
    ///
    /// If the first non-null value is text, the extent is categorical: every value's display
    /// form, deduplicated in first-seen order. Otherwise it is the min/max over values with a
    /// finite quantitative reading; non-finite and non-numeric values are skipped.
    ///
    /// ```
    /// use trellis_data::{Extent, Value};
    ///
    /// let v = [Value::from("b"), Value::from("a"), Value::from("b")];
    /// assert_eq!(Extent::of_values(&v), Extent::Categorical(vec!["b".into(), "a".into()]));
    /// ```
    pub fn of_values(values: &[Value]) -> Self {
        let Some(first) = values.iter().find(|v| !v.is_null()) else {
            return Self::Empty;
        };
        if first.as_text().is_some() {
            let mut seen: Vec<String> = Vec::new();
            for v in values.iter().filter(|v| !v.is_null()) {
                let key = v.to_string();
                if !seen.contains(&key) {
                    seen.push(key);
                }
            }
            return Self::Categorical(seen);
        }
        let mut numbers = values
            .iter()
            .filter_map(Value::as_number)
            .filter(|n| n.is_finite());
        let Some(first) = numbers.next() else {
            return Self::Empty;
        };
        let (min, max) = numbers.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n)));
        Self::Numeric { min, max }
    }

    /// Merge two extents. Categories from `self` come first. Mixing kinds keeps `self`.
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Empty, o) => o.clone(),
            (s, Self::Empty) => s.clone(),
            (Self::Numeric { min: a, max: b }, Self::Numeric { min: c, max: d }) => {
                Self::Numeric {
                    min: a.min(*c),
                    max: b.max(*d),
                }
            }
            (Self::Categorical(a), Self::Categorical(b)) => {
                let mut merged = a.clone();
                for v in b {
                    if !merged.contains(v) {
                        merged.push(v.clone());
                    }
                }
                Self::Categorical(merged)
            }
            (s, _) => s.clone(),
        }
    }

    /// Whether nothing was observed.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The numeric bounds, if quantitative.
    pub fn numeric(&self) -> Option<(f64, f64)> {
        match self {
            Self::Numeric { min, max } => Some((*min, *max)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(Extent::of_values(&[]), Extent::Empty);
        assert_eq!(Extent::of_values(&[Value::Null]), Extent::Empty);
    }

    #[test]
    fn numeric_skips_invalid() {
        let v = [
            Value::Number(3.0),
            Value::Number(f64::NAN),
            Value::Null,
            Value::Number(-1.0),
            Value::Number(f64::INFINITY),
        ];
        assert_eq!(Extent::of_values(&v), Extent::Numeric { min: -1.0, max: 3.0 });
    }

    #[test]
    fn union_keeps_first_seen_category_order() {
        let a = Extent::Categorical(vec!["x".into(), "y".into()]);
        let b = Extent::Categorical(vec!["z".into(), "x".into()]);
        assert_eq!(
            a.union(&b),
            Extent::Categorical(vec!["x".into(), "y".into(), "z".into()])
        );
        assert_eq!(
            b.union(&a),
            Extent::Categorical(vec!["z".into(), "x".into(), "y".into()])
        );
    }

    #[test]
    fn union_of_numbers_and_empty() {
        let a = Extent::Numeric { min: 0.0, max: 1.0 };
        let b = Extent::Numeric { min: -2.0, max: 0.5 };
        assert_eq!(a.union(&b), Extent::Numeric { min: -2.0, max: 1.0 });
        assert_eq!(Extent::Empty.union(&a), a);
        assert_eq!(a.union(&Extent::Empty).numeric(), Some((0.0, 1.0)));
    }
}
