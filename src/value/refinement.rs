//! Refinements: partial knowledge about an unknown value.
//!
//! A refinement narrows the set of values an unknown might turn out to be:
//! it may promise the value is not null, that a string starts with a known
//! prefix, that a number lies within inclusive bounds, or that a collection
//! length lies within inclusive bounds. Refinements only ever describe
//! unknown values of a concrete type; `Dynamic` unknowns carry none.

use unicode_segmentation::UnicodeSegmentation;

use super::{Number, Type, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Refinement {
    pub not_null: bool,
    pub string_prefix: Option<String>,
    pub number_lower: Option<Number>,
    pub number_upper: Option<Number>,
    pub length_lower: Option<usize>,
    pub length_upper: Option<usize>,
}

impl Refinement {
    pub fn not_null() -> Self {
        Self {
            not_null: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The tightest refinement that describes `value`.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null(_) => Self::default(),
            Value::Unknown(_, refinement) => refinement.clone(),
            Value::String(s) => Self {
                not_null: true,
                string_prefix: Some(s.clone()),
                ..Self::default()
            },
            Value::Number(n) => Self {
                not_null: true,
                number_lower: Some(n.clone()),
                number_upper: Some(n.clone()),
                ..Self::default()
            },
            Value::List(_, items) | Value::Set(_, items) => Self::known_length(items.len()),
            Value::Map(_, items) => Self::known_length(items.len()),
            Value::Bool(_) | Value::Tuple(_) | Value::Object(_) => Self::not_null(),
        }
    }

    fn known_length(len: usize) -> Self {
        Self {
            not_null: true,
            length_lower: Some(len),
            length_upper: Some(len),
            ..Self::default()
        }
    }

    /// The strongest refinement implied by both `self` and `other`.
    pub fn common(&self, other: &Refinement) -> Self {
        Self {
            not_null: self.not_null && other.not_null,
            string_prefix: match (&self.string_prefix, &other.string_prefix) {
                (Some(a), Some(b)) => Some(common_prefix(a, b)).filter(|p| !p.is_empty()),
                _ => None,
            },
            number_lower: both(self.number_lower.clone(), other.number_lower.clone(), Ord::min),
            number_upper: both(self.number_upper.clone(), other.number_upper.clone(), Ord::max),
            length_lower: both(self.length_lower, other.length_lower, usize::min),
            length_upper: both(self.length_upper, other.length_upper, usize::max),
        }
    }

    /// Drops the parts of the refinement that do not apply to `ty`.
    pub fn restrict_to(mut self, ty: &Type) -> Self {
        match ty {
            Type::Dynamic => return Self::default(),
            Type::String => {}
            _ => self.string_prefix = None,
        }
        if *ty != Type::Number {
            self.number_lower = None;
            self.number_upper = None;
        }
        if !ty.is_collection() {
            self.length_lower = None;
            self.length_upper = None;
        }
        if self.string_prefix.as_deref() == Some("") {
            self.string_prefix = None;
        }
        if self.length_lower == Some(0) {
            self.length_lower = None;
        }
        self
    }

    /// What survives when an unknown of type `from` is converted to `to`.
    pub fn through_conversion(&self, from: &Type, to: &Type) -> Self {
        let mut result = Self {
            not_null: self.not_null,
            ..Self::default()
        };
        match (from, to) {
            (Type::String, Type::String) => result.string_prefix = self.string_prefix.clone(),
            (Type::Number, Type::Number) => {
                result.number_lower = self.number_lower.clone();
                result.number_upper = self.number_upper.clone();
            }
            (Type::Set(_), Type::List(_))
            | (Type::List(_), Type::List(_))
            | (Type::Set(_), Type::Set(_))
            | (Type::Map(_), Type::Map(_)) => {
                result.length_lower = self.length_lower;
                result.length_upper = self.length_upper;
            }
            (Type::List(_), Type::Set(_)) => {
                // duplicates may collapse
                result.length_lower = self.length_lower.map(|n| n.min(1));
                result.length_upper = self.length_upper;
            }
            _ => {}
        }
        result.restrict_to(to)
    }
}

fn both<T>(a: Option<T>, b: Option<T>, pick: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        _ => None,
    }
}

fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// Removes the last grapheme cluster, which a later character could still
/// combine with.
pub fn safe_prefix(prefix: &str) -> &str {
    match prefix.grapheme_indices(true).last() {
        Some((idx, _)) => &prefix[..idx],
        None => prefix,
    }
}

/// Builds a refined unknown value. Refining a known or `Dynamic` value is a
/// no-op.
#[derive(Debug, Clone)]
pub struct RefinementBuilder {
    value: Value,
}

impl RefinementBuilder {
    pub(crate) fn new(value: Value) -> Self {
        Self { value }
    }

    fn update(mut self, f: impl FnOnce(&mut Refinement)) -> Self {
        if let Value::Unknown(ty, refinement) = &mut self.value {
            if !ty.is_dynamic() {
                f(refinement);
            }
        }
        self
    }

    pub fn not_null(self) -> Self {
        self.update(|r| r.not_null = true)
    }

    /// Records a prefix whose last grapheme cluster may still change.
    pub fn string_prefix(self, prefix: &str) -> Self {
        let prefix = safe_prefix(prefix).to_string();
        self.string_prefix_full(&prefix)
    }

    /// Records a prefix that is exactly known.
    pub fn string_prefix_full(self, prefix: &str) -> Self {
        self.update(|r| {
            let keep_existing = r
                .string_prefix
                .as_deref()
                .is_some_and(|existing| existing.len() >= prefix.len());
            if !keep_existing && !prefix.is_empty() {
                r.string_prefix = Some(prefix.to_string());
            }
        })
    }

    pub fn number_lower_bound(self, bound: Number) -> Self {
        self.update(|r| {
            r.number_lower = Some(match r.number_lower.take() {
                Some(b) => b.max(bound),
                None => bound,
            });
        })
    }

    pub fn number_upper_bound(self, bound: Number) -> Self {
        self.update(|r| {
            r.number_upper = Some(match r.number_upper.take() {
                Some(b) => b.min(bound),
                None => bound,
            });
        })
    }

    pub fn number_range_inclusive(self, lower: Number, upper: Number) -> Self {
        self.number_lower_bound(lower).number_upper_bound(upper)
    }

    pub fn collection_length_lower_bound(self, bound: usize) -> Self {
        self.update(|r| {
            r.length_lower = Some(r.length_lower.map_or(bound, |b| b.max(bound)));
        })
    }

    pub fn collection_length_upper_bound(self, bound: usize) -> Self {
        self.update(|r| {
            r.length_upper = Some(r.length_upper.map_or(bound, |b| b.min(bound)));
        })
    }

    pub fn collection_length(self, len: usize) -> Self {
        self.collection_length_lower_bound(len)
            .collection_length_upper_bound(len)
    }

    /// Merges an existing refinement into the one being built.
    pub fn with(self, other: &Refinement) -> Self {
        let mut builder = self;
        if other.not_null {
            builder = builder.not_null();
        }
        if let Some(prefix) = &other.string_prefix {
            builder = builder.string_prefix_full(prefix);
        }
        if let Some(n) = &other.number_lower {
            builder = builder.number_lower_bound(n.clone());
        }
        if let Some(n) = &other.number_upper {
            builder = builder.number_upper_bound(n.clone());
        }
        if let Some(n) = other.length_lower {
            builder = builder.collection_length_lower_bound(n);
        }
        if let Some(n) = other.length_upper {
            builder = builder.collection_length_upper_bound(n);
        }
        builder
    }

    pub fn new_value(self) -> Value {
        match self.value {
            Value::Unknown(ty, refinement) => {
                let refinement = refinement.restrict_to(&ty);
                Value::Unknown(ty, refinement)
            }
            known => known,
        }
    }
}
