use std::fmt;

use crate::ast::{NamedType, TypeAnnotation, TypeAnnotationKind};

/// The static type of a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Bool,
    Str,
    /// The type of the `None` literal.
    None,
    /// The type of the `[]` literal.
    Empty,
    Object,
    /// Subtype of every type; no value has it.
    Bottom,
    List(Box<ValueType>),
}

impl ValueType {
    pub fn list_of(elem: ValueType) -> ValueType {
        ValueType::List(Box::new(elem))
    }

    pub fn from_annotation(annotation: &TypeAnnotation) -> ValueType {
        match &annotation.kind {
            TypeAnnotationKind::Named(NamedType::Int) => ValueType::Int,
            TypeAnnotationKind::Named(NamedType::Bool) => ValueType::Bool,
            TypeAnnotationKind::Named(NamedType::Str) => ValueType::Str,
            TypeAnnotationKind::Named(NamedType::Object) => ValueType::Object,
            TypeAnnotationKind::List(inner) => ValueType::list_of(ValueType::from_annotation(inner)),
        }
    }

    /// Returns the element type if this is a list.
    pub fn elem(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ValueType::List(_))
    }

    /// Values of `int`, `bool` and `str` are not references, so they can't be
    /// compared by identity.
    pub fn is_special(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Bool | ValueType::Str)
    }

    /// The subtype relation, `self <: other`.
    pub fn is_subtype_of(&self, other: &ValueType) -> bool {
        use ValueType::*;
        if self == other {
            return true;
        }
        match (self, other) {
            (Bottom, _) => true,
            (Int | Bool | Str | List(_) | None | Empty, Object) => true,
            _ => false,
        }
    }

    /// The assignment compatibility relation, `self ≼ other`.
    pub fn is_assignable_to(&self, other: &ValueType) -> bool {
        use ValueType::*;
        if self.is_subtype_of(other) && *self != Bottom {
            return true;
        }
        match (self, other) {
            (None, other) => !matches!(other, Int | Bool | Str | Bottom),
            (Empty, List(_)) => true,
            (List(elem), List(other_elem)) if **elem == None => None.is_assignable_to(other_elem),
            _ => false,
        }
    }

    /// The least upper bound of both types under `≼`.
    pub fn join(&self, other: &ValueType) -> ValueType {
        if self.is_assignable_to(other) {
            other.clone()
        } else if other.is_assignable_to(self) {
            self.clone()
        } else {
            ValueType::Object
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => f.write_str("int"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Str => f.write_str("str"),
            ValueType::None => f.write_str("<None>"),
            ValueType::Empty => f.write_str("<Empty>"),
            ValueType::Object => f.write_str("object"),
            ValueType::Bottom => f.write_str("<bottom>"),
            ValueType::List(elem) => write!(f, "[{elem}]"),
        }
    }
}

/// The type of a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub ret: ValueType,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

#[cfg(test)]
mod tests {
    use super::ValueType::{self, *};

    fn samples() -> Vec<ValueType> {
        vec![
            Int,
            Bool,
            Str,
            None,
            Empty,
            Object,
            ValueType::list_of(Int),
            ValueType::list_of(None),
            ValueType::list_of(Object),
            ValueType::list_of(ValueType::list_of(Str)),
        ]
    }

    #[test]
    fn test_subtyping() {
        assert!(Int.is_subtype_of(&Int));
        assert!(Int.is_subtype_of(&Object));
        assert!(ValueType::list_of(Int).is_subtype_of(&Object));
        assert!(None.is_subtype_of(&Object));
        assert!(Bottom.is_subtype_of(&Int));
        assert!(!Int.is_subtype_of(&Bool));
        assert!(!Object.is_subtype_of(&Int));
        assert!(!ValueType::list_of(Int).is_subtype_of(&ValueType::list_of(Object)));
    }

    #[test]
    fn test_assignability() {
        assert!(None.is_assignable_to(&Object));
        assert!(None.is_assignable_to(&ValueType::list_of(Int)));
        assert!(!None.is_assignable_to(&Int));
        assert!(!None.is_assignable_to(&Str));
        assert!(Empty.is_assignable_to(&ValueType::list_of(Bool)));
        assert!(!Empty.is_assignable_to(&Str));
        assert!(ValueType::list_of(None).is_assignable_to(&ValueType::list_of(Object)));
        assert!(!ValueType::list_of(None).is_assignable_to(&ValueType::list_of(Int)));
        assert!(!Bottom.is_assignable_to(&Int));
        assert!(!Bool.is_assignable_to(&Int));
    }

    #[test]
    fn test_join() {
        assert_eq!(Int.join(&Int), Int);
        assert_eq!(Int.join(&Bool), Object);
        assert_eq!(None.join(&ValueType::list_of(Int)), ValueType::list_of(Int));
        assert_eq!(Empty.join(&ValueType::list_of(Str)), ValueType::list_of(Str));
        assert_eq!(Str.join(&None), Object);
    }

    #[test]
    fn test_join_is_commutative_and_absorbs_object() {
        let samples = samples();
        for a in &samples {
            assert_eq!(Object.join(a), Object, "join(object, {a})");
            assert_eq!(a.join(&Object), Object, "join({a}, object)");
            for b in &samples {
                assert_eq!(a.join(b), b.join(a), "join({a}, {b})");
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueType::list_of(ValueType::list_of(Int)).to_string(), "[[int]]");
        assert_eq!(None.to_string(), "<None>");
        assert_eq!(Empty.to_string(), "<Empty>");
    }
}
