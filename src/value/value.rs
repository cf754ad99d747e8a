use super::Record;
use crate::error::{Result, StoreError};
use std::fmt;
use std::sync::Arc;

type FuncImpl = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Coarse classification of a value, used to pick a diff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Primitives and functions. Compared by value or identity only.
    Scalar,
    /// Ordered sequences. Compared by identity only.
    List,
    /// Key-value records. Eligible for shallow diffing.
    Record,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => f.write_str("scalar"),
            Shape::List => f.write_str("list"),
            Shape::Record => f.write_str("record"),
        }
    }
}

/// A callable stored in state, typically an action that merges into its store.
#[derive(Clone)]
pub struct Func(Arc<FuncImpl>);

impl Func {
    /// Wrap a closure as a callable value.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Call with `args`.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }

    /// Identity comparison.
    pub fn same(&self, other: &Func) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

/// An immutable, shared list of values.
#[derive(Clone, Default)]
pub struct List(Arc<[Value]>);

impl List {
    /// Take ownership of `items` as a shared list.
    pub fn new(items: Vec<Value>) -> Self {
        Self(items.into())
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Identity comparison.
    pub fn same(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A state value.
///
/// `PartialEq` is deep structural equality and is what assertions want.
/// Change detection uses [`Value::same`] instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(List),
    Record(Record),
    Func(Func),
}

impl Value {
    /// Which diff strategy applies to this value.
    pub fn shape(&self) -> Shape {
        match self {
            Value::List(_) => Shape::List,
            Value::Record(_) => Shape::Record,
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::Str(_)
            | Value::Func(_) => Shape::Scalar,
        }
    }

    /// Reference/value equality.
    ///
    /// Primitives compare by value (floats with same-value semantics: NaN is
    /// the same as NaN, `0.0` is not the same as `-0.0`). Lists, records and
    /// functions compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.same(b),
            (Value::Record(a), Value::Record(b)) => a.same(b),
            (Value::Func(a), Value::Func(b)) => a.same(b),
            _ => false,
        }
    }

    /// Invoke a function value.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Func(func) => func.call(args),
            other => Err(StoreError::NotCallable {
                found: other.shape(),
            }),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Ints widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&Func> {
        match self {
            Value::Func(func) => Some(func),
            _ => None,
        }
    }
}

/// Shallow equality over top-level entries.
///
/// Records are equal when they hold the same keys and every value is
/// [`Value::same`]; lists compare element-wise the same way. Anything else
/// falls back to [`Value::same`].
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    if a.same(b) {
        return true;
    }
    match (a, b) {
        (Value::Record(a), Value::Record(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| value.same(other)))
        }
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y))
        }
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<Func> for Value {
    fn from(func: Func) -> Self {
        Value::Func(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_compares_primitives_by_value() {
        assert!(Value::from(3).same(&Value::from(3)));
        assert!(Value::from("a").same(&Value::from("a")));
        assert!(!Value::from(3).same(&Value::from(4)));
        assert!(!Value::from(3).same(&Value::from(3.0)));
    }

    #[test]
    fn same_uses_same_value_semantics_for_floats() {
        assert!(Value::Float(f64::NAN).same(&Value::Float(f64::NAN)));
        assert!(!Value::Float(0.0).same(&Value::Float(-0.0)));
    }

    #[test]
    fn same_compares_lists_by_identity() {
        let a = Value::from(vec![Value::from(1)]);
        let b = Value::from(vec![Value::from(1)]);
        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn call_rejects_non_functions() {
        let err = Value::from(1).call(&[]).unwrap_err();
        assert_eq!(
            err,
            StoreError::NotCallable {
                found: Shape::Scalar
            }
        );
    }

    #[test]
    fn funcs_are_scalars_with_identity() {
        let f = Func::new(|args| Ok(Value::from(args.len() as i64)));
        let v = Value::from(f.clone());
        assert_eq!(v.shape(), Shape::Scalar);
        assert!(v.same(&Value::from(f)));
        assert_eq!(v.call(&[Value::Null, Value::Null]).unwrap(), Value::from(2));

        let other = Value::from(Func::new(|_| Ok(Value::Null)));
        assert!(!v.same(&other));
    }

    #[test]
    fn shallow_equal_records() {
        let shared = Value::from(vec![Value::from(1)]);
        let a = Value::from(Record::new().with("xs", shared.clone()).with("n", 1));
        let b = Value::from(Record::new().with("xs", shared).with("n", 1));
        assert!(!a.same(&b));
        assert!(shallow_equal(&a, &b));

        let c = Value::from(
            Record::new()
                .with("xs", vec![Value::from(1)])
                .with("n", 1),
        );
        assert!(!shallow_equal(&a, &c));
    }

    #[test]
    fn shallow_equal_detects_extra_keys() {
        let a = Value::from(Record::new().with("n", 1));
        let b = Value::from(Record::new().with("n", 1).with("m", 2));
        assert!(!shallow_equal(&a, &b));
        assert!(!shallow_equal(&b, &a));
    }
}
