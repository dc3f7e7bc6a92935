//! The template type used by `NbtCompound::contains` and `NbtList::query`.

use super::NbtTag;

/// A value to match against in a `contains`/`query` template (see §4.1.1).
///
/// This mirrors the shape `NbtTag` can take, except that a name can map to `Wildcard`, meaning
/// "present with any value", and every leaf is compared by value rather than by identity.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    /// Matches any tag, as long as one is present under the given name.
    Wildcard,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    /// A nested template to be matched recursively against a `Compound` tag.
    Compound(Vec<(String, QueryValue)>),
    /// A nested template to be matched recursively (as a list) against a `List` tag.
    List(Vec<QueryValue>),
}

impl QueryValue {
    /// Tests whether `tag` satisfies this template, per the rules in §4.1.1.
    pub(crate) fn matches(&self, tag: &NbtTag) -> bool {
        match (self, tag) {
            (QueryValue::Wildcard, _) => true,
            (QueryValue::Compound(template), NbtTag::Compound(c)) => c.contains(template),
            (QueryValue::List(template), NbtTag::List(l)) => l.contains(template),
            (QueryValue::Byte(v), NbtTag::Byte(t)) => v == t,
            (QueryValue::Short(v), NbtTag::Short(t)) => v == t,
            (QueryValue::Int(v), NbtTag::Int(t)) => v == t,
            (QueryValue::Long(v), NbtTag::Long(t)) => v == t,
            (QueryValue::Float(v), NbtTag::Float(t)) => v == t,
            (QueryValue::Double(v), NbtTag::Double(t)) => v == t,
            (QueryValue::ByteArray(v), NbtTag::ByteArray(t)) => v == t,
            (QueryValue::String(v), NbtTag::String(t)) => v == t,
            (QueryValue::IntArray(v), NbtTag::IntArray(t)) => v == t,
            (QueryValue::LongArray(v), NbtTag::LongArray(t)) => v == t,
            _ => false,
        }
    }
}

macro_rules! from_scalar {
    ($t:ty, $variant:ident) => {
        impl From<$t> for QueryValue {
            fn from(v: $t) -> QueryValue {
                QueryValue::$variant(v)
            }
        }
    };
}

from_scalar!(i8, Byte);
from_scalar!(i16, Short);
from_scalar!(i32, Int);
from_scalar!(i64, Long);
from_scalar!(f32, Float);
from_scalar!(f64, Double);
from_scalar!(Vec<i8>, ByteArray);
from_scalar!(Vec<i32>, IntArray);
from_scalar!(Vec<i64>, LongArray);
from_scalar!(String, String);

impl<'a> From<&'a str> for QueryValue {
    fn from(v: &'a str) -> QueryValue {
        QueryValue::String(v.to_string())
    }
}

impl From<Option<QueryValue>> for QueryValue {
    fn from(v: Option<QueryValue>) -> QueryValue {
        v.unwrap_or(QueryValue::Wildcard)
    }
}
