use crate::error::NbtError;

use super::query::QueryValue;
use super::view::Value;
use super::{NbtTag, ID_END};

/// An NBT `List`: an ordered sequence of tags that all share the same variant.
///
/// The element type is fixed by the first tag ever inserted; an empty list may still carry
/// `ID_END` (0), meaning "type not yet determined" (§3.1).
#[derive(Clone, Debug, Default)]
pub struct NbtList {
    element_type: Option<u8>,
    elements: Vec<NbtTag>,
}

impl NbtList {
    /// Returns a new, empty list with no fixed element type.
    pub fn new() -> Self {
        NbtList { element_type: None, elements: Vec::new() }
    }

    /// Returns a new, empty list whose element type is fixed up front (useful for building an
    /// empty `List<Compound>` that should still reject a later `Int` insertion).
    pub fn with_element_type(id: u8) -> Self {
        NbtList { element_type: Some(id), elements: Vec::new() }
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether this list has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The fixed element type ID, or `ID_END` (0) if not yet determined.
    pub fn element_id(&self) -> u8 {
        self.element_type.unwrap_or(ID_END)
    }

    /// Returns the `i`-th element, if in bounds.
    pub fn get(&self, i: usize) -> Option<&NbtTag> {
        self.elements.get(i)
    }

    /// Iterates over elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &NbtTag> {
        self.elements.iter()
    }

    pub(crate) fn elements(&self) -> &[NbtTag] {
        &self.elements
    }

    fn check_type(&mut self, tag: &NbtTag) -> Result<(), NbtError> {
        match self.element_type {
            None => {
                self.element_type = Some(tag.id());
                Ok(())
            }
            Some(id) if id == tag.id() => Ok(()),
            Some(id) => Err(NbtError::TypeMismatch(format!(
                "cannot insert a {} into a List of element type {}",
                tag.tag_name(),
                id
            ))),
        }
    }

    /// Inserts `item` at `index`. If the list's element type isn't fixed yet, it is fixed to
    /// `item`'s variant. Fails with `TypeMismatch` if `item`'s variant doesn't match.
    pub fn insert(&mut self, index: usize, item: impl Into<NbtTag>) -> Result<(), NbtError> {
        let tag = item.into();
        tag.validate()?;
        self.check_type(&tag)?;
        self.elements.insert(index, tag);
        Ok(())
    }

    /// Inserts `item` at the end of the list.
    pub fn append(&mut self, item: impl Into<NbtTag>) -> Result<(), NbtError> {
        let index = self.elements.len();
        self.insert(index, item)
    }

    /// Inserts `item` at the front of the list.
    pub fn prepend(&mut self, item: impl Into<NbtTag>) -> Result<(), NbtError> {
        self.insert(0, item)
    }

    /// Inserts every item from `items` at the tail, in order.
    pub fn extend<T: Into<NbtTag>, I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<(), NbtError> {
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// Like [`extend`](Self::extend), but for an iterator of tag references (clones each one);
    /// used by `merge` to deep-copy the source list's elements.
    pub(crate) fn extend_cloned(&mut self, other: &NbtList) -> Result<(), NbtError> {
        for tag in &other.elements {
            self.append(tag.clone())?;
        }
        Ok(())
    }

    /// Removes every element. The fixed element type (if any) is preserved, matching the
    /// original implementation this crate is grounded on: a cleared list of Ints stays a list
    /// of Ints until a new element type is forced by some other means.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Returns a new list of the same element type, holding the elements in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> NbtList {
        NbtList {
            element_type: self.element_type,
            elements: self.elements[range].to_vec(),
        }
    }

    /// Tests whether every element of `template` can be uniquely matched to a distinct element
    /// of this list (see §4.1.1). Uses greedy array-order matching; each list element is
    /// consumed by at most one template element.
    pub fn contains(&self, template: &[QueryValue]) -> bool {
        let mut used = vec![false; self.elements.len()];
        for expected in template {
            let mut matched = false;
            for (j, tag) in self.elements.iter().enumerate() {
                if used[j] {
                    continue;
                }
                if expected.matches(tag) {
                    used[j] = true;
                    matched = true;
                    break;
                }
            }
            if !matched {
                return false;
            }
        }
        true
    }

    /// Returns a new list (of the same element type) containing the elements of `self` that
    /// satisfy `template`, in their original order. Only meaningful for a `List` of `Compound`;
    /// for any other element type every `template` comparison against a non-compound element
    /// simply fails to match, yielding an empty result.
    pub fn query(&self, template: &[(String, QueryValue)]) -> NbtList {
        let mut result = NbtList { element_type: self.element_type, elements: Vec::new() };
        for tag in &self.elements {
            if let NbtTag::Compound(c) = tag {
                if c.contains(template) {
                    result.elements.push(tag.clone());
                }
            }
        }
        result
    }

    /// Flattens this list into a plain `Vec`, recursing into nested compounds and lists.
    pub fn to_array(&self) -> Vec<Value> {
        self.elements.iter().map(Value::from).collect()
    }
}

impl PartialEq for NbtList {
    fn eq(&self, other: &Self) -> bool {
        self.element_type == other.element_type && self.elements == other.elements
    }
}

impl<'a> IntoIterator for &'a NbtList {
    type Item = &'a NbtTag;
    type IntoIter = std::slice::Iter<'a, NbtTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
