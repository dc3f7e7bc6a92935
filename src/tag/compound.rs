use std::collections::HashMap;

use crate::error::NbtError;

use super::query::QueryValue;
use super::view::Value;
use super::NbtTag;

/// How [`NbtCompound::merge`] reconciles a key present in both compounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Copy from the source only if the key is absent locally.
    Keep,
    /// Copy if absent; overwrite matching-type values if present; recurse into compounds when
    /// `recursive` is set.
    Merge,
    /// Copy from the source unconditionally, replacing whatever is there (deep copy).
    Replace,
    /// Only overwrite tags already present locally; never add a new key.
    Update,
}

/// An NBT `Compound`: a sequence of uniquely-named child tags.
///
/// Children are stored in insertion order (a `Vec`, not a `HashMap`) because §4.1's `add` with
/// `replace = true` must reinsert the new tag at the position the old one occupied, and
/// because encoding must be deterministic for round-trip tests like S1.
#[derive(Clone, Debug, Default)]
pub struct NbtCompound {
    children: Vec<(String, NbtTag)>,
}

impl NbtCompound {
    /// Returns a new, empty compound.
    pub fn new() -> Self {
        NbtCompound { children: Vec::new() }
    }

    /// Returns a new, empty compound with capacity for `n` children without reallocating.
    pub fn with_capacity(n: usize) -> Self {
        NbtCompound { children: Vec::with_capacity(n) }
    }

    /// The number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether this compound has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Looks up a child by exact name. Returns the first (and, by the uniqueness invariant,
    /// only) match.
    pub fn get(&self, name: &str) -> Option<&NbtTag> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Mutable counterpart of [`get`](Self::get).
    pub fn get_mut(&mut self, name: &str) -> Option<&mut NbtTag> {
        self.children.iter_mut().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    /// Inserts `tag` under `name`. If a child with the same name already exists and `replace`
    /// is `false`, fails with [`NbtError::DuplicateName`]. If `replace` is `true`, the existing
    /// child is removed and the new one takes its place in iteration order.
    pub fn add(&mut self, name: impl Into<String>, tag: impl Into<NbtTag>, replace: bool) -> Result<(), NbtError> {
        let name = name.into();
        let tag = tag.into();
        tag.validate()?;
        if let Some(pos) = self.children.iter().position(|(n, _)| *n == name) {
            if !replace {
                return Err(NbtError::DuplicateName(name));
            }
            self.children[pos] = (name, tag);
        } else {
            self.children.push((name, tag));
        }
        Ok(())
    }

    /// Removes the child named `name`, if present. Idempotent: no error if absent.
    pub fn remove(&mut self, name: &str) {
        self.children.retain(|(n, _)| n != name);
    }

    /// Removes the child named `name` and returns it, if present.
    pub fn take(&mut self, name: &str) -> Option<NbtTag> {
        let pos = self.children.iter().position(|(n, _)| n == name)?;
        Some(self.children.remove(pos).1)
    }

    /// Removes every child.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Iterates over children in insertion order (after accounting for in-place replacements).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NbtTag)> {
        self.children.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Mutable counterpart of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut NbtTag)> {
        self.children.iter_mut().map(|(n, t)| (n.as_str(), t))
    }

    pub(crate) fn children(&self) -> &[(String, NbtTag)] {
        &self.children
    }

    /// Tests whether this compound satisfies `template` (see §4.1.1).
    pub fn contains(&self, template: &[(String, QueryValue)]) -> bool {
        for (name, expected) in template {
            match self.get(name) {
                None => return false,
                Some(tag) => {
                    if !expected.matches(tag) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Combines `source` into `self` according to `mode`, recursing into matching `Compound`
    /// children when `recursive` is set. See §4.1.2.
    pub fn merge(&mut self, source: &NbtCompound, mode: MergeMode, recursive: bool) -> Result<(), NbtError> {
        for (name, source_tag) in &source.children {
            let existing_pos = self.children.iter().position(|(n, _)| n == name);
            match existing_pos {
                Some(pos) => {
                    let recurse_into_compound = recursive
                        && matches!(source_tag, NbtTag::Compound(_))
                        && matches!(self.children[pos].1, NbtTag::Compound(_));
                    if recurse_into_compound {
                        if let (NbtTag::Compound(ref mut local), NbtTag::Compound(ref src)) =
                            (&mut self.children[pos].1, source_tag)
                        {
                            local.merge(src, mode, true)?;
                        }
                        continue;
                    }
                    if mode == MergeMode::Keep {
                        continue;
                    }
                    if mode == MergeMode::Replace {
                        self.children[pos].1 = source_tag.clone();
                        continue;
                    }
                    // Merge / Update: require matching variants, then overwrite in place.
                    {
                        let local_ref: &NbtTag = &self.children[pos].1;
                        if std::mem::discriminant(local_ref) != std::mem::discriminant(source_tag) {
                            return Err(NbtError::TypeMismatch(format!(
                                "cannot merge {} into {} at key {:?}",
                                source_tag.tag_name(),
                                local_ref.tag_name(),
                                name
                            )));
                        }
                    }
                    if let (NbtTag::List(src_list), &mut NbtTag::List(ref mut local_list)) =
                        (source_tag, &mut self.children[pos].1)
                    {
                        local_list.clear();
                        local_list.extend_cloned(src_list)?;
                    } else {
                        self.children[pos].1 = source_tag.clone();
                    }
                }
                None => {
                    if mode != MergeMode::Update {
                        self.children.push((name.clone(), source_tag.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Flattens this compound into a plain `HashMap`, recursing into nested compounds and
    /// lists.
    pub fn to_dict(&self) -> HashMap<String, Value> {
        self.children
            .iter()
            .map(|(name, tag)| (name.clone(), Value::from(tag)))
            .collect()
    }
}

impl PartialEq for NbtCompound {
    /// Structural equality is name-multiset equality: order does not matter, only that every
    /// name in one compound maps to an equal tag in the other (and the counts match).
    fn eq(&self, other: &Self) -> bool {
        if self.children.len() != other.children.len() {
            return false;
        }
        self.children.iter().all(|(name, tag)| other.get(name) == Some(tag))
    }
}

impl<'a> IntoIterator for &'a NbtCompound {
    type Item = (&'a str, &'a NbtTag);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a NbtTag)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl FromIterator<(String, NbtTag)> for NbtCompound {
    fn from_iter<I: IntoIterator<Item = (String, NbtTag)>>(iter: I) -> Self {
        let mut compound = NbtCompound::new();
        for (name, tag) in iter {
            // Last write wins, matching HashMap-collection semantics for duplicate keys.
            compound.children.retain(|(n, _)| n != &name);
            compound.children.push((name, tag));
        }
        compound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::NbtList;

    #[test]
    fn duplicate_add_fails_and_leaves_compound_unchanged() {
        let mut c = NbtCompound::new();
        c.add("x", 1i32, false).unwrap();
        let err = c.add("x", 2i32, false).unwrap_err();
        assert!(matches!(err, NbtError::DuplicateName(_)));
        assert_eq!(c.get("x"), Some(&NbtTag::Int(1)));
    }

    #[test]
    fn add_with_replace_preserves_position() {
        let mut c = NbtCompound::new();
        c.add("a", 1i32, false).unwrap();
        c.add("b", 2i32, false).unwrap();
        c.add("c", 3i32, false).unwrap();
        c.add("b", 20i32, true).unwrap();

        let names: Vec<&str> = c.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(c.get("b"), Some(&NbtTag::Int(20)));
    }

    #[test]
    fn take_removes_and_returns_owned_tag() {
        let mut c = NbtCompound::new();
        c.add("a", 1i32, false).unwrap();
        let taken = c.take("a").unwrap();
        assert_eq!(taken, NbtTag::Int(1));
        assert_eq!(c.get("a"), None);
        assert_eq!(c.take("a"), None);
    }

    // Scenario S5: merging recursively with Merge mode overwrites matching-type scalars, copies
    // absent keys, and recurses into a shared nested compound.
    #[test]
    fn merge_scenario_recursive_merge() {
        let mut a = NbtCompound::new();
        a.add("name", "alice", false).unwrap();
        a.add("score", 10i32, false).unwrap();
        let mut a_stats = NbtCompound::new();
        a_stats.add("hp", 100i32, false).unwrap();
        a.add("stats", a_stats, false).unwrap();

        let mut b = NbtCompound::new();
        b.add("score", 20i32, false).unwrap();
        b.add("level", 5i32, false).unwrap();
        let mut b_stats = NbtCompound::new();
        b_stats.add("hp", 80i32, false).unwrap();
        b_stats.add("mp", 40i32, false).unwrap();
        b.add("stats", b_stats, false).unwrap();

        a.merge(&b, MergeMode::Merge, true).unwrap();

        assert_eq!(a.get("name"), Some(&NbtTag::String("alice".into())));
        assert_eq!(a.get("score"), Some(&NbtTag::Int(20)));
        assert_eq!(a.get("level"), Some(&NbtTag::Int(5)));
        let stats = a.get("stats").unwrap().as_compound().unwrap();
        assert_eq!(stats.get("hp"), Some(&NbtTag::Int(80)));
        assert_eq!(stats.get("mp"), Some(&NbtTag::Int(40)));
    }

    #[test]
    fn merge_keep_never_overwrites() {
        let mut a = NbtCompound::new();
        a.add("x", 1i32, false).unwrap();
        let mut b = NbtCompound::new();
        b.add("x", 2i32, false).unwrap();
        b.add("y", 3i32, false).unwrap();

        a.merge(&b, MergeMode::Keep, false).unwrap();
        assert_eq!(a.get("x"), Some(&NbtTag::Int(1)));
        assert_eq!(a.get("y"), Some(&NbtTag::Int(3)));
    }

    #[test]
    fn merge_update_never_adds_new_keys() {
        let mut a = NbtCompound::new();
        a.add("x", 1i32, false).unwrap();
        let mut b = NbtCompound::new();
        b.add("x", 2i32, false).unwrap();
        b.add("y", 3i32, false).unwrap();

        a.merge(&b, MergeMode::Update, false).unwrap();
        assert_eq!(a.get("x"), Some(&NbtTag::Int(2)));
        assert_eq!(a.get("y"), None);
    }

    #[test]
    fn merge_type_mismatch_fails() {
        let mut a = NbtCompound::new();
        a.add("x", 1i32, false).unwrap();
        let mut b = NbtCompound::new();
        b.add("x", "oops", false).unwrap();

        let err = a.merge(&b, MergeMode::Merge, false).unwrap_err();
        assert!(matches!(err, NbtError::TypeMismatch(_)));
    }

    #[test]
    fn merge_replaces_list_contents_but_keeps_type_check() {
        let mut a_list = NbtList::new();
        a_list.extend(vec![1i32, 2]).unwrap();
        let mut a = NbtCompound::new();
        a.add("l", a_list, false).unwrap();

        let mut b_list = NbtList::new();
        b_list.extend(vec![3i32, 4, 5]).unwrap();
        let mut b = NbtCompound::new();
        b.add("l", b_list, false).unwrap();

        a.merge(&b, MergeMode::Merge, false).unwrap();
        let merged = a.get("l").unwrap().as_list().unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(0), Some(&NbtTag::Int(3)));
    }

    #[test]
    fn contains_predicate() {
        let mut c = NbtCompound::new();
        c.add("name", "alice", false).unwrap();
        c.add("score", 10i32, false).unwrap();

        assert!(c.contains(&[("name".to_string(), QueryValue::String("alice".into()))]));
        assert!(c.contains(&[("score".to_string(), QueryValue::Wildcard)]));
        assert!(!c.contains(&[("score".to_string(), QueryValue::Int(11))]));
        assert!(!c.contains(&[("missing".to_string(), QueryValue::Wildcard)]));
    }

    #[test]
    fn structural_equality_ignores_order() {
        let mut a = NbtCompound::new();
        a.add("x", 1i32, false).unwrap();
        a.add("y", 2i32, false).unwrap();

        let mut b = NbtCompound::new();
        b.add("y", 2i32, false).unwrap();
        b.add("x", 1i32, false).unwrap();

        assert_eq!(a, b);
    }
}
