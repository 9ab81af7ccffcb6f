//! Shared dataset handle.

use serde_json::Value;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Rows shared between the caller and the indexes built over them.
///
/// Every index keeps a `Weak` reference to the rows it was built from.
/// That keeps the allocation reserved, so a dropped dataset's address is
/// never handed to a new one while an index still remembers it.
///
/// # Example
/// ```
/// use cari::Dataset;
/// use serde_json::json;
///
/// let mut data = Dataset::from(vec![json!({"name": "Jane"})]);
/// data.make_mut().push(json!({"name": "John"}));
/// assert_eq!(data.len(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    rows: Arc<Vec<Value>>,
}

impl Dataset {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows: Arc::new(rows) }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    /// Mutable access to the rows.
    ///
    /// When another handle or any index refers to these rows they are moved
    /// (or copied) to a new allocation first, so the edited dataset gets a
    /// new identity and cached indexes are rebuilt rather than reused.
    pub fn make_mut(&mut self) -> &mut Vec<Value> {
        Arc::make_mut(&mut self.rows)
    }

    /// Whether both handles share the same rows.
    pub fn ptr_eq(&self, other: &Dataset) -> bool {
        Arc::ptr_eq(&self.rows, &other.rows)
    }

    pub(crate) fn downgrade(&self) -> Weak<Vec<Value>> {
        Arc::downgrade(&self.rows)
    }

    pub(crate) fn as_ptr(&self) -> *const Vec<Value> {
        Arc::as_ptr(&self.rows)
    }
}

impl Deref for Dataset {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.rows
    }
}

impl From<Vec<Value>> for Dataset {
    fn from(rows: Vec<Value>) -> Self {
        Self::new(rows)
    }
}

impl FromIterator<Value> for Dataset {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clone_shares_rows() {
        let a = Dataset::from(vec![json!(1), json!(2)]);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(b[1], json!(2));
    }

    #[test]
    fn test_make_mut_unshared_keeps_identity() {
        let mut a = Dataset::from(vec![json!(1)]);
        let before = a.as_ptr();
        a.make_mut()[0] = json!(5);
        assert_eq!(a.as_ptr(), before);
        assert_eq!(a[0], json!(5));
    }

    #[test]
    fn test_make_mut_with_weak_moves_rows() {
        let mut a = Dataset::from(vec![json!(1)]);
        let weak = a.downgrade();
        a.make_mut()[0] = json!(5);
        assert!(!std::ptr::eq(weak.as_ptr(), a.as_ptr()));
    }

    #[test]
    fn test_make_mut_shared_copies() {
        let mut a = Dataset::from(vec![json!(1)]);
        let b = a.clone();
        a.make_mut().push(json!(2));
        assert!(!a.ptr_eq(&b));
        assert_eq!(b.len(), 1);
    }
}
