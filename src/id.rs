//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::IndexSet;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone, std::hash::Hash, PartialEq, Eq, serde::Deserialize, Debug, serde::Serialize,
        )]
        /// An ID type (e.g. `ProductID`)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}
pub(crate) use define_id_type;

define_id_type! {ProductID}

/// Check that all IDs in an iterator are unique, returning them as an ordered set.
///
/// # Arguments
///
/// * `ids` - The IDs to check
///
/// # Returns
///
/// The IDs in their original order, or an error naming the first duplicate.
pub fn check_unique_ids<'a, I>(ids: I) -> Result<IndexSet<&'a ProductID>>
where
    I: IntoIterator<Item = &'a ProductID>,
{
    let mut set = IndexSet::new();
    for id in ids {
        let inserted = set.insert(id);
        inserted
            .then_some(())
            .with_context(|| format!("Duplicate ID found: {id}"))?;
    }

    Ok(set)
}
