//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally passing a chapter id where a comment id is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`, `next()`
/// - `From<i32>`, `Into<i32>` and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use katha_vault_core::define_id;
/// define_id!(ShelfId);
/// define_id!(BadgeId);
///
/// let shelf = ShelfId::new(1);
/// assert_eq!(shelf.next(), ShelfId::new(2));
///
/// // These are different types, so this won't compile:
/// // let _: ShelfId = BadgeId::new(1);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }

            /// The id that follows this one in sequential assignment.
            #[must_use]
            pub const fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(NovelId);
define_id!(ChapterId);
define_id!(CommentId);
define_id!(PostId);

/// Next sequential id for a collection: one past the largest existing id,
/// or `1` for an empty collection.
///
/// # Example
///
/// ```rust
/// # use katha_vault_core::{NovelId, next_id};
/// let ids = [NovelId::new(3), NovelId::new(7)];
/// assert_eq!(next_id(ids), NovelId::new(8));
/// assert_eq!(next_id(Vec::<NovelId>::new()), NovelId::new(1));
/// ```
pub fn next_id<I, T>(ids: I) -> T
where
    I: IntoIterator<Item = T>,
    T: Ord + From<i32> + Into<i32> + Copy,
{
    ids.into_iter()
        .max()
        .map_or_else(|| T::from(1), |max| T::from(max.into() + 1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_bare_number() {
        let id = ChapterId::new(12);
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
        let back: ChapterId = serde_json::from_str("12").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_from_str() {
        let id: CommentId = "41".parse().unwrap();
        assert_eq!(id.as_i32(), 41);
        assert!("forty".parse::<CommentId>().is_err());
    }

    #[test]
    fn test_next_id_skips_gaps() {
        let ids = vec![PostId::new(1), PostId::new(5), PostId::new(2)];
        assert_eq!(next_id(ids), PostId::new(6));
    }
}
