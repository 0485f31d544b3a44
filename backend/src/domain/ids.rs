//! Store-assigned numeric identifiers.
//!
//! Posts, comments, likes, and ledger entries are keyed by ascending 64-bit
//! sequences, so identifier order doubles as a deterministic tie-break for
//! rows created within the same timestamp.

macro_rules! define_id {
    ($(#[$outer:meta])* $name:ident, $label:literal) => {
        $(#[$outer])*
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
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw store identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Raw store identifier.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, concat!($label, ":{}"), self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`crate::domain::Post`].
    PostId,
    "post"
);
define_id!(
    /// Identifier of a [`crate::domain::Comment`].
    CommentId,
    "comment"
);
define_id!(
    /// Identifier of a [`crate::domain::Like`].
    LikeId,
    "like"
);
define_id!(
    /// Identifier of a [`crate::domain::KarmaTransaction`].
    KarmaTransactionId,
    "karma"
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn display_includes_kind_label() {
        assert_eq!(PostId::new(7).to_string(), "post:7");
        assert_eq!(CommentId::new(3).to_string(), "comment:3");
    }

    #[rstest]
    fn serialises_as_bare_number() {
        let value = serde_json::to_value(LikeId::new(42)).expect("serialise id");
        assert_eq!(value, serde_json::json!(42));
    }
}
