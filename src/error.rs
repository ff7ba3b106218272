use core::fmt;

/// Result alias for `cftree`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by tree construction and hierarchy primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Point dimensionality does not match the tree.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Too many items for a dense pairwise structure.
    TooManyItems {
        /// Number of items supplied.
        n_items: usize,
        /// Largest supported number of items.
        max: usize,
    },

    /// A rebuild produced more leaves than it started with.
    CondenseFailed {
        /// Leaf count before the rebuild.
        before: usize,
        /// Leaf count after the rebuild.
        after: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::TooManyItems { n_items, max } => {
                write!(f, "{n_items} items exceed the supported maximum of {max}")
            }
            Error::CondenseFailed { before, after } => {
                write!(
                    f,
                    "could not reduce the number of leaves when compacting the tree ({before} -> {after})"
                )
            }
        }
    }
}

impl std::error::Error for Error {}
