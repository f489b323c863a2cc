use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E1xxx: Structural errors (shape checks before inference)
/// - E2xxx: Type errors
/// - E3xxx: Storage errors
/// - E9xxx: Internal compiler errors
/// - W2xxx: Type warnings
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Structural Errors (E1xxx)
    /// Unknown operator
    E1001,
    /// Wrong number of arguments
    E1002,
    /// Assignment target is not a subscript
    E1003,
    /// Delete target is not a subscript
    E1004,
    /// Member name is not a name
    E1005,
    /// Length is not a constant
    E1006,

    // Type Errors (E2xxx)
    /// Incompatible assignment
    E2001,
    /// Dereference of a non-pointer
    E2002,
    /// Member access on a non-aggregate
    E2003,
    /// No such member
    E2004,
    /// Subscript key is not a scalar
    E2005,
    /// Value is not subscriptable
    E2006,
    /// Map key type mismatch
    E2007,
    /// Value too large to use as a pointer
    E2008,
    /// Length out of range
    E2009,
    /// Map used as a value
    E2010,
    /// Unknown identifier
    E2011,
    /// Cannot infer type
    E2012,
    /// Value has no size
    E2013,

    // Storage Errors (E3xxx)
    /// Stack frame exhausted
    E3001,

    // Internal Errors (E9xxx)
    /// Internal compiler error
    E9001,

    // Type Warnings (W2xxx)
    /// `strcmp` operand is not a string
    W2001,
}

impl ErrorCode {
    /// Get the code as a string (e.g., "E1001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Structural
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            // Type
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E2011 => "E2011",
            ErrorCode::E2012 => "E2012",
            ErrorCode::E2013 => "E2013",
            // Storage
            ErrorCode::E3001 => "E3001",
            // Internal
            ErrorCode::E9001 => "E9001",
            // Warnings
            ErrorCode::W2001 => "W2001",
        }
    }

    /// Check if this is a structural error (E1xxx range).
    pub fn is_structural_error(&self) -> bool {
        self.as_str().starts_with("E1")
    }

    /// Check if this is a type error (E2xxx range).
    pub fn is_type_error(&self) -> bool {
        self.as_str().starts_with("E2")
    }

    /// Check if this is a warning code (Wxxx range).
    pub fn is_warning(&self) -> bool {
        self.as_str().starts_with('W')
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
