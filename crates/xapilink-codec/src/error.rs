/// Errors raised while encoding a command invocation.
///
/// These are returned to the calling invocation and never disturb device or
/// link state.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// Wrong number of positional arguments.
    #[error("{message}: expected {expected} arguments, {given} given")]
    Arity {
        message: String,
        expected: usize,
        given: usize,
    },

    /// The argument's value kind does not match the declared field type.
    #[error("{message}: field '{field}' expects {expected}")]
    TypeMismatch {
        message: String,
        field: String,
        expected: &'static str,
    },

    /// An integer does not fit the field's declared width.
    #[error("{message}: value {value} out of range for field '{field}' ({width}-byte)")]
    OutOfRange {
        message: String,
        field: String,
        value: i128,
        width: usize,
    },

    /// A byte sequence does not match a fixed-size field's length.
    #[error("{message}: field '{field}' requires exactly {expected} bytes, got {given}")]
    FixedLengthMismatch {
        message: String,
        field: String,
        expected: usize,
        given: usize,
    },

    /// A variable-length value exceeds what its length prefix can express.
    #[error("{message}: field '{field}' is {given} bytes, max {max}")]
    TooLong {
        message: String,
        field: String,
        given: usize,
        max: usize,
    },
}

/// Errors raised while decoding a payload against a known descriptor.
///
/// The dispatch engine reports these through the recoverable-error channel
/// and drops the frame; the reader loop continues.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload ended before all declared fields were consumed.
    #[error("{message}: payload truncated at field '{field}' (need {needed} bytes, {remaining} left)")]
    Truncated {
        message: String,
        field: String,
        needed: usize,
        remaining: usize,
    },

    /// A length prefix declares more bytes than the payload holds.
    #[error("{message}: field '{field}' declares {declared} bytes, only {remaining} left")]
    LengthOverrun {
        message: String,
        field: String,
        declared: usize,
        remaining: usize,
    },

    /// Payload is longer than the descriptor's fields account for.
    #[error("{message}: {extra} trailing byte(s) after last field")]
    TrailingBytes { message: String, extra: usize },
}
