use std::fmt;

macro_rules! error_codes {
    ($($(#[$doc:meta])* $code:ident => $summary:literal,)*) => {
        /// Stable identifiers for every diagnostic the generator reports.
        ///
        /// The leading digit names the phase that raises it: `E0` lexing,
        /// `E1` preprocessing and parsing, `E2` rules and transformation,
        /// `E9` internal invariants. `W` codes are warnings. `E1004` is a
        /// warning too, since the declaration is skipped and the run goes on.
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
        pub enum ErrorCode {
            $($(#[$doc])* $code,)*
        }

        impl ErrorCode {
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$code,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(ErrorCode::$code => stringify!($code),)*
                }
            }

            /// Default message for a diagnostic that never gets a more
            /// specific one.
            pub fn description(self) -> &'static str {
                match self {
                    $(ErrorCode::$code => $summary,)*
                }
            }
        }
    };
}

error_codes! {
    /// Unterminated string or character literal.
    E0001 => "unterminated literal",
    E0002 => "invalid character",
    E1001 => "unexpected token",
    /// `#else`, `#elif` or `#endif` without a matching `#if`, or an `#if`
    /// still open at end of file.
    E1002 => "unbalanced conditional directive",
    E1003 => "#error directive",
    E1004 => "unsupported declaration",
    /// A retype rule names a type the declaration cannot take.
    E2001 => "invalid retype target",
    /// A marshalling override reverses the slot's data flow or names a
    /// slot that is not a `char` pointer.
    E2002 => "marshalling override conflict",
    E2003 => "macro value not representable",
    /// A struct with no known layout appears as a field, parameter or
    /// return type rather than behind a pointer.
    E2004 => "opaque type used by value",
    E9001 => "internal reshape invariant violated",
    W1001 => "value-equality field not comparable",
    /// A rule that an earlier rule of the same kind always wins over.
    W2001 => "unreachable rule",
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
