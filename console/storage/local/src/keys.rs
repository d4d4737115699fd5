use std::fmt;

/// Keys of the values the console persists between runs.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    /// The serialized OAuth token pair of the signed in user.
    Token,
    /// An OAuth authorization code received by the callback route, pending exchange.
    Code,
    /// The route to return to once the OAuth redirect completes.
    LastArea,
}

impl Key {
    pub const ALL: [Key; 3] = [Key::Token, Key::Code, Key::LastArea];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Code => "code",
            Self::LastArea => "last-area",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
