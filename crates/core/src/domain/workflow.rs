use std::fmt;

/// A forward-only status progression. `next` is total over the enum, so every
/// status either has exactly one successor or is terminal.
pub trait Workflow: Copy + Eq + fmt::Display + Sized {
    const INITIAL: Self;

    fn next(self) -> Option<Self>;

    fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Position in the chain, starting at 0 for `INITIAL`.
    fn ordinal(self) -> usize {
        let mut status = Self::INITIAL;
        let mut ordinal = 0;
        while status != self {
            match status.next() {
                Some(next) => {
                    status = next;
                    ordinal += 1;
                }
                None => break,
            }
        }
        ordinal
    }
}

/// Result of an advance command against a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Advance<S> {
    Moved { from: S, to: S },
    Terminal { status: S },
}

impl<S: Workflow> Advance<S> {
    pub fn from_status(from: S) -> Self {
        match from.next() {
            Some(to) => Advance::Moved { from, to },
            None => Advance::Terminal { status: from },
        }
    }

    pub fn status(&self) -> S {
        match self {
            Advance::Moved { to, .. } => *to,
            Advance::Terminal { status } => *status,
        }
    }

    pub fn moved(&self) -> bool {
        matches!(self, Advance::Moved { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub input: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} status: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseStatusError {}
