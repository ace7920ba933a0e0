//! Droits d'accès REST par opération

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Ensemble de verbes REST autorisés
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessMask(u8);

impl AccessMask {
    pub const NONE: AccessMask = AccessMask(0);
    pub const GET: AccessMask = AccessMask(1);
    pub const POST: AccessMask = AccessMask(1 << 1);
    pub const PUT: AccessMask = AccessMask(1 << 2);
    pub const PATCH: AccessMask = AccessMask(1 << 3);
    pub const DELETE: AccessMask = AccessMask(1 << 4);
    pub const ALL: AccessMask = AccessMask(0b1_1111);

    const VERBS: [(AccessMask, &'static str); 5] = [
        (AccessMask::GET, "GET"),
        (AccessMask::POST, "POST"),
        (AccessMask::PUT, "PUT"),
        (AccessMask::PATCH, "PATCH"),
        (AccessMask::DELETE, "DELETE"),
    ];

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: AccessMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Masque d'un verbe HTTP (insensible à la casse)
    pub fn from_verb(verb: &str) -> Option<AccessMask> {
        Self::VERBS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(verb))
            .map(|(mask, _)| *mask)
    }

    /// Verbes contenus dans le masque
    pub fn verbs(&self) -> Vec<&'static str> {
        Self::VERBS
            .iter()
            .filter(|(mask, _)| self.contains(*mask))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for AccessMask {
    type Output = AccessMask;

    fn bitor(self, rhs: AccessMask) -> AccessMask {
        AccessMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: AccessMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verbs().join("|"))
    }
}
