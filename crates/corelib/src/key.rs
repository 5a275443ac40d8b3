//! The fixed key domain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of keys in the domain.
pub const KEY_SPACE: usize = 256;

/// A key in the fixed integer domain 0..=255.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Key(pub u8);

impl Key {
    /// Every key in the domain, in ascending order.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..=u8::MAX).map(Key)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u32> for Key {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        u8::try_from(raw).map(Key).map_err(|_| Error::InvalidKey(raw))
    }
}

impl From<Key> for u32 {
    fn from(key: Key) -> Self {
        key.0 as u32
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bounds() {
        assert_eq!(Key::try_from(0).unwrap(), Key(0));
        assert_eq!(Key::try_from(255).unwrap(), Key(255));
        assert!(matches!(Key::try_from(256), Err(Error::InvalidKey(256))));
    }

    #[test]
    fn test_all_covers_domain() {
        let keys: Vec<Key> = Key::all().collect();
        assert_eq!(keys.len(), KEY_SPACE);
        assert_eq!(keys.first(), Some(&Key(0)));
        assert_eq!(keys.last(), Some(&Key(255)));
    }
}
