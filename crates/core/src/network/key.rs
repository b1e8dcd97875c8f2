//! Node identifier trait

use std::fmt;
use std::hash::Hash;

/// Identifier of a network segment.
///
/// Flow tables and catchment layers must share one key type. Integer keys
/// (NHDPlus COMIDs) and string keys are supported.
pub trait NodeKey:
    Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Why this id cannot name a segment, if it cannot.
    fn malformed(&self) -> Option<&'static str> {
        None
    }
}

macro_rules! impl_integer_key {
    ($($t:ty),* $(,)?) => {
        $(impl NodeKey for $t {})*
    };
}

impl_integer_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl NodeKey for String {
    fn malformed(&self) -> Option<&'static str> {
        if self.trim().is_empty() {
            Some("empty id")
        } else if self.trim().len() != self.len() {
            Some("id has surrounding whitespace")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_keys_are_well_formed() {
        assert_eq!(0_i64.malformed(), None);
        assert_eq!(u32::MAX.malformed(), None);
    }

    #[test]
    fn test_string_keys() {
        assert_eq!("8893864".to_string().malformed(), None);
        assert!(String::new().malformed().is_some());
        assert!("   ".to_string().malformed().is_some());
        assert!(" 12".to_string().malformed().is_some());
    }
}
