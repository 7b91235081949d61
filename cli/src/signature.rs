//! The event signature: action names with their payload arities.

use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{Context, Result};
use symon::core::Action;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionInfo {
    pub action: Action,
    pub string_arity: usize,
    pub number_arity: usize,
}

/// Maps event names to their numeric id and payload arities. Ids are
/// assigned by appearance order starting at 0.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    entries: HashMap<String, ActionInfo>,
}

impl Signature {
    /// Parses the plain-text signature format: one
    /// `<action> <string-arity> <number-arity>` entry per line (any
    /// whitespace separates the fields).
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut text = String::new();
        let mut reader = reader;
        reader.read_to_string(&mut text).context("reading signature")?;
        let mut tokens = text.split_whitespace();
        let mut entries = Vec::new();
        while let Some(name) = tokens.next() {
            let (Some(strings), Some(numbers)) = (tokens.next(), tokens.next()) else {
                break;
            };
            let string_arity: usize = strings
                .parse()
                .with_context(|| format!("string arity of `{name}`"))?;
            let number_arity: usize = numbers
                .parse()
                .with_context(|| format!("number arity of `{name}`"))?;
            entries.push((name.to_string(), string_arity, number_arity));
        }
        Ok(Self::from_entries(entries))
    }

    /// Ids count every entry, so a name declared twice keeps its last id and
    /// arities.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, usize, usize)>) -> Self {
        let mut map = HashMap::new();
        for (id, (name, string_arity, number_arity)) in entries.into_iter().enumerate() {
            map.insert(
                name,
                ActionInfo {
                    action: Action(id as u32),
                    string_arity,
                    number_arity,
                },
            );
        }
        Signature { entries: map }
    }

    pub fn get(&self, name: &str) -> Option<&ActionInfo> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_in_order() {
        let sig = Signature::from_reader("withdraw\t1\t1\ndeposit 0 2\n".as_bytes()).unwrap();
        assert_eq!(sig.len(), 2);
        let w = sig.get("withdraw").unwrap();
        assert_eq!(w.action, Action(0));
        assert_eq!((w.string_arity, w.number_arity), (1, 1));
        let d = sig.get("deposit").unwrap();
        assert_eq!(d.action, Action(1));
        assert_eq!((d.string_arity, d.number_arity), (0, 2));
        assert!(sig.get("transfer").is_none());
    }

    #[test]
    fn duplicate_names_keep_the_last_entry() {
        let sig = Signature::from_reader("a 1 0\nb 0 1\na 2 2\n".as_bytes()).unwrap();
        assert_eq!(sig.len(), 2);
        let a = sig.get("a").unwrap();
        assert_eq!(a.action, Action(2));
        assert_eq!((a.string_arity, a.number_arity), (2, 2));
        assert_eq!(sig.get("b").unwrap().action, Action(1));
    }

    #[test]
    fn incomplete_trailing_entry_is_dropped() {
        let sig = Signature::from_reader("a 1 0 b 2".as_bytes()).unwrap();
        assert_eq!(sig.len(), 1);
        assert!(sig.contains("a"));
    }

    #[test]
    fn bad_arity_is_an_error() {
        assert!(Signature::from_reader("a one 0".as_bytes()).is_err());
    }
}
