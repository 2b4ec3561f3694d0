use std::{
    fmt::{self, Debug, Display},
    ops::{Deref, DerefMut},
    str::FromStr,
};

use mailparse::{MailAddr, SingleInfo};
use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// A single envelope recipient.
///
/// The mailbox is kept in normalised form (surrounding whitespace removed,
/// domain lower-cased), so two addresses are equal when they name the same
/// mailbox regardless of how they were written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse exactly one mailbox, e.g. `"Nobody <nobody@nowhere.net>"`.
    ///
    /// # Errors
    /// If the input is not a single, fully qualified mailbox.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let list = AddressList::parse(input)?;
        match list.as_slice() {
            [address] => Ok(address.clone()),
            _ => Err(AddressError::Invalid {
                input: input.to_string(),
                reason: format!("expected a single mailbox, found {}", list.len()),
            }),
        }
    }

    fn from_single(single: &SingleInfo, input: &str) -> Result<Self, AddressError> {
        let addr = single.addr.trim();
        let Some((local, domain)) = addr.rsplit_once('@') else {
            return Err(AddressError::Invalid {
                input: input.to_string(),
                reason: format!("'{addr}' has no domain"),
            });
        };

        if local.is_empty() || domain.is_empty() {
            return Err(AddressError::Invalid {
                input: input.to_string(),
                reason: format!("'{addr}' is incomplete"),
            });
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map_or(&self.0, |(local, _)| local)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressList(pub Vec<Address>);

impl AddressList {
    /// Parse a header-style address list. Group syntax is flattened into its
    /// members; an empty or blank input gives an empty list.
    ///
    /// # Errors
    /// If any member is not a fully qualified mailbox.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }

        let parsed = mailparse::addrparse(input).map_err(|err| AddressError::Invalid {
            input: input.to_string(),
            reason: err.to_string(),
        })?;

        let mut addresses = Vec::with_capacity(parsed.len());
        for addr in parsed.iter() {
            match addr {
                MailAddr::Single(single) => addresses.push(Address::from_single(single, input)?),
                MailAddr::Group(group) => {
                    for single in &group.addrs {
                        addresses.push(Address::from_single(single, input)?);
                    }
                }
            }
        }

        Ok(Self(addresses))
    }
}

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(addr, f)?;
        }
        Ok(())
    }
}

impl From<Vec<Address>> for AddressList {
    fn from(value: Vec<Address>) -> Self {
        Self(value)
    }
}

impl FromIterator<Address> for AddressList {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Deref for AddressList {
    type Target = Vec<Address>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AddressList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalised_equality() {
        let a = Address::parse("Nobody <nobody@NoWhere.NET>").unwrap();
        let b = Address::parse("  nobody@nowhere.net ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "nobody@nowhere.net");
        assert_eq!(a.local_part(), "nobody");
        assert_eq!(a.domain(), "nowhere.net");
    }

    #[test]
    fn test_local_part_case_is_preserved() {
        let a = Address::parse("Nobody@nowhere.net").unwrap();
        let b = Address::parse("nobody@nowhere.net").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_single_rejects_lists_and_bare_names() {
        assert!(Address::parse("a@x.org, b@y.org").is_err());
        assert!(Address::parse("nobody").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn test_list_parse() {
        let list = AddressList::parse("a@x.org, Bee <b@y.org>").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.to_string(), "a@x.org, b@y.org");

        assert!(AddressList::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_list_flattens_groups() {
        let list = AddressList::parse("Team: a@x.org, b@y.org;").unwrap();
        assert_eq!(
            list.iter().map(Address::as_str).collect::<Vec<_>>(),
            vec!["a@x.org", "b@y.org"]
        );
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let address: Address = ron::from_str(r#""qa@Staging.Example""#).unwrap();
        assert_eq!(address.as_str(), "qa@staging.example");
        assert!(ron::from_str::<Address>(r#""not-an-address""#).is_err());
    }
}
