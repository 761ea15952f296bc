//! Alternate sender addresses.
//!
//! A person may register secondary addresses (a phone, a personal account)
//! whose mail is attributed to their primary address. The forward table is
//! what gets persisted; the reverse table is derived from it.

use std::collections::{BTreeMap, HashMap};

/// `primary → alternates` plus the derived `alternate → primary` lookup.
#[derive(Debug, Clone, Default)]
pub struct AlternateTable {
  forward: BTreeMap<String, Vec<String>>,
  reverse: HashMap<String, String>,
}

impl AlternateTable {
  /// Build from the persisted forward table.
  ///
  /// When two primaries list the same alternate, the one that sorts last
  /// wins the reverse mapping.
  pub fn from_forward(forward: BTreeMap<String, Vec<String>>) -> Self {
    let mut reverse = HashMap::new();
    for (primary, alternates) in &forward {
      for alternate in alternates {
        reverse.insert(alternate.clone(), primary.clone());
      }
    }
    Self { forward, reverse }
  }

  pub fn forward(&self) -> &BTreeMap<String, Vec<String>> { &self.forward }

  /// The primary address mail from `sender` should be attributed to.
  pub fn resolve<'a>(&'a self, sender: &'a str) -> &'a str {
    self.reverse.get(sender).map_or(sender, String::as_str)
  }

  /// Replace the whole alternate set of `primary`.
  ///
  /// The previous set's reverse mappings are removed first. Any alternate
  /// already claimed by another primary is taken away from it.
  pub fn replace(&mut self, primary: &str, alternates: Vec<String>) {
    if let Some(previous) = self.forward.remove(primary) {
      for alternate in previous {
        self.reverse.remove(&alternate);
      }
    }

    for alternate in &alternates {
      if let Some(owner) = self.reverse.remove(alternate)
        && let Some(owned) = self.forward.get_mut(&owner)
      {
        owned.retain(|a| a != alternate);
        if owned.is_empty() {
          self.forward.remove(&owner);
        }
      }
    }

    for alternate in &alternates {
      self.reverse.insert(alternate.clone(), primary.to_string());
    }
    self.forward.insert(primary.to_string(), alternates);
  }

  pub fn is_empty(&self) -> bool { self.forward.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addrs(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn resolve_falls_back_to_sender() {
    let table = AlternateTable::default();
    assert_eq!(table.resolve("me@example.com"), "me@example.com");
  }

  #[test]
  fn replace_swaps_whole_set() {
    let mut table = AlternateTable::default();
    table.replace("alice@example.com", addrs(&["a1@mobile.jp", "a2@home.net"]));
    assert_eq!(table.resolve("a1@mobile.jp"), "alice@example.com");

    table.replace("alice@example.com", addrs(&["a3@mobile.jp"]));
    assert_eq!(table.resolve("a1@mobile.jp"), "a1@mobile.jp");
    assert_eq!(table.resolve("a2@home.net"), "a2@home.net");
    assert_eq!(table.resolve("a3@mobile.jp"), "alice@example.com");
    assert_eq!(
      table.forward().get("alice@example.com"),
      Some(&addrs(&["a3@mobile.jp"]))
    );
  }

  #[test]
  fn second_registration_evicts_first_owner() {
    let mut table = AlternateTable::default();
    table.replace("alice@example.com", addrs(&["shared@mobile.jp", "a@x.jp"]));
    table.replace("bob@example.com", addrs(&["shared@mobile.jp"]));

    assert_eq!(table.resolve("shared@mobile.jp"), "bob@example.com");
    assert_eq!(
      table.forward().get("alice@example.com"),
      Some(&addrs(&["a@x.jp"]))
    );

    // Alice re-registering must not disturb Bob's mapping.
    table.replace("alice@example.com", addrs(&["a@y.jp"]));
    assert_eq!(table.resolve("shared@mobile.jp"), "bob@example.com");
  }

  #[test]
  fn from_forward_derives_reverse() {
    let mut forward = BTreeMap::new();
    forward.insert("carol@example.com".to_string(), addrs(&["c@phone.jp"]));
    let table = AlternateTable::from_forward(forward);
    assert_eq!(table.resolve("c@phone.jp"), "carol@example.com");
  }
}
