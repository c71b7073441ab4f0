//! The option table: registration and alias lookup.

use super::descriptor::OptionDescriptor;
use load_common::{LoadError, Result};
use std::collections::HashMap;

/// All recognized option descriptors, in registration order.
#[derive(Debug, Default)]
pub struct OptionTable {
    descriptors: Vec<OptionDescriptor>,
    by_alias: HashMap<&'static str, usize>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. Fails if any of its aliases is already taken.
    pub fn register(&mut self, descriptor: OptionDescriptor) -> Result<()> {
        if descriptor.aliases().is_empty() {
            return Err(LoadError::configuration_error(format!(
                "option '{}' has no aliases",
                descriptor.description()
            )));
        }

        for (i, alias) in descriptor.aliases().iter().enumerate() {
            if self.by_alias.contains_key(alias) || descriptor.aliases()[..i].contains(alias) {
                return Err(LoadError::configuration_error(format!(
                    "option alias {alias} is already registered"
                )));
            }
        }

        let index = self.descriptors.len();
        for alias in descriptor.aliases() {
            self.by_alias.insert(*alias, index);
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn lookup(&self, token: &str) -> Option<&OptionDescriptor> {
        self.index_of(token).map(|index| &self.descriptors[index])
    }

    pub(crate) fn index_of(&self, token: &str) -> Option<usize> {
        self.by_alias.get(token).copied()
    }

    pub(crate) fn descriptor_at(&self, index: usize) -> &OptionDescriptor {
        &self.descriptors[index]
    }

    /// Iterate descriptors in registration order. Call again to restart.
    pub fn descriptors(&self) -> std::slice::Iter<'_, OptionDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate() -> OptionDescriptor {
        OptionDescriptor::flag(&["-g", "--generate"], |o| o.data_generate = true, "generate")
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = OptionTable::new();
        table.register(generate()).unwrap();
        table
            .register(OptionDescriptor::flag(&["-c"], |o| o.count_sort = true, "count"))
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("--generate").unwrap().description(), "generate");
        assert_eq!(table.lookup("-c").unwrap().description(), "count");
        assert!(table.lookup("--count").is_none());
    }

    #[test]
    fn test_alias_collision_rejected() {
        let mut table = OptionTable::new();
        table.register(generate()).unwrap();

        let clash = OptionDescriptor::flag(&["-x", "--generate"], |o| o.copy = true, "clash");
        let err = table.register(clash).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("--generate"));
        assert!(table.lookup("-x").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_alias_within_descriptor_rejected() {
        let mut table = OptionTable::new();
        let twice = OptionDescriptor::flag(&["-c", "-c"], |o| o.count_sort = true, "count");
        assert!(table.register(twice).is_err());
    }

    #[test]
    fn test_descriptors_restartable() {
        let mut table = OptionTable::new();
        table.register(generate()).unwrap();
        table
            .register(OptionDescriptor::flag(&["-c"], |o| o.count_sort = true, "count"))
            .unwrap();

        let first: Vec<_> = table.descriptors().map(|d| d.primary_alias()).collect();
        let second: Vec<_> = table.descriptors().map(|d| d.primary_alias()).collect();
        assert_eq!(first, vec!["-g", "-c"]);
        assert_eq!(first, second);
    }
}
