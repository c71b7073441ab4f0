//! Option descriptors: one entry per recognized flag.

use super::Options;

/// The kind of value a flag carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Boolean switch, no argument
    Flag,
    Integer,
    Float,
    Text,
}

/// What a matched flag does to the configuration.
///
/// Setters are plain function pointers so the whole table is static data.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// Print usage and stop
    Help,
    /// Print the option table as markdown and stop
    Markdown,
    Flag(fn(&mut Options)),
    Integer(fn(&mut Options, i32)),
    Float(fn(&mut Options, f32)),
    Text(fn(&mut Options, String)),
}

impl Target {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            Target::Help | Target::Markdown | Target::Flag(_) => ValueKind::Flag,
            Target::Integer(_) => ValueKind::Integer,
            Target::Float(_) => ValueKind::Float,
            Target::Text(_) => ValueKind::Text,
        }
    }
}

/// A recognized flag: its spellings, its setter and its help text.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    aliases: Vec<&'static str>,
    target: Target,
    required: bool,
    repeatable: bool,
    description: &'static str,
}

impl OptionDescriptor {
    pub fn new(aliases: &[&'static str], target: Target, description: &'static str) -> Self {
        Self {
            aliases: aliases.to_vec(),
            target,
            required: false,
            repeatable: false,
            description,
        }
    }

    pub fn flag(aliases: &[&'static str], set: fn(&mut Options), description: &'static str) -> Self {
        Self::new(aliases, Target::Flag(set), description)
    }

    pub fn integer(
        aliases: &[&'static str],
        set: fn(&mut Options, i32),
        description: &'static str,
    ) -> Self {
        Self::new(aliases, Target::Integer(set), description)
    }

    pub fn float(
        aliases: &[&'static str],
        set: fn(&mut Options, f32),
        description: &'static str,
    ) -> Self {
        Self::new(aliases, Target::Float(set), description)
    }

    pub fn text(
        aliases: &[&'static str],
        set: fn(&mut Options, String),
        description: &'static str,
    ) -> Self {
        Self::new(aliases, Target::Text(set), description)
    }

    /// Absence after parsing becomes a configuration error.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Every occurrence is applied instead of the last one winning.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    /// The spelling used in error messages.
    pub fn primary_alias(&self) -> &'static str {
        self.aliases.first().copied().unwrap_or("")
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn value_kind(&self) -> ValueKind {
        self.target.value_kind()
    }

    pub fn takes_value(&self) -> bool {
        self.value_kind() != ValueKind::Flag
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn matches(&self, token: &str) -> bool {
        self.aliases.iter().any(|alias| *alias == token)
    }
}
