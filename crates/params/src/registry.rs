use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::builtin::{
    boolean::{BooleanListPlugin, BooleanPlugin},
    double::{DoubleListPlugin, DoublePlugin},
    enums::{IntegerEnumPlugin, StringEnumPlugin},
    image::ImagePlugin,
    integer::{IntegerListPlugin, IntegerPlugin},
    joints::JointsPlugin,
    pose::{PoseListPlugin, PosePlugin},
    position::PositionPlugin,
    relative_pose::RelativePosePlugin,
    string::{StringListPlugin, StringPlugin},
};
use crate::{Error, ParameterPlugin, ValueKind};

/// Parameter plugins keyed by type name. Adding a plugin is a single
/// `register` call; the builtin set is installed by
/// [`Registry::register_builtins`].
pub struct Registry {
    by_name: BTreeMap<&'static str, Box<dyn ParameterPlugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            by_name: BTreeMap::new(),
        }
    }

    /// Installs a plugin. The first registration of a type name wins;
    /// later ones are ignored with a warning.
    pub fn register(&mut self, plugin: Box<dyn ParameterPlugin>) {
        let name = plugin.type_name();
        if self.by_name.contains_key(name) {
            tracing::warn!(type_name = name, "plugin already registered, keeping first");
            return;
        }
        self.by_name.insert(name, plugin);
    }

    pub fn register_builtins(&mut self) {
        self.register(Box::new(BooleanPlugin));
        self.register(Box::new(BooleanListPlugin));
        self.register(Box::new(DoublePlugin));
        self.register(Box::new(DoubleListPlugin));
        self.register(Box::new(ImagePlugin));
        self.register(Box::new(IntegerPlugin));
        self.register(Box::new(IntegerListPlugin));
        self.register(Box::new(IntegerEnumPlugin));
        self.register(Box::new(JointsPlugin));
        self.register(Box::new(PosePlugin));
        self.register(Box::new(PoseListPlugin));
        self.register(Box::new(PositionPlugin));
        self.register(Box::new(RelativePosePlugin));
        self.register(Box::new(StringPlugin));
        self.register(Box::new(StringListPlugin));
        self.register(Box::new(StringEnumPlugin));
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    pub fn by_name(&self, type_name: &str) -> Result<&dyn ParameterPlugin, Error> {
        self.by_name
            .get(type_name)
            .map(Box::as_ref)
            .ok_or_else(|| Error::UnknownPlugin(type_name.to_string()))
    }

    /// Finds the plugin decoding to the given runtime kind. Enum kinds
    /// are their own kinds here; callers holding a concrete enum type
    /// map it to `IntegerEnum`/`StringEnum` first.
    pub fn by_kind(&self, kind: &ValueKind) -> Result<&dyn ParameterPlugin, Error> {
        self.by_name
            .values()
            .find(|plugin| plugin.kind() == *kind)
            .map(Box::as_ref)
            .ok_or_else(|| Error::UnknownPlugin(format!("{kind:?}")))
    }

    pub fn known_type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_name.keys().copied()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

lazy_static! {
    static ref REGISTRY: Registry = Registry::builtin();
}

/// The process-wide registry, populated with the builtin set on first
/// use.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtin_registration() {
        let registry = Registry::builtin();

        for name in [
            "boolean",
            "boolean_array",
            "double",
            "double_array",
            "image",
            "integer",
            "integer_array",
            "integer_enum",
            "joints",
            "pose",
            "pose_array",
            "position",
            "relative_pose",
            "string",
            "string_array",
            "string_enum",
        ] {
            assert!(registry.by_name(name).is_ok(), "missing plugin: {name}");
        }
        assert_eq!(registry.known_type_names().count(), 16);
        assert!(registry.by_name("quaternion").is_err());
    }

    #[test]
    fn test_by_kind() {
        let registry = Registry::builtin();
        assert_eq!(registry.by_kind(&ValueKind::Boolean).unwrap().type_name(), "boolean");
        assert_eq!(
            registry
                .by_kind(&ValueKind::List(Box::new(ValueKind::Pose)))
                .unwrap()
                .type_name(),
            "pose_array"
        );
    }

    #[test]
    fn test_countable_flags() {
        let registry = Registry::builtin();
        for (name, expect) in [
            ("boolean", true),
            ("integer_enum", true),
            ("integer", false),
            ("string_enum", false),
            ("pose", false),
        ] {
            assert_eq!(registry.by_name(name).unwrap().countable(), expect, "{name}");
        }
    }
}
