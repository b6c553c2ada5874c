// engine_core/src/ecs/component_registry.rs
use crate::ecs::component::Component;
use crate::error::RegistryError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

inventory::collect!(ComponentRegistration);

/// Semantic type of a persisted component field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Bool,
    Text,
    Vec2,
    /// An assignable reference or an id.
    Reference,
    List,
    Table,
}

/// One persisted field of a component, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Static information every registered component type provides.
/// Implemented by `#[ecs_component]`.
pub trait ComponentType: Sized + 'static {
    /// Human‑readable identifier that will appear in the save file.
    const TYPE_NAME: &'static str;

    /// Ordered list of the fields that are persisted.
    fn schema() -> &'static [FieldSchema];
}

/// One entry for a concrete component type.
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    /// Discriminator written into the `type` field of a component node.
    pub type_name: &'static str,
    /// Persisted fields of the component.
    pub schema: &'static [FieldSchema],
    /// Creates a blank instance.
    pub factory: fn() -> Box<dyn Component>,
    /// Converts a live component into its field map.
    pub to_value: fn(&dyn Component) -> Result<Value, serde_json::Error>,
    /// Converts a field map back into a boxed component.
    pub from_value: fn(Value) -> Result<Box<dyn Component>, serde_json::Error>,
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_name", &self.type_name)
            .field("schema", &self.schema)
            .finish()
    }
}

impl ComponentDescriptor {
    /// Builds the descriptor for `T`.
    pub fn of<T>() -> Self
    where
        T: Component + ComponentType + Default + Serialize + DeserializeOwned,
    {
        Self {
            type_name: T::TYPE_NAME,
            schema: T::schema(),
            factory: generic_factory::<T>,
            to_value: generic_to_value::<T>,
            from_value: generic_from_value::<T>,
        }
    }

    /// Default value of `field`, taken from a blank instance.
    pub fn default_value(&self, field: &str) -> Option<Value> {
        let blank = (self.factory)();
        match (self.to_value)(blank.as_ref()) {
            Ok(Value::Object(mut map)) => map.remove(field),
            _ => None,
        }
    }

    /// Returns the schema entry for `field`.
    pub fn field(&self, field: &str) -> Option<&FieldSchema> {
        self.schema.iter().find(|f| f.name == field)
    }
}

/// Entry submitted to `inventory` by `#[ecs_component]`.
pub struct ComponentRegistration {
    pub describe: fn() -> ComponentDescriptor,
}

/// Factory that works for any component that implements `Component + Default`.
pub fn generic_factory<T>() -> Box<dyn Component>
where
    T: Component + Default,
{
    Box::new(T::default())
}

fn generic_to_value<T>(component: &dyn Component) -> Result<Value, serde_json::Error>
where
    T: Component + ComponentType + Serialize,
{
    let concrete = component.as_any().downcast_ref::<T>().ok_or_else(|| {
        <serde_json::Error as serde::ser::Error>::custom(format!(
            "descriptor for `{}` was handed a `{}`",
            T::TYPE_NAME,
            component.type_name()
        ))
    })?;
    serde_json::to_value(concrete)
}

fn generic_from_value<T>(value: Value) -> Result<Box<dyn Component>, serde_json::Error>
where
    T: Component + DeserializeOwned,
{
    let concrete: T = serde_json::from_value(value)?;
    Ok(Box::new(concrete))
}

/// Maps type names to component descriptors. Populated once by the host at
/// startup, read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    entries: HashMap<&'static str, ComponentDescriptor>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every component submitted with `#[ecs_component]`.
    pub fn from_inventory() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<ComponentRegistration> {
            let descriptor = (registration.describe)();
            if let Err(e) = registry.register(descriptor) {
                log::warn!("Ignoring registration: {e}.");
            }
        }
        log::debug!("Component registry holds {} types.", registry.len());
        registry
    }

    /// Adds an entry, failing if the name is taken.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<(), RegistryError> {
        if self.entries.contains_key(descriptor.type_name) {
            return Err(RegistryError::DuplicateType(descriptor.type_name.to_string()));
        }
        self.entries.insert(descriptor.type_name, descriptor);
        Ok(())
    }

    /// Adds an entry, replacing any previous one with the same name.
    pub fn register_or_replace(
        &mut self,
        descriptor: ComponentDescriptor,
    ) -> Option<ComponentDescriptor> {
        self.entries.insert(descriptor.type_name, descriptor)
    }

    /// Looks up the descriptor for `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<&ComponentDescriptor, RegistryError> {
        self.entries
            .get(type_name)
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))
    }

    /// Creates a blank instance of `type_name`.
    pub fn instantiate(&self, type_name: &str) -> Result<Box<dyn Component>, RegistryError> {
        self.resolve(type_name).map(|descriptor| (descriptor.factory)())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Registered names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
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
    use crate::ecs::component::{Follow, Velocity};
    use crate::tiles::tilemap::Tilemap;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::of::<Velocity>()).unwrap();

        let descriptor = registry.resolve("Velocity").unwrap();
        assert_eq!(descriptor.type_name, "Velocity");

        let blank = registry.instantiate("Velocity").unwrap();
        assert_eq!(blank.type_name(), "Velocity");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::of::<Velocity>()).unwrap();

        let err = registry.register(ComponentDescriptor::of::<Velocity>()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType(name) if name == "Velocity"));

        // Overwrite is an explicit host choice.
        assert!(registry.register_or_replace(ComponentDescriptor::of::<Velocity>()).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_and_case_sensitive_lookup() {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::of::<Velocity>()).unwrap();

        assert!(matches!(
            registry.resolve("velocity"),
            Err(RegistryError::UnknownType(name)) if name == "velocity"
        ));
        assert!(registry.instantiate("Missing").is_err());
    }

    #[test]
    fn test_inventory_collects_builtin_components() {
        let registry = ComponentRegistry::from_inventory();
        for name in ["Velocity", "Follow", "Sprite", "Tilemap"] {
            assert!(registry.contains(name), "{name} not registered");
        }
    }

    #[test]
    fn test_schema_lists_persisted_fields_in_order() {
        let names: Vec<_> = Follow::schema().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["target", "speed"]);
        assert_eq!(Follow::schema()[0].kind, FieldKind::Reference);
        assert_eq!(Follow::schema()[1].kind, FieldKind::Number);

        // Runtime-only fields are not part of the schema.
        assert!(Tilemap::schema().iter().all(|f| f.name != "atlas"));
    }

    #[test]
    fn test_default_value_comes_from_blank_instance() {
        let descriptor = ComponentDescriptor::of::<Follow>();
        assert_eq!(descriptor.default_value("speed"), Some(serde_json::json!(64.0)));
        assert_eq!(descriptor.default_value("missing"), None);
    }
}
