use burn::tensor::backend::Backend;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, ConfigResult};
use crate::factory::LayerFactory;
use crate::role::Role;

/// A registered role is either backed by a factory or explicitly switched off.
pub enum Slot<F> {
    Active(F),
    Disabled,
}

impl<F> Slot<F> {
    pub fn is_active(&self) -> bool {
        matches!(self, Slot::Active(_))
    }
}

pub type BoxedFactory<B, L> = Box<dyn LayerFactory<B, L>>;

/// Role-to-factory lookup fixed at construction time.
///
/// `context` names the component the registry serves and shows up in
/// [`ConfigError::UnregisteredRole`].
pub struct LayerRegistry<B: Backend, L> {
    context: &'static str,
    slots: BTreeMap<Role, Slot<BoxedFactory<B, L>>>,
}

impl<B: Backend, L> LayerRegistry<B, L> {
    pub fn new(context: &'static str) -> Self {
        Self {
            context,
            slots: BTreeMap::new(),
        }
    }

    pub fn with<F>(mut self, role: Role, factory: F) -> Self
    where
        F: LayerFactory<B, L> + 'static,
    {
        self.slots.insert(role, Slot::Active(Box::new(factory)));
        self
    }

    pub fn with_disabled(mut self, role: Role) -> Self {
        self.slots.insert(role, Slot::Disabled);
        self
    }

    /// Register `factory` for `role`, or mark the role disabled when `None`.
    pub fn with_optional<F>(self, role: Role, factory: Option<F>) -> Self
    where
        F: LayerFactory<B, L> + 'static,
    {
        match factory {
            Some(factory) => self.with(role, factory),
            None => self.with_disabled(role),
        }
    }

    /// `Ok(None)` for a disabled role; an error when the role was never registered.
    pub fn resolve(&self, role: Role) -> ConfigResult<Option<&dyn LayerFactory<B, L>>> {
        match self.slots.get(&role) {
            Some(Slot::Active(factory)) => Ok(Some(factory.as_ref())),
            Some(Slot::Disabled) => Ok(None),
            None => Err(ConfigError::UnregisteredRole {
                role,
                context: self.context,
            }),
        }
    }

    /// Check a whole layer order up front, before any layer is built.
    pub fn validate_order(&self, order: &[Role]) -> ConfigResult<()> {
        for role in order {
            self.resolve(*role)?;
        }
        Ok(())
    }
}

impl<B: Backend, L> fmt::Debug for LayerRegistry<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (role, slot) in &self.slots {
            map.entry(role, &if slot.is_active() { "active" } else { "disabled" });
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{ActivationConfig, Conv2dFactory};
    use crate::layers::ConvLayer;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn registry() -> LayerRegistry<TestBackend, ConvLayer<TestBackend>> {
        LayerRegistry::new("test encoder")
            .with(Role::Conv, Conv2dFactory::default())
            .with(Role::Activation, ActivationConfig::default())
            .with_disabled(Role::Norm)
    }

    #[test]
    fn disabled_roles_resolve_to_none() {
        let registry = registry();
        assert!(registry.resolve(Role::Conv).unwrap().is_some());
        assert!(registry.resolve(Role::Norm).unwrap().is_none());
    }

    #[test]
    fn unregistered_roles_fail() {
        let err = registry()
            .validate_order(&[Role::Conv, Role::Dropout])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnregisteredRole {
                role: Role::Dropout,
                context: "test encoder"
            }
        );
    }
}
