//! VM configuration

use crate::stack::DEFAULT_MAX_STACK_SIZE;
use crate::VmResult;
use serde::Deserialize;

/// Options for creating a [`Vm`](super::Vm)
///
/// Every field has a default, so a TOML document only needs the keys it
/// overrides:
///
/// ```toml
/// gc_threshold = 256
/// max_heap_objects = 100000
/// strict_redefinition = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// Maximum operand stack size in slots
    pub max_stack_slots: usize,

    /// Live object count that triggers the first collection
    pub gc_threshold: usize,

    /// Maximum number of live heap objects (None = unlimited)
    pub max_heap_objects: Option<usize>,

    /// Collect before every allocation
    pub gc_stress: bool,

    /// Reject re-binding a member name already bound in the same class
    pub strict_redefinition: bool,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_stack_slots: DEFAULT_MAX_STACK_SIZE,
            gc_threshold: 1024,
            max_heap_objects: None,
            gc_stress: false,
            strict_redefinition: false,
        }
    }
}

impl VmOptions {
    /// Parse options from a TOML document
    pub fn from_toml_str(source: &str) -> VmResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Collect before every allocation
    pub fn with_gc_stress(mut self) -> Self {
        self.gc_stress = true;
        self
    }

    /// Limit the number of live heap objects
    pub fn with_heap_limit(mut self, max_objects: usize) -> Self {
        self.max_heap_objects = Some(max_objects);
        self
    }

    /// Set the operand stack size
    pub fn with_stack_slots(mut self, slots: usize) -> Self {
        self.max_stack_slots = slots;
        self
    }

    /// Reject member redefinition
    pub fn with_strict_redefinition(mut self) -> Self {
        self.strict_redefinition = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VmError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let options = VmOptions::default();
        assert_eq!(options.max_stack_slots, DEFAULT_MAX_STACK_SIZE);
        assert_eq!(options.max_heap_objects, None);
        assert!(!options.gc_stress);
    }

    #[test]
    fn test_options_from_toml() {
        let options = VmOptions::from_toml_str(
            r#"
            gc_threshold = 16
            max_heap_objects = 500
            strict_redefinition = true
            "#,
        )
        .unwrap();

        assert_eq!(
            options,
            VmOptions {
                gc_threshold: 16,
                max_heap_objects: Some(500),
                strict_redefinition: true,
                ..VmOptions::default()
            }
        );
    }

    #[test]
    fn test_options_from_invalid_toml() {
        let result = VmOptions::from_toml_str("gc_threshold = \"lots\"");
        assert!(matches!(result, Err(VmError::Options(_))));
    }

    #[test]
    fn test_options_builders() {
        let options = VmOptions::default()
            .with_gc_stress()
            .with_heap_limit(10)
            .with_stack_slots(32)
            .with_strict_redefinition();

        assert!(options.gc_stress);
        assert_eq!(options.max_heap_objects, Some(10));
        assert_eq!(options.max_stack_slots, 32);
        assert!(options.strict_redefinition);
    }
}
