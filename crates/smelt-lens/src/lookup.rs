use smelt_graph::{FieldRef, MethodRef};

/// The invoke kind carried by a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Interface,
    Super,
    Direct,
    Static,
    Polymorphic,
}

/// Description of how a method's prototype changed across the rewrite
/// pipeline: synthetic leading parameters added, parameters removed, the
/// return value dropped. Consumers treat it as opaque and only ever compose
/// or test it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrototypeChanges {
    extra_leading_parameters: u16,
    removed_parameters: Vec<u16>,
    return_type_dropped: bool,
}

impl PrototypeChanges {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_extra_leading_parameters(count: u16) -> Self {
        Self {
            extra_leading_parameters: count,
            ..Self::default()
        }
    }

    pub fn with_removed_parameters(indices: Vec<u16>) -> Self {
        Self {
            removed_parameters: indices,
            ..Self::default()
        }
    }

    pub fn with_return_type_dropped() -> Self {
        Self {
            return_type_dropped: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extra_leading_parameters == 0
            && self.removed_parameters.is_empty()
            && !self.return_type_dropped
    }

    pub fn extra_leading_parameters(&self) -> u16 {
        self.extra_leading_parameters
    }

    pub fn removed_parameters(&self) -> &[u16] {
        &self.removed_parameters
    }

    pub fn is_return_type_dropped(&self) -> bool {
        self.return_type_dropped
    }

    /// Compose with the changes applied by a later layer.
    pub fn compose(&self, later: &PrototypeChanges) -> PrototypeChanges {
        if self.is_empty() {
            return later.clone();
        }
        if later.is_empty() {
            return self.clone();
        }
        let mut removed_parameters = self.removed_parameters.clone();
        removed_parameters.extend_from_slice(&later.removed_parameters);
        PrototypeChanges {
            extra_leading_parameters: self.extra_leading_parameters + later.extra_leading_parameters,
            removed_parameters,
            return_type_dropped: self.return_type_dropped || later.return_type_dropped,
        }
    }
}

/// Result of looking a method reference up through the lens chain.
///
/// `reference` is what the call site should now name; `rebound_reference` is
/// the precise defining member when a rebinding layer knows it. The two are
/// rewritten independently: a renaming pass may move the syntactic holder
/// without moving the declaration of an inherited member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLookupResult {
    pub reference: MethodRef,
    pub rebound_reference: Option<MethodRef>,
    pub invoke_kind: InvokeKind,
    pub prototype_changes: PrototypeChanges,
}

impl MethodLookupResult {
    pub fn identity(reference: MethodRef, invoke_kind: InvokeKind) -> Self {
        Self {
            reference,
            rebound_reference: None,
            invoke_kind,
            prototype_changes: PrototypeChanges::none(),
        }
    }

    pub fn has_rebound_reference(&self) -> bool {
        self.rebound_reference.is_some()
    }
}

/// Result of looking a field reference up through the lens chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLookupResult {
    pub reference: FieldRef,
    pub rebound_reference: Option<FieldRef>,
}

impl FieldLookupResult {
    pub fn identity(reference: FieldRef) -> Self {
        Self {
            reference,
            rebound_reference: None,
        }
    }

    pub fn has_rebound_reference(&self) -> bool {
        self.rebound_reference.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototype_changes_compose() {
        let none = PrototypeChanges::none();
        assert!(none.is_empty());
        assert_eq!(none.compose(&none), none);

        let staticized = PrototypeChanges::with_extra_leading_parameters(1);
        let voided = PrototypeChanges::with_return_type_dropped();
        let both = staticized.compose(&voided);
        assert_eq!(both.extra_leading_parameters(), 1);
        assert!(both.is_return_type_dropped());
        assert!(!both.is_empty());
    }
}
