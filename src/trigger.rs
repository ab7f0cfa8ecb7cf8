pub mod properties {
    pub const INVOKE: u32 = 1 << 0;
    pub const RETURN: u32 = 1 << 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerType {
    // Callable subroutine; may return values.
    Proc,
    // Client event callback; neither invokable nor value-returning.
    Clientscript,
}

impl TriggerType {
    pub const ALL: [TriggerType; 2] = [TriggerType::Proc, TriggerType::Clientscript];

    pub fn representation(&self) -> &'static str {
        match self {
            TriggerType::Proc => "proc",
            TriggerType::Clientscript => "clientscript",
        }
    }

    fn properties(&self) -> u32 {
        match self {
            TriggerType::Proc => properties::INVOKE | properties::RETURN,
            TriggerType::Clientscript => 0,
        }
    }

    pub fn has_property(&self, property: u32) -> bool {
        self.properties() & property == property
    }

    pub fn is_invokable(&self) -> bool {
        self.has_property(properties::INVOKE)
    }

    pub fn has_returns(&self) -> bool {
        self.has_property(properties::RETURN)
    }

    pub fn for_representation(representation: &str) -> Option<TriggerType> {
        TriggerType::ALL
            .iter()
            .copied()
            .find(|trigger| trigger.representation() == representation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representation_round_trip() {
        for trigger in TriggerType::ALL {
            assert_eq!(
                TriggerType::for_representation(trigger.representation()),
                Some(trigger)
            );
        }
        assert_eq!(TriggerType::for_representation("label"), None);
    }

    #[test]
    fn representations_are_pairwise_distinct() {
        for (index, a) in TriggerType::ALL.iter().enumerate() {
            for b in &TriggerType::ALL[index + 1..] {
                assert_ne!(a.representation(), b.representation());
            }
        }
    }

    #[test]
    fn proc_is_invokable_and_returning() {
        assert!(TriggerType::Proc.is_invokable());
        assert!(TriggerType::Proc.has_returns());
    }

    #[test]
    fn clientscript_has_no_capabilities() {
        assert!(!TriggerType::Clientscript.is_invokable());
        assert!(!TriggerType::Clientscript.has_returns());
    }
}
