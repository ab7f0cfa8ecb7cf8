use rustc_hash::FxHashMap;

use crate::trigger::TriggerType;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableDomain {
    Local,
    Global,
}

impl VariableDomain {
    pub fn sigil(&self) -> char {
        match self {
            VariableDomain::Local => '$',
            VariableDomain::Global => '%',
        }
    }
}

/// The slot disambiguates same-named locals from different scopes for the
/// generator; globals use it as their registration id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub domain: VariableDomain,
    pub name: String,
    pub ty: Type,
    pub slot: usize,
}

impl VariableInfo {
    pub fn new(domain: VariableDomain, name: impl Into<String>, ty: Type) -> Self {
        Self::with_slot(domain, name, ty, 0)
    }

    pub fn with_slot(
        domain: VariableDomain,
        name: impl Into<String>,
        ty: Type,
        slot: usize,
    ) -> Self {
        Self {
            domain,
            name: name.into(),
            ty,
            slot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInfo {
    pub name: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub trigger: TriggerType,
    pub name: String,
    pub arguments: Type,
    pub returns: Type,
}

/// Cross-script entities: declared scripts, global-domain variables,
/// configs. Local-domain variables live in the `ScopeStack` instead.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    scripts: FxHashMap<(TriggerType, String), ScriptInfo>,
    globals: FxHashMap<String, VariableInfo>,
    configs: FxHashMap<String, ConfigInfo>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // False when the (trigger, name) pair is already taken.
    pub fn define_script(&mut self, info: ScriptInfo) -> bool {
        let key = (info.trigger, info.name.clone());
        if self.scripts.contains_key(&key) {
            return false;
        }
        self.scripts.insert(key, info);
        true
    }

    pub fn lookup_script(&self, trigger: TriggerType, name: &str) -> Option<&ScriptInfo> {
        self.scripts.get(&(trigger, name.to_owned()))
    }

    pub fn define_global(&mut self, name: impl Into<String>, ty: Type) -> &VariableInfo {
        let name = name.into();
        let slot = self.globals.len();
        self.globals
            .entry(name.clone())
            .or_insert_with(|| VariableInfo::with_slot(VariableDomain::Global, name, ty, slot))
    }

    pub fn lookup_global(&self, name: &str) -> Option<&VariableInfo> {
        self.globals.get(name)
    }

    pub fn define_config(&mut self, info: ConfigInfo) {
        self.configs.insert(info.name.clone(), info);
    }

    pub fn lookup_config(&self, name: &str) -> Option<&ConfigInfo> {
        self.configs.get(name)
    }
}

/// Duplicate detection applies to the innermost frame only; shadowing a
/// name from an outer frame is permitted.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<FxHashMap<String, VariableInfo>>,
    next_slot: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: &str, ty: Type) -> Option<VariableInfo> {
        let frame = self.frames.last_mut().expect("no active scope");
        if frame.contains_key(name) {
            return None;
        }
        let info = VariableInfo::with_slot(VariableDomain::Local, name, ty, self.next_slot);
        self.next_slot += 1;
        frame.insert(name.to_owned(), info.clone());
        Some(info)
    }

    pub fn lookup(&self, name: &str) -> Option<&VariableInfo> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_in_same_frame_is_rejected() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", Type::INT).is_some());
        assert!(scopes.declare("x", Type::INT).is_none());
    }

    #[test]
    fn inner_scope_shadowing_is_permitted() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.declare("x", Type::INT).unwrap();
        scopes.push();
        assert!(scopes.declare("x", Type::STRING).is_some());
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::STRING);
        scopes.pop();
        assert_eq!(scopes.lookup("x").unwrap().ty, Type::INT);
    }

    #[test]
    fn shadowed_locals_get_distinct_slots() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        let outer = scopes.declare("x", Type::INT).unwrap();
        scopes.push();
        let inner = scopes.declare("x", Type::INT).unwrap();
        assert_ne!(outer.slot, inner.slot);
    }

    #[test]
    fn lookup_walks_outer_frames() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.declare("x", Type::INT).unwrap();
        scopes.push();
        assert!(scopes.lookup("x").is_some());
        assert!(scopes.lookup("y").is_none());
    }

    #[test]
    fn scripts_are_keyed_by_trigger_and_name() {
        use crate::trigger::TriggerType;
        let mut table = SymbolTable::new();
        let info = ScriptInfo {
            trigger: TriggerType::Proc,
            name: "attack".into(),
            arguments: Type::unit(),
            returns: Type::unit(),
        };
        assert!(table.define_script(info.clone()));
        assert!(!table.define_script(info));
        assert!(table.lookup_script(TriggerType::Proc, "attack").is_some());
        assert!(table
            .lookup_script(TriggerType::Clientscript, "attack")
            .is_none());
    }

    #[test]
    fn configs_round_trip_by_name() {
        let mut table = SymbolTable::new();
        table.define_config(ConfigInfo {
            name: "bronze_sword".into(),
            group: "obj".into(),
        });
        assert_eq!(table.lookup_config("bronze_sword").unwrap().group, "obj");
        assert!(table.lookup_config("iron_sword").is_none());
    }

    #[test]
    fn variable_equality_is_full_identity() {
        let a = VariableInfo::new(VariableDomain::Local, "x", Type::INT);
        let b = VariableInfo::new(VariableDomain::Global, "x", Type::INT);
        let c = VariableInfo::new(VariableDomain::Local, "x", Type::STRING);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, VariableInfo::new(VariableDomain::Local, "x", Type::INT));
    }
}
