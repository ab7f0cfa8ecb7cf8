use rustc_hash::FxHashMap;

/// Resolves compiled script names to the numeric ids the runtime
/// dispatches on.
pub trait IdProvider {
    fn find_script(&self, name: &str) -> Option<i32>;
}

// Keyed by full script name, "[trigger,name]".
#[derive(Debug, Default)]
pub struct ScriptIdTable {
    ids: FxHashMap<String, i32>,
}

impl ScriptIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: i32) {
        self.ids.insert(name.into(), id);
    }
}

impl IdProvider for ScriptIdTable {
    fn find_script(&self, name: &str) -> Option<i32> {
        self.ids.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_resolves_inserted_names_only() {
        let mut table = ScriptIdTable::new();
        table.insert("[proc,damage]", 42);
        assert_eq!(table.find_script("[proc,damage]"), Some(42));
        assert_eq!(table.find_script("[proc,heal]"), None);
    }
}
