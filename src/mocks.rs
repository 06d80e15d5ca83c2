use std::collections::{HashMap, HashSet};

use crate::{
    env::TypeEnv,
    ty::{Ty, TyName},
};

/// In-memory nominal environment for tests: declared supertype edges plus a
/// set of final types.
#[derive(Default)]
pub struct MockTypeEnv {
    pub supertypes: HashMap<TyName, Vec<Ty>>,
    pub final_types: HashSet<TyName>,
}

impl MockTypeEnv {
    pub fn new() -> MockTypeEnv {
        MockTypeEnv::default()
    }

    pub fn add_supertype(&mut self, name: impl Into<TyName>, supertype: Ty) {
        self.supertypes.entry(name.into()).or_default().push(supertype);
    }

    pub fn mark_final(&mut self, name: impl Into<TyName>) {
        self.final_types.insert(name.into());
    }
}

impl TypeEnv for MockTypeEnv {
    fn supertypes_of(&self, name: &TyName) -> Vec<Ty> {
        self.supertypes.get(name).cloned().unwrap_or_default()
    }

    fn is_final(&self, name: &TyName) -> bool {
        self.final_types.contains(name)
    }
}
