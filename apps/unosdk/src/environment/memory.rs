//! In-memory [`EnvironmentStore`] for tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::environment::{EnvironmentStore, Scope};
use crate::errors::SdkError;

pub struct MemoryEnvironment {
    separator: char,
    variables: RefCell<HashMap<(Scope, String), String>>,
    elevated: Cell<bool>,
    failing_scope: Cell<Option<Scope>>,
    fail_broadcast: Cell<bool>,
    writes: Cell<usize>,
    broadcasts: Cell<usize>,
}

impl MemoryEnvironment {
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            variables: RefCell::new(HashMap::new()),
            elevated: Cell::new(false),
            failing_scope: Cell::new(None),
            fail_broadcast: Cell::new(false),
            writes: Cell::new(0),
            broadcasts: Cell::new(0),
        }
    }

    pub fn set_elevated(&self, elevated: bool) {
        self.elevated.set(elevated);
    }

    /// Makes every write and delete at `scope` fail.
    pub fn fail_writes(&self, scope: Scope) {
        self.failing_scope.set(Some(scope));
    }

    pub fn fail_broadcast(&self) {
        self.fail_broadcast.set(true);
    }

    /// Sets a value without counting it as a write.
    pub fn seed(&self, scope: Scope, name: &str, value: &str) {
        self.variables
            .borrow_mut()
            .insert((scope, name.to_string()), value.to_string());
    }

    pub fn value(&self, scope: Scope, name: &str) -> Option<String> {
        self.variables
            .borrow()
            .get(&(scope, name.to_string()))
            .cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.get()
    }

    fn check_writable(&self, scope: Scope) -> Result<(), SdkError> {
        if self.failing_scope.get() == Some(scope) {
            return Err(SdkError::path_mutation(scope, "injected failure"));
        }
        Ok(())
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn separator(&self) -> char {
        self.separator
    }

    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, SdkError> {
        Ok(self.value(scope, name))
    }

    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), SdkError> {
        self.check_writable(scope)?;
        self.writes.set(self.writes.get() + 1);
        self.seed(scope, name, value);
        Ok(())
    }

    fn delete(&self, scope: Scope, name: &str) -> Result<(), SdkError> {
        self.check_writable(scope)?;
        self.writes.set(self.writes.get() + 1);
        self.variables
            .borrow_mut()
            .remove(&(scope, name.to_string()));
        Ok(())
    }

    fn can_write_machine(&self) -> bool {
        self.elevated.get()
    }

    fn broadcast_change(&self) -> Result<(), SdkError> {
        if self.fail_broadcast.get() {
            return Err(SdkError::path_mutation(Scope::User, "broadcast timed out"));
        }
        self.broadcasts.set(self.broadcasts.get() + 1);
        Ok(())
    }
}
