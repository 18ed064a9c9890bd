//! Builder facades for the four CRUD operations.
//!
//! Every facade owns exactly one [`Operation`]: the collection back-reference,
//! the accumulated state, the binding table and whether it already executed.
//! Stage transitions move the operation into the facade type of the next stage.

mod add;
mod find;
mod modify;
mod remove;

pub use add::{CollectionAdd, CollectionAddBase};
pub use find::CollectionFind;
pub use modify::CollectionModify;
pub use remove::CollectionRemove;

use crate::{
    bind::BindingTable,
    collection::CollectionRef,
    error::{CrudError, CrudResult},
    executor::{self, Prepare},
    result::DocResult,
    value::ExprValue,
};

#[derive(Debug)]
pub(crate) struct Operation<S> {
    target: CollectionRef,
    pub(crate) state: S,
    bindings: BindingTable,
    /// Set by a successful execute, cleared by `bind`.
    executed: bool,
    /// Set by the first successful execute and never cleared.
    sealed: bool,
}

impl<S> Operation<S> {
    pub(crate) fn new(target: CollectionRef, state: S) -> Self {
        Operation {
            target,
            state,
            bindings: BindingTable::new(),
            executed: false,
            sealed: false,
        }
    }

    /// Fails once the operation has executed. From then on only `bind` is accepted,
    /// including after a rebind.
    pub(crate) fn ensure_mutable(&self, method: &str) -> CrudResult<()> {
        if self.sealed {
            return Err(CrudError::StageMisuse(format!(
                "{method} called after execute; only bind may follow an execute"
            )));
        }

        Ok(())
    }

    /// Binds a parameter and re-arms the operation for one more execute.
    pub(crate) fn bind(mut self, name: &str, value: ExprValue) -> CrudResult<Self> {
        self.bindings.bind(name, value)?;
        self.executed = false;

        Ok(self)
    }

    pub(crate) fn bindings(&self) -> &BindingTable {
        &self.bindings
    }
}

impl<S: Prepare + Send> Operation<S> {
    pub(crate) async fn execute(&mut self) -> CrudResult<DocResult> {
        if self.executed {
            return Err(CrudError::StageMisuse(
                "operation already executed; bind a parameter before executing again".into(),
            ));
        }

        let result = executor::run(&self.target, &mut self.state, &self.bindings).await?;
        self.executed = true;
        self.sealed = true;

        Ok(result)
    }
}
