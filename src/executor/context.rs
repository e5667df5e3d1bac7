use crate::core::{Result, Tuple};
use crate::evaluator::{EvaluationContext, EvaluatorRegistry};
use crate::storage::{Entry, Mapping, MappingCatalog, StoreRegistry};

/// Everything an executor may touch while running one statement.
pub struct ExecutionContext<'a> {
    pub stores: &'a StoreRegistry,
    pub catalog: &'a MappingCatalog,
    pub evaluators: &'a EvaluatorRegistry,
    /// Scans hand control back to the runtime after this many entries.
    pub scan_yield_interval: usize,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        stores: &'a StoreRegistry,
        catalog: &'a MappingCatalog,
        evaluators: &'a EvaluatorRegistry,
        scan_yield_interval: usize,
    ) -> Self {
        Self {
            stores,
            catalog,
            evaluators,
            scan_yield_interval: scan_yield_interval.max(1),
        }
    }

    pub fn evaluation(&self) -> EvaluationContext<'a> {
        EvaluationContext::new(self.evaluators)
    }

    /// Visit every entry of the mapping's backing map together with its
    /// decoded row. A map that was never written to has no entries.
    ///
    /// Entries are read one at a time, so a concurrent writer may or may not
    /// be seen; each visited entry is a consistent value of its key.
    pub async fn for_each_row<F>(&self, mapping: &Mapping, mut visit: F) -> Result<()>
    where
        F: FnMut(Entry, Tuple) -> Result<()> + Send,
    {
        let Some(store) = self.stores.get(mapping.object_name()) else {
            return Ok(());
        };

        let mut scanned = 0usize;
        for entry in store.scan()? {
            let row = mapping.decode(&entry)?;
            visit(entry, row)?;

            scanned += 1;
            if scanned % self.scan_yield_interval == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }
}
