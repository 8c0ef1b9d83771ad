//! Extension points around list writes.
//!
//! The embedding application registers ordered hook stacks. Each hook receives
//! the in-flight list and either hands back a (possibly modified) list or
//! aborts the operation with messages. Stacks run left to right and stop at
//! the first veto.

use std::sync::Arc;

use productlist_core::Message;

use crate::product_list::ProductList;

pub type HookResult = Result<ProductList, Vec<Message>>;

/// A single step in a hook stack.
pub trait ProductListHook: Send + Sync {
    fn run(&self, product_list: ProductList) -> HookResult;
}

impl<F> ProductListHook for F
where
    F: Fn(ProductList) -> HookResult + Send + Sync,
{
    fn run(&self, product_list: ProductList) -> HookResult {
        self(product_list)
    }
}

/// Ordered sequence of hooks.
#[derive(Clone, Default)]
pub struct HookStack {
    hooks: Vec<Arc<dyn ProductListHook>>,
}

impl HookStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: impl ProductListHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn run(&self, product_list: ProductList) -> HookResult {
        self.hooks
            .iter()
            .try_fold(product_list, |list, hook| hook.run(list))
    }
}

impl core::fmt::Debug for HookStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookStack").field("len", &self.hooks.len()).finish()
    }
}

/// All hook stacks consulted by the list manager.
#[derive(Debug, Clone, Default)]
pub struct ProductListHooks {
    /// Runs immediately before every save commits (create, update, direct save).
    pub pre_save: HookStack,
    pub pre_create: HookStack,
    pub pre_update: HookStack,
    /// May veto a removal (e.g. the list is still assigned somewhere).
    pub delete_pre_check: HookStack,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product_list::ProductListType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn list() -> ProductList {
        ProductList::new("Base", ProductListType::Blacklist)
    }

    #[test]
    fn empty_stack_passes_list_through() {
        let out = HookStack::new().run(list()).unwrap();
        assert_eq!(out, list());
    }

    #[test]
    fn hooks_run_left_to_right() {
        let stack = HookStack::new()
            .with(|mut l: ProductList| -> HookResult {
                l.title.push_str("-a");
                Ok(l)
            })
            .with(|mut l: ProductList| -> HookResult {
                l.title.push_str("-b");
                Ok(l)
            });

        assert_eq!(stack.run(list()).unwrap().title, "Base-a-b");
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn first_veto_stops_the_stack() {
        let calls = Arc::new(AtomicUsize::new(0));
        let after = calls.clone();

        let stack = HookStack::new()
            .with(|_l: ProductList| -> HookResult { Err(vec![Message::new("in_use")]) })
            .with(move |l: ProductList| -> HookResult {
                after.fetch_add(1, Ordering::SeqCst);
                Ok(l)
            });

        let err = stack.run(list()).unwrap_err();
        assert_eq!(err, vec![Message::new("in_use")]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
