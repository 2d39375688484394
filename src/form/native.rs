use std::sync::{Arc, Weak};

use crate::reactive::ReactiveCell;

/// Validity hooks of a host form element.
pub trait NativeForm: Send + Sync {
    fn check_validity(&self) -> bool;

    /// Surfaces the invalid state to the user (focus, tooltips, ...).
    fn report_validity(&self);
}

/// Weak slot for the host form. A form that has been dropped reads as absent.
pub type FormHandle = ReactiveCell<Option<Weak<dyn NativeForm>>>;

pub fn form_handle<F>(form: &Arc<F>) -> FormHandle
where
    F: NativeForm + 'static,
{
    let weak: Weak<F> = Arc::downgrade(form);
    let weak: Weak<dyn NativeForm> = weak;
    ReactiveCell::new(Some(weak))
}

pub fn empty_form_handle() -> FormHandle {
    ReactiveCell::new(None)
}

pub fn attach_form<F>(handle: &FormHandle, form: &Arc<F>)
where
    F: NativeForm + 'static,
{
    let weak: Weak<F> = Arc::downgrade(form);
    let weak: Weak<dyn NativeForm> = weak;
    handle.set(Some(weak));
}

pub(super) fn resolve_form(handle: &FormHandle) -> Option<Arc<dyn NativeForm>> {
    handle.with(|slot| slot.as_ref().and_then(Weak::upgrade))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysValid;

    impl NativeForm for AlwaysValid {
        fn check_validity(&self) -> bool {
            true
        }

        fn report_validity(&self) {}
    }

    #[test]
    fn handle_resolves_until_the_form_is_dropped() {
        let form = Arc::new(AlwaysValid);
        let handle = form_handle(&form);
        assert!(resolve_form(&handle).is_some_and(|form| form.check_validity()));

        drop(form);
        assert!(resolve_form(&handle).is_none());
    }

    #[test]
    fn attach_fills_an_empty_handle() {
        let handle = empty_form_handle();
        assert!(resolve_form(&handle).is_none());

        let form = Arc::new(AlwaysValid);
        attach_form(&handle, &form);
        assert!(resolve_form(&handle).is_some());
    }
}
