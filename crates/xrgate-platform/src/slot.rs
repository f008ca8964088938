//! Process-global slots the JNI exports share between activity instances.

/// Empty `slot` only when its value belongs to the caller, as decided by
/// `is_owner`. A slot already taken over by another activity instance is
/// left in place.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn take_owned<T>(slot: &mut Option<T>, is_owner: impl FnOnce(&T) -> bool) -> Option<T> {
    if slot.as_ref().is_some_and(is_owner) {
        slot.take()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_empties_the_slot() {
        let mut slot = Some("first");
        assert_eq!(take_owned(&mut slot, |held| *held == "first"), Some("first"));
        assert!(slot.is_none());
    }

    #[test]
    fn stale_owner_leaves_newer_value() {
        // the first instance's destroy arrives after the second was created
        let mut slot = Some("second");
        assert_eq!(take_owned(&mut slot, |held| *held == "first"), None);
        assert_eq!(slot, Some("second"));
    }

    #[test]
    fn empty_slot_stays_empty() {
        let mut slot: Option<&str> = None;
        assert_eq!(take_owned(&mut slot, |_| true), None);
    }
}
