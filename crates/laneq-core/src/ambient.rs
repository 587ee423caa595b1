//! Ambient execution context carried across queued dispatches.
//!
//! An entry that has to wait behind in-flight work is dispatched later, from
//! whichever call stack signals completion of its predecessor. To keep errors
//! and log events attributed to the scope the entry was enqueued in, the
//! queue captures an [`AmbientContext`] at enqueue time and re-enters it
//! around the deferred dispatch.

use tracing::Span;

/// A logical scope that can be captured on one call stack and re-entered on
/// another.
pub trait AmbientContext: Clone + Send + Sync + 'static {
    /// The context active on the calling thread, if any.
    fn capture() -> Option<Self>;

    /// Run `f` with this context entered.
    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// No ambient context at all.
impl AmbientContext for () {
    fn capture() -> Option<Self> {
        None
    }

    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// The current `tracing` span. Disabled spans (no subscriber, or nothing
/// entered) are not captured.
impl AmbientContext for Span {
    fn capture() -> Option<Self> {
        let current = Span::current();
        if current.is_disabled() {
            None
        } else {
            Some(current)
        }
    }

    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        Span::in_scope(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_context_never_captures() {
        assert!(<() as AmbientContext>::capture().is_none());
        assert_eq!(().in_scope(|| 7), 7);
    }

    #[test]
    fn test_span_not_captured_without_subscriber() {
        assert!(<Span as AmbientContext>::capture().is_none());
    }

    #[test]
    fn test_span_captured_and_reentered() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            let session = tracing::info_span!("session", id = 42);
            let captured = session.in_scope(<Span as AmbientContext>::capture);
            let captured = captured.expect("span should be captured");
            assert_eq!(captured.metadata().map(|m| m.name()), Some("session"));

            // outside the span, re-entering makes it current again
            assert!(Span::current().is_none());
            let name = AmbientContext::in_scope(&captured, || {
                Span::current().metadata().map(|m| m.name())
            });
            assert_eq!(name, Some("session"));
        });
    }
}
