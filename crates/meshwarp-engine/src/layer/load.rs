use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A pending image load handed to the host.
///
/// The host decodes `uri` however it likes (on another thread, if it wants)
/// and returns the result with the ticket to
/// [`RenderLoopController::finish_load`](super::RenderLoopController::finish_load).
/// The controller revokes the ticket on detach or when a newer load starts,
/// after which completing it is a no-op.
#[derive(Debug)]
pub struct LoadTicket {
    uri: String,
    alive: Arc<AtomicBool>,
}

impl LoadTicket {
    pub(crate) fn issue(uri: impl Into<String>) -> (Self, Arc<AtomicBool>) {
        let alive = Arc::new(AtomicBool::new(true));
        let ticket = Self {
            uri: uri.into(),
            alive: Arc::clone(&alive),
        };
        (ticket, alive)
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Whether completing this ticket would still reach the layer.
    ///
    /// Loaders may poll this to abandon work early.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn same_load(&self, token: &Arc<AtomicBool>) -> bool {
        Arc::ptr_eq(&self.alive, token)
    }
}

pub(crate) fn revoke(token: &Arc<AtomicBool>) {
    token.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoking_kills_the_ticket() {
        let (ticket, token) = LoadTicket::issue("tiles/world.png");
        assert!(ticket.is_live());
        assert!(ticket.same_load(&token));
        revoke(&token);
        assert!(!ticket.is_live());
    }

    #[test]
    fn tickets_are_sendable() {
        fn assert_send<T: Send + 'static>(_: &T) {}
        let (ticket, _token) = LoadTicket::issue("a.png");
        assert_send(&ticket);
        let handle = std::thread::spawn(move || ticket.uri().to_string());
        assert_eq!(handle.join().unwrap(), "a.png");
    }
}
