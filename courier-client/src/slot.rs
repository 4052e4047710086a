//! Lock-free holder for the currently published connection

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Single-writer, many-reader slot holding the live connection.
///
/// Reads and writes are one atomic pointer operation each; readers never
/// wait on the writer and never observe a partially replaced value.
pub struct ConnectionSlot<C> {
    current: ArcSwapOption<C>,
}

impl<C> ConnectionSlot<C> {
    /// Create an empty slot
    pub fn empty() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Current connection, if one has ever been published
    pub fn get(&self) -> Option<Arc<C>> {
        self.current.load_full()
    }

    /// Replace the published connection
    pub fn set(&self, conn: Option<Arc<C>>) {
        self.current.store(conn);
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_none()
    }
}

impl<C> Default for ConnectionSlot<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C> fmt::Debug for ConnectionSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// `check` is always derived from `id`, so a torn read would break it
    struct Conn {
        id: u64,
        check: u64,
    }

    impl Conn {
        fn new(id: u64) -> Arc<Self> {
            Arc::new(Self {
                id,
                check: !id,
            })
        }
    }

    #[test]
    fn test_empty_slot() {
        let slot: ConnectionSlot<Conn> = ConnectionSlot::empty();
        assert!(slot.get().is_none());
        assert!(slot.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let slot = ConnectionSlot::default();
        slot.set(Some(Conn::new(1)));
        assert_eq!(slot.get().unwrap().id, 1);

        slot.set(Some(Conn::new(2)));
        assert_eq!(slot.get().unwrap().id, 2);

        slot.set(None);
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_reader_keeps_old_connection_alive() {
        let slot = ConnectionSlot::default();
        slot.set(Some(Conn::new(1)));

        let held = slot.get().unwrap();
        slot.set(Some(Conn::new(2)));

        assert_eq!(held.id, 1);
        assert_eq!(slot.get().unwrap().id, 2);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let slot = Arc::new(ConnectionSlot::<Conn>::default());
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let stop = Arc::clone(&stop);
                thread::spawn(move || {
                    let mut last = 0;
                    let mut reads = 0u64;
                    while !stop.load(Ordering::Relaxed) {
                        if let Some(conn) = slot.get() {
                            assert_eq!(conn.check, !conn.id);
                            // Single writer publishes increasing ids
                            assert!(conn.id >= last);
                            last = conn.id;
                        }
                        reads += 1;
                    }
                    reads
                })
            })
            .collect();

        for id in 1..=10_000 {
            slot.set(Some(Conn::new(id)));
        }
        stop.store(true, Ordering::Relaxed);

        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(slot.get().unwrap().id, 10_000);
    }

    #[test]
    fn test_debug_reports_occupancy() {
        let slot = ConnectionSlot::default();
        assert!(format!("{:?}", slot).contains("occupied: false"));
        slot.set(Some(Conn::new(5)));
        assert!(format!("{:?}", slot).contains("occupied: true"));
    }
}
