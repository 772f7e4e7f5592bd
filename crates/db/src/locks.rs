use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use glassdesk_core::domain::session::SessionKey;

type Slot = Arc<AsyncMutex<()>>;

/// One async mutex per session key.
///
/// Slots are created on demand and dropped once nobody holds or waits on
/// them, so the table only tracks keys with in-flight work.
#[derive(Clone, Default)]
pub struct SessionLocks {
    slots: Arc<Mutex<HashMap<SessionKey, Slot>>>,
}

pub struct SessionGuard {
    key: SessionKey,
    _guard: OwnedMutexGuard<()>,
}

impl SessionGuard {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

impl SessionLocks {
    pub async fn acquire(&self, key: &SessionKey) -> SessionGuard {
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        SessionGuard { key: key.clone(), _guard: guard }
    }

    pub fn tracked_keys(&self) -> usize {
        match self.slots.lock() {
            Ok(slots) => slots.values().filter(|slot| Arc::strong_count(slot) > 1).count(),
            Err(poisoned) => {
                poisoned.into_inner().values().filter(|slot| Arc::strong_count(slot) > 1).count()
            }
        }
    }
}
