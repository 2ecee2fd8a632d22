//! Builder wiring a [`WorkerPool`] together from configuration and the
//! injected collaborators.

use std::sync::{Arc, Weak};

use crate::config::PoolConfig;
use crate::core::dispatch::{DirectDispatcher, Dispatcher, PrivilegedProducer, Scheduler};
use crate::core::error::PoolError;
use crate::core::pool::WorkerPool;

/// Assembles a [`WorkerPool`].
///
/// The dispatcher defaults to [`DirectDispatcher`]; scheduler and privileged
/// producer are optional. The pool keeps only a weak reference to the
/// scheduler, so the caller stays its owner.
///
/// # Example
///
/// ```
/// use minion_pool::{PoolBuilder, PoolConfig};
///
/// let pool = PoolBuilder::new(PoolConfig::new().with_worker_count(2))
///     .build()
///     .unwrap();
/// pool.run();
/// pool.stop();
/// ```
pub struct PoolBuilder {
    config: PoolConfig,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    scheduler: Option<Weak<dyn Scheduler>>,
    privileged: Option<Arc<dyn PrivilegedProducer>>,
}

impl PoolBuilder {
    /// Starts a builder from `config`.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self { config, dispatcher: None, scheduler: None, privileged: None }
    }

    /// Sets the dispatcher shared by all workers.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Registers the external scheduler for deferred runs.
    #[must_use]
    pub fn scheduler(mut self, scheduler: &Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(Arc::downgrade(scheduler));
        self
    }

    /// Registers the privileged producer identity.
    #[must_use]
    pub fn privileged(mut self, producer: Arc<dyn PrivilegedProducer>) -> Self {
        self.privileged = Some(producer);
        self
    }

    /// Validates the configuration and builds the (stopped) pool.
    pub fn build(self) -> Result<WorkerPool, PoolError> {
        let dispatcher =
            self.dispatcher.unwrap_or_else(|| Arc::new(DirectDispatcher) as Arc<dyn Dispatcher>);
        WorkerPool::new(self.config, dispatcher, self.scheduler, self.privileged)
    }
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
