//! Fact registration for the external templating consumer
//!
//! The consumer owns the registration surface: the engine hands it one
//! fact per exposed value, each a bundle of update/is-ready/get-value
//! closures over the shared snapshot cache. `is_ready` is false whenever
//! the underlying snapshot has no ready value at that slot, which tells
//! the consumer to deactivate everything depending on it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::config::EngineConfig;
use crate::lifecycle::MAX_PROXIES;
use crate::registry::IdentityRegistry;
use crate::snapshot::SnapshotCache;

/// Ordinal prefixes for per-slot fact names, one per supported proxy
pub const ORDINALS: [&str; MAX_PROXIES] = ["First", "Second", "Third", "Fourth"];

/// A single registered fact
pub struct Fact {
    update_context: Box<dyn Fn(u64) -> bool>,
    is_ready: Box<dyn Fn() -> bool>,
    get_value: Box<dyn Fn() -> Option<String>>,
}

impl Fact {
    pub fn new(
        update_context: impl Fn(u64) -> bool + 'static,
        is_ready: impl Fn() -> bool + 'static,
        get_value: impl Fn() -> Option<String> + 'static,
    ) -> Self {
        Self {
            update_context: Box::new(update_context),
            is_ready: Box::new(is_ready),
            get_value: Box::new(get_value),
        }
    }

    /// Refresh the backing snapshot for this frame; true when any
    /// exposed value changed
    pub fn update_context(&self, frame: u64) -> bool {
        (self.update_context)(frame)
    }

    pub fn is_ready(&self) -> bool {
        (self.is_ready)()
    }

    pub fn value(&self) -> Option<String> {
        (self.get_value)()
    }
}

/// The consumer-side registration surface
pub trait FactConsumer {
    fn register_fact(&mut self, name: &str, fact: Fact);
}

/// Register every exposed fact with the consumer: the aggregate minor
/// count, the two config values, and five facts per ordinal slot.
pub fn register_facts(
    consumer: &mut dyn FactConsumer,
    cache: Rc<RefCell<SnapshotCache>>,
    registry: Rc<RefCell<IdentityRegistry>>,
    config: &EngineConfig,
) {
    let update = {
        let cache = Rc::clone(&cache);
        let registry = Rc::clone(&registry);
        move |frame: u64| cache.borrow_mut().update(&registry.borrow(), frame)
    };
    let update = Rc::new(update);

    // Aggregate: total number of known minors
    {
        let cache_ready = Rc::clone(&cache);
        let cache_value = Rc::clone(&cache);
        let update = Rc::clone(&update);
        consumer.register_fact(
            "TotalMinors",
            Fact::new(
                move |frame| (*update)(frame),
                move || cache_ready.borrow().has_updated(),
                move || Some(cache_value.borrow().total().to_string()),
            ),
        );
    }

    // Config passthrough values, constant for the session
    let promotion_age = config.promotion_age_days;
    consumer.register_fact(
        "ConfigPromotionAge",
        Fact::new(|_| false, || true, move || Some(promotion_age.to_string())),
    );
    let curfew_time = config.curfew_time;
    consumer.register_fact(
        "ConfigCurfewTime",
        Fact::new(|_| false, || true, move || Some(curfew_time.to_string())),
    );

    // Per-slot facts
    for (index, ordinal) in ORDINALS.iter().enumerate() {
        register_slot_fact(consumer, &cache, &update, &format!("{}MinorName", ordinal), index, |c, i| {
            c.name_at(i).map(str::to_string)
        });
        register_slot_fact(
            consumer,
            &cache,
            &update,
            &format!("{}MinorBirthday", ordinal),
            index,
            |c, i| c.birthday_at(i).map(str::to_string),
        );
        register_slot_fact(consumer, &cache, &update, &format!("{}MinorBed", ordinal), index, |c, i| {
            c.bed_at(i).map(str::to_string)
        });
        register_slot_fact(
            consumer,
            &cache,
            &update,
            &format!("{}MinorGender", ordinal),
            index,
            |c, i| c.gender_at(i).map(str::to_string),
        );
        register_slot_fact(
            consumer,
            &cache,
            &update,
            &format!("{}MinorGuardian", ordinal),
            index,
            |c, i| c.guardian_at(i).map(str::to_string),
        );
    }
}

fn register_slot_fact<F: Fn(u64) -> bool + 'static>(
    consumer: &mut dyn FactConsumer,
    cache: &Rc<RefCell<SnapshotCache>>,
    update: &Rc<F>,
    name: &str,
    index: usize,
    get: impl Fn(&SnapshotCache, usize) -> Option<String> + 'static,
) {
    let cache_ready = Rc::clone(cache);
    let cache_value = Rc::clone(cache);
    let update = Rc::clone(update);
    consumer.register_fact(
        name,
        Fact::new(
            move |frame| (*update)(frame),
            move || cache_ready.borrow().is_ready(index),
            move || get(&cache_value.borrow(), index),
        ),
    );
}
